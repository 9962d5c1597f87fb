use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mongodb::Client;

use moneytrading::services::clock::SystemClock;
use moneytrading::services::execution_simulator::ExecutionSimulator;
use moneytrading::services::market_service::MarketData;
use moneytrading::services::notifier::LogNotifier;
use moneytrading::services::order_store::MongoOrderStore;
use moneytrading::services::scheduler::TokioScheduler;
use moneytrading::services::db_init;
use moneytrading::{config, routes, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!(error = %e, "could not ensure indexes");
    }

    let clock = Arc::new(SystemClock);
    let store = Arc::new(MongoOrderStore::new(db.clone()));
    let simulator = Arc::new(ExecutionSimulator::new(
        store.clone(),
        clock.clone(),
        settings.exec_success_rate,
    ));
    let scheduler = Arc::new(TokioScheduler::new(
        simulator,
        Duration::from_millis(settings.exec_delay_ms),
    ));

    let state = AppState {
        db,
        settings: settings.clone(),
        orders: store,
        clock,
        scheduler,
        notifier: Arc::new(LogNotifier),
        market: Arc::new(MarketData::default_fixture()),
    };

    let app = routes::app(state);

    let addr = SocketAddr::from((
        settings
            .host
            .parse::<std::net::IpAddr>()
            .expect("HOST must be a valid IP address"),
        settings.port,
    ));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
