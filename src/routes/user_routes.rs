use axum::{
    routing::{get, post},
    Router,
};

use crate::{controllers::user_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/users/register", post(user_controller::register))
        .route("/api/users/verify-otp", post(user_controller::verify_otp))
        .route("/api/users/login", post(user_controller::login))
        .route(
            "/api/users/verify-login-otp",
            post(user_controller::verify_login_otp),
        )
        .route("/api/users/resend-otp", post(user_controller::resend_otp))
        .route("/api/users/me", get(user_controller::me))
}
