use rand::Rng;
use serde::Serialize;

/// One entry of the mock market fixture. Base prices drift a little on every
/// read so the UI looks alive; nothing here is real.
#[derive(Debug, Clone)]
pub struct StockInfo {
    pub symbol: &'static str,
    pub name: &'static str,
    pub sector: &'static str,
    pub base_price: f64,
    pub pe: f64,
    pub market_cap: &'static str,
    pub volume: &'static str,
}

/// Injected at AppState construction; holds the one canonical stock table so
/// every endpoint perturbs the same data.
#[derive(Debug, Clone)]
pub struct MarketData {
    stocks: Vec<StockInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: String,
    pub market_cap: String,
    pub pe: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDetail {
    #[serde(flatten)]
    pub quote: StockQuote,
    pub sector: String,
    pub day_high: f64,
    pub day_low: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreData {
    pub trending: Vec<StockQuote>,
    pub gainers: Vec<StockQuote>,
    pub losers: Vec<StockQuote>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl MarketData {
    pub fn new(stocks: Vec<StockInfo>) -> Self {
        MarketData { stocks }
    }

    /// The NSE large-cap table the original app shipped as mock data.
    pub fn default_fixture() -> Self {
        MarketData::new(vec![
            StockInfo { symbol: "RELIANCE", name: "Reliance Industries", sector: "ENERGY", base_price: 2456.75, pe: 25.6, market_cap: "16.6L Cr", volume: "2.1M" },
            StockInfo { symbol: "TCS", name: "Tata Consultancy Services", sector: "IT", base_price: 3678.90, pe: 28.3, market_cap: "13.4L Cr", volume: "1.8M" },
            StockInfo { symbol: "INFY", name: "Infosys Limited", sector: "IT", base_price: 1534.25, pe: 23.1, market_cap: "6.4L Cr", volume: "3.2M" },
            StockInfo { symbol: "HDFCBANK", name: "HDFC Bank Limited", sector: "BANKING", base_price: 1678.30, pe: 19.7, market_cap: "12.8L Cr", volume: "2.5M" },
            StockInfo { symbol: "ICICIBANK", name: "ICICI Bank Limited", sector: "BANKING", base_price: 967.45, pe: 17.4, market_cap: "6.8L Cr", volume: "4.1M" },
            StockInfo { symbol: "ADANIPORTS", name: "Adani Ports & SEZ", sector: "INFRASTRUCTURE", base_price: 876.45, pe: 15.2, market_cap: "1.9L Cr", volume: "1.2M" },
            StockInfo { symbol: "TATASTEEL", name: "Tata Steel Limited", sector: "METALS", base_price: 134.75, pe: 8.9, market_cap: "1.6L Cr", volume: "4.1M" },
            StockInfo { symbol: "SBIN", name: "State Bank of India", sector: "BANKING", base_price: 598.20, pe: 12.3, market_cap: "5.3L Cr", volume: "5.6M" },
            StockInfo { symbol: "BHARTIARTL", name: "Bharti Airtel Limited", sector: "TELECOM", base_price: 912.60, pe: 32.8, market_cap: "5.1L Cr", volume: "2.9M" },
            StockInfo { symbol: "WIPRO", name: "Wipro Limited", sector: "IT", base_price: 432.15, pe: 18.6, market_cap: "2.4L Cr", volume: "2.2M" },
        ])
    }

    fn find(&self, symbol: &str) -> Option<&StockInfo> {
        let sym = symbol.trim().to_uppercase();
        self.stocks.iter().find(|s| s.symbol == sym)
    }

    fn quote(&self, info: &StockInfo) -> StockQuote {
        // Drift the base price by up to +-2% per read.
        let pct: f64 = rand::thread_rng().gen_range(-2.0..2.0);
        let change = info.base_price * pct / 100.0;

        StockQuote {
            symbol: info.symbol.to_string(),
            name: info.name.to_string(),
            price: round2(info.base_price + change),
            change: round2(change),
            change_percent: round2(pct),
            volume: info.volume.to_string(),
            market_cap: info.market_cap.to_string(),
            pe: info.pe,
        }
    }

    pub fn explore(&self) -> ExploreData {
        let mut quotes: Vec<StockQuote> = self.stocks.iter().map(|s| self.quote(s)).collect();

        let trending = quotes.iter().take(5).cloned().collect();

        quotes.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));
        let gainers = quotes.iter().take(3).cloned().collect();
        let losers = quotes.iter().rev().take(3).cloned().collect();

        ExploreData {
            trending,
            gainers,
            losers,
        }
    }

    pub fn details(&self, symbol: &str) -> Option<StockDetail> {
        let info = self.find(symbol)?;
        let quote = self.quote(info);

        let day_high = round2(quote.price * 1.012);
        let day_low = round2(quote.price * 0.988);

        Some(StockDetail {
            quote,
            sector: info.sector.to_string(),
            day_high,
            day_low,
        })
    }

    /// Random-walk chart points ending at `now_ms`. `None` when the symbol
    /// or the period is unknown.
    pub fn chart(&self, symbol: &str, period: &str, now_ms: i64) -> Option<Vec<ChartPoint>> {
        let info = self.find(symbol)?;
        let (points, step_ms) = chart_shape(period)?;

        let mut rng = rand::thread_rng();
        let mut price = info.base_price;
        let mut out = Vec::with_capacity(points);

        for i in 0..points {
            let pct: f64 = rng.gen_range(-1.0..1.0);
            price = (price * (1.0 + pct / 100.0)).max(1.0);
            let timestamp = now_ms - ((points - 1 - i) as i64) * step_ms;
            out.push(ChartPoint {
                timestamp,
                price: round2(price),
            });
        }

        Some(out)
    }

    pub fn sector(&self, sector: &str) -> Vec<StockQuote> {
        let wanted = sector.trim().to_uppercase();
        self.stocks
            .iter()
            .filter(|s| s.sector == wanted)
            .map(|s| self.quote(s))
            .collect()
    }

    /// Case-insensitive symbol/name substring match, capped at 10 results.
    pub fn search(&self, query: &str) -> Vec<StockQuote> {
        let q = query.trim().to_uppercase();
        if q.is_empty() {
            return Vec::new();
        }

        self.stocks
            .iter()
            .filter(|s| s.symbol.contains(&q) || s.name.to_uppercase().contains(&q))
            .take(10)
            .map(|s| self.quote(s))
            .collect()
    }
}

/// Point count and spacing per chart period.
fn chart_shape(period: &str) -> Option<(usize, i64)> {
    const HOUR: i64 = 60 * 60 * 1000;
    const DAY: i64 = 24 * HOUR;

    match period.trim().to_uppercase().as_str() {
        "1D" => Some((24, HOUR)),
        "1W" => Some((7, DAY)),
        "1M" => Some((30, DAY)),
        "3M" => Some((90, DAY)),
        "1Y" => Some((52, 7 * DAY)),
        _ => None,
    }
}
