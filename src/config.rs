use std::{env, path::PathBuf, time::Duration};

/// Shortest polling interval accepted; lower values are clamped up.
pub const MIN_CHECK_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub binance_base_url: String,

    // None => alerts live only in memory
    pub alerts_file: Option<PathBuf>,
    pub max_alerts: usize,

    pub check_interval_secs: u64,
    // budget for each market request and each notification in a cycle
    pub cycle_timeout_secs: u64,
    pub http_timeout_secs: u64,

    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Settings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let host = var_or("HOST", "127.0.0.1");
    let port = parse_or("PORT", 3000u16);

    let binance_base_url = var_or("BINANCE_BASE_URL", "https://api.binance.com")
        .trim_end_matches('/')
        .to_string();

    let alerts_file = match var_or("ALERTS_FILE", "data/alerts.json").trim() {
        "" | "memory" => None,
        path => Some(PathBuf::from(path)),
    };

    let max_alerts = parse_or("MAX_ALERTS", 100usize);

    let requested = parse_or("CHECK_INTERVAL_SECS", 60u64);
    let check_interval_secs = if requested < MIN_CHECK_INTERVAL_SECS {
        tracing::warn!(
            requested,
            minimum = MIN_CHECK_INTERVAL_SECS,
            "CHECK_INTERVAL_SECS below minimum, clamping"
        );
        MIN_CHECK_INTERVAL_SECS
    } else {
        requested
    };

    let cycle_timeout_secs = parse_or("CYCLE_TIMEOUT_SECS", 30u64).max(1);
    let http_timeout_secs = parse_or("HTTP_TIMEOUT_SECS", 10u64).max(1);

    Settings {
        host,
        port,
        binance_base_url,
        alerts_file,
        max_alerts,
        check_interval_secs,
        cycle_timeout_secs,
        http_timeout_secs,
        telegram_bot_token: non_empty("TELEGRAM_BOT_TOKEN"),
        telegram_chat_id: non_empty("TELEGRAM_CHAT_ID"),
    }
}
