#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use cryptoalerts::{
    config,
    error::{AppError, Result},
    models::CryptoCurrency,
    services::{
        alert_store::AlertStore,
        market_data::MarketData,
        notifier::{Notification, Notifier},
    },
    AppState,
};
use rust_decimal::Decimal;

#[derive(Clone)]
pub enum Quote {
    Price(Decimal),
    Unavailable,
    Garbled,
}

/// Scripted market data that records every ticker request.
#[derive(Default)]
pub struct FakeMarket {
    quotes: Mutex<HashMap<String, Quote>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    delay: Mutex<Option<Duration>>,
    slow: Mutex<HashMap<String, Duration>>,
}

impl FakeMarket {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.quotes
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Quote::Price(price));
    }

    pub fn set_quote(&self, symbol: &str, quote: Quote) {
        self.quotes.lock().unwrap().insert(symbol.to_string(), quote);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Delays only `symbol`, on top of any global delay.
    pub fn set_delay_for(&self, symbol: &str, delay: Duration) {
        self.slow.lock().unwrap().insert(symbol.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls().iter().filter(|s| s.as_str() == symbol).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn snapshot(symbol: &str, price: Decimal) -> CryptoCurrency {
        CryptoCurrency {
            symbol: symbol.to_string(),
            price,
            price_change_percent: Decimal::new(125, 2),
            volume: Decimal::new(1000, 0),
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn ping(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Upstream {
                status: 503,
                body: "offline".to_string(),
            });
        }
        Ok(())
    }

    async fn ticker(&self, symbol: &str) -> Result<CryptoCurrency> {
        self.calls.lock().unwrap().push(symbol.to_string());

        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        let slow = self.slow.lock().unwrap().get(symbol).copied();
        if let Some(d) = slow {
            tokio::time::sleep(d).await;
        }

        let quote = self.quotes.lock().unwrap().get(symbol).cloned();
        match quote {
            Some(Quote::Price(p)) => Ok(Self::snapshot(symbol, p)),
            Some(Quote::Unavailable) => Err(AppError::Upstream {
                status: 503,
                body: "unavailable".to_string(),
            }),
            Some(Quote::Garbled) => Err(AppError::Parse {
                symbol: symbol.to_string(),
                field: "lastPrice",
                value: "NaN?".to_string(),
            }),
            None => Err(AppError::Upstream {
                status: 400,
                body: r#"{"code":-1121,"msg":"Invalid symbol."}"#.to_string(),
            }),
        }
    }

    async fn all_tickers(&self) -> Result<Vec<CryptoCurrency>> {
        let quotes = self.quotes.lock().unwrap().clone();
        let mut out: Vec<CryptoCurrency> = quotes
            .into_iter()
            .filter_map(|(s, q)| match q {
                Quote::Price(p) => Some(Self::snapshot(&s, p)),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(out)
    }
}

/// Notifier that only remembers what it was asked to present.
#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.dedup_key.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn present(&self, note: &Notification) {
        self.seen.lock().unwrap().push(note.clone());
    }
}

/// Notifier that takes `delay` before recording each notification.
pub struct SlowNotifier {
    pub delay: Duration,
    pub started: Mutex<usize>,
    pub finished: Mutex<usize>,
}

impl SlowNotifier {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: Mutex::new(0),
            finished: Mutex::new(0),
        })
    }

    pub fn started(&self) -> usize {
        *self.started.lock().unwrap()
    }

    pub fn finished(&self) -> usize {
        *self.finished.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for SlowNotifier {
    async fn present(&self, _note: &Notification) {
        *self.started.lock().unwrap() += 1;
        tokio::time::sleep(self.delay).await;
        *self.finished.lock().unwrap() += 1;
    }
}

pub fn test_settings() -> config::Settings {
    let mut settings = config::load();
    settings.alerts_file = None;
    settings.max_alerts = 100;
    settings.cycle_timeout_secs = 5;
    settings.telegram_bot_token = None;
    settings.telegram_chat_id = None;
    settings
}

pub fn test_state(market: Arc<FakeMarket>) -> AppState {
    let settings = test_settings();
    let store = Arc::new(AlertStore::in_memory(settings.max_alerts));
    AppState::with_parts(settings, store, market)
}
