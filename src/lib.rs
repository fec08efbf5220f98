//! Library entrypoint for CryptoAlerts.
//!
//! `main.rs` only wires settings, logging and the listener; everything else
//! lives here so integration tests under `tests/` can build the app state
//! with fake market data and drive the routers directly.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

pub mod services;

#[path = "views/render.rs"]
pub mod render;
#[path = "views/templates.rs"]
pub mod templates;

pub mod controllers;
pub mod routes;

use services::{
    alert_monitor::AlertMonitor,
    alert_store::AlertStore,
    binance::BinanceClient,
    market_data::MarketData,
    notifier::{Fanout, Inbox, Notifier, TelegramNotifier},
};

/// Notifications kept in the inbox shown by the UI.
pub const INBOX_CAPACITY: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub settings: config::Settings,
    pub store: Arc<AlertStore>,
    pub market: Arc<dyn MarketData>,
    pub inbox: Arc<Inbox>,
    pub monitor: Arc<AlertMonitor>,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
}

impl AppState {
    /// Wires the store, notifier chain and monitor around a market data source.
    pub fn with_parts(
        settings: config::Settings,
        store: Arc<AlertStore>,
        market: Arc<dyn MarketData>,
    ) -> Self {
        let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(64);

        let inbox = Arc::new(Inbox::new(events_tx.clone(), INBOX_CAPACITY));

        let mut targets: Vec<Arc<dyn Notifier>> = vec![inbox.clone()];
        if let (Some(token), Some(chat)) = (&settings.telegram_bot_token, &settings.telegram_chat_id) {
            match TelegramNotifier::new(token.clone(), chat.clone(), settings.http_timeout()) {
                Ok(t) => targets.push(Arc::new(t)),
                Err(e) => tracing::warn!(error = %e, "telegram notifier disabled"),
            }
        }
        let notifier: Arc<dyn Notifier> = Arc::new(Fanout::new(targets));

        let monitor = Arc::new(AlertMonitor::new(
            store.clone(),
            market.clone(),
            notifier,
            events_tx.clone(),
            settings.cycle_timeout(),
        ));

        Self {
            hbs: templates::build_handlebars(),
            settings,
            store,
            market,
            inbox,
            monitor,
            events_tx,
        }
    }

    /// Production state: Binance gateway plus the configured alert store.
    pub async fn from_settings(settings: config::Settings) -> error::Result<Self> {
        let market: Arc<dyn MarketData> = Arc::new(BinanceClient::new(
            settings.binance_base_url.clone(),
            settings.http_timeout(),
        )?);

        let store = match &settings.alerts_file {
            Some(path) => AlertStore::open(path, settings.max_alerts).await,
            None => AlertStore::in_memory(settings.max_alerts),
        };

        Ok(Self::with_parts(settings, Arc::new(store), market))
    }
}
