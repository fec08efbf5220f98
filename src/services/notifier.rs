use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::{
    error::{AppError, Result},
    models::{CryptoCurrency, PriceAlert},
};

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn for_trigger(alert: &PriceAlert, ticker: &CryptoCurrency) -> Self {
        Self {
            title: format!("{} price alert", alert.symbol),
            body: format!(
                "{} price is now {}, which is {} your target of {}",
                alert.symbol,
                ticker.price.normalize(),
                alert.direction.as_str(),
                alert.target_price.normalize(),
            ),
            dedup_key: alert.dedup_key(),
            created_at: Utc::now(),
        }
    }
}

/// Surface that shows a triggered alert to the user. Delivery problems are
/// the notifier's to log; they never fail an evaluation cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn present(&self, note: &Notification);
}

/// In-process notification list backing the UI. Entries are keyed by
/// `dedup_key`: presenting the same key again replaces the old entry and
/// moves it to the top.
pub struct Inbox {
    entries: RwLock<Vec<Notification>>,
    capacity: usize,
    events_tx: broadcast::Sender<String>,
}

impl Inbox {
    pub fn new(events_tx: broadcast::Sender<String>, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
            events_tx,
        }
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<Notification> {
        self.entries.read().await.clone()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        let _ = self.events_tx.send("notification".to_string());
    }
}

#[async_trait]
impl Notifier for Inbox {
    async fn present(&self, note: &Notification) {
        {
            let mut entries = self.entries.write().await;
            entries.retain(|n| n.dedup_key != note.dedup_key);
            entries.insert(0, note.clone());
            entries.truncate(self.capacity);
        }

        tracing::info!(key = %note.dedup_key, title = %note.title, "{}", note.body);

        // nobody listening is fine
        let _ = self.events_tx.send("notification".to_string());
    }
}

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Forwards notifications to a Telegram chat through the Bot API.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> Result<Self> {
        Self::with_api_base(TELEGRAM_API, bot_token, chat_id, timeout)
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        bot_token: String,
        chat_id: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }

    // The request URL embeds the bot token, so transport errors are
    // stripped of it before they can reach a log line.
    async fn send(&self, note: &Notification) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let text = format!("{}\n{}", note.title, note.body);

        let params = [("chat_id", self.chat_id.as_str()), ("text", text.as_str())];

        let resp = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.without_url()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream { status, body });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn present(&self, note: &Notification) {
        match self.send(note).await {
            Ok(()) => tracing::debug!(key = %note.dedup_key, "telegram notification sent"),
            Err(e) => tracing::warn!(key = %note.dedup_key, error = %e, "failed to send telegram notification"),
        }
    }
}

/// Presents every notification on each of its targets, in order.
pub struct Fanout {
    targets: Vec<Arc<dyn Notifier>>,
}

impl Fanout {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl Notifier for Fanout {
    async fn present(&self, note: &Notification) {
        for t in &self.targets {
            t.present(note).await;
        }
    }
}
