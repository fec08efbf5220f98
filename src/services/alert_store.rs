//! Owned store of alert definitions.
//!
//! All reads and writes go through one async mutex, so the store is the
//! single writer of the alert list. When a file path is configured every
//! mutation is written through to disk as one JSON document (temp file +
//! rename). Disk failures never fail the caller: the in-memory list stays
//! authoritative and the failure is logged and counted.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{CryptoCurrency, PriceAlert},
    services::evaluator::{self, Outcome},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    alerts: Vec<PriceAlert>,
}

pub struct AlertStore {
    alerts: Mutex<Vec<PriceAlert>>,
    path: Option<PathBuf>,
    // 0 => unbounded
    max_alerts: usize,
    persist_failures: AtomicU64,
}

impl AlertStore {
    pub fn in_memory(max_alerts: usize) -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            path: None,
            max_alerts,
            persist_failures: AtomicU64::new(0),
        }
    }

    /// Opens a file-backed store. A missing file starts empty. A file that
    /// does not parse is moved aside to `<name>.corrupt-<timestamp>` before
    /// starting empty, so later writes never overwrite it; if it cannot be
    /// moved, the store runs in memory only.
    pub async fn open(path: impl Into<PathBuf>, max_alerts: usize) -> Self {
        let path = path.into();

        let (alerts, path) = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<StoreFile>(&bytes) {
                Ok(file) => {
                    tracing::info!(path = %path.display(), count = file.alerts.len(), "loaded alerts");
                    (file.alerts, Some(path))
                }
                Err(e) => {
                    let path = quarantine(&path, &e).await;
                    (Vec::new(), path)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Vec::new(), Some(path)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read alerts, starting empty");
                (Vec::new(), Some(path))
            }
        };

        Self {
            alerts: Mutex::new(alerts),
            path,
            max_alerts,
            persist_failures: AtomicU64::new(0),
        }
    }

    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    /// Inserts a new alert. Returns whatever had to be evicted to respect the cap.
    pub async fn create(&self, alert: PriceAlert) -> Result<Vec<PriceAlert>> {
        let mut alerts = self.alerts.lock().await;

        if alerts.iter().any(|a| a.id == alert.id) {
            return Err(AppError::Validation(format!("alert {} already exists", alert.id)));
        }

        let evicted = self.insert_capped(&mut alerts, alert);
        self.persist(&alerts).await;

        Ok(evicted)
    }

    /// Replaces the alert with the same id, or inserts it if unknown.
    /// Symbol, target, direction and creation time cannot change.
    pub async fn upsert(&self, alert: PriceAlert) -> Result<Vec<PriceAlert>> {
        let mut alerts = self.alerts.lock().await;

        let evicted = match alerts.iter().position(|a| a.id == alert.id) {
            Some(i) => {
                check_immutable(&alerts[i], &alert)?;
                alerts[i] = alert;
                Vec::new()
            }
            None => self.insert_capped(&mut alerts, alert),
        };

        self.persist(&alerts).await;
        Ok(evicted)
    }

    /// Returns false if no alert had that id.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut alerts = self.alerts.lock().await;

        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        let removed = alerts.len() != before;

        if removed {
            self.persist(&alerts).await;
        }
        removed
    }

    pub async fn get(&self, id: Uuid) -> Option<PriceAlert> {
        self.alerts.lock().await.iter().find(|a| a.id == id).cloned()
    }

    pub async fn list_all(&self) -> Vec<PriceAlert> {
        self.alerts.lock().await.clone()
    }

    pub async fn list_active(&self) -> Vec<PriceAlert> {
        self.alerts
            .lock()
            .await
            .iter()
            .filter(|a| a.active)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.alerts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Activating an alert re-arms it: the triggered flag is cleared so the
    /// next crossing notifies again.
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<PriceAlert> {
        let mut alerts = self.alerts.lock().await;

        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppError::NotFound(id))?;

        alert.active = active;
        if active {
            alert.triggered = false;
            alert.triggered_at = None;
        }
        let updated = alert.clone();

        self.persist(&alerts).await;
        Ok(updated)
    }

    /// Records a fresh ticker for one alert and applies the evaluation under
    /// the store lock. `None` means the alert was deleted since it was listed.
    pub async fn observe(&self, id: Uuid, ticker: &CryptoCurrency) -> Option<(PriceAlert, Outcome)> {
        self.observe_many(&[(id, ticker)]).await.pop()
    }

    /// Batch form of [`observe`](Self::observe): every reading is applied
    /// under one lock and the file is written once. Alerts deleted since they
    /// were listed are left out of the result.
    pub async fn observe_many(&self, readings: &[(Uuid, &CryptoCurrency)]) -> Vec<(PriceAlert, Outcome)> {
        let mut alerts = self.alerts.lock().await;
        let now = Utc::now();
        let mut applied = Vec::with_capacity(readings.len());

        for (id, ticker) in readings {
            let Some(alert) = alerts.iter_mut().find(|a| a.id == *id) else {
                continue;
            };

            let outcome = evaluator::evaluate(alert, ticker.price);

            alert.last_price = Some(ticker.price);
            alert.last_change_percent = Some(ticker.price_change_percent);
            alert.last_checked_at = Some(now);

            if outcome == Outcome::Triggered {
                alert.triggered = true;
                alert.triggered_at = Some(now);
                alert.active = false;
            }

            applied.push((alert.clone(), outcome));
        }

        if !applied.is_empty() {
            self.persist(&alerts).await;
        }
        applied
    }

    fn insert_capped(&self, alerts: &mut Vec<PriceAlert>, alert: PriceAlert) -> Vec<PriceAlert> {
        let mut evicted = Vec::new();

        if self.max_alerts > 0 {
            while alerts.len() >= self.max_alerts {
                let Some(oldest) = alerts
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, a)| a.created_at)
                    .map(|(i, _)| i)
                else {
                    break;
                };

                let gone = alerts.remove(oldest);
                tracing::info!(id = %gone.id, symbol = %gone.symbol, "alert cap reached, evicting oldest");
                evicted.push(gone);
            }
        }

        alerts.push(alert);
        evicted
    }

    async fn persist(&self, alerts: &[PriceAlert]) {
        let Some(path) = &self.path else {
            return;
        };

        if let Err(e) = write_file(path, alerts).await {
            self.persist_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(path = %path.display(), error = %e, "failed to persist alerts");
        }
    }
}

fn check_immutable(existing: &PriceAlert, incoming: &PriceAlert) -> Result<()> {
    if existing.symbol != incoming.symbol {
        return Err(AppError::ImmutableField("symbol"));
    }
    if existing.target_price != incoming.target_price {
        return Err(AppError::ImmutableField("target_price"));
    }
    if existing.direction != incoming.direction {
        return Err(AppError::ImmutableField("direction"));
    }
    if existing.created_at != incoming.created_at {
        return Err(AppError::ImmutableField("created_at"));
    }
    Ok(())
}

// Returns the path to keep writing to, or None when the bad file could not
// be moved out of the way.
async fn quarantine(path: &Path, cause: &serde_json::Error) -> Option<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "alerts.json".to_string());
    let aside = path.with_file_name(format!(
        "{name}.corrupt-{}",
        Utc::now().format("%Y%m%dT%H%M%S%.3f")
    ));

    match tokio::fs::rename(path, &aside).await {
        Ok(()) => {
            tracing::warn!(
                path = %path.display(),
                moved_to = %aside.display(),
                error = %cause,
                "alerts file is corrupt, moved aside and starting empty"
            );
            Some(path.to_path_buf())
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "alerts file is corrupt and could not be moved aside, keeping alerts in memory only"
            );
            None
        }
    }
}

async fn write_file(path: &Path, alerts: &[PriceAlert]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }

    let body = serde_json::to_vec_pretty(&StoreFile {
        alerts: alerts.to_vec(),
    })?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;

    Ok(())
}
