use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex, RwLock},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{CryptoCurrency, PriceAlert},
    services::{
        alert_store::AlertStore,
        evaluator::Outcome,
        market_data::MarketData,
        notifier::{Notification, Notifier},
    },
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    pub active_alerts: usize,
    pub symbols: usize,
    pub fetched: usize,
    pub failed_symbols: Vec<String>,

    pub evaluated: usize,
    pub skipped_alerts: usize,
    pub triggered: usize,

    // connectivity check failed, nothing fetched
    pub offline: bool,
    // at least one request ran past its budget
    pub timed_out: bool,
}

impl CycleReport {
    /// Some alerts could not be checked, so displayed prices may be stale.
    pub fn is_degraded(&self) -> bool {
        self.offline || self.timed_out || !self.failed_symbols.is_empty()
    }
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    busy: AtomicU64,
    failed_symbols: AtomicU64,
    skipped_alerts: AtomicU64,
    notifications: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStats {
    pub cycles: u64,
    pub busy: u64,
    pub failed_symbols: u64,
    pub skipped_alerts: u64,
    pub notifications: u64,
}

/// Runs fetch-evaluate-notify cycles. At most one cycle runs at a time,
/// whether started by the scheduler or by a manual refresh.
pub struct AlertMonitor {
    store: Arc<AlertStore>,
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    events_tx: broadcast::Sender<String>,
    fetch_timeout: Duration,

    cycle_lock: Mutex<()>,
    counters: Counters,
    last_report: RwLock<Option<CycleReport>>,
}

impl AlertMonitor {
    pub fn new(
        store: Arc<AlertStore>,
        market: Arc<dyn MarketData>,
        notifier: Arc<dyn Notifier>,
        events_tx: broadcast::Sender<String>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            market,
            notifier,
            events_tx,
            fetch_timeout,
            cycle_lock: Mutex::new(()),
            counters: Counters::default(),
            last_report: RwLock::new(None),
        }
    }

    /// Runs one cycle. Returns `None` without doing anything if another
    /// cycle is still in flight.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            self.counters.busy.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("[alert-monitor] cycle already running");
            return None;
        };

        let mut report = CycleReport {
            started_at: Some(Utc::now()),
            ..CycleReport::default()
        };

        self.cycle(&mut report).await;
        report.finished_at = Some(Utc::now());

        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        self.counters
            .failed_symbols
            .fetch_add(report.failed_symbols.len() as u64, Ordering::Relaxed);
        self.counters
            .skipped_alerts
            .fetch_add(report.skipped_alerts as u64, Ordering::Relaxed);
        self.counters
            .notifications
            .fetch_add(report.triggered as u64, Ordering::Relaxed);

        *self.last_report.write().await = Some(report.clone());

        Some(report)
    }

    pub async fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().await.clone()
    }

    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            cycles: self.counters.cycles.load(Ordering::Relaxed),
            busy: self.counters.busy.load(Ordering::Relaxed),
            failed_symbols: self.counters.failed_symbols.load(Ordering::Relaxed),
            skipped_alerts: self.counters.skipped_alerts.load(Ordering::Relaxed),
            notifications: self.counters.notifications.load(Ordering::Relaxed),
        }
    }

    async fn cycle(&self, report: &mut CycleReport) {
        let active = self.store.list_active().await;
        report.active_alerts = active.len();

        if active.is_empty() {
            return;
        }

        // one fetch per symbol, however many alerts watch it
        let mut by_symbol: BTreeMap<String, Vec<PriceAlert>> = BTreeMap::new();
        for a in active {
            by_symbol.entry(a.symbol.clone()).or_default().push(a);
        }
        report.symbols = by_symbol.len();

        let symbols: Vec<String> = by_symbol.keys().cloned().collect();

        // Writes only happen after this point.
        let fetched = match self.fetch_all(&symbols).await {
            Ok(results) => results,
            Err(e) => {
                report.offline = true;
                report.timed_out = matches!(e, AppError::Timeout(_));
                report.skipped_alerts = report.active_alerts;
                tracing::warn!(error = %e, "[alert-monitor] market data unreachable, prices may be stale");
                return;
            }
        };

        let mut tickers: Vec<(CryptoCurrency, Vec<PriceAlert>)> = Vec::with_capacity(fetched.len());
        for ((symbol, group), result) in by_symbol.into_iter().zip(fetched) {
            match result {
                Ok(t) => {
                    report.fetched += 1;
                    tracing::debug!(%symbol, price = %t.price, "[alert-monitor] fetched");
                    tickers.push((t, group));
                }
                Err(e) => {
                    if matches!(e, AppError::Timeout(_)) {
                        report.timed_out = true;
                    }
                    if e.is_recoverable() {
                        tracing::warn!(%symbol, alerts = group.len(), error = %e, "[alert-monitor] no price this cycle, skipping symbol");
                    } else {
                        tracing::error!(%symbol, alerts = group.len(), error = %e, "[alert-monitor] unexpected fetch error, skipping symbol");
                    }
                    report.failed_symbols.push(symbol);
                    report.skipped_alerts += group.len();
                }
            }
        }

        let readings: Vec<(Uuid, &CryptoCurrency)> = tickers
            .iter()
            .flat_map(|(t, group)| group.iter().map(move |a| (a.id, t)))
            .collect();
        if readings.is_empty() {
            return;
        }

        let applied = self.store.observe_many(&readings).await;
        report.evaluated = applied.len();
        if applied.len() < readings.len() {
            tracing::debug!(
                missing = readings.len() - applied.len(),
                "[alert-monitor] alerts deleted mid-cycle"
            );
        }

        for (snapshot, outcome) in &applied {
            if *outcome != Outcome::Triggered {
                continue;
            }
            let Some((ticker, _)) = tickers.iter().find(|(t, _)| t.symbol == snapshot.symbol) else {
                continue;
            };

            report.triggered += 1;
            tracing::info!(
                id = %snapshot.id,
                symbol = %snapshot.symbol,
                target = %snapshot.target_price,
                direction = snapshot.direction.as_str(),
                price = %ticker.price,
                "[alert-monitor] alert triggered"
            );
            self.deliver(&Notification::for_trigger(snapshot, ticker)).await;
        }

        if report.evaluated > 0 {
            let _ = self.events_tx.send("alertsUpdated".to_string());
        }
    }

    // Delivery shares the fetch budget so a stuck notifier cannot hold the
    // cycle lock indefinitely.
    async fn deliver(&self, note: &Notification) {
        if time::timeout(self.fetch_timeout, self.notifier.present(note))
            .await
            .is_err()
        {
            tracing::warn!(
                key = %note.dedup_key,
                budget_ms = self.fetch_timeout.as_millis() as u64,
                "[alert-monitor] notification delivery timed out"
            );
        }
    }

    /// Connectivity check, then every symbol concurrently. Each request gets
    /// its own budget, so one slow symbol only fails itself. Results come back
    /// in the order of `symbols`.
    async fn fetch_all(&self, symbols: &[String]) -> Result<Vec<Result<CryptoCurrency>>> {
        time::timeout(self.fetch_timeout, self.market.ping())
            .await
            .map_err(|_| AppError::Timeout("market ping".to_string()))??;

        let budget = self.fetch_timeout;
        let fetches = symbols.iter().map(|s| async move {
            time::timeout(budget, self.market.ticker(s))
                .await
                .unwrap_or_else(|_| Err(AppError::Timeout(s.clone())))
        });

        Ok(join_all(fetches).await)
    }
}

pub fn spawn_price_alert_monitor(monitor: Arc<AlertMonitor>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match monitor.run_cycle().await {
                Some(r) => tracing::info!(
                    alerts = r.active_alerts,
                    symbols = r.symbols,
                    failed = r.failed_symbols.len(),
                    triggered = r.triggered,
                    "[alert-monitor] cycle done"
                ),
                None => tracing::debug!("[alert-monitor] previous cycle still running, skipping tick"),
            }
        }
    })
}
