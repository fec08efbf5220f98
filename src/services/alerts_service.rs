use std::{collections::BTreeMap, str::FromStr, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Direction, NewAlert, PriceAlert},
    AppState,
};

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{2,20}$").expect("symbol regex"));

pub fn normalize_symbol(raw: &str) -> Result<String> {
    let sym = raw.trim().to_uppercase();
    if !SYMBOL_RE.is_match(&sym) {
        return Err(AppError::Validation("Please enter a valid symbol, e.g. BTCUSDT.".to_string()));
    }
    Ok(sym)
}

pub fn parse_target(raw: &str) -> Result<Decimal> {
    match Decimal::from_str(raw.trim()) {
        Ok(v) if v > Decimal::ZERO => Ok(v),
        _ => Err(AppError::Validation("Please enter a valid target price.".to_string())),
    }
}

/// Creates an alert. The current price is fetched once: it seeds the cached
/// observation and, when no direction was chosen, decides it.
pub async fn create_alert(state: &AppState, new: NewAlert) -> Result<PriceAlert> {
    let symbol = normalize_symbol(&new.symbol)?;

    let ticker = match state.market.ticker(&symbol).await {
        Ok(t) => Some(t),
        // Binance answers 400 for symbols it does not list
        Err(AppError::Upstream { status: 400, .. }) => {
            return Err(AppError::Validation(format!("Unknown symbol {symbol}.")));
        }
        Err(e) => {
            tracing::warn!(%symbol, error = %e, "no price available while creating alert");
            None
        }
    };

    let direction = match (new.direction, &ticker) {
        (Some(d), _) => d,
        (None, Some(t)) => Direction::infer(new.target_price, t.price),
        (None, None) => {
            return Err(AppError::Validation(format!(
                "Current price for {symbol} is unavailable; choose above or below."
            )));
        }
    };

    let mut alert = PriceAlert::new(symbol, new.target_price, direction);
    if let Some(t) = &ticker {
        alert.last_price = Some(t.price);
        alert.last_change_percent = Some(t.price_change_percent);
        alert.last_checked_at = Some(t.updated_at);
    }

    let evicted = state.store.create(alert.clone()).await?;
    for gone in &evicted {
        tracing::info!(id = %gone.id, symbol = %gone.symbol, "evicted to make room for new alert");
    }

    tracing::info!(
        id = %alert.id,
        symbol = %alert.symbol,
        target = %alert.target_price,
        direction = alert.direction.as_str(),
        "alert created"
    );

    let _ = state.events_tx.send("alertsUpdated".to_string());

    Ok(alert)
}

pub async fn delete_alert(state: &AppState, id: Uuid) -> Result<()> {
    if !state.store.delete(id).await {
        return Err(AppError::NotFound(id));
    }

    let _ = state.events_tx.send("alertsUpdated".to_string());
    Ok(())
}

/// Flips the active flag. Turning a triggered alert back on re-arms it.
pub async fn toggle_alert(state: &AppState, id: Uuid) -> Result<PriceAlert> {
    let current = state.store.get(id).await.ok_or(AppError::NotFound(id))?;
    let updated = state.store.set_active(id, !current.active).await?;

    let _ = state.events_tx.send("alertsUpdated".to_string());
    Ok(updated)
}

/// All alerts by symbol, newest first inside each group.
pub async fn list_alerts_grouped(state: &AppState) -> BTreeMap<String, Vec<PriceAlert>> {
    let mut map: BTreeMap<String, Vec<PriceAlert>> = BTreeMap::new();
    for a in state.store.list_all().await {
        map.entry(a.symbol.clone()).or_default().push(a);
    }

    for group in map.values_mut() {
        group.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    map
}
