use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ticker snapshot for one symbol. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoCurrency {
    pub symbol: String,
    pub price: Decimal,
    pub price_change_percent: Decimal,
    pub volume: Decimal,
    pub updated_at: DateTime<Utc>,
}
