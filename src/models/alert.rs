use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    /// Direction for an alert created without one: a target above the
    /// creation-time price waits for a rise, anything else waits for a fall.
    pub fn infer(target: Decimal, price_at_creation: Decimal) -> Self {
        if target > price_at_creation {
            Direction::Above
        } else {
            Direction::Below
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "above" => Some(Direction::Above),
            "below" => Some(Direction::Below),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }

    /// Capitalised form for display.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Above => "Above",
            Direction::Below => "Below",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: Uuid,
    pub symbol: String,

    pub target_price: Decimal,
    pub direction: Direction,

    pub active: bool,
    pub triggered: bool,

    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,

    // last observation, refreshed every cycle that fetched this symbol
    pub last_price: Option<Decimal>,
    pub last_change_percent: Option<Decimal>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl PriceAlert {
    pub fn new(symbol: String, target_price: Decimal, direction: Direction) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            target_price,
            direction,
            active: true,
            triggered: false,
            created_at: Utc::now(),
            triggered_at: None,
            last_price: None,
            last_change_percent: None,
            last_checked_at: None,
        }
    }

    /// Stable key so repeated notifications for one alert replace each other.
    pub fn dedup_key(&self) -> String {
        format!("alert-{}", self.id)
    }
}

/// What the user asked for; `alerts_service::create_alert` turns it into a
/// `PriceAlert`.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub symbol: String,
    pub target_price: Decimal,
    pub direction: Option<Direction>,
}
