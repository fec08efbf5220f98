//! Threshold-crossing rule for price alerts.
//!
//! Direction is always explicit on the alert (see [`Direction::infer`] for
//! how it is chosen at creation when the user leaves it out). Triggering is
//! one-shot: once `triggered` is set the alert stays dormant until the user
//! re-arms it.

use rust_decimal::Decimal;

use crate::models::{Direction, PriceAlert};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Crossed on this observation; notify once.
    Triggered,
    /// Live, not crossed yet.
    Waiting,
    /// Inactive or already triggered; never notifies.
    Dormant,
}

pub fn crossed(target: Decimal, direction: Direction, observed: Decimal) -> bool {
    match direction {
        Direction::Above => observed >= target,
        Direction::Below => observed <= target,
    }
}

pub fn evaluate(alert: &PriceAlert, observed: Decimal) -> Outcome {
    if !alert.active || alert.triggered {
        return Outcome::Dormant;
    }

    if crossed(alert.target_price, alert.direction, observed) {
        Outcome::Triggered
    } else {
        Outcome::Waiting
    }
}
