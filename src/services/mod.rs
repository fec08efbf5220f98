pub mod binance;
pub mod market_data;
pub mod alert_store;
pub mod evaluator;
pub mod alert_monitor;
pub mod notifier;

pub mod alerts_service;
pub mod market_service;
