pub mod alert;
pub mod crypto;

pub use alert::{Direction, NewAlert, PriceAlert};
pub use crypto::CryptoCurrency;
