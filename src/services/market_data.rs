use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{error::Result, models::CryptoCurrency};

/// Source of ticker snapshots. `BinanceClient` is the production
/// implementation; tests substitute their own.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Cheap reachability check, run before each evaluation cycle.
    async fn ping(&self) -> Result<()>;

    async fn ticker(&self, symbol: &str) -> Result<CryptoCurrency>;

    async fn all_tickers(&self) -> Result<Vec<CryptoCurrency>>;

    /// Symbols containing `query`, most liquid first, at most `limit` entries.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CryptoCurrency>> {
        let q = query.trim().to_uppercase();
        if q.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<CryptoCurrency> = self
            .all_tickers()
            .await?
            .into_iter()
            .filter(|t| t.symbol.contains(&q))
            .collect();

        // exact match first, then by traded value
        hits.sort_by(|a, b| {
            (b.symbol == q)
                .cmp(&(a.symbol == q))
                .then_with(|| liquidity(b).cmp(&liquidity(a)))
        });
        hits.truncate(limit);

        Ok(hits)
    }
}

fn liquidity(t: &CryptoCurrency) -> Decimal {
    t.volume.checked_mul(t.price).unwrap_or(Decimal::MAX)
}
