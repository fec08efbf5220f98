use serde_json::json;

use crate::{models::CryptoCurrency, AppState};

pub const SEARCH_LIMIT: usize = 10;

fn fmt_price(c: &CryptoCurrency) -> String {
    c.price.normalize().to_string()
}

fn ticker_json(c: &CryptoCurrency) -> serde_json::Value {
    json!({
        "symbol": c.symbol,
        "price": fmt_price(c),
        "change": format!("{:.2}", c.price_change_percent),
        "change_up": !c.price_change_percent.is_sign_negative(),
        "volume": c.volume.round_dp(2).to_string(),
        "updated_at": c.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    })
}

/// Build the context used by the `partials/search_results` template.
///
/// - empty query => no results, no error
/// - non-empty query => symbols containing the query, limit 10
/// - gateway failure => generic error string
pub async fn search_results_ctx(state: &AppState, query: &str) -> serde_json::Value {
    let q = query.trim().to_uppercase();

    if q.is_empty() {
        return json!({
            "query": "",
            "results": serde_json::Value::Null,
            "error": serde_json::Value::Null
        });
    }

    match state.market.search(&q, SEARCH_LIMIT).await {
        Ok(hits) => {
            let results: Vec<_> = hits.iter().map(ticker_json).collect();

            let results_val = if results.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::Array(results)
            };

            json!({
                "query": q,
                "results": results_val,
                "error": serde_json::Value::Null
            })
        }
        Err(e) => {
            tracing::warn!(query = %q, error = %e, "symbol search failed");
            json!({
                "query": q,
                "results": serde_json::Value::Null,
                "error": "Search unavailable right now."
            })
        }
    }
}

/// Build the context used by the `partials/quote` template.
pub async fn quote_ctx(state: &AppState, symbol: &str) -> serde_json::Value {
    match state.market.ticker(symbol).await {
        Ok(t) => json!({ "quote": ticker_json(&t), "error": serde_json::Value::Null }),
        Err(e) => {
            tracing::warn!(%symbol, error = %e, "quote failed");
            json!({ "quote": serde_json::Value::Null, "error": "Price unavailable right now." })
        }
    }
}
