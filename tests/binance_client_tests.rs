use std::{collections::HashMap, time::Duration};

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cryptoalerts::{
    error::AppError,
    services::{binance::BinanceClient, market_data::MarketData},
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn tickers() -> Vec<Value> {
    vec![
        json!({
            "symbol": "BTCUSDT",
            "lastPrice": "50000.01000000",
            "priceChangePercent": "1.500",
            "volume": "1000.00000000",
            "closeTime": 1_700_000_000_000i64
        }),
        json!({
            "symbol": "ETHUSDT",
            "lastPrice": "3200.00000000",
            "priceChangePercent": "-0.750",
            "volume": "20000.00000000",
            "closeTime": 1_700_000_000_000i64
        }),
        json!({
            "symbol": "ETHBTC",
            "lastPrice": "0.05200000",
            "priceChangePercent": "0.100",
            "volume": "5.00000000",
            "closeTime": 1_700_000_000_000i64
        }),
        json!({
            "symbol": "BADUSDT",
            "lastPrice": "not-a-number",
            "priceChangePercent": "0",
            "volume": "1",
            "closeTime": 1_700_000_000_000i64
        }),
    ]
}

async fn ticker_24hr(Query(q): Query<HashMap<String, String>>) -> Response {
    let all = tickers();

    let Some(symbol) = q.get("symbol") else {
        return Json(Value::Array(all)).into_response();
    };

    match all.into_iter().find(|t| t["symbol"] == symbol.as_str()) {
        Some(t) => Json(t).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": -1121, "msg": "Invalid symbol." })),
        )
            .into_response(),
    }
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/api/v3/ping", get(|| async { Json(json!({})) }))
        .route("/api/v3/ticker/24hr", get(ticker_24hr));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

async fn client() -> BinanceClient {
    let base = spawn_stub().await;
    BinanceClient::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn ping_succeeds() {
    let c = client().await;
    c.ping().await.unwrap();
}

#[tokio::test]
async fn ticker_decodes_snapshot() {
    let c = client().await;

    let t = c.ticker("BTCUSDT").await.unwrap();

    assert_eq!(t.symbol, "BTCUSDT");
    assert_eq!(t.price, dec!(50000.01));
    assert_eq!(t.price_change_percent, dec!(1.5));
    assert_eq!(t.updated_at.timestamp_millis(), 1_700_000_000_000);
}

#[tokio::test]
async fn unknown_symbol_is_upstream_400() {
    let c = client().await;

    match c.ticker("NOPEUSDT").await {
        Err(AppError::Upstream { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Invalid symbol"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn garbled_price_is_a_parse_error() {
    let c = client().await;

    match c.ticker("BADUSDT").await {
        Err(AppError::Parse { symbol, field, .. }) => {
            assert_eq!(symbol, "BADUSDT");
            assert_eq!(field, "lastPrice");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn all_tickers_drops_unparseable_entries() {
    let c = client().await;

    let all = c.all_tickers().await.unwrap();
    let symbols: Vec<&str> = all.iter().map(|t| t.symbol.as_str()).collect();

    assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "ETHBTC"]);
}

#[tokio::test]
async fn search_filters_and_ranks_by_liquidity() {
    let c = client().await;

    let hits = c.search("usdt", 10).await.unwrap();
    let symbols: Vec<&str> = hits.iter().map(|t| t.symbol.as_str()).collect();

    // 3200 * 20000 outranks 50000.01 * 1000
    assert_eq!(symbols, vec!["ETHUSDT", "BTCUSDT"]);

    let hits = c.search("ethbtc", 10).await.unwrap();
    assert_eq!(hits.len(), 1);

    let hits = c.search("ETH", 1).await.unwrap();
    assert_eq!(hits[0].symbol, "ETHUSDT");

    assert!(c.search("  ", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let c = BinanceClient::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let err = c.ping().await.unwrap_err();

    assert!(matches!(err, AppError::Transport(_)));
    assert!(err.is_recoverable());
}
