use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::CryptoCurrency,
    services::market_data::MarketData,
};

#[derive(Clone)]
pub struct BinanceClient {
    http: Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let res = self.http.get(&url).query(query).send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::Upstream { status, body });
        }

        Ok(res)
    }
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn ping(&self) -> Result<()> {
        self.get("/api/v3/ping", &[]).await?;
        Ok(())
    }

    async fn ticker(&self, symbol: &str) -> Result<CryptoCurrency> {
        let res = self
            .get("/api/v3/ticker/24hr", &[("symbol", symbol)])
            .await?;

        let raw = res.json::<Ticker24hResponse>().await?;
        CryptoCurrency::try_from(raw)
    }

    async fn all_tickers(&self) -> Result<Vec<CryptoCurrency>> {
        let res = self.get("/api/v3/ticker/24hr", &[]).await?;
        let raw = res.json::<Vec<Ticker24hResponse>>().await?;

        let tickers = raw
            .into_iter()
            .filter_map(|t| match CryptoCurrency::try_from(t) {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::debug!(error = %e, "dropping unparseable ticker");
                    None
                }
            })
            .collect();

        Ok(tickers)
    }
}

/// Binance `/api/v3/ticker/24hr` entry. Numbers arrive as strings.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hResponse {
    pub symbol: String,
    pub last_price: String,
    pub price_change_percent: String,
    pub volume: String,
    // millis since epoch
    pub close_time: i64,
}

fn parse_decimal(symbol: &str, field: &'static str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| AppError::Parse {
        symbol: symbol.to_string(),
        field,
        value: value.to_string(),
    })
}

impl TryFrom<Ticker24hResponse> for CryptoCurrency {
    type Error = AppError;

    // A bad reading is an error, never a zero price.
    fn try_from(raw: Ticker24hResponse) -> Result<Self> {
        let price = parse_decimal(&raw.symbol, "lastPrice", &raw.last_price)?;
        let price_change_percent =
            parse_decimal(&raw.symbol, "priceChangePercent", &raw.price_change_percent)?;
        let volume = parse_decimal(&raw.symbol, "volume", &raw.volume)?;

        let updated_at = DateTime::<Utc>::from_timestamp_millis(raw.close_time).ok_or_else(|| {
            AppError::Parse {
                symbol: raw.symbol.clone(),
                field: "closeTime",
                value: raw.close_time.to_string(),
            }
        })?;

        Ok(CryptoCurrency {
            symbol: raw.symbol,
            price,
            price_change_percent,
            volume,
            updated_at,
        })
    }
}
