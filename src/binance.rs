use crate::error::{ScanError, ScanResult};
use crate::types::{Candle, LiquiditySnapshot};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, info};

/// Read-only market data the scanner needs. Every call is fallible and the
/// scanner treats a failure as a skip for that symbol.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn list_tradable_pairs(&self, quote_asset: &str) -> ScanResult<Vec<String>>;
    async fn get_candles(&self, symbol: &str, interval: &str, limit: u32) -> ScanResult<Vec<Candle>>;
    async fn get_24h_ticker(&self, symbol: &str) -> ScanResult<LiquiditySnapshot>;
}

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    quote_asset: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    #[serde(default)]
    quote_volume: Option<String>,
    #[serde(default)]
    price_change_percent: Option<String>,
}

/// Binance spot public REST client.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: &str, timeout: Duration) -> ScanResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> ScanResult<JsonValue> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn list_tradable_pairs(&self, quote_asset: &str) -> ScanResult<Vec<String>> {
        let raw = self.get_json("/api/v3/exchangeInfo", &[]).await?;
        let info: ExchangeInfo = serde_json::from_value(raw)?;
        let symbols: Vec<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.quote_asset == quote_asset && s.status == "TRADING")
            .map(|s| s.symbol)
            .collect();
        info!("[Binance] {} tradable {} pairs", symbols.len(), quote_asset);
        Ok(symbols)
    }

    async fn get_candles(&self, symbol: &str, interval: &str, limit: u32) -> ScanResult<Vec<Candle>> {
        let raw = self
            .get_json(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let candles = parse_klines(&raw)?;
        debug!("[Binance] {} {}: {} candles", symbol, interval, candles.len());
        Ok(candles)
    }

    async fn get_24h_ticker(&self, symbol: &str) -> ScanResult<LiquiditySnapshot> {
        let raw = self
            .get_json("/api/v3/ticker/24hr", &[("symbol", symbol.to_string())])
            .await?;
        parse_ticker(raw)
    }
}

fn number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}

/// Kline rows are arrays: open time, open, high, low, close, volume, close time, ...
/// Prices and volumes arrive as strings.
pub fn parse_klines(raw: &JsonValue) -> ScanResult<Vec<Candle>> {
    let rows = raw
        .as_array()
        .ok_or_else(|| ScanError::Decode("klines response is not an array".to_string()))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let parsed = row.as_array().filter(|arr| arr.len() >= 7).and_then(|arr| {
                Some(Candle {
                    open_time: arr[0].as_i64()?,
                    open: number(&arr[1])?,
                    high: number(&arr[2])?,
                    low: number(&arr[3])?,
                    close: number(&arr[4])?,
                    volume: number(&arr[5])?,
                    close_time: arr[6].as_i64()?,
                })
            });
            match parsed {
                Some(c) if [c.open, c.high, c.low, c.close, c.volume].iter().all(|v| v.is_finite()) => Ok(c),
                _ => Err(ScanError::Decode(format!("malformed kline row {}", i))),
            }
        })
        .collect()
}

/// Missing or unparsable fields read as 0, which the liquidity gate rejects.
pub fn parse_ticker(raw: JsonValue) -> ScanResult<LiquiditySnapshot> {
    let ticker: Ticker24h = serde_json::from_value(raw)?;
    let field = |v: Option<String>| v.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0);
    Ok(LiquiditySnapshot {
        quote_volume_24h: field(ticker.quote_volume),
        price_change_percent_24h: field(ticker.price_change_percent),
    })
}
