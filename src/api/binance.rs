use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::api::{MarketData, OrderExecutor};
use crate::models::{Candle, OrderSide};
use crate::{BotError, Result};

const BINANCE_API_BASE: &str = "https://api.binance.com";
const BINANCE_TESTNET_BASE: &str = "https://testnet.binance.vision";

/// Binance spot REST client
///
/// Public market-data endpoints need no credentials; order placement
/// requires an API key/secret pair and signs requests with HMAC-SHA256.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    #[allow(dead_code)]
    symbol: String,
    price: String,
}

#[derive(Debug, Deserialize)]
struct OrderFill {
    price: String,
    qty: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    #[serde(default)]
    fills: Vec<OrderFill>,
}

impl BinanceClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: BINANCE_API_BASE.to_string(),
            api_key: None,
            api_secret: None,
        }
    }

    pub fn with_credentials(api_key: String, api_secret: String, testnet: bool) -> Self {
        let base_url = if testnet {
            BINANCE_TESTNET_BASE.to_string()
        } else {
            BINANCE_API_BASE.to_string()
        };

        Self {
            client: Client::new(),
            base_url,
            api_key: Some(api_key),
            api_secret: Some(api_secret),
        }
    }

    /// Point the client at a different host (tests)
    #[doc(hidden)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn sign(&self, query: &str) -> Result<String> {
        let secret = self
            .api_secret
            .as_ref()
            .ok_or_else(|| BotError::Api("API secret not configured".to_string()))?;

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|e| BotError::Api(format!("invalid API secret: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn parse_kline(symbol: &str, row: &Value) -> Result<Candle> {
        let fields = row
            .as_array()
            .ok_or_else(|| BotError::Api("kline row is not an array".to_string()))?;
        if fields.len() < 6 {
            return Err(BotError::Api("kline row too short".to_string()));
        }

        let open_time = fields[0]
            .as_i64()
            .ok_or_else(|| BotError::Api("kline open time is not an integer".to_string()))?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(open_time)
            .ok_or_else(|| BotError::Api(format!("kline timestamp out of range: {}", open_time)))?;

        let number = |idx: usize, name: &str| -> Result<f64> {
            fields[idx]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| BotError::Api(format!("kline {} is not numeric", name)))
        };

        Ok(Candle {
            symbol: symbol.to_string(),
            timestamp,
            open: number(1, "open")?,
            high: number(2, "high")?,
            low: number(3, "low")?,
            close: number(4, "close")?,
            volume: number(5, "volume")?,
        })
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);

        let rows: Vec<Value> = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", timeframe),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if rows.is_empty() {
            return Err(BotError::Api(format!("empty kline response for {}", symbol)));
        }

        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            let candle = Self::parse_kline(symbol, row)?;
            // Out-of-order rows would break the no-lookahead replay
            if candles
                .last()
                .is_some_and(|prev: &Candle| candle.timestamp <= prev.timestamp)
            {
                tracing::warn!(
                    "dropping out-of-order kline at {} for {}",
                    candle.timestamp,
                    symbol
                );
                continue;
            }
            candles.push(candle);
        }

        Ok(candles)
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);

        let ticker: TickerPrice = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        ticker
            .price
            .parse()
            .map_err(|_| BotError::Api(format!("unparseable ticker price: {}", ticker.price)))
    }
}

#[async_trait]
impl OrderExecutor for BinanceClient {
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<f64> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| BotError::Api("API key not configured".to_string()))?;

        let timestamp = Utc::now().timestamp_millis();
        let query = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&timestamp={}",
            symbol,
            side.as_str(),
            quantity,
            timestamp
        );
        let signature = self.sign(&query)?;
        let url = format!(
            "{}/api/v3/order?{}&signature={}",
            self.base_url, query, signature
        );

        let response: OrderResponse = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Quantity-weighted average over the fills
        let mut filled_qty = 0.0;
        let mut notional = 0.0;
        for fill in &response.fills {
            let price: f64 = fill
                .price
                .parse()
                .map_err(|_| BotError::Api(format!("unparseable fill price: {}", fill.price)))?;
            let qty: f64 = fill
                .qty
                .parse()
                .map_err(|_| BotError::Api(format!("unparseable fill qty: {}", fill.qty)))?;
            filled_qty += qty;
            notional += price * qty;
        }

        if filled_qty <= 0.0 {
            return Err(BotError::Api(format!(
                "order for {} returned no fills",
                symbol
            )));
        }

        Ok(notional / filled_qty)
    }
}
