// Exchange boundary. The core consumes these capabilities only through the
// traits below, so a host can wrap them with retry or rate-limit policy
// without touching strategy or position state.

pub mod binance;

pub use binance::BinanceClient;

use async_trait::async_trait;

use crate::models::{Candle, OrderSide};
use crate::Result;

/// Candle and mark-price source
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Latest `limit` candles for the symbol/timeframe, oldest first
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// Current mark price for the symbol
    async fn fetch_price(&self, symbol: &str) -> Result<f64>;
}

/// Order placement for live execution
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Place a market order and return the realized fill price
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<f64>;
}
