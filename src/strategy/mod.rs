// Trading strategy module
pub mod bollinger_volume;
pub mod volty;

use crate::config::StrategyChoice;
use crate::models::{Candle, Signal};
use crate::Result;

pub use bollinger_volume::BollingerVolumeStrategy;
pub use volty::VoltyStrategy;

/// Base trait for all trading strategies
pub trait Strategy: Send + Sync {
    /// Evaluate the latest candle window and produce a trading signal.
    ///
    /// The last element of `candles` is the candle under evaluation; the
    /// window must hold at least `min_candles` entries.
    fn evaluate(&self, candles: &[Candle]) -> Result<Signal>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Warm-up window: candles required before a signal can exist
    fn min_candles(&self) -> usize;
}

/// Build the configured strategy variant
pub fn build_strategy(choice: &StrategyChoice) -> Box<dyn Strategy> {
    match choice {
        StrategyChoice::Volty(config) => Box::new(VoltyStrategy::new(config.clone())),
        StrategyChoice::BollingerVolume(config) => {
            Box::new(BollingerVolumeStrategy::new(config.clone()))
        }
    }
}
