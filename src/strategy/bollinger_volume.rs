use crate::config::BollingerVolumeConfig;
use crate::indicators::calculate_bollinger_bands;
use crate::models::{Candle, Signal};
use crate::strategy::Strategy;
use crate::{BotError, Result};

/// Bollinger band + volume surge mean-reversion strategy
///
/// Goes long when price closes at or below the lower band on elevated
/// volume, short at the upper band on the symmetric condition. The volume
/// filter compares the current candle's volume to the trailing average so
/// quiet drifts through a band do not trade.
#[derive(Debug, Clone)]
pub struct BollingerVolumeStrategy {
    config: BollingerVolumeConfig,
}

impl BollingerVolumeStrategy {
    pub fn new(config: BollingerVolumeConfig) -> Self {
        Self { config }
    }
}

impl Default for BollingerVolumeStrategy {
    fn default() -> Self {
        Self::new(BollingerVolumeConfig::default())
    }
}

impl Strategy for BollingerVolumeStrategy {
    fn evaluate(&self, candles: &[Candle]) -> Result<Signal> {
        if candles.len() < self.min_candles() {
            return Err(BotError::InsufficientData {
                needed: self.min_candles(),
                got: candles.len(),
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let bands = match calculate_bollinger_bands(
            &closes,
            self.config.bb_length,
            self.config.bb_deviation,
        ) {
            Some(b) => b,
            None => return Ok(Signal::Hold),
        };

        let Some(current) = candles.last() else {
            return Ok(Signal::Hold);
        };

        let lookback = self.config.volume_lookback.min(candles.len());
        let avg_volume: f64 = candles
            .iter()
            .rev()
            .take(lookback)
            .map(|c| c.volume)
            .sum::<f64>()
            / lookback as f64;

        // Zero average volume means no activity at all; never a surge
        let volume_pct = if avg_volume > 0.0 {
            current.volume / avg_volume * 100.0
        } else {
            0.0
        };
        let volume_surge = volume_pct >= self.config.volume_increase_pct;

        tracing::debug!(
            close = current.close,
            lower = bands.lower,
            upper = bands.upper,
            volume_pct,
            volume_surge,
            "Bollinger+Volume check"
        );

        if current.close <= bands.lower && volume_surge {
            tracing::info!(
                "Bollinger LONG: close {:.4} under band {:.4} on {:.0}% volume",
                current.close,
                bands.lower,
                volume_pct
            );
            Ok(Signal::EnterLong)
        } else if current.close >= bands.upper && volume_surge {
            tracing::info!(
                "Bollinger SHORT: close {:.4} over band {:.4} on {:.0}% volume",
                current.close,
                bands.upper,
                volume_pct
            );
            Ok(Signal::EnterShort)
        } else {
            Ok(Signal::Hold)
        }
    }

    fn name(&self) -> &str {
        "Bollinger + Volume"
    }

    fn min_candles(&self) -> usize {
        self.config.bb_length.max(self.config.volume_lookback)
    }
}
