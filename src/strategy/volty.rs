use crate::config::VoltyConfig;
use crate::indicators::calculate_atr_series;
use crate::models::{Candle, Signal};
use crate::strategy::Strategy;
use crate::{BotError, Result};

/// ATR breakout strategy
///
/// Projects trigger levels from each close: `close ± ATR * atr_mult`. A long
/// entry fires when the current high crosses the level projected from the
/// previous candle, but only if the previous high had not already crossed its
/// own projected level — an edge trigger, so the signal fires once per
/// breakout instead of on every candle that stays past the level.
#[derive(Debug, Clone)]
pub struct VoltyStrategy {
    config: VoltyConfig,
}

impl VoltyStrategy {
    pub fn new(config: VoltyConfig) -> Self {
        Self { config }
    }
}

impl Default for VoltyStrategy {
    fn default() -> Self {
        Self::new(VoltyConfig::default())
    }
}

impl Strategy for VoltyStrategy {
    fn evaluate(&self, candles: &[Candle]) -> Result<Signal> {
        let n = candles.len();
        if n < self.min_candles() {
            return Err(BotError::InsufficientData {
                needed: self.min_candles(),
                got: n,
            });
        }

        let atr = calculate_atr_series(candles, self.config.length);

        // Levels are projected from the two candles before the current one
        let (atr_prev, atr_prev2) = match (atr[n - 2], atr[n - 3]) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(Signal::Hold),
        };

        let current = &candles[n - 1];
        let prior = &candles[n - 2];
        let prior2 = &candles[n - 3];

        let long_level = prior.close + atr_prev * self.config.atr_mult;
        let long_level_prior = prior2.close + atr_prev2 * self.config.atr_mult;
        let short_level = prior.close - atr_prev * self.config.atr_mult;
        let short_level_prior = prior2.close - atr_prev2 * self.config.atr_mult;

        let long_entry = current.high >= long_level && prior.high < long_level_prior;
        let short_entry = current.low <= short_level && prior.low > short_level_prior;

        tracing::debug!(
            high = current.high,
            low = current.low,
            long_level,
            short_level,
            long_entry,
            short_entry,
            "Volty levels"
        );

        if long_entry {
            tracing::info!(
                "Volty LONG breakout: high {:.4} crossed level {:.4}",
                current.high,
                long_level
            );
            Ok(Signal::EnterLong)
        } else if short_entry {
            tracing::info!(
                "Volty SHORT breakout: low {:.4} crossed level {:.4}",
                current.low,
                short_level
            );
            Ok(Signal::EnterShort)
        } else {
            Ok(Signal::Hold)
        }
    }

    fn name(&self) -> &str {
        "Volty Breakout"
    }

    fn min_candles(&self) -> usize {
        // ATR needs length+1 candles; the edge trigger looks at levels two
        // candles back
        self.config.length + 3
    }
}
