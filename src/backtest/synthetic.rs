use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Candle;

/// Market regimes for generated data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Uptrend,
    Downtrend,
    Sideways,
    Volatile,
    /// Quiet range for the first two thirds, then a sharp directional move.
    /// Useful for exercising breakout entries and trailing stops.
    Breakout,
}

/// Seeded OHLCV generator. The same seed and scenario always produce the
/// same candles, so runs over generated data are reproducible.
pub struct SyntheticDataGenerator {
    rng: StdRng,
    symbol: String,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticDataGenerator {
    pub fn new(symbol: &str, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            symbol: symbol.to_string(),
            base_price: 100.0,
            base_volume: 1_000.0,
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    pub fn generate(
        &mut self,
        scenario: Scenario,
        count: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        // Fixed epoch so two generators with the same seed agree on
        // timestamps too
        let start = Utc
            .timestamp_opt(1_700_000_000, 0)
            .single()
            .unwrap_or_default();
        let breakout_at = count * 2 / 3;

        let mut candles = Vec::with_capacity(count);
        let mut price = self.base_price;

        for i in 0..count {
            let drift = match scenario {
                Scenario::Uptrend => 0.0015,
                Scenario::Downtrend => -0.0015,
                Scenario::Sideways | Scenario::Volatile => 0.0,
                Scenario::Breakout if i >= breakout_at => 0.004,
                Scenario::Breakout => 0.0,
            };
            let noise_scale = match scenario {
                Scenario::Volatile => 0.02,
                Scenario::Breakout if i >= breakout_at => 0.012,
                _ => 0.004,
            };

            let noise: f64 = self.rng.gen_range(-noise_scale..noise_scale);
            let open = price;
            let close = (open * (1.0 + drift + noise)).max(0.01);
            let wick_up: f64 = self.rng.gen_range(0.0..noise_scale / 2.0 + f64::EPSILON);
            let wick_down: f64 = self.rng.gen_range(0.0..noise_scale / 2.0 + f64::EPSILON);

            // Heavier prints on larger moves, so volume-filtered strategies
            // see surges where price actually moved
            let move_pct = ((close - open) / open).abs();
            let surge = 1.0 + move_pct / noise_scale.max(f64::EPSILON);
            let volume = self.base_volume * self.rng.gen_range(0.5..1.5) * surge;

            candles.push(Candle {
                symbol: self.symbol.clone(),
                timestamp: start + Duration::minutes(interval_minutes * i as i64),
                open,
                high: open.max(close) * (1.0 + wick_up),
                low: open.min(close) * (1.0 - wick_down),
                close,
                volume,
            });
            price = close;
        }

        candles
    }
}
