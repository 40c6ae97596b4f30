use crate::indicators::{calculate_sma, calculate_std_dev};

/// Bollinger Bands: SMA middle band with bands at ± deviation * stddev
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Bands over the trailing `length` closes, or None during warm-up
pub fn calculate_bollinger_bands(
    closes: &[f64],
    length: usize,
    deviation: f64,
) -> Option<BollingerBands> {
    let middle = calculate_sma(closes, length)?;
    let std_dev = calculate_std_dev(closes, middle, length)?;

    Some(BollingerBands {
        middle,
        upper: middle + deviation * std_dev,
        lower: middle - deviation * std_dev,
    })
}
