/// Average True Range (ATR) indicator
///
/// Measures volatility as the rolling mean of true ranges. True Range is the
/// greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// The rolling window is a simple moving average, so values line up with a
/// pandas-style `tr.rolling(length).mean()`.
use crate::models::Candle;

fn true_range(current: &Candle, prev_close: f64) -> f64 {
    (current.high - current.low)
        .max((current.high - prev_close).abs())
        .max((current.low - prev_close).abs())
}

/// Latest ATR value, or None while the window is still warming up
pub fn calculate_atr(candles: &[Candle], length: usize) -> Option<f64> {
    calculate_atr_series(candles, length).last().copied()?
}

/// ATR per candle index, aligned with the input slice.
///
/// Index `i` holds the average of the `length` true ranges ending at candle
/// `i`; entries are None until enough candles have accumulated. The first
/// candle has no previous close, so its true range does not exist and the
/// earliest defined ATR sits at index `length`.
pub fn calculate_atr_series(candles: &[Candle], length: usize) -> Vec<Option<f64>> {
    let mut series = vec![None; candles.len()];
    if length == 0 || candles.len() < length + 1 {
        return series;
    }

    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|pair| true_range(&pair[1], pair[0].close))
        .collect();

    // true_ranges[k] belongs to candle k+1
    let mut window_sum: f64 = true_ranges.iter().take(length).sum();
    series[length] = Some(window_sum / length as f64);

    for k in length..true_ranges.len() {
        window_sum += true_ranges[k] - true_ranges[k - length];
        series[k + 1] = Some(window_sum / length as f64);
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_candles(bars: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        bars.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Candle {
                symbol: "TEST".to_string(),
                timestamp: Utc::now() + chrono::Duration::hours(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_calculate_atr_constant_range() {
        let bars = vec![(100.0, 101.0, 99.0, 100.0); 8];
        let candles = create_test_candles(&bars);

        let atr = calculate_atr(&candles, 5).unwrap();
        // Every true range is exactly high - low = 2
        assert!((atr - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_atr_includes_gaps() {
        // Second candle gaps up: TR = |high - prev_close| = 10
        let bars = vec![
            (100.0, 101.0, 99.0, 100.0),
            (108.0, 110.0, 107.0, 109.0),
            (109.0, 110.0, 108.0, 109.0),
        ];
        let candles = create_test_candles(&bars);
        let series = calculate_atr_series(&candles, 2);

        assert_eq!(series[0], None);
        assert_eq!(series[1], None);
        // mean(10, 2) = 6
        assert!((series[2].unwrap() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_data() {
        let bars = vec![(100.0, 101.0, 99.0, 100.0); 3];
        let candles = create_test_candles(&bars);

        assert!(calculate_atr(&candles, 5).is_none());
        assert!(calculate_atr_series(&candles, 5).iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_series_alignment() {
        let bars = vec![(100.0, 105.0, 95.0, 100.0); 8];
        let candles = create_test_candles(&bars);
        let series = calculate_atr_series(&candles, 5);

        assert_eq!(series.len(), candles.len());
        assert!(series[..5].iter().all(|v| v.is_none()));
        assert!(series[5..].iter().all(|v| v.is_some()));
    }
}
