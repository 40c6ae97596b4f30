/// Calculate Simple Moving Average (SMA) over the trailing window.
///
/// Returns None when fewer than `period` values exist; callers must not
/// mistake the warm-up for a zero average.
pub fn calculate_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let sum: f64 = values.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Population standard deviation of the trailing window around `mean`.
///
/// None during warm-up for the same reason as the SMA: an undefined
/// deviation is not zero volatility.
pub fn calculate_std_dev(values: &[f64], mean: f64, period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let variance: f64 = values
        .iter()
        .rev()
        .take(period)
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / period as f64;

    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let values = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        assert_eq!(calculate_sma(&values, 5), Some(104.0));
    }

    #[test]
    fn test_sma_uses_trailing_window() {
        let values = vec![0.0, 0.0, 100.0, 102.0, 104.0];
        assert_eq!(calculate_sma(&values, 3), Some(102.0));
    }

    #[test]
    fn test_sma_insufficient_data() {
        let values = vec![100.0, 102.0];
        assert!(calculate_sma(&values, 5).is_none());
    }

    #[test]
    fn test_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mean = calculate_sma(&values, 8).unwrap();
        let std = calculate_std_dev(&values, mean, 8).unwrap();
        assert!((std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_flat_series_is_zero() {
        let values = vec![5.0; 10];
        assert_eq!(calculate_std_dev(&values, 5.0, 10), Some(0.0));
    }

    #[test]
    fn test_std_dev_insufficient_data() {
        let values = vec![1.0, 2.0];
        assert!(calculate_std_dev(&values, 1.5, 5).is_none());
    }
}
