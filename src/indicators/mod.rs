// Technical indicators module
// Stateless pure functions over trailing candle/price windows.

pub mod atr;
pub mod bollinger;
pub mod moving_average;

pub use atr::{calculate_atr, calculate_atr_series};
pub use bollinger::{calculate_bollinger_bands, BollingerBands};
pub use moving_average::{calculate_sma, calculate_std_dev};
