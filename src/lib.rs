// Core modules
pub mod api;
pub mod backtest;
pub mod config;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use config::{BotConfig, RiskConfig, StrategyChoice, TradeMode};
pub use models::*;
pub use strategy::Strategy;

use thiserror::Error;

/// Error taxonomy for the whole crate.
///
/// Ratio edge cases (zero gross loss, flat equity curve) are not errors;
/// they resolve to sentinel values in the performance metrics.
#[derive(Debug, Error)]
pub enum BotError {
    /// Rejected before any run state is created.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Fewer candles than the strategy warm-up window.
    #[error("insufficient candle data: need {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Data fetch or order placement failure at the exchange boundary.
    #[error("exchange API error: {0}")]
    Api(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Open-on-open or close-on-none. A correct state machine never hits
    /// this; the current position is left untouched when it does.
    #[error("position state violation: {0}")]
    PositionState(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
