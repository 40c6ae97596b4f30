// Run configuration: strategy parameters, risk limits, market selection.
// Everything is validated before a run starts; a BotConfig that passed
// validate() never mutates state mid-run.

use serde::{Deserialize, Serialize};

use crate::{BotError, Result};

/// Parameters for the ATR breakout strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoltyConfig {
    /// Period for ATR calculation
    pub length: usize,
    /// Multiplier applied to ATR when projecting trigger levels
    pub atr_mult: f64,
}

impl Default for VoltyConfig {
    fn default() -> Self {
        Self {
            length: 5,
            atr_mult: 0.75,
        }
    }
}

/// Parameters for the Bollinger band + volume surge strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerVolumeConfig {
    pub bb_length: usize,
    pub bb_deviation: f64,
    /// Current volume must be at least this percentage of the trailing
    /// average volume for a band touch to count (e.g. 120.0 = 1.2x)
    pub volume_increase_pct: f64,
    /// Candles in the trailing average-volume window
    pub volume_lookback: usize,
}

impl Default for BollingerVolumeConfig {
    fn default() -> Self {
        Self {
            bb_length: 20,
            bb_deviation: 2.0,
            volume_increase_pct: 120.0,
            volume_lookback: 30,
        }
    }
}

/// Which strategy drives the run, with its parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyChoice {
    Volty(VoltyConfig),
    BollingerVolume(BollingerVolumeConfig),
}

impl Default for StrategyChoice {
    fn default() -> Self {
        StrategyChoice::Volty(VoltyConfig::default())
    }
}

/// Risk management thresholds. Percentages are in percent units
/// (take_profit_pct = 3.0 means +3%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub use_take_profit: bool,
    pub take_profit_pct: f64,
    pub use_stop_loss: bool,
    pub stop_loss_pct: f64,
    pub use_trailing_stop: bool,
    pub trailing_stop_pct: f64,
    /// Percentage of available capital committed per trade
    pub position_size_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            use_take_profit: true,
            take_profit_pct: 3.0,
            use_stop_loss: true,
            stop_loss_pct: 2.0,
            use_trailing_stop: false,
            trailing_stop_pct: 1.5,
            position_size_pct: 10.0,
        }
    }
}

/// Paper trading simulates fills at the mark price; live trading routes
/// orders through the exchange.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    Paper,
    Live,
}

/// Full configuration for one backtest or live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub symbol: String,
    pub timeframe: String,
    pub mode: TradeMode,
    pub initial_capital: f64,
    pub strategy: StrategyChoice,
    pub risk: RiskConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            timeframe: "1h".to_string(),
            mode: TradeMode::Paper,
            initial_capital: 10_000.0,
            strategy: StrategyChoice::default(),
            risk: RiskConfig::default(),
        }
    }
}

fn require(cond: bool, msg: &str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(BotError::InvalidConfig(msg.to_string()))
    }
}

fn positive_finite(value: f64, name: &str) -> Result<()> {
    require(
        value.is_finite() && value > 0.0,
        &format!("{} must be a positive number, got {}", name, value),
    )
}

impl RiskConfig {
    pub fn validate(&self) -> Result<()> {
        if self.use_take_profit {
            positive_finite(self.take_profit_pct, "take_profit_pct")?;
        }
        if self.use_stop_loss {
            positive_finite(self.stop_loss_pct, "stop_loss_pct")?;
            require(
                self.stop_loss_pct < 100.0,
                "stop_loss_pct must be below 100",
            )?;
        }
        if self.use_trailing_stop {
            positive_finite(self.trailing_stop_pct, "trailing_stop_pct")?;
            require(
                self.trailing_stop_pct < 100.0,
                "trailing_stop_pct must be below 100",
            )?;
        }
        positive_finite(self.position_size_pct, "position_size_pct")?;
        require(
            self.position_size_pct <= 100.0,
            "position_size_pct cannot exceed 100",
        )?;
        Ok(())
    }
}

impl StrategyChoice {
    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyChoice::Volty(c) => {
                require(c.length >= 1, "ATR length must be at least 1")?;
                positive_finite(c.atr_mult, "atr_mult")?;
            }
            StrategyChoice::BollingerVolume(c) => {
                require(c.bb_length >= 2, "bb_length must be at least 2")?;
                positive_finite(c.bb_deviation, "bb_deviation")?;
                positive_finite(c.volume_increase_pct, "volume_increase_pct")?;
                require(c.volume_lookback >= 1, "volume_lookback must be at least 1")?;
            }
        }
        Ok(())
    }
}

impl BotConfig {
    /// Check every tunable before any run state is created
    pub fn validate(&self) -> Result<()> {
        require(!self.symbol.is_empty(), "symbol must not be empty")?;
        require(!self.timeframe.is_empty(), "timeframe must not be empty")?;
        positive_finite(self.initial_capital, "initial_capital")?;
        self.strategy.validate()?;
        self.risk.validate()?;
        Ok(())
    }
}

/// Polling cadence in seconds for a Binance-style timeframe string.
/// Unknown timeframes fall back to one minute.
pub fn timeframe_seconds(timeframe: &str) -> u64 {
    match timeframe {
        "1m" => 60,
        "5m" => 300,
        "15m" => 900,
        "30m" => 1_800,
        "1h" => 3_600,
        "4h" => 14_400,
        "1d" => 86_400,
        _ => 60,
    }
}
