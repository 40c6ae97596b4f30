use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::models::{ExitReason, PositionSide, Trade};
use crate::{BotError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// The single open trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    /// Units of base asset
    pub size: f64,
    pub entry_time: DateTime<Utc>,
    pub take_profit_price: Option<f64>,
    pub stop_loss_price: Option<f64>,
    pub trailing_stop_price: Option<f64>,
    /// Highest price seen while long, lowest while short
    pub extreme_price: f64,
    pub status: PositionStatus,
}

/// Owns the single optional open position, realized capital, and the trade
/// history. At most one position is open at any time; an attempt to open a
/// second is rejected and leaves the current one untouched.
pub struct PositionManager {
    position: Option<Position>,
    trades: Vec<Trade>,
    capital: f64,
    risk: RiskConfig,
}

impl PositionManager {
    pub fn new(initial_capital: f64, risk: RiskConfig) -> Self {
        Self {
            position: None,
            trades: Vec::new(),
            capital: initial_capital,
            risk,
        }
    }

    pub fn current(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn has_open_position(&self) -> bool {
        self.position.is_some()
    }

    /// Realized capital (initial plus closed-trade PnL)
    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Quantity of base asset the sizing rule allocates at the given price
    pub fn position_size(&self, price: f64) -> f64 {
        self.capital * self.risk.position_size_pct / 100.0 / price
    }

    /// Open a position sized from available capital.
    ///
    /// Take-profit and stop-loss levels are placed direction-aware relative
    /// to the entry; the trailing extreme starts at the entry price.
    pub fn open(
        &mut self,
        side: PositionSide,
        entry_price: f64,
        entry_time: DateTime<Utc>,
    ) -> Result<&Position> {
        let size = self.position_size(entry_price);
        self.open_sized(side, entry_price, size, entry_time)
    }

    /// Open with an explicit size, for live fills where the order quantity
    /// was committed before the exact fill price was known.
    pub fn open_sized(
        &mut self,
        side: PositionSide,
        entry_price: f64,
        size: f64,
        entry_time: DateTime<Utc>,
    ) -> Result<&Position> {
        if self.position.is_some() {
            return Err(BotError::PositionState(
                "attempted to open a position while one is already open".to_string(),
            ));
        }

        let take_profit_price = self.risk.use_take_profit.then(|| match side {
            PositionSide::Long => entry_price * (1.0 + self.risk.take_profit_pct / 100.0),
            PositionSide::Short => entry_price * (1.0 - self.risk.take_profit_pct / 100.0),
        });
        let stop_loss_price = self.risk.use_stop_loss.then(|| match side {
            PositionSide::Long => entry_price * (1.0 - self.risk.stop_loss_pct / 100.0),
            PositionSide::Short => entry_price * (1.0 + self.risk.stop_loss_pct / 100.0),
        });

        let position = Position {
            side,
            entry_price,
            size,
            entry_time,
            take_profit_price,
            stop_loss_price,
            trailing_stop_price: None,
            extreme_price: entry_price,
            status: PositionStatus::Open,
        };

        tracing::info!(
            "{} position opened at ${:.4} size {:.6} (tp: {:?}, sl: {:?})",
            side,
            entry_price,
            size,
            take_profit_price,
            stop_loss_price,
        );

        Ok(self.position.insert(position))
    }

    /// Ratchet the trailing stop on a favorable new extreme.
    ///
    /// The extreme is monotonic per direction, so the stop only ever moves
    /// toward the market; adverse prices leave both fields alone.
    pub fn update_trailing(&mut self, price: f64) {
        if !self.risk.use_trailing_stop {
            return;
        }
        let Some(position) = self.position.as_mut() else {
            return;
        };

        let pct = self.risk.trailing_stop_pct / 100.0;
        match position.side {
            PositionSide::Long if price > position.extreme_price => {
                position.extreme_price = price;
                position.trailing_stop_price = Some(price * (1.0 - pct));
            }
            PositionSide::Short if price < position.extreme_price => {
                position.extreme_price = price;
                position.trailing_stop_price = Some(price * (1.0 + pct));
            }
            _ => {}
        }
    }

    /// Check exit thresholds against a single mark price (live loop).
    ///
    /// Priority: take-profit, then stop-loss, then trailing stop.
    pub fn exit_breach(&self, price: f64) -> Option<ExitReason> {
        let position = self.position.as_ref()?;

        let crossed = |level: f64| match position.side {
            PositionSide::Long => price <= level,
            PositionSide::Short => price >= level,
        };
        let crossed_favorable = |level: f64| match position.side {
            PositionSide::Long => price >= level,
            PositionSide::Short => price <= level,
        };

        if position.take_profit_price.is_some_and(crossed_favorable) {
            return Some(ExitReason::TakeProfit);
        }
        if position.stop_loss_price.is_some_and(crossed) {
            return Some(ExitReason::StopLoss);
        }
        if position.trailing_stop_price.is_some_and(crossed) {
            return Some(ExitReason::TrailingStop);
        }
        None
    }

    /// Check exit thresholds against a candle's full range (backtest).
    ///
    /// Returns the reason and the threshold price as the simulated fill.
    /// When one candle spans both levels, take-profit wins by the same fixed
    /// priority as `exit_breach`.
    pub fn exit_breach_range(&self, high: f64, low: f64) -> Option<(ExitReason, f64)> {
        let position = self.position.as_ref()?;

        let touched_favorable = |level: f64| match position.side {
            PositionSide::Long => high >= level,
            PositionSide::Short => low <= level,
        };
        let touched_adverse = |level: f64| match position.side {
            PositionSide::Long => low <= level,
            PositionSide::Short => high >= level,
        };

        if let Some(tp) = position.take_profit_price {
            if touched_favorable(tp) {
                return Some((ExitReason::TakeProfit, tp));
            }
        }
        if let Some(sl) = position.stop_loss_price {
            if touched_adverse(sl) {
                return Some((ExitReason::StopLoss, sl));
            }
        }
        if let Some(ts) = position.trailing_stop_price {
            if touched_adverse(ts) {
                return Some((ExitReason::TrailingStop, ts));
            }
        }
        None
    }

    /// Close the open position, realize PnL into capital, and record the
    /// trade.
    pub fn close(
        &mut self,
        exit_price: f64,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) -> Result<Trade> {
        let mut position = self.position.take().ok_or_else(|| {
            BotError::PositionState("attempted to close with no open position".to_string())
        })?;
        position.status = PositionStatus::Closed;

        let (pnl, pnl_pct) = match position.side {
            PositionSide::Long => (
                (exit_price - position.entry_price) * position.size,
                (exit_price - position.entry_price) / position.entry_price,
            ),
            PositionSide::Short => (
                (position.entry_price - exit_price) * position.size,
                (position.entry_price - exit_price) / position.entry_price,
            ),
        };

        self.capital += pnl;

        let trade = Trade {
            side: position.side,
            entry_price: position.entry_price,
            exit_price,
            entry_time: position.entry_time,
            exit_time,
            size: position.size,
            pnl,
            pnl_pct,
            exit_reason: reason,
        };

        tracing::info!(
            "{} position closed at ${:.4}: {}${:.2} ({:+.2}%), reason: {}",
            trade.side,
            exit_price,
            if pnl >= 0.0 { "+" } else { "-" },
            pnl.abs(),
            pnl_pct * 100.0,
            reason,
        );

        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Mark-to-market PnL of the open position, 0 when flat
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match &self.position {
            Some(p) => match p.side {
                PositionSide::Long => (price - p.entry_price) * p.size,
                PositionSide::Short => (p.entry_price - price) * p.size,
            },
            None => 0.0,
        }
    }

    /// Realized capital plus unrealized PnL at the given mark
    pub fn equity(&self, price: f64) -> f64 {
        self.capital + self.unrealized_pnl(price)
    }
}
