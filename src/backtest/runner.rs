use crate::backtest::metrics::RunResult;
use crate::config::BotConfig;
use crate::execution::PositionManager;
use crate::models::{Candle, EquityPoint, ExitReason, PositionSide, Signal};
use crate::strategy::build_strategy;
use crate::{BotError, Result};

/// Replays a candle history against a strategy with no lookahead.
///
/// A signal produced on candle `i` fills at the open of candle `i + 1`, the
/// same delay a live loop sees between a closed candle and the next order.
/// Risk exits are the exception: they fire inside the candle whose range
/// touches the threshold and fill at the threshold price itself.
pub struct BacktestRunner {
    config: BotConfig,
}

impl BacktestRunner {
    pub fn new(config: BotConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the full replay. Per candle, in order: fill the signal pending
    /// from the previous candle at this open, check risk exits against this
    /// candle's range, ratchet the trailing stop on the close, evaluate the
    /// strategy on the history up to and including this candle, and mark
    /// equity at the close. A position still open at the end stays open and
    /// never becomes a trade.
    pub fn run(&self, candles: &[Candle]) -> Result<RunResult> {
        let strategy = build_strategy(&self.config.strategy);
        let warmup = strategy.min_candles();
        if candles.len() <= warmup {
            return Err(BotError::InsufficientData {
                needed: warmup + 1,
                got: candles.len(),
            });
        }

        tracing::info!(
            "backtest: {} candles of {} with {} (warmup {})",
            candles.len(),
            self.config.symbol,
            strategy.name(),
            warmup,
        );

        let mut manager =
            PositionManager::new(self.config.initial_capital, self.config.risk.clone());
        let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(candles.len() - warmup);
        let mut pending = Signal::Hold;

        for i in warmup..candles.len() {
            let candle = &candles[i];

            self.fill_pending(&mut manager, pending, candle)?;
            pending = Signal::Hold;

            if let Some((reason, fill)) = manager.exit_breach_range(candle.high, candle.low) {
                manager.close(fill, candle.timestamp, reason)?;
            }
            manager.update_trailing(candle.close);

            pending = strategy.evaluate(&candles[..=i])?;

            equity_curve.push(EquityPoint {
                timestamp: candle.timestamp,
                equity: manager.equity(candle.close),
            });
        }

        Ok(RunResult::compute(
            manager.trades(),
            &equity_curve,
            self.config.initial_capital,
        ))
    }

    /// Execute the previous candle's signal at this candle's open. A
    /// reversal closes the opposite position first; a same-side entry
    /// signal with a position already open is a no-op.
    fn fill_pending(
        &self,
        manager: &mut PositionManager,
        pending: Signal,
        candle: &Candle,
    ) -> Result<()> {
        let target = match pending {
            Signal::EnterLong => Some(PositionSide::Long),
            Signal::EnterShort => Some(PositionSide::Short),
            Signal::Exit => None,
            Signal::Hold => return Ok(()),
        };

        if let Some(open) = manager.current() {
            if target == Some(open.side) {
                return Ok(());
            }
            manager.close(candle.open, candle.timestamp, ExitReason::SignalReversal)?;
        }

        if let Some(side) = target {
            manager.open(side, candle.open, candle.timestamp)?;
        }
        Ok(())
    }
}
