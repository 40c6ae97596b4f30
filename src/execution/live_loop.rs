use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::api::{MarketData, OrderExecutor};
use crate::backtest::RunResult;
use crate::config::{timeframe_seconds, BotConfig, TradeMode};
use crate::execution::position_manager::{Position, PositionManager};
use crate::models::{EquityPoint, ExitReason, PositionSide, Signal, Trade};
use crate::strategy::{build_strategy, Strategy};
use crate::{BotError, Result};

/// Polls the market once per timeframe and applies the strategy to the
/// latest closed candles.
///
/// Each tick is atomic with respect to position state: a failed fetch or a
/// rejected order skips the tick without touching the open position, and
/// the next tick starts from a clean read of the market. Cancellation is
/// observed only between ticks.
pub struct LiveLoop {
    config: BotConfig,
    strategy: Box<dyn Strategy>,
    manager: PositionManager,
    market: Arc<dyn MarketData>,
    executor: Option<Arc<dyn OrderExecutor>>,
    equity_curve: Vec<EquityPoint>,
    skipped_ticks: u64,
}

impl LiveLoop {
    pub fn new(
        config: BotConfig,
        market: Arc<dyn MarketData>,
        executor: Option<Arc<dyn OrderExecutor>>,
    ) -> Result<Self> {
        config.validate()?;
        if config.mode == TradeMode::Live && executor.is_none() {
            return Err(BotError::InvalidConfig(
                "live mode requires an order executor".to_string(),
            ));
        }

        let strategy = build_strategy(&config.strategy);
        let manager = PositionManager::new(config.initial_capital, config.risk.clone());

        Ok(Self {
            config,
            strategy,
            manager,
            market,
            executor,
            equity_curve: Vec::new(),
            skipped_ticks: 0,
        })
    }

    /// Run until the cancel channel flips to true. The first tick fires
    /// immediately, then once per timeframe.
    pub async fn run(&mut self, mut cancel: watch::Receiver<bool>) -> Result<()> {
        let period = Duration::from_secs(timeframe_seconds(&self.config.timeframe));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "live loop started: {} {} every {:?} with {} ({:?})",
            self.config.symbol,
            self.config.timeframe,
            period,
            self.strategy.name(),
            self.config.mode,
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.changed() => {}
            }
            if *cancel.borrow() {
                tracing::info!("cancellation requested, stopping after current tick");
                break;
            }

            if let Err(e) = self.tick().await {
                self.skipped_ticks += 1;
                tracing::warn!("tick skipped: {}", e);
            }
        }

        tracing::info!(
            "live loop stopped: {} trades, {} skipped ticks",
            self.manager.trades().len(),
            self.skipped_ticks,
        );
        Ok(())
    }

    /// One full poll-evaluate-act cycle. Public so a host can drive the
    /// cadence itself instead of using `run`.
    pub async fn tick(&mut self) -> Result<()> {
        let needed = self.strategy.min_candles();
        let candles = self
            .market
            .fetch_candles(&self.config.symbol, &self.config.timeframe, needed + 2)
            .await?;
        if candles.len() < needed {
            return Err(BotError::InsufficientData {
                needed,
                got: candles.len(),
            });
        }

        let mark = candles
            .last()
            .map(|c| c.close)
            .ok_or(BotError::InsufficientData { needed, got: 0 })?;

        // Risk exits run before the strategy so a breached threshold is
        // honored even on a candle that would also signal
        if let Some(reason) = self.manager.exit_breach(mark) {
            self.close_position(mark, reason).await?;
        }
        self.manager.update_trailing(mark);

        match self.strategy.evaluate(&candles)? {
            Signal::EnterLong => self.enter(PositionSide::Long, mark).await?,
            Signal::EnterShort => self.enter(PositionSide::Short, mark).await?,
            Signal::Exit => {
                if self.manager.has_open_position() {
                    self.close_position(mark, ExitReason::SignalReversal).await?;
                }
            }
            Signal::Hold => {}
        }

        self.equity_curve.push(EquityPoint {
            timestamp: Utc::now(),
            equity: self.manager.equity(mark),
        });
        Ok(())
    }

    /// Enter on a signal: a same-side open position is left alone, an
    /// opposite one is closed first.
    async fn enter(&mut self, side: PositionSide, mark: f64) -> Result<()> {
        if let Some(open_side) = self.manager.current().map(|p| p.side) {
            if open_side == side {
                tracing::debug!("{} signal with {} already open, holding", side, side);
                return Ok(());
            }
            self.close_position(mark, ExitReason::SignalReversal).await?;
        }

        let quantity = self.manager.position_size(mark);
        let fill = match self.execution_route() {
            Some(executor) => {
                executor
                    .place_market_order(&self.config.symbol, side.entry_order(), quantity)
                    .await?
            }
            None => mark,
        };

        self.manager.open_sized(side, fill, quantity, Utc::now())?;
        Ok(())
    }

    /// Close the open position at the mark, or at the realized fill when an
    /// exchange order is routed. An order error propagates before any state
    /// changes, so the position survives for the next tick.
    async fn close_position(&mut self, mark: f64, reason: ExitReason) -> Result<()> {
        let fill = match (self.execution_route(), self.manager.current()) {
            (Some(executor), Some(open)) => {
                executor
                    .place_market_order(&self.config.symbol, open.side.exit_order(), open.size)
                    .await?
            }
            _ => mark,
        };

        self.manager.close(fill, Utc::now(), reason)?;
        Ok(())
    }

    fn execution_route(&self) -> Option<Arc<dyn OrderExecutor>> {
        match self.config.mode {
            TradeMode::Live => self.executor.clone(),
            TradeMode::Paper => None,
        }
    }

    pub fn current_position(&self) -> Option<&Position> {
        self.manager.current()
    }

    pub fn capital(&self) -> f64 {
        self.manager.capital()
    }

    pub fn trades(&self) -> &[Trade] {
        self.manager.trades()
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    /// Performance summary of the session so far
    pub fn run_result(&self) -> RunResult {
        RunResult::compute(
            self.manager.trades(),
            &self.equity_curve,
            self.config.initial_capital,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BollingerVolumeConfig, RiskConfig, StrategyChoice};
    use crate::models::{Candle, OrderSide};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves pre-scripted candle batches, one per fetch
    struct ScriptedMarket {
        batches: Mutex<VecDeque<Result<Vec<Candle>>>>,
    }

    impl ScriptedMarket {
        fn new(batches: Vec<Result<Vec<Candle>>>) -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(batches.into()),
            })
        }
    }

    #[async_trait]
    impl MarketData for ScriptedMarket {
        async fn fetch_candles(
            &self,
            _symbol: &str,
            _timeframe: &str,
            _limit: usize,
        ) -> Result<Vec<Candle>> {
            self.batches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BotError::Api("script exhausted".to_string())))
        }

        async fn fetch_price(&self, _symbol: &str) -> Result<f64> {
            Err(BotError::Api("not scripted".to_string()))
        }
    }

    /// Always fills at a fixed price
    struct FixedFillExecutor {
        fill_price: f64,
        orders: Mutex<Vec<(OrderSide, f64)>>,
    }

    #[async_trait]
    impl OrderExecutor for FixedFillExecutor {
        async fn place_market_order(
            &self,
            _symbol: &str,
            side: OrderSide,
            quantity: f64,
        ) -> Result<f64> {
            self.orders.lock().unwrap().push((side, quantity));
            Ok(self.fill_price)
        }
    }

    fn candles_with_last(closes_last: f64, volume_last: f64) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut candles: Vec<Candle> = (0..29)
            .map(|i| Candle {
                symbol: "TEST".to_string(),
                timestamp: start + ChronoDuration::hours(i),
                open: 100.0,
                high: 100.5,
                low: 99.5,
                close: 100.0,
                volume: 1_000.0,
            })
            .collect();
        candles.push(Candle {
            symbol: "TEST".to_string(),
            timestamp: start + ChronoDuration::hours(29),
            open: 100.0,
            high: 100.5,
            low: closes_last.min(99.5),
            close: closes_last,
            volume: volume_last,
        });
        candles
    }

    fn paper_config() -> BotConfig {
        BotConfig {
            symbol: "TEST".to_string(),
            timeframe: "1h".to_string(),
            mode: TradeMode::Paper,
            initial_capital: 10_000.0,
            strategy: StrategyChoice::BollingerVolume(BollingerVolumeConfig::default()),
            risk: RiskConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_live_mode_requires_executor() {
        let market = ScriptedMarket::new(vec![]);
        let mut config = paper_config();
        config.mode = TradeMode::Live;

        let result = LiveLoop::new(config, market, None);
        assert!(matches!(result, Err(BotError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_paper_entry_fills_at_mark() {
        // Band dip on heavy volume signals a long; paper mode fills at the
        // last close
        let market = ScriptedMarket::new(vec![Ok(candles_with_last(95.0, 3_000.0))]);
        let mut bot = LiveLoop::new(paper_config(), market, None).unwrap();

        bot.tick().await.unwrap();

        let position = bot.current_position().unwrap();
        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.entry_price, 95.0);
        assert_eq!(bot.equity_curve().len(), 1);
    }

    #[tokio::test]
    async fn test_take_profit_closes_on_later_tick() {
        // Tick 1 opens a long at 95; tick 2 marks 98, past the 3% target
        let mut exit_batch = candles_with_last(98.0, 1_000.0);
        exit_batch.last_mut().unwrap().low = 97.5;
        let market = ScriptedMarket::new(vec![
            Ok(candles_with_last(95.0, 3_000.0)),
            Ok(exit_batch),
        ]);
        let mut bot = LiveLoop::new(paper_config(), market, None).unwrap();

        bot.tick().await.unwrap();
        assert!(bot.current_position().is_some());

        bot.tick().await.unwrap();
        assert!(bot.current_position().is_none());

        let result = bot.run_result();
        assert_eq!(result.total_trades, 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
        assert_eq!(result.trades[0].exit_price, 98.0);
        assert!(bot.capital() > 10_000.0);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_tick_and_keeps_position() {
        let market = ScriptedMarket::new(vec![
            Ok(candles_with_last(95.0, 3_000.0)),
            Err(BotError::Api("connection reset".to_string())),
        ]);
        let mut bot = LiveLoop::new(paper_config(), market.clone(), None).unwrap();

        bot.tick().await.unwrap();
        let entry = bot.current_position().unwrap().entry_price;

        let result = bot.tick().await;
        assert!(result.is_err());
        assert_eq!(bot.current_position().unwrap().entry_price, entry);
        // No equity point for the failed tick
        assert_eq!(bot.equity_curve().len(), 1);
    }

    #[tokio::test]
    async fn test_live_entry_uses_order_fill_price() {
        let market = ScriptedMarket::new(vec![Ok(candles_with_last(95.0, 3_000.0))]);
        let executor = Arc::new(FixedFillExecutor {
            fill_price: 95.4,
            orders: Mutex::new(Vec::new()),
        });
        let mut config = paper_config();
        config.mode = TradeMode::Live;

        let mut bot = LiveLoop::new(config, market, Some(executor.clone())).unwrap();
        bot.tick().await.unwrap();

        let position = bot.current_position().unwrap();
        assert_eq!(position.entry_price, 95.4);
        // Quantity was sized at the mark before the order went out
        let orders = executor.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].0, OrderSide::Buy);
        assert!((orders[0].1 - 1_000.0 / 95.0).abs() < 1e-9);
        assert_eq!(position.size, orders[0].1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let market = ScriptedMarket::new(vec![]);
        let mut bot = LiveLoop::new(paper_config(), market, None).unwrap();

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        // Already-cancelled channel: the loop must exit without fetching
        bot.run(rx).await.unwrap();
        assert_eq!(bot.equity_curve().len(), 0);
    }
}
