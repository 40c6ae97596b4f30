// End-to-end backtests over seeded synthetic data. These pin down the
// run-level properties that hold for any market: determinism, equity-curve
// shape, exit-price arithmetic, and metric bounds.

use voltybot::backtest::{BacktestRunner, RunResult, Scenario, SyntheticDataGenerator};
use voltybot::config::{
    BollingerVolumeConfig, BotConfig, RiskConfig, StrategyChoice, TradeMode, VoltyConfig,
};
use voltybot::models::{ExitReason, PositionSide};

const CANDLES: usize = 400;

fn config(strategy: StrategyChoice) -> BotConfig {
    BotConfig {
        symbol: "SYNUSDT".to_string(),
        timeframe: "1h".to_string(),
        mode: TradeMode::Paper,
        initial_capital: 10_000.0,
        strategy,
        risk: RiskConfig::default(),
    }
}

fn run(strategy: StrategyChoice, scenario: Scenario, seed: u64) -> RunResult {
    let candles = SyntheticDataGenerator::new("SYNUSDT", seed).generate(scenario, CANDLES, 60);
    let runner = BacktestRunner::new(config(strategy)).expect("valid config");
    runner.run(&candles).expect("enough candles")
}

fn all_scenarios() -> [Scenario; 5] {
    [
        Scenario::Uptrend,
        Scenario::Downtrend,
        Scenario::Sideways,
        Scenario::Volatile,
        Scenario::Breakout,
    ]
}

#[test]
fn test_backtest_is_deterministic() {
    for scenario in all_scenarios() {
        let a = run(StrategyChoice::Volty(VoltyConfig::default()), scenario, 7);
        let b = run(StrategyChoice::Volty(VoltyConfig::default()), scenario, 7);

        assert_eq!(a.total_trades, b.total_trades);
        assert_eq!(a.total_return, b.total_return);
        assert_eq!(a.equity_curve.len(), b.equity_curve.len());
        for (x, y) in a.equity_curve.iter().zip(&b.equity_curve) {
            assert_eq!(x.timestamp, y.timestamp);
            assert_eq!(x.equity, y.equity);
        }
    }
}

#[test]
fn test_equity_curve_covers_every_candle_past_warmup() {
    // Volty warm-up is length + 3
    let volty = run(
        StrategyChoice::Volty(VoltyConfig::default()),
        Scenario::Volatile,
        11,
    );
    assert_eq!(volty.equity_curve.len(), CANDLES - 8);

    // Bollinger warm-up is max(bb_length, volume_lookback)
    let bollinger = run(
        StrategyChoice::BollingerVolume(BollingerVolumeConfig::default()),
        Scenario::Volatile,
        11,
    );
    assert_eq!(bollinger.equity_curve.len(), CANDLES - 30);
}

#[test]
fn test_risk_exit_fills_match_configured_percentages() {
    // Backtest risk exits fill at the threshold price, so a take-profit
    // trade realizes exactly +3% and a stop-loss exactly -2% regardless of
    // direction
    for scenario in all_scenarios() {
        for seed in [1, 2, 3] {
            let result = run(StrategyChoice::Volty(VoltyConfig::default()), scenario, seed);
            for trade in &result.trades {
                match trade.exit_reason {
                    ExitReason::TakeProfit => {
                        assert!((trade.pnl_pct - 0.03).abs() < 1e-9);
                        assert!(trade.pnl > 0.0);
                    }
                    ExitReason::StopLoss => {
                        assert!((trade.pnl_pct + 0.02).abs() < 1e-9);
                        assert!(trade.pnl < 0.0);
                    }
                    _ => {}
                }
                assert!(trade.exit_time >= trade.entry_time);
                assert!(trade.size > 0.0);
            }
        }
    }
}

#[test]
fn test_metric_bounds_hold_across_markets() {
    for scenario in all_scenarios() {
        for seed in [5, 17] {
            let result = run(StrategyChoice::Volty(VoltyConfig::default()), scenario, seed);

            assert!((0.0..=1.0).contains(&result.win_rate));
            assert!((0.0..=1.0).contains(&result.max_drawdown));
            assert!(result.profit_factor >= 0.0);
            assert!(result.max_win >= 0.0);
            assert!(result.max_loss <= 0.0);

            // The curve end and the headline return must agree
            if let Some(last) = result.equity_curve.last() {
                let implied = 10_000.0 * (1.0 + result.total_return);
                assert!((last.equity - implied).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn test_unreachable_volume_filter_trades_nothing() {
    let strategy = StrategyChoice::BollingerVolume(BollingerVolumeConfig {
        volume_increase_pct: 1_000_000.0,
        ..Default::default()
    });
    let result = run(strategy, Scenario::Volatile, 23);

    assert_eq!(result.total_trades, 0);
    assert_eq!(result.total_return, 0.0);
    assert_eq!(result.win_rate, 0.0);
    assert_eq!(result.profit_factor, 0.0);
    assert_eq!(result.max_drawdown, 0.0);
    assert_eq!(result.sharpe_ratio, 0.0);
    // Equity never moves without a position
    assert!(result.equity_curve.iter().all(|p| p.equity == 10_000.0));
}

#[test]
fn test_sized_entries_never_exceed_committed_capital() {
    for seed in [3, 9, 31] {
        let result = run(
            StrategyChoice::Volty(VoltyConfig::default()),
            Scenario::Volatile,
            seed,
        );
        for trade in &result.trades {
            // 10% sizing: notional at entry is a tenth of capital at the
            // time, which never exceeds the running equity peak
            let notional = trade.size * trade.entry_price;
            let peak = result
                .equity_curve
                .iter()
                .map(|p| p.equity)
                .fold(10_000.0_f64, f64::max);
            assert!(notional <= peak * 0.1 + 1e-6);
        }
    }
}

#[test]
fn test_long_and_short_trades_both_occur_in_volatile_markets() {
    // Across several seeds the breakout strategy should fire in both
    // directions at least once; a sign bug in either path breaks this
    let mut longs = 0usize;
    let mut shorts = 0usize;
    for seed in 0..20 {
        let result = run(
            StrategyChoice::Volty(VoltyConfig::default()),
            Scenario::Volatile,
            seed,
        );
        longs += result
            .trades
            .iter()
            .filter(|t| t.side == PositionSide::Long)
            .count();
        shorts += result
            .trades
            .iter()
            .filter(|t| t.side == PositionSide::Short)
            .count();
    }
    assert!(longs > 0);
    assert!(shorts > 0);
}
