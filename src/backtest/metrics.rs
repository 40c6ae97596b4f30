use serde::{Deserialize, Serialize};

use crate::models::{EquityPoint, Trade};

/// Annualization factor for the Sharpe ratio (daily-return convention)
const SHARPE_ANNUALIZATION: f64 = 252.0;

/// Aggregate performance of one run, derived purely from the closed-trade
/// history and the equity curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Fractional return over initial capital
    pub total_return: f64,
    /// Fraction of closed trades with positive pnl; 0 with no trades
    pub win_rate: f64,
    /// Gross profit / gross loss; infinite when there are profits but no
    /// losses, 0 when there are neither
    pub profit_factor: f64,
    /// Largest peak-to-trough fraction of the equity curve, always >= 0
    pub max_drawdown: f64,
    /// Mean step return over its standard deviation, annualized; 0 for a
    /// flat or single-point curve
    pub sharpe_ratio: f64,
    pub total_trades: usize,
    pub avg_trade: f64,
    pub max_win: f64,
    pub max_loss: f64,
}

impl RunResult {
    pub fn compute(trades: &[Trade], equity_curve: &[EquityPoint], initial_capital: f64) -> Self {
        let total_return = match equity_curve.last() {
            Some(point) if initial_capital > 0.0 => {
                (point.equity - initial_capital) / initial_capital
            }
            _ => 0.0,
        };

        let total_trades = trades.len();
        let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64
        } else {
            0.0
        };

        let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
        let gross_loss: f64 = trades
            .iter()
            .filter(|t| t.pnl < 0.0)
            .map(|t| t.pnl.abs())
            .sum();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_trade = if total_trades > 0 {
            trades.iter().map(|t| t.pnl).sum::<f64>() / total_trades as f64
        } else {
            0.0
        };
        let max_win = trades
            .iter()
            .map(|t| t.pnl)
            .fold(f64::NEG_INFINITY, f64::max)
            .max(0.0);
        let max_loss = trades
            .iter()
            .map(|t| t.pnl)
            .fold(f64::INFINITY, f64::min)
            .min(0.0);

        Self {
            trades: trades.to_vec(),
            equity_curve: equity_curve.to_vec(),
            total_return,
            win_rate,
            profit_factor,
            max_drawdown: max_drawdown(equity_curve),
            sharpe_ratio: sharpe_ratio(equity_curve),
            total_trades,
            avg_trade,
            max_win,
            max_loss,
        }
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!("\n================ RUN REPORT ================");
        println!("  Total Return:     {:+.2}%", self.total_return * 100.0);
        println!("  Total Trades:     {}", self.total_trades);
        println!("  Win Rate:         {:.1}%", self.win_rate * 100.0);
        if self.profit_factor.is_infinite() {
            println!("  Profit Factor:    inf (no losing trades)");
        } else {
            println!("  Profit Factor:    {:.2}", self.profit_factor);
        }
        println!("  Max Drawdown:     {:.2}%", self.max_drawdown * 100.0);
        println!("  Sharpe Ratio:     {:.2}", self.sharpe_ratio);
        println!("  Avg Trade:        ${:.2}", self.avg_trade);
        println!("  Max Win:          ${:.2}", self.max_win);
        println!("  Max Loss:         ${:.2}", self.max_loss);
        println!("============================================\n");
    }
}

/// Largest peak-to-trough decline as a fraction of the running peak
fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd: f64 = 0.0;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }

    max_dd
}

/// Mean per-step equity return over its standard deviation, annualized.
/// A zero deviation (flat or too-short curve) resolves to 0, not a fault.
fn sharpe_ratio(equity_curve: &[EquityPoint]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|pair| pair[0].equity != 0.0)
        .map(|pair| (pair[1].equity - pair[0].equity) / pair[0].equity)
        .collect();
    if returns.is_empty() {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        mean / std_dev * SHARPE_ANNUALIZATION.sqrt()
    } else {
        0.0
    }
}
