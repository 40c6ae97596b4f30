use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use voltybot::api::{BinanceClient, MarketData, OrderExecutor};
use voltybot::backtest::{BacktestRunner, Scenario, SyntheticDataGenerator};
use voltybot::config::{
    timeframe_seconds, BollingerVolumeConfig, BotConfig, RiskConfig, StrategyChoice, VoltyConfig,
};
use voltybot::execution::LiveLoop;
use voltybot::TradeMode;

#[derive(Parser)]
#[command(
    name = "voltybot",
    about = "ATR breakout and Bollinger mean-reversion trading bot",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a strategy over historical or synthetic candles
    Backtest {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of candles to fetch or generate
        #[arg(long, default_value_t = 500)]
        candles: usize,

        /// Generate seeded data instead of fetching from Binance
        #[arg(long, value_enum)]
        synthetic: Option<ScenarioArg>,

        /// Seed for synthetic data
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Poll the market once per timeframe and trade continuously
    Run {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_enum, default_value_t = ModeArg::Paper)]
        mode: ModeArg,

        /// Route live orders to the Binance spot testnet
        #[arg(long)]
        testnet: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    #[arg(long, default_value = "BTCUSDT")]
    symbol: String,

    /// Candle timeframe (1m, 5m, 15m, 30m, 1h, 4h, 1d)
    #[arg(long, default_value = "1h")]
    timeframe: String,

    #[arg(long, value_enum, default_value_t = StrategyArg::Volty)]
    strategy: StrategyArg,

    #[arg(long, default_value_t = 10_000.0)]
    capital: f64,

    /// ATR period (volty strategy)
    #[arg(long, default_value_t = 5)]
    atr_length: usize,

    /// ATR multiplier for trigger levels (volty strategy)
    #[arg(long, default_value_t = 0.75)]
    atr_mult: f64,

    /// Bollinger period (bollinger strategy)
    #[arg(long, default_value_t = 20)]
    bb_length: usize,

    /// Bollinger band width in standard deviations (bollinger strategy)
    #[arg(long, default_value_t = 2.0)]
    bb_deviation: f64,

    /// Volume threshold as a percentage of the trailing average
    #[arg(long, default_value_t = 120.0)]
    volume_increase_pct: f64,

    /// Candles in the trailing average-volume window
    #[arg(long, default_value_t = 30)]
    volume_lookback: usize,

    #[arg(long, default_value_t = 3.0)]
    take_profit_pct: f64,

    #[arg(long, default_value_t = 2.0)]
    stop_loss_pct: f64,

    /// Enable a trailing stop this far under the favorable extreme
    #[arg(long)]
    trailing_stop_pct: Option<f64>,

    /// Percentage of capital committed per trade
    #[arg(long, default_value_t = 10.0)]
    position_size_pct: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Volty,
    Bollinger,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Paper,
    Live,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioArg {
    Uptrend,
    Downtrend,
    Sideways,
    Volatile,
    Breakout,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::Uptrend => Scenario::Uptrend,
            ScenarioArg::Downtrend => Scenario::Downtrend,
            ScenarioArg::Sideways => Scenario::Sideways,
            ScenarioArg::Volatile => Scenario::Volatile,
            ScenarioArg::Breakout => Scenario::Breakout,
        }
    }
}

impl CommonArgs {
    fn to_config(&self, mode: TradeMode) -> BotConfig {
        let strategy = match self.strategy {
            StrategyArg::Volty => StrategyChoice::Volty(VoltyConfig {
                length: self.atr_length,
                atr_mult: self.atr_mult,
            }),
            StrategyArg::Bollinger => StrategyChoice::BollingerVolume(BollingerVolumeConfig {
                bb_length: self.bb_length,
                bb_deviation: self.bb_deviation,
                volume_increase_pct: self.volume_increase_pct,
                volume_lookback: self.volume_lookback,
            }),
        };

        BotConfig {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe.clone(),
            mode,
            initial_capital: self.capital,
            strategy,
            risk: RiskConfig {
                use_take_profit: true,
                take_profit_pct: self.take_profit_pct,
                use_stop_loss: true,
                stop_loss_pct: self.stop_loss_pct,
                use_trailing_stop: self.trailing_stop_pct.is_some(),
                trailing_stop_pct: self.trailing_stop_pct.unwrap_or(1.5),
                position_size_pct: self.position_size_pct,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "voltybot=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Backtest {
            common,
            candles,
            synthetic,
            seed,
        } => backtest(common, candles, synthetic, seed).await,
        Command::Run {
            common,
            mode,
            testnet,
        } => run(common, mode, testnet).await,
    }
}

async fn backtest(
    common: CommonArgs,
    count: usize,
    synthetic: Option<ScenarioArg>,
    seed: u64,
) -> anyhow::Result<()> {
    let config = common.to_config(TradeMode::Paper);

    let candles = match synthetic {
        Some(scenario) => {
            let interval_minutes = (timeframe_seconds(&config.timeframe) / 60) as i64;
            SyntheticDataGenerator::new(&config.symbol, seed).generate(
                scenario.into(),
                count,
                interval_minutes,
            )
        }
        None => {
            let client = BinanceClient::new();
            client
                .fetch_candles(&config.symbol, &config.timeframe, count)
                .await
                .context("fetching historical candles")?
        }
    };

    let runner = BacktestRunner::new(config)?;
    let result = runner.run(&candles)?;
    result.print_report();
    Ok(())
}

async fn run(common: CommonArgs, mode: ModeArg, testnet: bool) -> anyhow::Result<()> {
    let mode = match mode {
        ModeArg::Paper => TradeMode::Paper,
        ModeArg::Live => TradeMode::Live,
    };
    let config = common.to_config(mode);

    let api_key = std::env::var("BINANCE_API_KEY").ok();
    let api_secret = std::env::var("BINANCE_API_SECRET").ok();

    let client = match (api_key, api_secret) {
        (Some(key), Some(secret)) => BinanceClient::with_credentials(key, secret, testnet),
        _ if mode == TradeMode::Live => {
            bail!("live mode requires BINANCE_API_KEY and BINANCE_API_SECRET")
        }
        _ => BinanceClient::new(),
    };

    let market = Arc::new(client.clone());
    let executor = match mode {
        TradeMode::Live => Some(Arc::new(client) as Arc<dyn OrderExecutor>),
        TradeMode::Paper => None,
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            let _ = cancel_tx.send(true);
        }
    });

    let mut bot = LiveLoop::new(config, market, executor)?;
    bot.run(cancel_rx).await?;
    bot.run_result().print_report();
    Ok(())
}
