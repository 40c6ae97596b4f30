// Historical replay: runner drives the strategy and position manager over
// a candle series, metrics summarize the result, synthetic feeds the tests.

pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use metrics::RunResult;
pub use runner::BacktestRunner;
pub use synthetic::{Scenario, SyntheticDataGenerator};
