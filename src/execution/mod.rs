pub mod live_loop;
pub mod position_manager;

pub use live_loop::LiveLoop;
pub use position_manager::{Position, PositionManager, PositionStatus};
