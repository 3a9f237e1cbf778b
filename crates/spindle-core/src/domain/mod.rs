//! Domain model (ids, lifecycle, outcomes, reports, events).

pub mod events;
pub mod ids;
pub mod outcome;
pub mod report;
pub mod state;

pub use events::PoolEvent;
pub use ids::{TaskId, WorkerId};
pub use outcome::{Failure, Outcome};
pub use report::{PoolStats, ShutdownReport};
pub use state::PoolState;
