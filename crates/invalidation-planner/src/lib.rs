pub mod classify;
pub mod events;
pub mod planner;

pub use classify::{classify_statement, DdlAction, DEFAULT_SCHEMA};
pub use events::{table_events, TableEvent};
pub use planner::plan_invalidations;
