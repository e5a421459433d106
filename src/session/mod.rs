pub mod report;
pub mod stat;
pub mod tracker;

pub use stat::{HISTORY_LIMIT, SessionHistory, SessionStat};
pub use tracker::{SessionCounters, SessionSummary, SessionTracker};
