//! Scheduling annotations carried on dependency edges.
pub mod execute_time;

pub use execute_time::{ExecuteTimeInput, ExecuteTimes, EXECUTE_TIME_KEY};
