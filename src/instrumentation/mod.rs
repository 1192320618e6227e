pub mod logger;

pub use logger::{RunLog, RunLogger, StageTimings};
