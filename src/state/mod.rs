//! State module for tracking crawl progress
//!
//! `JobState` is the lifecycle of one domain crawl: `Ready -> Running` and then
//! one of `Completed`, `Failed`, `TimedOut` or `Cancelled`.

mod job_state;

pub use job_state::JobState;
