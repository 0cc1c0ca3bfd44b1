//! Scheduler
//!
//! Wall-clock triggers for plan cycles, the token sweep and the end-of-day
//! jobs. Job kinds are a closed enum; the history is a ring buffer owned by
//! the scheduler instance.

mod history;
mod jobs;
mod runner;
mod service;

pub use history::{DEFAULT_HISTORY_CAPACITY, JobHistory, JobRecord, RunStatus};
pub use jobs::{JobKind, Schedule};
pub use runner::EngineJobs;
pub use service::{JobError, JobRunner, JobView, Scheduler};
