//! Bounded job-run history owned by the scheduler.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::jobs::JobKind;

/// Runs kept before the oldest is evicted.
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Job body returned normally.
    Success,
    /// Job body returned an error.
    Failed,
    /// Not started because the same job was still running.
    Skipped,
}

/// One finished or skipped run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    /// Job.
    pub job: JobKind,
    /// When the run finished.
    pub last_run: DateTime<Utc>,
    /// Outcome.
    pub status: RunStatus,
    /// Summary or error text.
    pub message: String,
}

/// Ring buffer of recent runs, oldest first.
#[derive(Debug)]
pub struct JobHistory {
    records: VecDeque<JobRecord>,
    capacity: usize,
}

impl Default for JobHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl JobHistory {
    /// Empty history keeping at most `capacity` runs.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a run, evicting the oldest when full.
    pub fn push(&mut self, record: JobRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Most recent run of `job`.
    #[must_use]
    pub fn last(&self, job: JobKind) -> Option<&JobRecord> {
        self.records.iter().rev().find(|r| r.job == job)
    }

    /// Runs newest first.
    pub fn recent(&self) -> impl Iterator<Item = &JobRecord> {
        self.records.iter().rev()
    }

    /// Number of runs held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has run yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(job: JobKind, message: &str) -> JobRecord {
        JobRecord {
            job,
            last_run: Utc::now(),
            status: RunStatus::Success,
            message: message.to_string(),
        }
    }

    #[test]
    fn oldest_run_is_evicted_at_capacity() {
        let mut history = JobHistory::with_capacity(2);
        history.push(record(JobKind::DailyBuy, "first"));
        history.push(record(JobKind::DailySell, "second"));
        history.push(record(JobKind::DailyBuy, "third"));

        assert_eq!(history.len(), 2);
        let messages: Vec<_> = history.recent().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["third", "second"]);
    }

    #[test]
    fn last_returns_the_newest_run_of_a_job() {
        let mut history = JobHistory::default();
        history.push(record(JobKind::DailyBuy, "old"));
        history.push(record(JobKind::DailySell, "other"));
        history.push(record(JobKind::DailyBuy, "new"));

        assert_eq!(history.last(JobKind::DailyBuy).unwrap().message, "new");
        assert!(history.last(JobKind::DashboardSync).is_none());
    }
}
