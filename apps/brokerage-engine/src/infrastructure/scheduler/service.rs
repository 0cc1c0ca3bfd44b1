//! Scheduler Service
//!
//! One timer loop fires due jobs sequentially in wall-clock order. Manual
//! runs go through the same entry point, so a per-job lock keeps any job
//! from overlapping with itself however it was triggered.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::history::{JobHistory, JobRecord, RunStatus};
use super::jobs::JobKind;
use crate::infrastructure::metrics;

/// Job failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// The same job is still running.
    #[error("job {job} is already running")]
    AlreadyRunning {
        /// Job.
        job: JobKind,
    },

    /// Job is not registered in this run mode.
    #[error("job {job} is not registered")]
    NotRegistered {
        /// Job.
        job: JobKind,
    },

    /// Job body failed.
    #[error("job {job} failed: {message}")]
    Failed {
        /// Job.
        job: JobKind,
        /// Cause.
        message: String,
    },
}

/// Executes job bodies.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run `job` once and summarize the outcome.
    async fn run(&self, job: JobKind) -> Result<String, JobError>;
}

/// Status of one registered job.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    /// Job id.
    pub id: &'static str,
    /// Description.
    pub description: &'static str,
    /// Next timer fire, if the timer loop is running.
    pub next_run: Option<DateTime<Utc>>,
    /// Last finished run.
    pub last_run: Option<JobRecord>,
}

/// Scheduler service.
pub struct Scheduler<R: JobRunner> {
    runner: Arc<R>,
    timezone: Tz,
    jobs: Vec<JobKind>,
    locks: HashMap<JobKind, tokio::sync::Mutex<()>>,
    next_fires: Mutex<BTreeMap<JobKind, DateTime<Utc>>>,
    history: Mutex<JobHistory>,
}

impl<R: JobRunner> Scheduler<R> {
    /// Create a scheduler for `jobs`, firing in wall-clock zone `timezone`.
    #[must_use]
    pub fn new(runner: Arc<R>, timezone: Tz, jobs: Vec<JobKind>) -> Self {
        let locks = jobs
            .iter()
            .map(|job| (*job, tokio::sync::Mutex::new(())))
            .collect();
        Self {
            runner,
            timezone,
            jobs,
            locks,
            next_fires: Mutex::new(BTreeMap::new()),
            history: Mutex::new(JobHistory::default()),
        }
    }

    /// Wall-clock zone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Registered jobs.
    #[must_use]
    pub fn jobs(&self) -> &[JobKind] {
        &self.jobs
    }

    /// Run `job` now, unless it is already running.
    pub async fn run_now(&self, job: JobKind) -> Result<String, JobError> {
        let lock = self
            .locks
            .get(&job)
            .ok_or(JobError::NotRegistered { job })?;
        let Ok(_guard) = lock.try_lock() else {
            tracing::warn!(job = %job, "Job already running, skipped");
            let error = JobError::AlreadyRunning { job };
            self.record(job, RunStatus::Skipped, error.to_string());
            return Err(error);
        };

        tracing::info!(job = %job, "Job started");
        let result = self.runner.run(job).await;
        metrics::record_job_run(job.id(), result.is_ok());

        let (status, message) = match &result {
            Ok(summary) => {
                tracing::info!(job = %job, summary = %summary, "Job finished");
                (RunStatus::Success, summary.clone())
            }
            Err(e) => {
                tracing::error!(job = %job, error = %e, "Job failed");
                (RunStatus::Failed, e.to_string())
            }
        };
        self.record(job, status, message);
        result
    }

    fn record(&self, job: JobKind, status: RunStatus, message: String) {
        self.history.lock().push(JobRecord {
            job,
            last_run: Utc::now(),
            status,
            message,
        });
    }

    /// Per-job status, in registration order.
    #[must_use]
    pub fn status(&self) -> Vec<JobView> {
        let next_fires = self.next_fires.lock();
        let history = self.history.lock();
        self.jobs
            .iter()
            .map(|job| JobView {
                id: job.id(),
                description: job.description(),
                next_run: next_fires.get(job).copied(),
                last_run: history.last(*job).cloned(),
            })
            .collect()
    }

    /// Recent runs, newest first.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<JobRecord> {
        self.history.lock().recent().take(limit).cloned().collect()
    }

    /// Fire jobs on schedule until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let start = Utc::now();
        {
            let mut next_fires = self.next_fires.lock();
            for job in &self.jobs {
                next_fires.insert(*job, job.schedule().next_after(start, self.timezone));
            }
        }
        tracing::info!(
            jobs = self.jobs.len(),
            timezone = %self.timezone,
            "Scheduler started"
        );

        loop {
            let Some(fire_at) = self.next_fires.lock().values().min().copied() else {
                break;
            };
            let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }

            for job in self.due(fire_at) {
                // Overlap with a manual run is logged and recorded as skipped.
                let _ = self.run_now(job).await;
                if shutdown.is_cancelled() {
                    break;
                }
            }
        }

        self.next_fires.lock().clear();
        tracing::info!("Scheduler stopped");
    }

    /// Jobs due at `fire_at`, advancing their next fire.
    fn due(&self, fire_at: DateTime<Utc>) -> Vec<JobKind> {
        let mut next_fires = self.next_fires.lock();
        let due: Vec<JobKind> = next_fires
            .iter()
            .filter(|(_, at)| **at <= fire_at)
            .map(|(job, _)| *job)
            .collect();
        for job in &due {
            let next = job.schedule().next_after(fire_at, self.timezone);
            next_fires.insert(*job, next);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct BlockingRunner {
        started: Notify,
        release: Notify,
        runs: AtomicUsize,
    }

    #[async_trait]
    impl JobRunner for BlockingRunner {
        async fn run(&self, job: JobKind) -> Result<String, JobError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if job == JobKind::DailyAssetRecording {
                return Err(JobError::Failed {
                    job,
                    message: "balance unavailable".to_string(),
                });
            }
            if job == JobKind::DailyBuy {
                self.started.notify_one();
                self.release.notified().await;
            }
            Ok(format!("{job} done"))
        }
    }

    fn scheduler(runner: Arc<BlockingRunner>) -> Arc<Scheduler<BlockingRunner>> {
        Arc::new(Scheduler::new(
            runner,
            chrono_tz::Asia::Seoul,
            JobKind::registered(false),
        ))
    }

    #[tokio::test]
    async fn overlapping_run_of_the_same_job_is_rejected() {
        let runner = Arc::new(BlockingRunner::default());
        let scheduler = scheduler(runner.clone());

        let first = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run_now(JobKind::DailyBuy).await }
        });
        runner.started.notified().await;

        assert_eq!(
            scheduler.run_now(JobKind::DailyBuy).await,
            Err(JobError::AlreadyRunning {
                job: JobKind::DailyBuy
            })
        );
        // A different job is not blocked.
        assert!(scheduler.run_now(JobKind::DailySell).await.is_ok());

        runner.release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(runner.runs.load(Ordering::SeqCst), 2);

        let buys: Vec<RunStatus> = scheduler
            .history(10)
            .into_iter()
            .filter(|r| r.job == JobKind::DailyBuy)
            .map(|r| r.status)
            .collect();
        assert_eq!(buys, [RunStatus::Success, RunStatus::Skipped]);
    }

    #[tokio::test]
    async fn failures_are_recorded_in_history() {
        let scheduler = scheduler(Arc::new(BlockingRunner::default()));
        assert!(scheduler.run_now(JobKind::DailyAssetRecording).await.is_err());

        let view = scheduler
            .status()
            .into_iter()
            .find(|v| v.id == "daily_asset_recording")
            .unwrap();
        let last = view.last_run.unwrap();
        assert_eq!(last.status, RunStatus::Failed);
        assert!(last.message.contains("balance unavailable"));
    }

    #[tokio::test]
    async fn unregistered_job_is_rejected() {
        let scheduler = scheduler(Arc::new(BlockingRunner::default()));
        assert!(matches!(
            scheduler.run_now(JobKind::DashboardSync).await,
            Err(JobError::NotRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn timer_loop_publishes_next_fires_and_stops_on_cancel() {
        let scheduler = scheduler(Arc::new(BlockingRunner::default()));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.clone().run(shutdown.clone()));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(scheduler.status().iter().all(|v| v.next_run.is_some()));

        shutdown.cancel();
        handle.await.unwrap();
        assert!(scheduler.status().iter().all(|v| v.next_run.is_none()));
    }
}
