//! Job kinds and their wall-clock schedules.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Every scheduled job this engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Sell-side plan cycle.
    DailySell,
    /// Buy-side plan cycle.
    DailyBuy,
    /// Token sweep.
    HourlyTokenRefresh,
    /// End-of-day asset snapshot.
    DailyAssetRecording,
    /// Production-only dashboard push.
    DashboardSync,
}

impl JobKind {
    /// All kinds, in registration order.
    pub const ALL: [Self; 5] = [
        Self::DailySell,
        Self::DailyBuy,
        Self::HourlyTokenRefresh,
        Self::DailyAssetRecording,
        Self::DashboardSync,
    ];

    /// Stable job id.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::DailySell => "daily_sell_job",
            Self::DailyBuy => "daily_buy_job",
            Self::HourlyTokenRefresh => "hourly_token_refresh",
            Self::DailyAssetRecording => "daily_asset_recording",
            Self::DashboardSync => "dashboard_sync",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::DailySell => "Execute scheduled SELL plans (12:15)",
            Self::DailyBuy => "Execute scheduled BUY plans (12:30)",
            Self::HourlyTokenRefresh => "Refresh tokens expiring within an hour (every 60 min)",
            Self::DailyAssetRecording => "Record end-of-day account assets (16:00)",
            Self::DashboardSync => "Push daily asset snapshots to the dashboard (16:30, prd only)",
        }
    }

    /// Trigger schedule.
    #[must_use]
    pub const fn schedule(self) -> Schedule {
        match self {
            Self::DailySell => Schedule::daily(12, 15),
            Self::DailyBuy => Schedule::daily(12, 30),
            Self::HourlyTokenRefresh => Schedule::Every(Duration::from_secs(3600)),
            Self::DailyAssetRecording => Schedule::daily(16, 0),
            Self::DashboardSync => Schedule::daily(16, 30),
        }
    }

    /// Whether the job is registered only in production mode.
    #[must_use]
    pub const fn production_only(self) -> bool {
        matches!(self, Self::DashboardSync)
    }

    /// Look a kind up by id.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Kinds registered for the given run mode.
    #[must_use]
    pub fn registered(production: bool) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|kind| production || !kind.production_only())
            .collect()
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every day at a local wall-clock time.
    DailyAt {
        /// Hour, 0-23.
        hour: u32,
        /// Minute, 0-59.
        minute: u32,
    },
    /// Fixed interval from scheduler start.
    Every(Duration),
}

impl Schedule {
    /// Daily trigger at `hour:minute`.
    #[must_use]
    pub const fn daily(hour: u32, minute: u32) -> Self {
        Self::DailyAt { hour, minute }
    }

    /// First fire strictly after `after`, in wall-clock zone `tz`.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        match *self {
            Self::Every(interval) => {
                after + TimeDelta::from_std(interval).unwrap_or(TimeDelta::hours(1))
            }
            Self::DailyAt { hour, minute } => {
                let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
                let mut date = after.with_timezone(&tz).date_naive();
                // A wall-clock time skipped by a DST gap has no instant; try the next day.
                for _ in 0..3 {
                    if let Some(candidate) = tz.from_local_datetime(&date.and_time(time)).earliest() {
                        let candidate = candidate.with_timezone(&Utc);
                        if candidate > after {
                            return candidate;
                        }
                    }
                    date = date.checked_add_days(Days::new(1)).unwrap_or(date);
                }
                after + TimeDelta::days(1)
            }
        }
    }
}
