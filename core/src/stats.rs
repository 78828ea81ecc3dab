use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::script::{Script, ScriptStatus};

/// How many scripts the recent-runs list holds.
pub const RECENT_LIMIT: usize = 5;

/// Dashboard counters over a script collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Stats {
    /// All scripts.
    pub total: usize,
    /// Scripts whose status is `running`.
    pub running: usize,
    /// Scripts carrying a schedule, whatever their status.
    pub scheduled: usize,
    /// Scripts whose last run started within the past 7 days.
    pub run_last_7_days: usize,
}

impl Stats {
    /// Count over `scripts` as seen at `now`.
    pub fn collect(scripts: &[Script], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(7);
        Self {
            total: scripts.len(),
            running: scripts.iter().filter(|s| s.status == ScriptStatus::Running).count(),
            scheduled: scripts.iter().filter(|s| s.schedule.is_some()).count(),
            run_last_7_days: scripts
                .iter()
                .filter(|s| s.last_run.is_some_and(|t| t >= week_ago))
                .count(),
        }
    }
}

/// Up to [`RECENT_LIMIT`] scripts that have run, newest first.
pub fn recently_run(scripts: &[Script]) -> Vec<&Script> {
    let mut ran: Vec<&Script> = scripts.iter().filter(|s| s.last_run.is_some()).collect();
    ran.sort_by(|a, b| b.last_run.cmp(&a.last_run));
    ran.truncate(RECENT_LIMIT);
    ran
}
