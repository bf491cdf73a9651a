use std::time::Duration;

use chrono::Local;
use tokio::time::Instant;
use tracing::info;

use crate::snapshot::DATE_FORMAT;

/// Fixed-interval "refresh due" signal for the control loop.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    interval: Duration,
    next_due: Instant,
}

impl RefreshSchedule {
    /// First refresh falls one `interval` after `now`.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    /// Restart the interval from `now`; called after every attempt, successful or not.
    pub fn mark_done(&mut self, now: Instant) {
        self.next_due = now + self.interval;
        self.log_next();
    }

    /// Make the next check at or after `now` trigger a refresh.
    pub fn expedite(&mut self, now: Instant) {
        self.next_due = now;
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn log_next(&self) {
        let remaining = self.next_due.saturating_duration_since(Instant::now());
        match chrono::Duration::from_std(remaining) {
            Ok(delta) => {
                let at = Local::now() + delta;
                info!(
                    at = %at.format(DATE_FORMAT),
                    "next snapshot refresh scheduled"
                );
            }
            Err(_) => info!(
                within = %humantime::format_duration(remaining),
                "next snapshot refresh scheduled"
            ),
        }
    }
}
