use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use chrono::{DateTime, TimeDelta, Utc};

use crate::types::SnoozeMarker;

/// Marker key shared by every custody type's backup reminder.
pub const APP_BACKUP_SNOOZE: &str = "appBackupSnooze";

/// Default first snooze: one day.
pub const DEFAULT_SNOOZE: Duration = Duration::from_secs(24 * 60 * 60);
/// Default upper bound for exponential snoozes: thirty days.
pub const DEFAULT_MAX_SNOOZE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

// doublings past this point are all clamped to `max` anyway
const MAX_DOUBLINGS: u32 = 32;

/// Marker key for a notification topic the user muted.
#[must_use]
pub fn notifications_topic_key(topic: &str) -> String {
    format!("snoozeNotificationsTopic:{topic}")
}

/// How long dismissing a prompt defers the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnoozePolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for SnoozePolicy {
    fn default() -> Self {
        Self { base: DEFAULT_SNOOZE, max: DEFAULT_MAX_SNOOZE }
    }
}

impl SnoozePolicy {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max: max.max(base) }
    }

    /// Delay of the snooze following `count` earlier consecutive ones: `min(base * 2^count, max)`.
    #[must_use]
    pub fn delay_for(&self, count: u32) -> Duration {
        let count = count.min(MAX_DOUBLINGS) as usize;
        ExponentialBuilder::default()
            .with_min_delay(self.base)
            .with_max_delay(self.max)
            .with_factor(2.0)
            .with_max_times(count + 1)
            .build()
            .nth(count)
            .unwrap_or(self.max)
    }

    /// Snooze `key` until an explicit instant. The consecutive count is kept.
    #[must_use]
    pub fn until(
        &self,
        key: &str,
        previous: Option<&SnoozeMarker>,
        until: DateTime<Utc>,
    ) -> SnoozeMarker {
        SnoozeMarker { key: key.to_owned(), until, count: previous.map_or(0, |marker| marker.count) }
    }

    /// Snooze `key` for the next exponential step.
    #[must_use]
    pub fn exponential(
        &self,
        key: &str,
        previous: Option<&SnoozeMarker>,
        now: DateTime<Utc>,
    ) -> SnoozeMarker {
        let count = previous.map_or(0, |marker| marker.count);
        SnoozeMarker {
            key: key.to_owned(),
            until: later(now, self.delay_for(count)),
            count: count.saturating_add(1),
        }
    }

    /// The concern was dealt with: defer for one base period and restart the exponential sequence.
    #[must_use]
    pub fn resolved(&self, key: &str, now: DateTime<Utc>) -> SnoozeMarker {
        SnoozeMarker { key: key.to_owned(), until: later(now, self.base), count: 0 }
    }
}

fn later(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
