//! Cooldown — per-container debounce table.
//!
//! Entries are keyed by container name and never removed; a stale entry is
//! harmless because eligibility is always measured against a fixed window.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Seconds after a dispatch during which further events are suppressed.
pub const COOLDOWN_WINDOW_SECS: i64 = 60;

#[derive(Debug)]
pub struct CooldownTracker {
    window: TimeDelta,
    last_processed: DashMap<String, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new(window: TimeDelta) -> Self {
        Self { window, last_processed: DashMap::new() }
    }

    /// True when `name` has no entry or its entry is at least one window old.
    pub fn is_eligible(&self, name: &str, now: DateTime<Utc>) -> bool {
        match self.last_processed.get(name) {
            Some(last) => self.elapsed_enough(*last, now),
            None => true,
        }
    }

    /// Record `now` as the last dispatch time for `name`.
    pub fn mark_processed(&self, name: &str, now: DateTime<Utc>) {
        self.last_processed.insert(name.to_string(), now);
    }

    /// Check-and-mark under the entry's shard lock, so two concurrent events
    /// for the same container cannot both pass.
    ///
    /// Returns the remaining cooldown when `name` is not eligible.
    pub fn try_claim(&self, name: &str, now: DateTime<Utc>) -> Result<(), TimeDelta> {
        match self.last_processed.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                let last = *entry.get();
                if self.elapsed_enough(last, now) {
                    entry.insert(now);
                    Ok(())
                } else {
                    Err(self.remaining_from(last, now))
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                Ok(())
            }
        }
    }

    /// Time left in the window for `name`, or `None` if it is eligible.
    pub fn remaining(&self, name: &str, now: DateTime<Utc>) -> Option<TimeDelta> {
        let last = *self.last_processed.get(name)?;
        if self.elapsed_enough(last, now) {
            None
        } else {
            Some(self.remaining_from(last, now))
        }
    }

    pub fn len(&self) -> usize {
        self.last_processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_processed.is_empty()
    }

    // A `now` earlier than `last` (clock stepped back) counts as inside the window.
    fn elapsed_enough(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last) >= self.window
    }

    fn remaining_from(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> TimeDelta {
        self.window - now.signed_duration_since(last)
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(COOLDOWN_WINDOW_SECS))
    }
}
