//! Per-container restart bookkeeping.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Restart history for a single container. `occasions` is non-decreasing;
/// `mail_sent` latches once an exhausted record has sent its "maximum
/// restart count reached" mail and is cleared only by
/// [`RestartRecord::reset`], so that mail never repeats for the same streak.
#[derive(Default)]
pub struct RestartRecord {
    occasions: Vec<Instant>,
    formatted_occasions: Vec<String>,
    pub mail_sent: bool,
}

impl RestartRecord {
    pub fn occasions_len(&self) -> usize {
        self.occasions.len()
    }

    pub fn last_restart(&self) -> Option<Instant> {
        self.occasions.last().copied()
    }

    pub fn formatted_occasions(&self) -> &[String] {
        &self.formatted_occasions
    }

    /// Record a successfully issued restart at `now` (monotonic) with
    /// `wall_clock` used only for human-readable display.
    pub fn add_occasion(&mut self, now: Instant, wall_clock: DateTime<Utc>) {
        self.occasions.push(now);
        self.formatted_occasions
            .push(wall_clock.format("%Y-%m-%d %H:%M:%S").to_string());
    }

    /// Clear all counters and the mail latch. The only place `mail_sent`
    /// is ever cleared; nothing else should reset it opportunistically.
    pub fn reset(&mut self) {
        self.occasions.clear();
        self.formatted_occasions.clear();
        self.mail_sent = false;
    }

    /// True iff a restart may be issued now: fewer than `limit` occasions
    /// recorded, or at least one of the last `limit` occasions is older than
    /// `threshold`. Equivalently: false iff all of the last `limit`
    /// occasions fall inside `[now - threshold, now]`.
    pub fn restart_allowed(&self, limit: usize, threshold: Duration, now: Instant) -> bool {
        if self.occasions.len() < limit {
            return true;
        }
        let last_n = &self.occasions[self.occasions.len() - limit..];
        last_n
            .iter()
            .any(|&t| now.saturating_duration_since(t) > threshold)
    }
}
