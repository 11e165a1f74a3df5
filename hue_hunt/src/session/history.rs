// THEORY:
// The history is the session's record of accepted "color observed" events.
// The detection loop can report the same dominant color sixty times a second,
// so every event passes through a `Debouncer` first:
//
// - the same name as the last accepted event, less than `window` later: drop
// - anything else: accept, and remember (name, time) as the new reference
//
// A suppressed event does not move the reference time, so holding one color
// in front of the camera records it once per window, not never.
//
// The history itself only grows. It is cleared by an explicit user action and
// is never persisted.

use crate::core_modules::color_model::{BucketName, RgbColor};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(2000);

/// One accepted observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorHistoryEntry {
    pub color: RgbColor,
    pub name: BucketName,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<(BucketName, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns true if an event for `name` at `now` should be recorded.
    pub fn accept(&mut self, name: BucketName, now: Instant) -> bool {
        if let Some((last_name, last_time)) = self.last {
            if last_name == name && now.saturating_duration_since(last_time) < self.window {
                return false;
            }
        }
        self.last = Some((name, now));
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

/// Number of accepted observations for one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorCount {
    pub name: BucketName,
    pub display_color: RgbColor,
    pub count: usize,
}

/// Aggregate view over a session's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total_detections: usize,
    pub unique_colors: usize,
    /// Most frequent first; equal counts keep first-seen order.
    pub distribution: Vec<ColorCount>,
}

#[derive(Debug, Clone, Default)]
pub struct ColorHistory {
    entries: Vec<ColorHistoryEntry>,
}

impl ColorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, color: RgbColor, name: BucketName, timestamp: DateTime<Utc>) {
        self.entries.push(ColorHistoryEntry { color, name, timestamp });
    }

    pub fn entries(&self) -> &[ColorHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn summary(&self) -> HistorySummary {
        let mut distribution: Vec<ColorCount> = Vec::new();
        for entry in &self.entries {
            match distribution.iter_mut().find(|count| count.name == entry.name) {
                Some(count) => count.count += 1,
                None => distribution.push(ColorCount {
                    name: entry.name,
                    display_color: entry.color,
                    count: 1,
                }),
            }
        }
        // `sort_by` is stable, so ties stay in first-seen order.
        distribution.sort_by(|a, b| b.count.cmp(&a.count));

        HistorySummary {
            total_detections: self.entries.len(),
            unique_colors: distribution.len(),
            distribution,
        }
    }
}
