//! Upcoming-activity filter: time window plus optional sport.
//!
//! The map only shows activities starting between "now" and the end of the
//! selected window. The window bounds are fixed when the filter is built, so
//! applying the same filter twice gives the same result.

use chrono::{DateTime, Duration, Utc};
use log::warn;

use crate::ActivityMarker;

/// Time window offered by the map's filter picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
    Month,
}

impl TimeWindow {
    pub fn days(self) -> i64 {
        match self {
            TimeWindow::Day => 1,
            TimeWindow::Week => 7,
            TimeWindow::Month => 30,
        }
    }

    /// Map a picker value (1, 7 or 30) back to a window.
    pub fn from_days(days: u32) -> Option<Self> {
        match days {
            1 => Some(TimeWindow::Day),
            7 => Some(TimeWindow::Week),
            30 => Some(TimeWindow::Month),
            _ => None,
        }
    }
}

/// Keeps activities starting within `[from, to]`, optionally of one sport.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFilter {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Sport catalog id; `None` keeps every sport
    pub sport: Option<String>,
}

impl ActivityFilter {
    /// Activities starting from `now` until the end of `window`.
    ///
    /// An empty sport string means "all sports".
    pub fn upcoming(window: TimeWindow, sport: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            from: now,
            to: now + Duration::days(window.days()),
            sport: sport.filter(|s| !s.is_empty()),
        }
    }

    /// Parse a marker's start time. Returns `None` for malformed timestamps.
    pub fn start_time(marker: &ActivityMarker) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&marker.starts_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn matches(&self, marker: &ActivityMarker) -> bool {
        match Self::start_time(marker) {
            Some(start) => self.accepts(marker, start),
            None => false,
        }
    }

    fn accepts(&self, marker: &ActivityMarker, start: DateTime<Utc>) -> bool {
        let sport_ok = match &self.sport {
            Some(sport) => &marker.sport == sport,
            None => true,
        };
        sport_ok && start >= self.from && start <= self.to
    }

    /// Matching markers, soonest first. Ties keep their input order.
    pub fn apply(&self, markers: &[ActivityMarker]) -> Vec<ActivityMarker> {
        let mut kept: Vec<(DateTime<Utc>, &ActivityMarker)> = Vec::with_capacity(markers.len());
        let mut malformed = 0usize;

        for marker in markers {
            let Some(start) = Self::start_time(marker) else {
                malformed += 1;
                continue;
            };
            if self.accepts(marker, start) {
                kept.push((start, marker));
            }
        }

        if malformed > 0 {
            warn!(
                "[ActivityFilter] Skipped {} markers with unparseable starts_at",
                malformed
            );
        }

        kept.sort_by_key(|(start, _)| *start);
        kept.into_iter().map(|(_, m)| m.clone()).collect()
    }
}
