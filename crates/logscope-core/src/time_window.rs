//! Time window resolution and index partition naming.
//!
//! A [`TimeWindow`] is built once per search from two caller inputs. Text
//! inputs are read in the configured zone; a date-only end means the end of
//! that day. An end in the future is clamped to "now" so histogram bounds never
//! run past the data that can exist.
//!
//! Partitions are monthly (`<prefix>-<environment>-<YYYY-MM>`) and are always
//! derived from the UTC dates of the window, whatever the display zone is.

use crate::error::{Error, Result};
use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use std::sync::OnceLock;

/// Local (zone-less) layouts accepted for text inputs, tried in order.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One side of a requested time range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeInput {
    /// An already-resolved instant. Used as is, never widened to end-of-day.
    At(DateTime<Utc>),
    /// Free text in one of the accepted layouts.
    Text(String),
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        TimeInput::Text(value.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(value: String) -> Self {
        TimeInput::Text(value)
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(value: DateTime<Utc>) -> Self {
        TimeInput::At(value)
    }
}

impl From<DateTime<Tz>> for TimeInput {
    fn from(value: DateTime<Tz>) -> Self {
        TimeInput::At(value.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

// ---------------------------------------------------------------------------
// TimeWindow
// ---------------------------------------------------------------------------

/// Resolved, clamped `[start, end]` range for one search.
#[derive(Debug, Clone)]
pub struct TimeWindow {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    time_zone: Tz,
    months: OnceLock<Vec<String>>,
}

impl TimeWindow {
    /// Resolve a window against the current wall clock.
    pub fn new(start: impl Into<TimeInput>, end: impl Into<TimeInput>, time_zone: Tz) -> Result<Self> {
        Self::resolve(start, end, time_zone, Utc::now())
    }

    /// Resolve a window against an explicit `now`.
    pub fn resolve(
        start: impl Into<TimeInput>,
        end: impl Into<TimeInput>,
        time_zone: Tz,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let start = resolve_input(&start.into(), time_zone, Bound::Start)?;
        let mut end = resolve_input(&end.into(), time_zone, Bound::End)?;

        let now = now.with_timezone(&time_zone);
        if end > now {
            tracing::debug!(requested = %end, clamped = %now, "time window: end clamped to now");
            end = now;
        }

        Ok(Self {
            start,
            end,
            time_zone,
            months: OnceLock::new(),
        })
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Start rendered as ISO-8601 in the configured zone, second precision.
    pub fn start_iso8601(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// End rendered as ISO-8601 in the configured zone, second precision.
    pub fn end_iso8601(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// `YYYY-MM` for every UTC calendar month touched by the window, oldest
    /// first. Empty when `start > end`. Computed once.
    pub fn months(&self) -> &[String] {
        self.months.get_or_init(|| {
            let first = self.start.with_timezone(&Utc).date_naive();
            let last = self.end.with_timezone(&Utc).date_naive();
            month_span(first, last)
        })
    }

    /// Partition names for this window: `<prefix>-<environment>-<YYYY-MM>`.
    pub fn partitions(&self, prefix: &str, environment: &str) -> Vec<String> {
        self.months()
            .iter()
            .map(|month| format!("{prefix}-{environment}-{month}"))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn resolve_input(input: &TimeInput, time_zone: Tz, bound: Bound) -> Result<DateTime<Tz>> {
    match input {
        TimeInput::At(at) => Ok(at.with_timezone(&time_zone)),
        TimeInput::Text(raw) => parse_text(raw, time_zone, bound),
    }
}

fn parse_text(raw: &str, time_zone: Tz, bound: Bound) -> Result<DateTime<Tz>> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::parse(raw, "empty input"));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&time_zone));
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return localize(raw, naive, time_zone, bound);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return match bound {
            Bound::Start => start_of_day(raw, date, time_zone),
            Bound::End => localize(raw, end_of_day(date), time_zone, bound),
        };
    }

    Err(Error::parse(
        raw,
        "expected RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DD`",
    ))
}

/// Attach the zone to a wall-clock time. Ambiguous local times (DST fall-back)
/// pick the side that widens the window; skipped local times are rejected.
fn localize(raw: &str, naive: NaiveDateTime, time_zone: Tz, bound: Bound) -> Result<DateTime<Tz>> {
    let local = time_zone.from_local_datetime(&naive);
    let resolved = match bound {
        Bound::Start => local.earliest(),
        Bound::End => local.latest(),
    };
    resolved.ok_or_else(|| Error::parse(raw, format!("local time does not exist in {time_zone}")))
}

/// First instant of `date` in `time_zone`. Zones that start DST at midnight
/// skip 00:00, so the day begins at the end of the gap instead.
fn start_of_day(raw: &str, date: NaiveDate, time_zone: Tz) -> Result<DateTime<Tz>> {
    let midnight = date.and_time(NaiveTime::MIN);
    let mut minute = midnight;
    while minute.date() == date {
        if let Some(start) = time_zone.from_local_datetime(&minute).earliest() {
            if minute != midnight {
                tracing::debug!(%date, %start, "time window: midnight skipped, day starts later");
            }
            return Ok(start);
        }
        minute += TimeDelta::minutes(1);
    }
    Err(Error::parse(raw, format!("day does not exist in {time_zone}")))
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + TimeDelta::days(1) - TimeDelta::milliseconds(1)
}

fn month_span(first: NaiveDate, last: NaiveDate) -> Vec<String> {
    let mut months = Vec::new();
    if first > last {
        return months;
    }

    let stop = (last.year(), last.month());
    let mut cursor = (first.year(), first.month());
    while cursor <= stop {
        months.push(format!("{:04}-{:02}", cursor.0, cursor.1));
        cursor = if cursor.1 == 12 {
            (cursor.0 + 1, 1)
        } else {
            (cursor.0, cursor.1 + 1)
        };
    }
    months
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
