//! Test builders: ergonomic constructors for settings, windows and searches.
//!
//! These are designed for readability in test assertions, not for production
//! use. They panic on invalid input rather than returning `Result`.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use logscope_core::{LogSearch, SearchSettings, TimeInput, TimeWindow};

/// The instant every harness treats as "now": 2024-03-15 12:00:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

pub fn settings() -> SearchSettings {
    SearchSettings::new("test", "api-logs", chrono_tz::UTC)
}

pub fn settings_in(time_zone: Tz) -> SearchSettings {
    SearchSettings::new("test", "api-logs", time_zone)
}

pub fn window(start: impl Into<TimeInput>, end: impl Into<TimeInput>) -> TimeWindow {
    window_in(chrono_tz::UTC, start, end)
}

pub fn window_in(time_zone: Tz, start: impl Into<TimeInput>, end: impl Into<TimeInput>) -> TimeWindow {
    TimeWindow::resolve(start, end, time_zone, fixed_now()).expect("test window must resolve")
}

/// A January 2024 search in UTC with nothing configured yet.
pub fn january_search() -> LogSearch {
    search_between("2024-01-01", "2024-01-31")
}

pub fn search_between(start: &str, end: &str) -> LogSearch {
    LogSearch::with_window(settings(), window(start, end))
}
