// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar windows in the configured timezone, plus timestamp formatting.
//!
//! A [`DayWindow`] is the closed range `[00:00:00, 23:59:59.999999999]` of one
//! calendar date in a zone. Every punch resolves "today" through this type, so
//! two instants on the same local date always produce the same window.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// A closed instant range covering one or more whole local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window for the local calendar date of `reference` in `zone`.
    pub fn for_instant(reference: DateTime<Utc>, zone: Tz) -> Self {
        let date = reference.with_timezone(&zone).date_naive();
        Self::for_date(date, zone)
    }

    /// Window for an explicit local calendar date in `zone`.
    pub fn for_date(date: NaiveDate, zone: Tz) -> Self {
        Self::spanning(date, date, zone)
    }

    /// Window for the calendar month (in `zone`) containing `reference`.
    pub fn month_of(reference: DateTime<Utc>, zone: Tz) -> Self {
        let local = reference.with_timezone(&zone).date_naive();
        // Day 1 always exists; the last day is one day before the next month starts.
        let first = local.with_day(1).unwrap_or(local);
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .unwrap_or(first);
        Self::spanning(first, last, zone)
    }

    /// Whether `instant` falls inside the window (both ends inclusive).
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    fn spanning(first: NaiveDate, last: NaiveDate, zone: Tz) -> Self {
        let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap_or(NaiveTime::MIN);
        Self {
            start: local_to_utc(zone, first.and_time(NaiveTime::MIN), true),
            end: local_to_utc(zone, last.and_time(end_of_day), false),
        }
    }
}

/// Resolve a local wall-clock time to UTC.
///
/// DST gaps move forward to the first valid instant; folds pick the earliest
/// mapping for window starts and the latest for window ends.
fn local_to_utc(zone: Tz, local: chrono::NaiveDateTime, is_start: bool) -> DateTime<Utc> {
    let mut probe = local;
    loop {
        match zone.from_local_datetime(&probe) {
            chrono::LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            chrono::LocalResult::Ambiguous(early, late) => {
                let chosen = if is_start { early } else { late };
                return chosen.with_timezone(&Utc);
            }
            chrono::LocalResult::None => {
                probe += chrono::Duration::minutes(1);
            }
        }
    }
}

/// Fixed-width RFC3339 (nanosecond precision) whose lexical order matches time order.
pub fn format_sortable_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a `YYYY-MM` month key into the instant at noon on the 1st in `zone`.
pub fn parse_month_key(key: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d").ok()?;
    let noon = date.and_hms_opt(12, 0, 0)?;
    zone.from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Local calendar date of `instant` in `zone`, e.g. for log fields.
pub fn local_date(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}
