//! Calendar period boundaries used to widen row-level bounds out to the
//! enclosing partition.
//!
//! Every function here is pure: it maps a naive (UTC) timestamp to the first or
//! last instant of the quarter/month that contains it.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// First day of the month containing `date`.
fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// First day of the quarter containing `date`.
fn first_of_quarter(date: NaiveDate) -> NaiveDate {
    first_of_month(date) - Months::new(date.month0() % 3)
}

/// Last representable instant before `next_start`.
fn instant_before(next_start: NaiveDate) -> NaiveDateTime {
    next_start.and_time(NaiveTime::MIN) - TimeDelta::nanoseconds(1)
}

/// Start of the calendar quarter containing `ts` (00:00 on Jan 1, Apr 1, Jul 1 or Oct 1).
pub fn quarter_start(ts: NaiveDateTime) -> NaiveDateTime {
    first_of_quarter(ts.date()).and_time(NaiveTime::MIN)
}

/// Last nanosecond of the calendar quarter containing `ts`.
pub fn quarter_end(ts: NaiveDateTime) -> NaiveDateTime {
    instant_before(first_of_quarter(ts.date()) + Months::new(3))
}

/// Start of the calendar month containing `ts`.
pub fn month_start(ts: NaiveDateTime) -> NaiveDateTime {
    first_of_month(ts.date()).and_time(NaiveTime::MIN)
}

/// Last nanosecond of the calendar month containing `ts`.
pub fn month_end(ts: NaiveDateTime) -> NaiveDateTime {
    instant_before(first_of_month(ts.date()) + Months::new(1))
}

/// Pair of boundary functions for one partition granularity.
#[derive(Debug, Clone, Copy)]
pub struct PeriodBoundary {
    pub start: fn(NaiveDateTime) -> NaiveDateTime,
    pub end: fn(NaiveDateTime) -> NaiveDateTime,
}
