//! Planned teaching hours of a course edition
//!
//! An edition teaches a fixed number of hours on every weekday between its
//! start and end dates, both included. The result is compared with the
//! nominal duration of the course.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

pub const HOURS_PER_DAY: i64 = 5;
/// Largest accepted gap between planned and nominal hours.
pub const TOLERANCE_HOURS: i64 = 25;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoursCheck {
    pub working_days: i64,
    pub planned_hours: i64,
    pub course_hours: i64,
    pub difference: i64,
    pub within_tolerance: bool,
}

pub fn working_days(start: NaiveDate, end: NaiveDate) -> Result<i64, Error> {
    if end < start {
        return Err(Error::EndBeforeStart { start, end });
    }
    let days = start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count();
    Ok(days as i64)
}

pub fn planned_hours(start: NaiveDate, end: NaiveDate) -> Result<i64, Error> {
    Ok(working_days(start, end)? * HOURS_PER_DAY)
}

/// Compares the planned hours with the course duration. A course without a
/// duration accepts any dates.
pub fn check_hours(
    course_hours: Option<i64>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HoursCheck, Error> {
    let working_days = working_days(start, end)?;
    let planned_hours = working_days * HOURS_PER_DAY;
    let course_hours = course_hours.unwrap_or(0).max(0);
    let difference = (planned_hours - course_hours).abs();
    Ok(HoursCheck {
        working_days,
        planned_hours,
        course_hours,
        difference,
        within_tolerance: course_hours == 0 || difference <= TOLERANCE_HOURS,
    })
}
