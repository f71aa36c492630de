use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppResult;
use crate::models::plan_request::StudyPreferences;

pub const MIN_PLAN_DAYS: i64 = 7;
pub const MAX_DETAILED_WEEKS: u32 = 4;
pub const NEXT_DAYS_FOCUS_LEN: usize = 7;
pub const DAYS_PER_WEEK: usize = 7;
pub const WEEKDAYS_PER_WEEK: f64 = 5.0;
pub const WEEKEND_DAYS_PER_WEEK: f64 = 2.0;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Scheduling numbers derived from the study preferences. Recomputed on
/// every use, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedParameters {
    pub total_days: i64,
    pub total_weeks: u32,
    pub weekly_hours: f64,
    pub generated_weeks: u32,
}

impl DerivedParameters {
    pub fn compute(preferences: &StudyPreferences, now: DateTime<Utc>) -> AppResult<Self> {
        let target = preferences.target_instant()?;
        let total_days = days_until(now, target).max(MIN_PLAN_DAYS);
        let total_weeks = ceil_div(total_days, DAYS_PER_WEEK as i64) as u32;

        Ok(Self {
            total_days,
            total_weeks,
            weekly_hours: weekly_hours(preferences.weekday_hours, preferences.weekend_hours),
            generated_weeks: total_weeks.min(MAX_DETAILED_WEEKS),
        })
    }
}

pub fn weekly_hours(weekday_hours: f64, weekend_hours: f64) -> f64 {
    weekday_hours * WEEKDAYS_PER_WEEK + weekend_hours * WEEKEND_DAYS_PER_WEEK
}

/// Whole days from `now` to `target`, rounded up; negative when the target is past.
pub fn days_until(now: DateTime<Utc>, target: DateTime<Utc>) -> i64 {
    ceil_div(
        target.signed_duration_since(now).num_milliseconds(),
        MILLIS_PER_DAY,
    )
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value.div_euclid(divisor);
    if value.rem_euclid(divisor) == 0 {
        quotient
    } else {
        quotient + 1
    }
}
