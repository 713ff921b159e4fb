use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use tracing::warn;

use crate::error::{Result, SchedulerError};
use crate::types::Schedule;

impl Schedule {
    /// Build a cron schedule, rejecting expressions that do not parse.
    pub fn cron(expression: impl Into<String>) -> Result<Self> {
        let schedule = Schedule::Cron {
            expression: expression.into(),
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check field ranges and cron syntax.
    pub fn validate(&self) -> Result<()> {
        match self {
            Schedule::Once { .. } => Ok(()),
            Schedule::Interval { every_secs } => {
                if *every_secs == 0 {
                    return Err(SchedulerError::InvalidSchedule(
                        "interval must be at least one second".to_string(),
                    ));
                }
                Ok(())
            }
            Schedule::Daily { hour, minute } => check_time(*hour, *minute),
            Schedule::Weekly { day, hour, minute } => {
                if *day > 6 {
                    return Err(SchedulerError::InvalidSchedule(format!(
                        "weekday {day} out of range 0..=6"
                    )));
                }
                check_time(*hour, *minute)
            }
            Schedule::Cron { expression } => cron::Schedule::from_str(expression)
                .map(|_| ())
                .map_err(|e| SchedulerError::InvalidSchedule(format!("{expression}: {e}"))),
        }
    }
}

fn check_time(hour: u8, minute: u8) -> Result<()> {
    if hour > 23 || minute > 59 {
        return Err(SchedulerError::InvalidSchedule(format!(
            "time {hour:02}:{minute:02} out of range"
        )));
    }
    Ok(())
}

/// Compute the next UTC execution time for `schedule` strictly *after* `from`.
///
/// Returns `None` when the schedule is exhausted (a `Once` job whose instant
/// has passed) or invalid.
pub fn next_after(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Once { at } => (*at > from).then_some(*at),

        Schedule::Interval { every_secs } => {
            if *every_secs == 0 {
                return None;
            }
            let step = Duration::try_seconds(i64::try_from(*every_secs).ok()?)?;
            from.checked_add_signed(step)
        }

        Schedule::Daily { hour, minute } => {
            let candidate = at_time(from, 0, *hour, *minute)?;
            if candidate > from {
                Some(candidate)
            } else {
                Some(candidate + Duration::days(1))
            }
        }

        Schedule::Weekly { day, hour, minute } => {
            if *day > 6 {
                return None;
            }
            // `day` follows chrono's `num_days_from_monday`.
            let today = i64::from(from.weekday().num_days_from_monday());
            let days_ahead = (i64::from(*day) - today).rem_euclid(7);
            let candidate = at_time(from, days_ahead, *hour, *minute)?;
            if candidate > from {
                Some(candidate)
            } else {
                Some(candidate + Duration::days(7))
            }
        }

        Schedule::Cron { expression } => match cron::Schedule::from_str(expression) {
            Ok(parsed) => parsed.after(&from).next(),
            Err(e) => {
                warn!(%expression, "unparsable cron expression: {e}");
                None
            }
        },
    }
}

/// `from`'s date shifted by `days_ahead`, at HH:MM:00 UTC.
fn at_time(from: DateTime<Utc>, days_ahead: i64, hour: u8, minute: u8) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(u32::from(hour), u32::from(minute), 0)?;
    let date = from.date_naive() + Duration::days(days_ahead);
    Some(date.and_time(time).and_utc())
}
