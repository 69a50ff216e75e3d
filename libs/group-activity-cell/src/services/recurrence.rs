// libs/group-activity-cell/src/services/recurrence.rs
use chrono::{Duration, Months, NaiveDate};
use tracing::warn;

use crate::models::{GroupActivityError, RecurrenceFrequency, RecurrenceRule, RecurrenceTermination};

/// Upper bound on generated occurrences whatever the termination rule says.
pub const MAX_OCCURRENCES: usize = 50;

/// Dates of a series, starting with `start` and strictly increasing.
///
/// Occurrence `k` is `start + k * interval` weeks or months. Monthly steps are
/// taken from `start` each time, so a series that begins on the 31st lands on
/// the last day of shorter months and returns to the 31st afterwards.
pub fn generate_recurrence_dates(
    start: NaiveDate,
    rule: &RecurrenceRule,
) -> Result<Vec<NaiveDate>, GroupActivityError> {
    if rule.interval == 0 {
        return Err(GroupActivityError::Validation("Recurrence interval must be at least 1".to_string()));
    }

    let limit = match rule.termination {
        RecurrenceTermination::ByCount { count } => {
            if count == 0 {
                return Err(GroupActivityError::Validation("Occurrence count must be at least 1".to_string()));
            }
            if count as usize > MAX_OCCURRENCES {
                warn!("Recurrence count {} capped at {}", count, MAX_OCCURRENCES);
            }
            (count as usize).min(MAX_OCCURRENCES)
        }
        RecurrenceTermination::ByDate { end_date } => {
            if end_date < start {
                return Err(GroupActivityError::Validation(format!(
                    "Recurrence end date {} is before start date {}",
                    end_date, start
                )));
            }
            MAX_OCCURRENCES
        }
    };

    let mut dates = Vec::with_capacity(limit);
    for k in 0..limit as u32 {
        let Some(date) = occurrence(start, rule.frequency, k * rule.interval) else {
            break;
        };
        if let RecurrenceTermination::ByDate { end_date } = rule.termination {
            if date > end_date {
                break;
            }
        }
        dates.push(date);
    }

    Ok(dates)
}

fn occurrence(start: NaiveDate, frequency: RecurrenceFrequency, steps: u32) -> Option<NaiveDate> {
    match frequency {
        RecurrenceFrequency::Weekly => start.checked_add_signed(Duration::weeks(steps as i64)),
        RecurrenceFrequency::Monthly => start.checked_add_months(Months::new(steps)),
    }
}
