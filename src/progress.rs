use crate::errors::EngineError;
use crate::models::PROGRAM_DAYS;
use crate::store::ProgressStore;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use tracing::info;

/// Whole 24-hour periods between `started_at` and `now`. A clock that reads
/// earlier than the start counts as zero.
pub fn days_elapsed(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - started_at).num_days().max(0)
}

/// Program day for `now`, in `1..=PROGRAM_DAYS`.
pub fn resolve_day(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let capped = days_elapsed(started_at, now).min(i64::from(PROGRAM_DAYS - 1));
    capped as u32 + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayResolution {
    pub day: u32,
    pub advanced: bool,
}

/// Recomputes the real program day and persists it when it moved forward.
pub fn advance_day<S>(
    store: &mut S,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<DayResolution, EngineError>
where
    S: ProgressStore + ?Sized,
{
    let record = store
        .read(user_id)?
        .ok_or_else(|| EngineError::NotInitialized(user_id.to_string()))?;

    let actual = resolve_day(record.started_at, now);
    if actual <= record.current_day {
        return Ok(DayResolution {
            day: record.current_day,
            advanced: false,
        });
    }

    let advanced = store.advance_day(user_id, actual, now)?;
    if advanced {
        info!(user_id, day = actual, "program day advanced");
    }

    Ok(DayResolution {
        day: actual,
        advanced,
    })
}

/// Consecutive completed days ending at `today`. Zero when today has no
/// completion, so a missed day resets the count.
pub fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut cursor = today;

    for date in dates.range(..=today).rev() {
        if *date != cursor {
            break;
        }
        streak += 1;
        match cursor.pred_opt() {
            Some(previous) => cursor = previous,
            None => break,
        }
    }

    streak
}
