//! Evaluation pass tying the day resolver, streak calculator and
//! achievement evaluator together.

use crate::achievements::{AchievementCatalog, evaluate_achievements};
use crate::errors::EngineError;
use crate::models::{AchievementDefinition, ProgressRecord};
use crate::notify::{NotificationSink, ProgressEvent};
use crate::progress::{advance_day, current_streak};
use crate::store::{ProgressStore, UnlockStore};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub record: ProgressRecord,
    pub streak: u32,
    pub advanced: bool,
    pub unlocked: Vec<AchievementDefinition>,
    /// Whether the pass wrote anything to the store.
    pub changed: bool,
}

/// Creates the user's progress record if it does not exist yet.
/// Returns `true` when a new record was written.
pub fn start_progress<S>(
    store: &mut S,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, EngineError>
where
    S: ProgressStore + ?Sized,
{
    if store.read(user_id)?.is_some() {
        return Ok(false);
    }
    store.write(&ProgressRecord::new(user_id, now))?;
    Ok(true)
}

/// Records a completed routine for `today`. Only the first completion on a
/// calendar day counts; returns whether this one did.
pub fn complete_routine<S>(
    store: &mut S,
    user_id: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<bool, EngineError>
where
    S: ProgressStore + ?Sized,
{
    let mut record = store
        .read(user_id)?
        .ok_or_else(|| EngineError::NotInitialized(user_id.to_string()))?;

    if !store.record_completion(user_id, today)? {
        return Ok(false);
    }

    record.routines_completed = record.routines_completed.saturating_add(1);
    record.updated_at = now;
    store.write(&record)?;
    Ok(true)
}

/// Runs one evaluation pass for `user_id`.
///
/// Every write is idempotent, so a pass interrupted by a storage failure can
/// simply be run again.
pub fn run_pass<S, C, N>(
    store: &mut S,
    catalog: &C,
    sink: &mut N,
    user_id: &str,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Result<PassOutcome, EngineError>
where
    S: ProgressStore + UnlockStore + ?Sized,
    C: AchievementCatalog + ?Sized,
    N: NotificationSink + ?Sized,
{
    let resolution = advance_day(store, user_id, now)?;
    let mut changed = resolution.advanced;
    if resolution.advanced {
        sink.notify(ProgressEvent::DayAdvanced {
            user_id: user_id.to_string(),
            day: resolution.day,
        });
    }

    let dates = store.read_completion_dates(user_id)?;
    let streak = current_streak(&dates, today);

    let mut record = store
        .read(user_id)?
        .ok_or_else(|| EngineError::NotInitialized(user_id.to_string()))?;
    if record.streak_days != streak {
        record.streak_days = streak;
        record.updated_at = now;
        store.write(&record)?;
        changed = true;
    }

    let unlocked = evaluate_achievements(store, catalog.list_definitions(), &record, streak, now)?;
    changed |= !unlocked.is_empty();
    for achievement in &unlocked {
        sink.notify(ProgressEvent::AchievementUnlocked {
            user_id: user_id.to_string(),
            achievement: achievement.clone(),
        });
    }

    debug!(
        user_id,
        day = record.current_day,
        streak,
        unlocked = unlocked.len(),
        "evaluation pass finished"
    );

    Ok(PassOutcome {
        record,
        streak,
        advanced: resolution.advanced,
        unlocked,
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::StaticCatalog;
    use crate::errors::StoreError;
    use crate::models::{AchievementUnlock, AppData, RequirementType};
    use crate::store::InsertOutcome;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn definition(
        id: &str,
        requirement_type: RequirementType,
        value: u32,
    ) -> AchievementDefinition {
        AchievementDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: String::new(),
            requirement_type,
            requirement_value: value,
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(vec![
            definition("week", RequirementType::DaysCompleted, 7),
            definition("fortnight", RequirementType::DaysCompleted, 15),
            definition("streak-3", RequirementType::Streak, 3),
            definition("routines-10", RequirementType::RoutineCompleted, 10),
        ])
        .unwrap()
    }

    #[test]
    fn ten_days_of_completions() {
        let now = Utc.with_ymd_and_hms(2026, 4, 20, 18, 0, 0).unwrap();
        let today = now.date_naive();
        let mut store = AppData::default();

        start_progress(&mut store, "u-1", now - Duration::days(9)).unwrap();
        for offset in (0..10).rev() {
            let date = today - Duration::days(offset);
            assert!(complete_routine(&mut store, "u-1", date, now).unwrap());
        }

        let mut events = Vec::new();
        let outcome = run_pass(&mut store, &catalog(), &mut events, "u-1", now, today).unwrap();

        assert_eq!(outcome.record.current_day, 10);
        assert_eq!(outcome.streak, 10);
        assert_eq!(outcome.record.streak_days, 10);
        assert_eq!(outcome.record.routines_completed, 10);
        assert!(outcome.advanced);

        let ids: BTreeSet<&str> = outcome.unlocked.iter().map(|d| d.id.as_str()).collect();
        assert!(ids.contains("week"));
        assert!(ids.contains("streak-3"));
        assert!(ids.contains("routines-10"));
        assert!(!ids.contains("fortnight"));

        assert!(matches!(events[0], ProgressEvent::DayAdvanced { day: 10, .. }));
        assert_eq!(events.len(), 1 + outcome.unlocked.len());
    }

    #[test]
    fn repeated_pass_is_a_no_op() {
        let now = Utc.with_ymd_and_hms(2026, 4, 20, 18, 0, 0).unwrap();
        let today = now.date_naive();
        let mut store = AppData::default();
        start_progress(&mut store, "u-1", now - Duration::days(8)).unwrap();

        let mut events = Vec::new();
        let first = run_pass(&mut store, &catalog(), &mut events, "u-1", now, today).unwrap();
        assert!(first.changed);

        let mut events = Vec::new();
        let second = run_pass(&mut store, &catalog(), &mut events, "u-1", now, today).unwrap();
        assert!(!second.changed);
        assert!(second.unlocked.is_empty());
        assert!(events.is_empty());
        assert_eq!(second.record, first.record);
    }

    #[test]
    fn missed_day_resets_cached_streak() {
        let now = Utc.with_ymd_and_hms(2026, 4, 20, 18, 0, 0).unwrap();
        let today = now.date_naive();
        let mut store = AppData::default();
        start_progress(&mut store, "u-1", now - Duration::days(5)).unwrap();
        for offset in [4, 3, 2] {
            complete_routine(&mut store, "u-1", today - Duration::days(offset), now).unwrap();
        }

        let mut events = Vec::new();
        let two_days_ago = today - Duration::days(2);
        let earlier =
            run_pass(&mut store, &catalog(), &mut events, "u-1", now, two_days_ago).unwrap();
        assert_eq!(earlier.streak, 3);

        let outcome = run_pass(&mut store, &catalog(), &mut events, "u-1", now, today).unwrap();
        assert_eq!(outcome.streak, 0);
        assert_eq!(outcome.record.streak_days, 0);
    }

    #[test]
    fn second_completion_on_same_day_does_not_count() {
        let now = Utc.with_ymd_and_hms(2026, 4, 20, 18, 0, 0).unwrap();
        let today = now.date_naive();
        let mut store = AppData::default();
        start_progress(&mut store, "u-1", now).unwrap();

        assert!(complete_routine(&mut store, "u-1", today, now).unwrap());
        assert!(!complete_routine(&mut store, "u-1", today, now).unwrap());
        let record = store.read("u-1").unwrap().unwrap();
        assert_eq!(record.routines_completed, 1);
    }

    #[test]
    fn start_progress_is_idempotent() {
        let now = Utc.with_ymd_and_hms(2026, 4, 20, 18, 0, 0).unwrap();
        let mut store = AppData::default();
        assert!(start_progress(&mut store, "u-1", now).unwrap());
        assert!(!start_progress(&mut store, "u-1", now + Duration::days(3)).unwrap());
        assert_eq!(store.read("u-1").unwrap().unwrap().started_at, now);
    }

    #[test]
    fn uninitialized_user_is_reported() {
        let now = Utc.with_ymd_and_hms(2026, 4, 20, 18, 0, 0).unwrap();
        let mut store = AppData::default();
        let mut events = Vec::new();
        let err = run_pass(&mut store, &catalog(), &mut events, "nobody", now, now.date_naive())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized(_)));
        let err = complete_routine(&mut store, "nobody", now.date_naive(), now).unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized(_)));
    }

    /// Store that fails every read, to check errors propagate as storage
    /// failures instead of panicking.
    struct Offline;

    impl ProgressStore for Offline {
        fn read(&self, _user_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn write(&mut self, _record: &ProgressRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn read_completion_dates(&self, _user_id: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn record_completion(
            &mut self,
            _user_id: &str,
            _date: NaiveDate,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    impl UnlockStore for Offline {
        fn list_unlocked(&self, _user_id: &str) -> Result<BTreeSet<String>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn insert_unlock(
            &mut self,
            _unlock: &AchievementUnlock,
        ) -> Result<InsertOutcome, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn storage_failure_surfaces_as_error() {
        let now = Utc.with_ymd_and_hms(2026, 4, 20, 18, 0, 0).unwrap();
        let mut events = Vec::new();
        let err = run_pass(&mut Offline, &catalog(), &mut events, "u-1", now, now.date_naive())
            .unwrap_err();
        assert!(matches!(err, EngineError::Storage(StoreError::Unavailable(_))));
    }
}
