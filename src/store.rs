//! Storage seams the progress engine reads and writes through.

use crate::errors::StoreError;
use crate::models::{AchievementUnlock, ProgressRecord};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;

/// Result of inserting an unlock row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The (user, achievement) pair already exists. Not an error.
    AlreadyExists,
}

pub trait ProgressStore {
    fn read(&self, user_id: &str) -> Result<Option<ProgressRecord>, StoreError>;

    fn write(&mut self, record: &ProgressRecord) -> Result<(), StoreError>;

    /// Distinct calendar days with at least one completed routine.
    fn read_completion_dates(&self, user_id: &str) -> Result<BTreeSet<NaiveDate>, StoreError>;

    /// Returns `true` when `date` was not recorded before.
    fn record_completion(&mut self, user_id: &str, date: NaiveDate) -> Result<bool, StoreError>;

    /// Sets `current_day` only if `day` is greater than the stored value.
    /// Returns whether a write happened.
    fn advance_day(
        &mut self,
        user_id: &str,
        day: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(mut record) = self.read(user_id)? else {
            return Ok(false);
        };
        if day <= record.current_day {
            return Ok(false);
        }
        record.current_day = day;
        record.updated_at = at;
        self.write(&record)?;
        Ok(true)
    }
}

pub trait UnlockStore {
    fn list_unlocked(&self, user_id: &str) -> Result<BTreeSet<String>, StoreError>;

    /// Inserts under a (user, achievement) uniqueness constraint. An existing
    /// row is left untouched, including its `unlocked_at`.
    fn insert_unlock(&mut self, unlock: &AchievementUnlock) -> Result<InsertOutcome, StoreError>;
}
