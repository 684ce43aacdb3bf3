use crate::errors::{AppError, StoreError};
use crate::models::{AchievementUnlock, AppData, ProgressRecord, UserData};
use crate::sounds::SoundSettings;
use crate::store::{InsertOutcome, ProgressStore, UnlockStore};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::{env, path::Path, path::PathBuf};
use tokio::fs;
use tracing::error;

pub fn resolve_data_path() -> Result<PathBuf, std::io::Error> {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return Ok(PathBuf::from(path));
    }

    Ok(PathBuf::from("data/state.json"))
}

pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

impl AppData {
    pub fn user(&self, user_id: &str) -> Option<&UserData> {
        self.users.get(user_id)
    }

    pub fn user_mut(&mut self, user_id: &str) -> &mut UserData {
        self.users.entry(user_id.to_string()).or_default()
    }

    pub fn sound_settings(&self, user_id: &str) -> SoundSettings {
        self.user(user_id)
            .map(|user| user.sound)
            .unwrap_or_default()
    }

    pub fn unlocked_at(&self, user_id: &str, achievement_id: &str) -> Option<DateTime<Utc>> {
        self.user(user_id)?.unlocks.get(achievement_id).copied()
    }
}

impl ProgressStore for AppData {
    fn read(&self, user_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self.user(user_id).and_then(|user| user.progress.clone()))
    }

    /// `started_at` is kept from the first write; `current_day` and
    /// `routines_completed` never go backwards.
    fn write(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        let user = self.user_mut(&record.user_id);
        let merged = match user.progress.take() {
            Some(existing) => ProgressRecord {
                user_id: existing.user_id,
                started_at: existing.started_at,
                current_day: existing.current_day.max(record.current_day),
                streak_days: record.streak_days,
                routines_completed: existing.routines_completed.max(record.routines_completed),
                updated_at: record.updated_at,
            },
            None => record.clone(),
        };
        user.progress = Some(merged);
        Ok(())
    }

    fn read_completion_dates(&self, user_id: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
        Ok(self
            .user(user_id)
            .map(|user| user.completions.clone())
            .unwrap_or_default())
    }

    fn record_completion(&mut self, user_id: &str, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.user_mut(user_id).completions.insert(date))
    }

    fn advance_day(
        &mut self,
        user_id: &str,
        day: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let record = self
            .users
            .get_mut(user_id)
            .and_then(|user| user.progress.as_mut());
        let Some(record) = record else {
            return Ok(false);
        };
        if day <= record.current_day {
            return Ok(false);
        }
        record.current_day = day;
        record.updated_at = at;
        Ok(true)
    }
}

impl UnlockStore for AppData {
    fn list_unlocked(&self, user_id: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .user(user_id)
            .map(|user| user.unlocks.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn insert_unlock(&mut self, unlock: &AchievementUnlock) -> Result<InsertOutcome, StoreError> {
        let unlocks = &mut self.user_mut(&unlock.user_id).unlocks;
        if unlocks.contains_key(&unlock.achievement_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        unlocks.insert(unlock.achievement_id.clone(), unlock.unlocked_at);
        Ok(InsertOutcome::Inserted)
    }
}
