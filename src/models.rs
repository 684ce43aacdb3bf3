use crate::analysis::SkinAssessment;
use crate::notify::Feedback;
use crate::sounds::{InteractionSound, SoundSettings};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Length of the guided routine, in days.
pub const PROGRAM_DAYS: u32 = 30;

/// Persisted progress for one user.
///
/// `current_day` is derived from `started_at` but cached here; it never
/// decreases. `started_at` is set once when the record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub current_day: u32,
    pub streak_days: u32,
    pub routines_completed: u32,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(user_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            started_at,
            current_day: 1,
            streak_days: 0,
            routines_completed: 0,
            updated_at: started_at,
        }
    }

    /// Week of the program the current day falls in, starting at 1.
    pub fn week(&self) -> u32 {
        self.current_day.max(1).div_ceil(7)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    DaysCompleted,
    Streak,
    RoutineCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub requirement_type: RequirementType,
    pub requirement_value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub user_id: String,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Everything stored for a single user.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserData {
    pub progress: Option<ProgressRecord>,
    pub completions: BTreeSet<NaiveDate>,
    /// Achievement id to the instant it was first unlocked.
    pub unlocks: BTreeMap<String, DateTime<Utc>>,
    pub sound: SoundSettings,
    pub analysis: Option<SkinAssessment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    pub users: BTreeMap<String, UserData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub record: ProgressRecord,
    pub streak: u32,
    pub week: u32,
    pub advanced: bool,
    pub unlocked: Vec<AchievementDefinition>,
    pub feedback: Vec<Feedback>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub date: String,
    pub already_completed: bool,
    #[serde(flatten)]
    pub progress: ProgressResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub definition: AchievementDefinition,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: String,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub last_7_days: Vec<DailyPoint>,
    pub calendar_week: String,
    pub program_week: u32,
    pub streak: u32,
    pub routines_completed: u32,
    pub completion_percent: f64,
    pub feedback: Vec<Feedback>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AchievementsResponse {
    pub achievements: Vec<AchievementStatus>,
    pub feedback: Vec<Feedback>,
}

/// A user's sound settings together with the cues the client may play.
#[derive(Debug, Serialize)]
pub struct SoundPreferences {
    #[serde(flatten)]
    pub settings: SoundSettings,
    pub sounds: Vec<InteractionSound>,
}

#[derive(Debug, Deserialize)]
pub struct SoundUpdate {
    pub enabled: Option<bool>,
    pub volume: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub model_output: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub assessment: SkinAssessment,
    pub saved: bool,
    pub feedback: Vec<Feedback>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_record_starts_on_day_one() {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let record = ProgressRecord::new("u-1", started);
        assert_eq!(record.current_day, 1);
        assert_eq!(record.streak_days, 0);
        assert_eq!(record.routines_completed, 0);
        assert_eq!(record.updated_at, started);
    }

    #[test]
    fn week_rounds_up() {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut record = ProgressRecord::new("u-1", started);
        assert_eq!(record.week(), 1);
        record.current_day = 7;
        assert_eq!(record.week(), 1);
        record.current_day = 8;
        assert_eq!(record.week(), 2);
        record.current_day = 30;
        assert_eq!(record.week(), 5);
    }

    #[test]
    fn user_data_tolerates_missing_fields() {
        let user: UserData = serde_json::from_str("{}").unwrap();
        assert!(user.progress.is_none());
        assert!(user.completions.is_empty());
        assert!(user.sound.enabled);
    }
}
