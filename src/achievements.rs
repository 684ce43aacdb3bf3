//! Achievement catalog and unlock evaluation.
//!
//! Unlocks are one way: once a row exists for a (user, achievement) pair it
//! is never rewritten or removed.

use crate::errors::StoreError;
use crate::models::{AchievementDefinition, AchievementUnlock, ProgressRecord, RequirementType};
use crate::store::{InsertOutcome, UnlockStore};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

pub trait AchievementCatalog {
    /// Definitions in ascending `requirement_value` order.
    fn list_definitions(&self) -> &[AchievementDefinition];
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read achievement catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse achievement catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate achievement id: {0}")]
    DuplicateId(String),

    #[error("achievement {0} has a zero requirement value")]
    ZeroRequirement(String),
}

/// Catalog loaded once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    definitions: Vec<AchievementDefinition>,
}

impl StaticCatalog {
    pub fn new(definitions: Vec<AchievementDefinition>) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        for definition in &definitions {
            if definition.requirement_value == 0 {
                return Err(CatalogError::ZeroRequirement(definition.id.clone()));
            }
            if !seen.insert(definition.id.as_str()) {
                return Err(CatalogError::DuplicateId(definition.id.clone()));
            }
        }
        Ok(Self::sorted(definitions))
    }

    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let bytes = fs::read(path).await?;
        let definitions: Vec<AchievementDefinition> = serde_json::from_slice(&bytes)?;
        Self::new(definitions)
    }

    pub fn builtin() -> Self {
        use RequirementType::{DaysCompleted, RoutineCompleted, Streak};

        let definitions = [
            ("first-routine", "First Routine", "✨", RoutineCompleted, 1),
            ("getting-started", "Getting Started", "🌱", DaysCompleted, 3),
            ("on-a-roll", "On a Roll", "🔥", Streak, 3),
            ("first-week", "First Week", "📅", DaysCompleted, 7),
            ("perfect-week", "Perfect Week", "💎", Streak, 7),
            ("dedicated", "Dedicated", "💪", RoutineCompleted, 10),
            ("two-weeks", "Two Weeks Strong", "⭐", DaysCompleted, 14),
            ("unstoppable", "Unstoppable", "🚀", Streak, 15),
            ("habit-formed", "Habit Formed", "🧠", DaysCompleted, 21),
            ("glow-up", "Glow Up Complete", "🏆", DaysCompleted, 30),
            ("routine-master", "Routine Master", "👑", RoutineCompleted, 30),
        ]
        .into_iter()
        .map(|(id, name, icon, requirement_type, requirement_value)| AchievementDefinition {
            id: id.to_string(),
            name: name.to_string(),
            description: describe(requirement_type, requirement_value),
            icon: icon.to_string(),
            requirement_type,
            requirement_value,
        })
        .collect();

        Self::sorted(definitions)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn sorted(mut definitions: Vec<AchievementDefinition>) -> Self {
        definitions.sort_by_key(|definition| definition.requirement_value);
        Self { definitions }
    }
}

impl AchievementCatalog for StaticCatalog {
    fn list_definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }
}

fn describe(requirement_type: RequirementType, value: u32) -> String {
    match requirement_type {
        RequirementType::DaysCompleted => format!("Reach day {value} of the program"),
        RequirementType::Streak => format!("Complete routines {value} days in a row"),
        RequirementType::RoutineCompleted if value == 1 => {
            "Complete your first daily routine".to_string()
        }
        RequirementType::RoutineCompleted => format!("Complete {value} daily routines"),
    }
}

pub fn is_satisfied(
    definition: &AchievementDefinition,
    record: &ProgressRecord,
    streak: u32,
) -> bool {
    let current = match definition.requirement_type {
        RequirementType::DaysCompleted => record.current_day,
        RequirementType::Streak => streak,
        RequirementType::RoutineCompleted => record.routines_completed,
    };
    current >= definition.requirement_value
}

/// Unlocks every satisfied definition the user does not hold yet and returns
/// the new ones, lowest requirement first.
///
/// A failed insert is logged and skipped; its predicate still holds, so the
/// next pass retries it. Failing to list existing unlocks aborts the pass.
pub fn evaluate_achievements<U>(
    unlocks: &mut U,
    definitions: &[AchievementDefinition],
    record: &ProgressRecord,
    streak: u32,
    now: DateTime<Utc>,
) -> Result<Vec<AchievementDefinition>, StoreError>
where
    U: UnlockStore + ?Sized,
{
    let held = unlocks.list_unlocked(&record.user_id)?;

    let mut pending: Vec<&AchievementDefinition> = definitions
        .iter()
        .filter(|definition| !held.contains(&definition.id))
        .collect();
    pending.sort_by_key(|definition| definition.requirement_value);

    let mut unlocked = Vec::new();
    for definition in pending {
        if !is_satisfied(definition, record, streak) {
            continue;
        }

        let unlock = AchievementUnlock {
            user_id: record.user_id.clone(),
            achievement_id: definition.id.clone(),
            unlocked_at: now,
        };
        match unlocks.insert_unlock(&unlock) {
            Ok(InsertOutcome::Inserted) => {
                info!(
                    user_id = %record.user_id,
                    achievement = %definition.id,
                    "achievement unlocked"
                );
                unlocked.push(definition.clone());
            }
            Ok(InsertOutcome::AlreadyExists) => {
                debug!(
                    user_id = %record.user_id,
                    achievement = %definition.id,
                    "achievement already unlocked"
                );
            }
            Err(err) => {
                warn!(
                    user_id = %record.user_id,
                    achievement = %definition.id,
                    "failed to persist unlock: {err}"
                );
            }
        }
    }

    Ok(unlocked)
}
