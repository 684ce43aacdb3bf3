use crate::models::{AchievementDefinition, PROGRAM_DAYS};
use crate::sounds::{SoundCategory, SoundCue, SoundService, SoundSettings};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    DayAdvanced {
        user_id: String,
        day: u32,
    },
    AchievementUnlocked {
        user_id: String,
        achievement: AchievementDefinition,
    },
}

/// Receives engine events. Delivery is fire-and-forget.
pub trait NotificationSink {
    fn notify(&mut self, event: ProgressEvent);
}

impl NotificationSink for Vec<ProgressEvent> {
    fn notify(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Info,
    Success,
}

/// A user-facing message returned alongside API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub title: String,
    pub description: String,
    pub sound: Option<SoundCue>,
}

/// Turns engine events into client feedback, attaching sound cues when the
/// user has sounds enabled.
pub struct FeedbackSink<'a> {
    sounds: &'a SoundService,
    settings: SoundSettings,
    items: Vec<Feedback>,
}

impl<'a> FeedbackSink<'a> {
    pub fn new(sounds: &'a SoundService, settings: SoundSettings) -> Self {
        Self {
            sounds,
            settings,
            items: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        kind: FeedbackKind,
        title: impl Into<String>,
        description: impl Into<String>,
        category: SoundCategory,
    ) {
        self.items.push(Feedback {
            kind,
            title: title.into(),
            description: description.into(),
            sound: self.sounds.cue(&self.settings, category),
        });
    }

    pub fn into_feedback(self) -> Vec<Feedback> {
        self.items
    }
}

impl NotificationSink for FeedbackSink<'_> {
    fn notify(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::DayAdvanced { user_id, day } => {
                info!(%user_id, day, "notifying day advance");
                self.push(
                    FeedbackKind::Info,
                    format!("Day {day} of {PROGRAM_DAYS}"),
                    "Keep going! You're making great progress.",
                    SoundCategory::Progress,
                );
            }
            ProgressEvent::AchievementUnlocked {
                user_id,
                achievement,
            } => {
                info!(%user_id, achievement = %achievement.id, "notifying unlock");
                self.push(
                    FeedbackKind::Success,
                    "Achievement unlocked!",
                    format!(
                        "{} {} - {}",
                        achievement.icon, achievement.name, achievement.description
                    ),
                    SoundCategory::Achievement,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequirementType;

    #[test]
    fn events_become_feedback_with_sounds() {
        let sounds = SoundService::builtin();
        let mut sink = FeedbackSink::new(&sounds, SoundSettings::default());
        sink.notify(ProgressEvent::DayAdvanced {
            user_id: "u-1".to_string(),
            day: 4,
        });
        sink.notify(ProgressEvent::AchievementUnlocked {
            user_id: "u-1".to_string(),
            achievement: AchievementDefinition {
                id: "first-week".to_string(),
                name: "First Week".to_string(),
                description: "Reach day 7".to_string(),
                icon: "📅".to_string(),
                requirement_type: RequirementType::DaysCompleted,
                requirement_value: 7,
            },
        });

        let feedback = sink.into_feedback();
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[0].title, "Day 4 of 30");
        assert_eq!(
            feedback[0].sound.as_ref().map(|cue| cue.category),
            Some(SoundCategory::Progress)
        );
        assert_eq!(feedback[1].kind, FeedbackKind::Success);
        assert!(feedback[1].description.contains("First Week"));
    }

    #[test]
    fn muted_users_get_silent_feedback() {
        let sounds = SoundService::builtin();
        let settings = SoundSettings {
            enabled: false,
            volume: 1.0,
        };
        let mut sink = FeedbackSink::new(&sounds, settings);
        sink.notify(ProgressEvent::DayAdvanced {
            user_id: "u-1".to_string(),
            day: 2,
        });
        assert!(sink.into_feedback()[0].sound.is_none());
    }
}
