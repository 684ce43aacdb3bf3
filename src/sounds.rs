//! Interaction sound cues.
//!
//! The server never plays audio. It tells the client which cue to play and
//! at what volume, honouring each user's persisted preference.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCategory {
    Achievement,
    Progress,
    Notification,
    Button,
    Analysis,
    Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionSound {
    pub category: SoundCategory,
    pub name: String,
    pub url: String,
    /// Default playback volume for this category, 0.0 to 1.0.
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundSettings {
    pub enabled: bool,
    /// Master volume applied on top of each category's volume.
    pub volume: f32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 1.0,
        }
    }
}

impl SoundSettings {
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundCue {
    pub category: SoundCategory,
    pub url: String,
    pub volume: f32,
}

#[derive(Debug, Clone)]
pub struct SoundService {
    sounds: Vec<InteractionSound>,
}

impl SoundService {
    pub fn new(sounds: Vec<InteractionSound>) -> Self {
        Self { sounds }
    }

    pub fn builtin() -> Self {
        let sounds = [
            (SoundCategory::Achievement, "Achievement unlocked", "2018/2018-preview.mp3", 0.6),
            (SoundCategory::Progress, "Progress updated", "2000/2000-preview.mp3", 0.5),
            (SoundCategory::Notification, "Success notification", "2869/2869-preview.mp3", 0.4),
            (SoundCategory::Button, "Button click", "2568/2568-preview.mp3", 0.3),
            (SoundCategory::Analysis, "Analysis complete", "2013/2013-preview.mp3", 0.5),
            (SoundCategory::Completion, "Day completed", "1435/1435-preview.mp3", 0.6),
        ]
        .into_iter()
        .map(|(category, name, file, volume)| InteractionSound {
            category,
            name: name.to_string(),
            url: format!("https://assets.mixkit.co/active_storage/sfx/{file}"),
            volume,
        })
        .collect();

        Self::new(sounds)
    }

    pub fn sounds(&self) -> &[InteractionSound] {
        &self.sounds
    }

    /// Cue to play for `category`, or `None` when sounds are off or the
    /// category has no sound configured.
    pub fn cue(&self, settings: &SoundSettings, category: SoundCategory) -> Option<SoundCue> {
        if !settings.enabled {
            return None;
        }
        let sound = self.sounds.iter().find(|sound| sound.category == category)?;
        Some(SoundCue {
            category,
            url: sound.url.clone(),
            volume: clamp_volume(sound.volume * settings.volume),
        })
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_builtin_sound() {
        let service = SoundService::builtin();
        let settings = SoundSettings::default();
        for category in [
            SoundCategory::Achievement,
            SoundCategory::Progress,
            SoundCategory::Notification,
            SoundCategory::Button,
            SoundCategory::Analysis,
            SoundCategory::Completion,
        ] {
            assert!(service.cue(&settings, category).is_some(), "{category:?}");
        }
    }

    #[test]
    fn disabled_settings_produce_no_cue() {
        let service = SoundService::builtin();
        let mut settings = SoundSettings::default();
        assert!(!settings.toggle());
        assert!(service.cue(&settings, SoundCategory::Achievement).is_none());
        assert!(settings.toggle());
        assert!(service.cue(&settings, SoundCategory::Achievement).is_some());
    }

    #[test]
    fn volume_is_scaled_and_clamped() {
        let service = SoundService::builtin();
        let mut settings = SoundSettings::default();
        settings.set_volume(0.5);
        let cue = service.cue(&settings, SoundCategory::Progress).unwrap();
        assert!((cue.volume - 0.25).abs() < f32::EPSILON);

        settings.set_volume(7.0);
        assert_eq!(settings.volume, 1.0);
        settings.set_volume(-1.0);
        assert_eq!(settings.volume, 0.0);
        settings.set_volume(f32::NAN);
        assert_eq!(settings.volume, 0.0);
    }
}
