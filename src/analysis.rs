//! Skin assessment decoding and scoring.
//!
//! The vision model's reply is decoded strictly: anything that does not match
//! the expected document is a [`ParseError`], and the caller falls back to a
//! predefined assessment instead of guessing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Concerns kept per assessment, most prominent first.
const MAX_CONCERNS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    Oily,
    Dry,
    Combination,
    Normal,
    Sensitive,
}

impl SkinType {
    fn parse(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "oily" | "oleosa" => Some(Self::Oily),
            "dry" | "seca" => Some(Self::Dry),
            "combination" | "mista" => Some(Self::Combination),
            "normal" => Some(Self::Normal),
            "sensitive" | "sensível" | "sensivel" => Some(Self::Sensitive),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Oily => "Oily",
            Self::Dry => "Dry",
            Self::Combination => "Combination",
            Self::Normal => "Normal",
            Self::Sensitive => "Sensitive",
        }
    }

    pub fn water_recommendation(self) -> &'static str {
        match self {
            Self::Oily => "2-2.5 liters per day (helps control oiliness)",
            Self::Dry => "2.5-3 liters per day (hydration is essential)",
            Self::Combination => "2-2.5 liters per day (balances the zones)",
            Self::Normal => "2 liters per day (maintenance)",
            Self::Sensitive => "2.5 liters per day (helps calm the skin)",
        }
    }

    /// Concerns typical for the skin type, used when the model names none.
    pub fn default_concerns(self) -> &'static [Concern] {
        match self {
            Self::Oily => &[
                Concern::Acne,
                Concern::EnlargedPores,
                Concern::Hyperpigmentation,
            ],
            Self::Dry => &[Concern::Dryness, Concern::Wrinkles, Concern::Redness],
            Self::Combination => &[
                Concern::EnlargedPores,
                Concern::TZoneOiliness,
                Concern::Dryness,
            ],
            Self::Normal => &[],
            Self::Sensitive => &[Concern::Redness, Concern::Dryness],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concern {
    Acne,
    EnlargedPores,
    Hyperpigmentation,
    Dryness,
    Wrinkles,
    Redness,
    DarkCircles,
    TZoneOiliness,
    Dehydration,
}

impl Concern {
    fn parse(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "acne" => Some(Self::Acne),
            "enlarged pores" | "poros dilatados" => Some(Self::EnlargedPores),
            "hyperpigmentation" | "dark spots" | "manchas e hiperpigmentação" | "manchas" => {
                Some(Self::Hyperpigmentation)
            }
            "dryness" | "ressecamento" => Some(Self::Dryness),
            "wrinkles" | "fine lines" | "rugas e linhas de expressão" | "rugas" => {
                Some(Self::Wrinkles)
            }
            "redness" | "sensitivity and redness" | "sensibilidade e vermelhidão" => {
                Some(Self::Redness)
            }
            "dark circles" | "olheiras" => Some(Self::DarkCircles),
            "t-zone oiliness" | "oleosidade na zona t" => Some(Self::TZoneOiliness),
            "dehydration" | "desidratação" | "leve desidratação" => Some(Self::Dehydration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    #[default]
    Moderate,
    Severe,
}

impl Severity {
    fn parse(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "mild" | "leve" => Some(Self::Mild),
            "moderate" | "moderada" | "moderado" => Some(Self::Moderate),
            "severe" | "severa" | "severo" => Some(Self::Severe),
            _ => None,
        }
    }

    pub fn penalty(self) -> f64 {
        match self {
            Self::Mild => 0.5,
            Self::Moderate => 1.0,
            Self::Severe => 1.5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("model output is empty")]
    Empty,

    #[error("model output is not a valid assessment document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown skin type: {0}")]
    UnknownSkinType(String),

    #[error("unknown concern: {0}")]
    UnknownConcern(String),

    #[error("unknown severity {value:?} for concern {concern:?}")]
    UnknownSeverity { concern: String, value: String },

    #[error("severity given for {0:?}, which is not a listed concern")]
    UnknownSeverityKey(String),

    #[error("confidence {0} is outside 0..=100")]
    ConfidenceOutOfRange(f64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawAssessment {
    skin_type: String,
    concerns: Vec<String>,
    #[serde(default)]
    severity: BTreeMap<String, String>,
    confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcernFinding {
    pub concern: Concern,
    pub severity: Severity,
}

/// Validated content of a model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAssessment {
    pub skin_type: SkinType,
    pub findings: Vec<ConcernFinding>,
    pub confidence: Option<u8>,
}

/// What gets stored and shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinAssessment {
    pub skin_type: SkinType,
    pub findings: Vec<ConcernFinding>,
    pub score: f64,
    pub confidence: Option<u8>,
    pub water: String,
    pub sleep: String,
    /// Set when the model reply was rejected and the default assessment
    /// was used instead.
    pub fallback: bool,
    pub assessed_at: DateTime<Utc>,
}

pub fn decode_model_output(text: &str) -> Result<ModelAssessment, ParseError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(ParseError::Empty);
    }

    let raw: RawAssessment = serde_json::from_str(body)?;

    let skin_type = SkinType::parse(&raw.skin_type)
        .ok_or_else(|| ParseError::UnknownSkinType(raw.skin_type.clone()))?;

    if !(0.0..=100.0).contains(&raw.confidence) {
        return Err(ParseError::ConfidenceOutOfRange(raw.confidence));
    }

    let mut concerns: Vec<Concern> = Vec::new();
    for label in &raw.concerns {
        let concern =
            Concern::parse(label).ok_or_else(|| ParseError::UnknownConcern(label.clone()))?;
        if !concerns.contains(&concern) {
            concerns.push(concern);
        }
    }

    let mut severities: BTreeMap<Concern, Severity> = BTreeMap::new();
    for (key, value) in &raw.severity {
        let concern = Concern::parse(key)
            .filter(|concern| concerns.contains(concern))
            .ok_or_else(|| ParseError::UnknownSeverityKey(key.clone()))?;
        let severity = Severity::parse(value).ok_or_else(|| ParseError::UnknownSeverity {
            concern: key.clone(),
            value: value.clone(),
        })?;
        severities.insert(concern, severity);
    }

    let mut findings: Vec<ConcernFinding> = concerns
        .into_iter()
        .map(|concern| ConcernFinding {
            concern,
            severity: severities.get(&concern).copied().unwrap_or_default(),
        })
        .collect();
    findings.truncate(MAX_CONCERNS);

    Ok(ModelAssessment {
        skin_type,
        findings,
        confidence: Some(raw.confidence.round() as u8),
    })
}

/// Used whenever the model reply cannot be decoded.
pub fn fallback_assessment() -> ModelAssessment {
    ModelAssessment {
        skin_type: SkinType::Combination,
        findings: vec![
            ConcernFinding {
                concern: Concern::EnlargedPores,
                severity: Severity::Moderate,
            },
            ConcernFinding {
                concern: Concern::TZoneOiliness,
                severity: Severity::Moderate,
            },
            ConcernFinding {
                concern: Concern::Dehydration,
                severity: Severity::Mild,
            },
        ],
        confidence: None,
    }
}

/// Ten minus a penalty per concern, clamped to 1..=10, one decimal.
pub fn skin_score(findings: &[ConcernFinding]) -> f64 {
    let penalty: f64 = findings.iter().map(|finding| finding.severity.penalty()).sum();
    let score = ((10.0 - penalty) * 10.0).round() / 10.0;
    score.clamp(1.0, 10.0)
}

pub fn sleep_recommendation(findings: &[ConcernFinding]) -> &'static str {
    let needs_more = findings
        .iter()
        .any(|finding| matches!(finding.concern, Concern::Wrinkles | Concern::DarkCircles));
    if needs_more {
        "8-9 hours per night (essential for cell renewal)"
    } else {
        "7-8 hours per night (before 11pm for better recovery)"
    }
}

/// Decodes `model_output`, falling back to the default assessment when the
/// reply is rejected.
pub fn assess(model_output: &str, now: DateTime<Utc>) -> SkinAssessment {
    let (mut model, fallback) = match decode_model_output(model_output) {
        Ok(model) => (model, false),
        Err(err) => {
            warn!("rejected model output, using fallback assessment: {err}");
            (fallback_assessment(), true)
        }
    };

    if model.findings.is_empty() {
        model.findings = model
            .skin_type
            .default_concerns()
            .iter()
            .take(MAX_CONCERNS)
            .map(|&concern| ConcernFinding {
                concern,
                severity: Severity::default(),
            })
            .collect();
    }

    SkinAssessment {
        skin_type: model.skin_type,
        score: skin_score(&model.findings),
        water: model.skin_type.water_recommendation().to_string(),
        sleep: sleep_recommendation(&model.findings).to_string(),
        findings: model.findings,
        confidence: model.confidence,
        fallback,
        assessed_at: now,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}
