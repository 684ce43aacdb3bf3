use crate::achievements::AchievementCatalog;
use crate::analysis::{SkinAssessment, assess};
use crate::engine::{self, PassOutcome};
use crate::errors::{AppError, EngineError};
use crate::models::{
    AchievementStatus, AchievementsResponse, AnalysisRequest, AnalysisResponse, AppData,
    CompletionResponse, PROGRAM_DAYS, ProgressResponse, SoundPreferences, SoundUpdate,
    StatsResponse,
};
use crate::notify::{Feedback, FeedbackKind, FeedbackSink};
use crate::session::Session;
use crate::sounds::{SoundCategory, SoundSettings};
use crate::state::AppState;
use crate::stats::build_stats_at;
use crate::store::ProgressStore;
use axum::{extract::State, Json};
use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::info;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn start_progress(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ProgressResponse>, AppError> {
    let user_id = session.user_id()?;
    let (now, today) = clock();
    let mut data = state.data.lock().await;

    let created = engine::start_progress(&mut *data, user_id, now)?;
    if created {
        info!(user_id, "progress started");
    }

    let (outcome, sink) = evaluate(&state, &mut data, user_id, now, today)?;
    state.save(&data, created || outcome.changed).await?;

    Ok(Json(to_response(outcome, sink.into_feedback())))
}

pub async fn get_progress(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ProgressResponse>, AppError> {
    let user_id = session.user_id()?;
    let (now, today) = clock();
    let mut data = state.data.lock().await;

    let (outcome, sink) = evaluate(&state, &mut data, user_id, now, today)?;
    state.save(&data, outcome.changed).await?;

    Ok(Json(to_response(outcome, sink.into_feedback())))
}

pub async fn complete_routine(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CompletionResponse>, AppError> {
    let user_id = session.user_id()?;
    let (now, today) = clock();
    let mut data = state.data.lock().await;

    let counted = engine::complete_routine(&mut *data, user_id, today, now)?;
    let (outcome, mut sink) = evaluate(&state, &mut data, user_id, now, today)?;
    if counted {
        info!(user_id, date = %today, "routine completed");
        sink.push(
            FeedbackKind::Success,
            format!("Day {} of {PROGRAM_DAYS} completed", outcome.record.current_day),
            "Routine done. See you tomorrow!",
            SoundCategory::Completion,
        );
    }
    state.save(&data, counted || outcome.changed).await?;

    Ok(Json(CompletionResponse {
        date: today.to_string(),
        already_completed: !counted,
        progress: to_response(outcome, sink.into_feedback()),
    }))
}

pub async fn get_achievements(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<AchievementsResponse>, AppError> {
    let user_id = session.user_id()?;
    let (now, today) = clock();
    let mut data = state.data.lock().await;

    let (outcome, sink) = evaluate(&state, &mut data, user_id, now, today)?;
    state.save(&data, outcome.changed).await?;

    let achievements = state
        .catalog
        .list_definitions()
        .iter()
        .map(|definition| {
            let unlocked_at = data.unlocked_at(user_id, &definition.id);
            AchievementStatus {
                definition: definition.clone(),
                unlocked: unlocked_at.is_some(),
                unlocked_at,
            }
        })
        .collect();

    Ok(Json(AchievementsResponse {
        achievements,
        feedback: sink.into_feedback(),
    }))
}

pub async fn get_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<StatsResponse>, AppError> {
    let user_id = session.user_id()?;
    let (now, today) = clock();
    let mut data = state.data.lock().await;

    let (outcome, sink) = evaluate(&state, &mut data, user_id, now, today)?;
    state.save(&data, outcome.changed).await?;

    let completions = data.read_completion_dates(user_id)?;
    let mut stats = build_stats_at(today, &outcome.record, &completions);
    stats.feedback = sink.into_feedback();
    Ok(Json(stats))
}

pub async fn submit_analysis(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let assessment = assess(&payload.model_output, Utc::now());

    let (settings, saved) = match &session {
        Session::Authenticated { user_id, .. } => {
            let mut data = state.data.lock().await;
            data.user_mut(user_id).analysis = Some(assessment.clone());
            state.save(&data, true).await?;
            info!(%user_id, fallback = assessment.fallback, "skin assessment saved");
            (data.sound_settings(user_id), true)
        }
        Session::Anonymous => (SoundSettings::default(), false),
    };

    let mut sink = FeedbackSink::new(&state.sounds, settings);
    if assessment.fallback {
        sink.push(
            FeedbackKind::Info,
            "Analysis unavailable",
            "Showing a default assessment. Try again later.",
            SoundCategory::Notification,
        );
    } else {
        sink.push(
            FeedbackKind::Success,
            "Analysis complete!",
            format!("Skin type: {}", assessment.skin_type.label()),
            SoundCategory::Analysis,
        );
    }

    Ok(Json(AnalysisResponse {
        assessment,
        saved,
        feedback: sink.into_feedback(),
    }))
}

pub async fn get_analysis(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SkinAssessment>, AppError> {
    let user_id = session.user_id()?;
    let data = state.data.lock().await;
    data.user(user_id)
        .and_then(|user| user.analysis.clone())
        .map(Json)
        .ok_or_else(|| AppError::not_found("no skin assessment yet"))
}

pub async fn get_sound(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SoundPreferences>, AppError> {
    let user_id = session.user_id()?;
    let data = state.data.lock().await;
    Ok(Json(SoundPreferences {
        settings: data.sound_settings(user_id),
        sounds: state.sounds.sounds().to_vec(),
    }))
}

pub async fn update_sound(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<SoundUpdate>,
) -> Result<Json<SoundSettings>, AppError> {
    let user_id = session.user_id()?;
    if payload.volume.is_some_and(|volume| !volume.is_finite()) {
        return Err(AppError::bad_request("volume must be a finite number"));
    }

    let mut data = state.data.lock().await;
    let settings = {
        let sound = &mut data.user_mut(user_id).sound;
        if let Some(enabled) = payload.enabled {
            sound.enabled = enabled;
        }
        if let Some(volume) = payload.volume {
            sound.set_volume(volume);
        }
        *sound
    };

    state.save(&data, true).await?;
    Ok(Json(settings))
}

pub async fn toggle_sound(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SoundSettings>, AppError> {
    let user_id = session.user_id()?;
    let mut data = state.data.lock().await;
    let settings = {
        let sound = &mut data.user_mut(user_id).sound;
        sound.toggle();
        *sound
    };

    state.save(&data, true).await?;
    Ok(Json(settings))
}

fn evaluate<'a>(
    state: &'a AppState,
    data: &mut AppData,
    user_id: &str,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Result<(PassOutcome, FeedbackSink<'a>), EngineError> {
    let mut sink = FeedbackSink::new(&state.sounds, data.sound_settings(user_id));
    let outcome = engine::run_pass(data, state.catalog.as_ref(), &mut sink, user_id, now, today)?;
    Ok((outcome, sink))
}

fn to_response(outcome: PassOutcome, feedback: Vec<Feedback>) -> ProgressResponse {
    ProgressResponse {
        week: outcome.record.week(),
        record: outcome.record,
        streak: outcome.streak,
        advanced: outcome.advanced,
        unlocked: outcome.unlocked,
        feedback,
    }
}

fn clock() -> (DateTime<Utc>, NaiveDate) {
    let now = Local::now();
    (now.with_timezone(&Utc), now.date_naive())
}
