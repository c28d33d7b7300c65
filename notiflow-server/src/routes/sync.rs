//! Endpoints that feed records into the calendar

use axum::{Json, Router, extract::State, routing::post};

use notiflow_core::records::{CourseMeetingRecord, OneOrMany, RawRecord, TimedEventRecord};
use notiflow_core::sources::announcements::{AnnouncementSource, AnnouncementsByCourse};
use notiflow_core::sources::assignments::CourseMap;
use notiflow_core::sync::{SyncOutcome, sync_source_with};

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events", post(sync_events))
        .route("/api/course-meetings", post(sync_course_meeting))
        .route("/api/assignments", post(sync_assignments))
        .route("/api/announcements", post(sync_announcements))
}

/// POST /api/events - Final exams, midterms and other timed events
async fn sync_events(
    State(state): State<AppState>,
    Json(records): Json<OneOrMany<TimedEventRecord>>,
) -> Result<Json<SyncOutcome>, AppError> {
    let records: Vec<RawRecord> = records.into_vec().into_iter().map(RawRecord::from).collect();

    let outcome = state
        .run_exclusive(move |config, ctx| sync_source_with(config, ctx, &records))
        .await?;

    Ok(Json(outcome))
}

/// POST /api/course-meetings - One weekly class meeting from the extension
async fn sync_course_meeting(
    State(state): State<AppState>,
    Json(record): Json<CourseMeetingRecord>,
) -> Result<Json<SyncOutcome>, AppError> {
    let records = vec![RawRecord::from(record)];

    let outcome = state
        .run_exclusive(move |config, ctx| sync_source_with(config, ctx, &records))
        .await?;

    Ok(Json(outcome))
}

/// POST /api/assignments - Assignments grouped by course
async fn sync_assignments(
    State(state): State<AppState>,
    Json(courses): Json<CourseMap>,
) -> Result<Json<SyncOutcome>, AppError> {
    let outcome = state
        .run_exclusive(move |config, ctx| sync_source_with(config, ctx, &courses))
        .await?;

    Ok(Json(outcome))
}

/// POST /api/announcements - Announcements grouped by course; midterm dates
/// are extracted from them
async fn sync_announcements(
    State(state): State<AppState>,
    Json(by_course): Json<AnnouncementsByCourse>,
) -> Result<Json<SyncOutcome>, AppError> {
    let build_extractor = state.extractor_builder();

    let outcome = state
        .run_exclusive(move |config, ctx| {
            let extractor = build_extractor(config)?;
            let source = AnnouncementSource {
                by_course: &by_course,
                extractor: extractor.as_ref(),
                tz: ctx.tz,
            };
            sync_source_with(config, ctx, &source)
        })
        .await?;

    Ok(Json(outcome))
}
