//! Read-only calendar endpoints

use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use notiflow_core::{CalendarDocument, Component, NotiflowResult};

use crate::routes::AppError;
use crate::state::AppState;

const DEFAULT_OCCURRENCE_LIMIT: u16 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/calendar", get(calendar_ics))
        .route("/api/components", get(list_components))
        .route("/api/health", get(health))
}

/// GET /api/calendar - The persisted calendar as an .ics file
async fn calendar_ics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ics = state
        .run_exclusive(|config, ctx| {
            CalendarDocument::load(&config.calendar_path(), config.metadata(), ctx.tz).to_ics()
        })
        .await?;

    Ok(([(header::CONTENT_TYPE, "text/calendar; charset=utf-8")], ics))
}

#[derive(Deserialize)]
pub struct ComponentsQuery {
    /// How many occurrences of each recurring event to expand
    pub limit: Option<u16>,
}

/// A stored component with its upcoming start times
#[derive(Serialize)]
pub struct ComponentView {
    pub component: Component,
    pub occurrences: Vec<DateTime<Tz>>,
}

/// GET /api/components - Everything in the calendar, recurring events expanded
async fn list_components(
    State(state): State<AppState>,
    Query(query): Query<ComponentsQuery>,
) -> Result<Json<Vec<ComponentView>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_OCCURRENCE_LIMIT);

    let views: Vec<ComponentView> = state
        .run_exclusive(move |config, ctx| {
            let document = CalendarDocument::load(&config.calendar_path(), config.metadata(), ctx.tz);
            document
                .components()
                .iter()
                .map(|component| -> NotiflowResult<ComponentView> {
                    Ok(ComponentView {
                        component: component.clone(),
                        occurrences: component.occurrences(limit)?,
                    })
                })
                .collect()
        })
        .await?;

    Ok(Json(views))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /api/health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
