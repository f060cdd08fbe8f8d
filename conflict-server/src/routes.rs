use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

const CONFLICTS_PATH: &str = "/conflicts";
const CALENDAR_PATH: &str = "/calendars/:name";
const REFRESH_PATH: &str = "/refresh";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(CONFLICTS_PATH, get(handle_conflicts))
        .route(CALENDAR_PATH, get(handle_calendar))
        .route(REFRESH_PATH, post(handle_refresh))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
        .with_state(state)
}

#[derive(Deserialize)]
struct ConflictQuery {
    date: NaiveDate,
}

async fn handle_conflicts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConflictQuery>,
) -> Response {
    let calendars = state.snapshot().await;
    Json(calendars.conflicts(query.date)).into_response()
}

#[derive(Deserialize)]
struct CalendarQuery {
    #[serde(default)]
    json: bool,
}

async fn handle_calendar(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Response {
    let calendars = state.snapshot().await;

    let Some(index) = calendars.by_name(&name) else {
        return (StatusCode::NOT_FOUND, "Unknown calendar").into_response();
    };

    if query.json {
        return Json(index.as_ref()).into_response();
    }

    (
        [("content-type", "text/calendar")],
        index.to_ics(&name).to_string(),
    )
        .into_response()
}

#[derive(Serialize)]
struct RefreshReport {
    calendar: usize,
    lunchtime: usize,
    built_at: DateTime<Utc>,
}

async fn handle_refresh(State(state): State<Arc<AppState>>) -> Json<RefreshReport> {
    let calendars = state.refresh().await;

    Json(RefreshReport {
        calendar: calendars.calendar.len(),
        lunchtime: calendars.lunchtime.len(),
        built_at: calendars.built_at,
    })
}
