//! Event CRUD endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use schoolcal_core::{Event, EventDraft, EventKey, EventPatch};
use tracing::info;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{key}", get(get_event))
        .route("/add-event", post(add_event))
        .route("/update-event/{key}", put(update_event))
        .route("/delete-event/{key}", delete(delete_event))
}

/// GET /events - List all stored events in order
async fn list_events(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.store.events().await)
}

/// GET /events/:key - Fetch one event by index or id
async fn get_event(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Event>, AppError> {
    let event = state.store.get(&EventKey::from(key.as_str())).await?;
    Ok(Json(event))
}

/// POST /add-event - Create a new event
async fn add_event(
    State(state): State<AppState>,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state.store.append(draft).await?;
    info!(id = %event.id, summary = %event.summary, "Event added");

    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /update-event/:key - Overwrite the supplied fields of an event
async fn update_event(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<Event>, AppError> {
    let event = state.store.update(&EventKey::from(key.as_str()), patch).await?;
    info!(id = %event.id, "Event updated");

    Ok(Json(event))
}

/// DELETE /delete-event/:key - Remove an event
async fn delete_event(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Event>, AppError> {
    let event = state.store.remove(&EventKey::from(key.as_str())).await?;
    info!(id = %event.id, "Event deleted");

    Ok(Json(event))
}
