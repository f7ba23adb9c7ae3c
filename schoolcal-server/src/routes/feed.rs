//! Calendar feed endpoint

use axum::{Router, extract::State, http::header, response::IntoResponse, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/calendar.ics", get(calendar_ics))
}

/// GET /calendar.ics - Download all events as one iCalendar document
async fn calendar_ics(State(state): State<AppState>) -> impl IntoResponse {
    let events = state.store.events().await;
    let body = state.feed.render(&events);

    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"calendar.ics\"",
            ),
        ],
        body,
    )
}
