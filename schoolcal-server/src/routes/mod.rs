pub mod events;
pub mod feed;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use schoolcal_core::StoreError;
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Build the full application: API routes, landing page, static assets.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let index = ServeFile::new(&state.index_file);
    let assets = ServeDir::new(&state.public_dir);

    Router::new()
        .merge(events::router())
        .merge(feed::router())
        .route_service("/", index)
        .fallback_service(assets)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert anyhow errors to HTTP responses
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<StoreError>() {
            Some(StoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, Response, StatusCode, header},
    };
    use schoolcal_core::{EventStore, FeedProjector, Tz};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    use super::app;
    use crate::state::AppState;

    pub struct TestApp {
        pub router: Router,
        pub state: AppState,
        pub temp_dir: TempDir,
    }

    impl TestApp {
        pub fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            Self::in_dir(temp_dir)
        }

        /// Build an app over an existing directory, e.g. to simulate a restart
        pub fn in_dir(temp_dir: TempDir) -> Self {
            let store = EventStore::load(
                temp_dir.path().join("events.json"),
                Tz::Europe__Berlin,
            )
            .unwrap();

            let state = AppState {
                store: Arc::new(store),
                feed: Arc::new(FeedProjector::new("My School Stuff", "Europe/Berlin")),
                index_file: temp_dir.path().join("index.html"),
                public_dir: temp_dir.path().join("public"),
            };

            TestApp {
                router: app(state.clone()),
                state,
                temp_dir,
            }
        }

        pub async fn request(
            &self,
            method: &str,
            uri: &str,
            json: Option<serde_json::Value>,
        ) -> Response<Body> {
            let builder = Request::builder().method(method).uri(uri);
            let request = match json {
                Some(value) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(value.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            self.router.clone().oneshot(request).await.unwrap()
        }

        pub async fn events(&self) -> serde_json::Value {
            let response = self.request("GET", "/events", None).await;
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await
        }
    }

    pub async fn body_text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{TestApp, body_json, body_text};
    use super::*;

    #[tokio::test]
    async fn test_validation_error_maps_to_400() {
        let response = AppError::from(StoreError::Validation("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "bad");
    }

    #[tokio::test]
    async fn test_not_found_maps_to_404() {
        let response = AppError::from(StoreError::NotFound("#3".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_other_errors_map_to_500() {
        let io = std::io::Error::other("disk full");
        let response = AppError::from(StoreError::Io(io)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::from(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_landing_page_is_served() {
        let app = TestApp::new();
        std::fs::write(app.temp_dir.path().join("index.html"), "<h1>schoolcal</h1>").unwrap();

        let response = app.request("GET", "/", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>schoolcal</h1>");
    }

    #[tokio::test]
    async fn test_static_assets_are_served_from_public_dir() {
        let app = TestApp::new();
        let public = app.temp_dir.path().join("public");
        std::fs::create_dir_all(&public).unwrap();
        std::fs::write(public.join("app.js"), "console.log(1);").unwrap();

        let response = app.request("GET", "/app.js", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "console.log(1);");

        let missing = app.request("GET", "/nope.css", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
