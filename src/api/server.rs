//! HTTP server implementation for the API

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers;
use super::models::{ErrorResponse, ExtractPromptsRequest};
use crate::error::ServiceError;
use crate::extraction::SceneExtractor;
use crate::script::{ScriptRequest, ScriptRequestor};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub requestor: Arc<ScriptRequestor>,
    pub extractor: Arc<SceneExtractor>,
}

impl AppState {
    /// State whose extractor matches the requestor's prompt template
    pub fn new(requestor: ScriptRequestor) -> Self {
        let extractor = requestor.template().extractor();
        Self {
            requestor: Arc::new(requestor),
            extractor: Arc::new(extractor),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::EmptyGeneration | ServiceError::MalformedOutput(_) => StatusCode::BAD_GATEWAY,
            ServiceError::NoPromptsFound => StatusCode::NOT_FOUND,
            ServiceError::ExtractionInternal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidRequest(rejection.body_text())
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    // Configure CORS to allow browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/generate-script", post(generate_script_handler))
        .route("/extract-scene-prompts", post(extract_scene_prompts_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("🌐 API server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(handlers::health_check(&state.requestor))
}

/// Script generation handler
async fn generate_script_handler(
    State(state): State<AppState>,
    payload: Result<Json<ScriptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(request) = payload?;
    let response = handlers::generate_script(&state.requestor, &request).await?;
    Ok(Json(response))
}

/// Scene prompt extraction handler
async fn extract_scene_prompts_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExtractPromptsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(request) = payload?;
    let response = handlers::extract_scene_prompts(state.extractor.clone(), request.text).await?;
    Ok(Json(response))
}
