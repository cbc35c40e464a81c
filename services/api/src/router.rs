//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the voice session endpoints and OpenAPI documentation.

use crate::{
    models::ErrorResponse,
    state::AppState,
    ws::session::{self, COURSE_SESSION_PATH, INTERVIEW_SESSION_PATH},
};

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        session::course_voice_session,
        session::interview_voice_session,
    ),
    components(
        schemas(ErrorResponse)
    ),
    tags(
        (name = "Voice Sessions", description = "WebSocket voice sessions relayed to a live conversational model")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(COURSE_SESSION_PATH, get(session::course_voice_session))
        .route(INTERVIEW_SESSION_PATH, get(session::interview_voice_session))
        .with_state(app_state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
        .layer(cors)
}
