// src/routes.rs

use std::sync::Arc;

use axum::{
    Json, Router,
    http::Method,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{candidate, session},
    state::AppState,
    utils::audit::api_logger,
};

/// Assembles the main application router.
///
/// * Candidate surface under `/api/v1/candidate`.
/// * Submission and retrieval routes carry the audit middleware and a
///   per-IP rate limit; the read-only catalog and session routes do not.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://localhost:5173".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(5)
        .finish()
        .unwrap();
    let governor_conf = Arc::new(governor_conf);

    let candidate_routes = Router::new()
        .route("/questions", get(candidate::get_questions))
        .route("/session", post(session::establish_session))
        .merge(
            Router::new()
                .route("/submit-responses", post(candidate::submit_responses))
                .route("/responses/fetch", post(candidate::fetch_responses))
                .layer(middleware::from_fn_with_state(state.clone(), api_logger))
                .layer(GovernorLayer::new(governor_conf)),
        );

    Router::new()
        .nest("/api/v1/candidate", candidate_routes)
        .route("/test-api", get(test_api))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Liveness probe.
async fn test_api() -> impl IntoResponse {
    Json(json!({ "message": "Server is working!" }))
}
