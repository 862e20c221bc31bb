// src/handlers/session.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub token: Option<String>,
}

/// Entry point of the assessment flow: exchanges the SSO redirect token for
/// the client-held session blob. Refuses candidates that already submitted.
pub async fn establish_session(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = req.token.unwrap_or_default();
    let blob = state.verifier.establish_session(&token).await?;

    Ok(Json(json!({ "data": blob })))
}
