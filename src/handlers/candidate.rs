// src/handlers/candidate.rs

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    catalog,
    error::AppError,
    models::response::{EncryptedBody, FetchResponsesRequest},
    state::AppState,
    utils::net::client_ip,
};

/// Serves the full section/question/option catalog, encrypted for transit.
///
/// The catalog is not secret; encryption here is a transport-consistency
/// choice, not a security boundary.
pub async fn get_questions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = state.store.catalog_rows().await.map_err(|e| {
        tracing::error!("Failed to fetch catalog rows: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let sections = catalog::assemble(&rows);

    let encrypted = state
        .payload_cipher
        .encrypt_value(&sections)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(json!({ "data": encrypted })))
}

/// Accepts one encrypted bulk submission for a candidate.
///
/// All validation and the at-most-once guarantee live in the
/// `SubmissionValidator`; this handler only unwraps the transport envelope
/// and tags the batch with the client address.
pub async fn submit_responses(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<EncryptedBody>,
) -> Result<impl IntoResponse, AppError> {
    let Some(data) = body.data.filter(|data| !data.is_empty()) else {
        return Err(AppError::BadRequest("Missing encrypted payload".to_string()));
    };

    let ip_address = client_ip(&headers, peer);
    state.validator.submit(&data, &ip_address).await?;

    Ok(Json(json!({ "message": "Responses submitted successfully" })))
}

/// Read-only retrieval of a candidate's persisted responses. Not a
/// re-submission path: nothing here mutates state.
pub async fn fetch_responses(
    State(state): State<AppState>,
    Json(req): Json<FetchResponsesRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let rows = state
        .store
        .responses_by_roll_no(&req.roll_no)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch responses: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if rows.is_empty() {
        return Err(AppError::NotFound(
            "No responses found for this candidate".to_string(),
        ));
    }

    let encrypted = state
        .payload_cipher
        .encrypt_value(&rows)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(json!({
        "message": "Data fetched successfully",
        "roll_no": req.roll_no,
        "data": encrypted,
    })))
}
