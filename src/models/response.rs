// src/models/response.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Request body wrapper for encrypted payloads: `{ "data": "<ciphertext>" }`.
#[derive(Debug, Deserialize)]
pub struct EncryptedBody {
    pub data: Option<String>,
}

/// Decrypted submission payload, before any shape validation.
///
/// Every field is optional here so the validator can distinguish missing
/// identity from malformed request data instead of failing wholesale at the
/// deserialization step.
#[derive(Debug, Default, Deserialize)]
pub struct RawSubmission {
    #[serde(default)]
    pub roll_no: Option<String>,
    #[serde(default)]
    pub sso_id: Option<String>,
    #[serde(default)]
    pub exam_name: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub responses: Option<Vec<serde_json::Value>>,
}

/// One well-formed response record. Deserialized strictly: all three fields
/// must be JSON integers, so `"option_id": "2"` or `"rating": 4.5` is
/// rejected and the record is dropped by the validator's filter step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub question_id: i64,
    pub option_id: i64,
    pub rating: i64,
}

/// One persisted response joined back to its question/option text, as
/// returned by the responses/fetch endpoint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubmittedResponse {
    pub question_id: i64,
    pub question_text: String,
    pub option_text: Option<String>,
    pub rating: i64,
}

static ROLL_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9_-]+$").expect("roll_no pattern is valid"));

/// DTO for the read-only responses/fetch endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct FetchResponsesRequest {
    #[validate(
        length(min = 1, max = 50, message = "Roll number is required."),
        custom(function = validate_roll_no)
    )]
    pub roll_no: String,
}

fn validate_roll_no(roll_no: &str) -> Result<(), validator::ValidationError> {
    if ROLL_NO_RE.is_match(roll_no) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_roll_no"))
    }
}
