// src/submission.rs

use std::fmt;
use std::sync::Arc;

use crate::crypto::PayloadCipher;
use crate::models::response::{RawSubmission, ResponseRow};
use crate::store::{AssessmentStore, StoreError};

/// Outcomes of a rejected submission, in the order the checks run.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmissionError {
    InvalidPayload,
    MissingIdentity,
    InvalidRequestData,
    CandidateNotFound,
    CandidateNotFoundBySso,
    IdentityMismatch,
    AlreadySubmitted,
    NoValidResponses,
    Persistence(String),
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::InvalidPayload => write!(f, "invalid encrypted payload"),
            SubmissionError::MissingIdentity => write!(f, "missing sso_id or exam_name"),
            SubmissionError::InvalidRequestData => write!(f, "invalid request data"),
            SubmissionError::CandidateNotFound => write!(f, "candidate not found"),
            SubmissionError::CandidateNotFoundBySso => {
                write!(f, "candidate not found for sso id")
            }
            SubmissionError::IdentityMismatch => write!(f, "identity mismatch"),
            SubmissionError::AlreadySubmitted => write!(f, "responses already submitted"),
            SubmissionError::NoValidResponses => write!(f, "no valid responses in payload"),
            SubmissionError::Persistence(msg) => write!(f, "persistence failure: {msg}"),
        }
    }
}

impl std::error::Error for SubmissionError {}

/// Validates and commits candidate response batches.
///
/// Per candidate there are two implicit states, derived from persisted data:
/// no responses yet, or submitted (terminal). One atomic bulk insert moves a
/// candidate between them; everything else here is gatekeeping.
///
/// The check order is load-bearing: identity resolution runs before the
/// duplicate check, and the duplicate check runs before per-row filtering,
/// so malformed rows cannot be used to probe whether a roll number has
/// already submitted.
pub struct SubmissionValidator {
    cipher: PayloadCipher,
    store: Arc<dyn AssessmentStore>,
}

impl SubmissionValidator {
    pub fn new(cipher: PayloadCipher, store: Arc<dyn AssessmentStore>) -> Self {
        Self { cipher, store }
    }

    pub async fn submit(
        &self,
        encrypted_payload: &str,
        ip_address: &str,
    ) -> Result<(), SubmissionError> {
        let payload: RawSubmission = self
            .cipher
            .decrypt_value(encrypted_payload)
            .map_err(|_| SubmissionError::InvalidPayload)?;

        let sso_id = non_empty(payload.sso_id.as_deref()).ok_or(SubmissionError::MissingIdentity)?;
        let exam_name =
            non_empty(payload.exam_name.as_deref()).ok_or(SubmissionError::MissingIdentity)?;
        let roll_no =
            non_empty(payload.roll_no.as_deref()).ok_or(SubmissionError::InvalidRequestData)?;
        let raw_rows = payload
            .responses
            .as_deref()
            .filter(|rows| !rows.is_empty())
            .ok_or(SubmissionError::InvalidRequestData)?;

        let candidate = self
            .store
            .find_candidate(roll_no, exam_name)
            .await
            .map_err(persistence)?
            .ok_or(SubmissionError::CandidateNotFound)?;

        let by_sso = self
            .store
            .find_candidate_by_sso(sso_id)
            .await
            .map_err(persistence)?
            .ok_or(SubmissionError::CandidateNotFoundBySso)?;

        // The two lookups must resolve to the same person; a mismatched
        // roll_no/sso_id pair is a tamper signal, not a not-found.
        if candidate.id != by_sso.id {
            tracing::warn!(roll_no, sso_id, "submission identity mismatch");
            return Err(SubmissionError::IdentityMismatch);
        }

        if self
            .store
            .has_responses(candidate.id)
            .await
            .map_err(persistence)?
        {
            return Err(SubmissionError::AlreadySubmitted);
        }

        // Malformed rows are dropped silently; only an entirely unusable
        // batch is fatal.
        let rows: Vec<ResponseRow> = raw_rows
            .iter()
            .filter_map(|value| serde_json::from_value(value.clone()).ok())
            .collect();
        if rows.is_empty() {
            return Err(SubmissionError::NoValidResponses);
        }

        match self.store.insert_responses(candidate.id, ip_address, &rows).await {
            Ok(()) => Ok(()),
            Err(StoreError::DuplicateSubmission) => Err(SubmissionError::AlreadySubmitted),
            Err(e) => Err(persistence(e)),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn persistence(e: StoreError) -> SubmissionError {
    SubmissionError::Persistence(e.to_string())
}
