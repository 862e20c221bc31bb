// src/store/mod.rs

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::fmt;

use async_trait::async_trait;

use crate::catalog::CatalogRow;
use crate::models::audit::ApiLogEntry;
use crate::models::candidate::Candidate;
use crate::models::response::{ResponseRow, SubmittedResponse};

/// Errors surfaced by the persistence gateway.
///
/// `DuplicateSubmission` is the storage-layer uniqueness signal the
/// validator maps to an "already submitted" conflict; everything else is an
/// opaque database fault whose detail stays in server-side logs.
#[derive(Debug)]
pub enum StoreError {
    DuplicateSubmission,
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateSubmission => write!(f, "responses already submitted"),
            StoreError::Database(msg) => write!(f, "database error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The response persistence gateway.
///
/// All cross-request coordination happens behind this trait; the submission
/// path relies on `insert_responses` being all-or-nothing and on its
/// uniqueness guard firing atomically when two batches race for the same
/// candidate.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn find_candidate(
        &self,
        roll_no: &str,
        exam_name: &str,
    ) -> Result<Option<Candidate>, StoreError>;

    async fn find_candidate_by_sso(&self, sso_id: &str) -> Result<Option<Candidate>, StoreError>;

    async fn has_responses(&self, candidate_id: i64) -> Result<bool, StoreError>;

    /// Persists one batch atomically, tagging every row with the client
    /// address. Returns `DuplicateSubmission` if a batch for this candidate
    /// already committed, including when a concurrent batch wins the race.
    async fn insert_responses(
        &self,
        candidate_id: i64,
        ip_address: &str,
        rows: &[ResponseRow],
    ) -> Result<(), StoreError>;

    /// Flat section/question/option join ordered by section, question,
    /// option. Input to the catalog assembler.
    async fn catalog_rows(&self) -> Result<Vec<CatalogRow>, StoreError>;

    async fn responses_by_roll_no(
        &self,
        roll_no: &str,
    ) -> Result<Vec<SubmittedResponse>, StoreError>;

    /// Ancillary audit insert; callers swallow failures.
    async fn record_api_log(&self, entry: ApiLogEntry) -> Result<(), StoreError>;
}
