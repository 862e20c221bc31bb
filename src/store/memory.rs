// src/store/memory.rs

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AssessmentStore, StoreError};
use crate::catalog::CatalogRow;
use crate::models::audit::ApiLogEntry;
use crate::models::candidate::Candidate;
use crate::models::response::{ResponseRow, SubmittedResponse};

#[derive(Debug, Clone)]
struct StoredResponse {
    question_id: i64,
    option_id: i64,
    rating: i64,
    ip_address: String,
    submitted_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    candidates: Vec<Candidate>,
    catalog: Vec<CatalogRow>,
    responses: HashMap<i64, Vec<StoredResponse>>,
    submitted: HashSet<i64>,
    api_logs: Vec<ApiLogEntry>,
}

/// In-memory persistence gateway.
///
/// Backs the integration suite and ad hoc local runs. The whole state sits
/// behind one mutex, so the claim-then-insert step has the same
/// linearization semantics as the Postgres submissions unique key: the
/// second of two racing batches observes the claim and fails.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with candidates and catalog rows.
    pub fn seeded(candidates: Vec<Candidate>, catalog: Vec<CatalogRow>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                candidates,
                catalog,
                ..Inner::default()
            }),
        }
    }

    /// Number of persisted response rows for a candidate. Test hook.
    pub fn response_count(&self, candidate_id: i64) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.responses.get(&candidate_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Number of recorded audit entries. Test hook.
    pub fn api_log_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.api_logs.len()).unwrap_or(0)
    }

    /// Tagging metadata of the persisted batch, if any. Test hook.
    pub fn submission_meta(&self, candidate_id: i64) -> Option<(String, DateTime<Utc>)> {
        self.inner.lock().ok().and_then(|inner| {
            inner
                .responses
                .get(&candidate_id)
                .and_then(|rows| rows.first())
                .map(|row| (row.ip_address.clone(), row.submitted_at))
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Database("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn find_candidate(
        &self,
        roll_no: &str,
        exam_name: &str,
    ) -> Result<Option<Candidate>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .candidates
            .iter()
            .find(|c| c.roll_no == roll_no && c.exam_name == exam_name)
            .cloned())
    }

    async fn find_candidate_by_sso(&self, sso_id: &str) -> Result<Option<Candidate>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.candidates.iter().find(|c| c.sso_id == sso_id).cloned())
    }

    async fn has_responses(&self, candidate_id: i64) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .responses
            .get(&candidate_id)
            .is_some_and(|rows| !rows.is_empty()))
    }

    async fn insert_responses(
        &self,
        candidate_id: i64,
        ip_address: &str,
        rows: &[ResponseRow],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;

        // Claim-then-insert under one lock: mirrors the unique key the
        // relational gateway relies on.
        if !inner.submitted.insert(candidate_id) {
            return Err(StoreError::DuplicateSubmission);
        }

        let now = Utc::now();
        let stored: Vec<StoredResponse> = rows
            .iter()
            .map(|row| StoredResponse {
                question_id: row.question_id,
                option_id: row.option_id,
                rating: row.rating,
                ip_address: ip_address.to_string(),
                submitted_at: now,
            })
            .collect();
        inner.responses.insert(candidate_id, stored);
        Ok(())
    }

    async fn catalog_rows(&self) -> Result<Vec<CatalogRow>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.catalog.clone())
    }

    async fn responses_by_roll_no(
        &self,
        roll_no: &str,
    ) -> Result<Vec<SubmittedResponse>, StoreError> {
        let inner = self.lock()?;

        let Some(candidate) = inner.candidates.iter().find(|c| c.roll_no == roll_no) else {
            return Ok(Vec::new());
        };

        let rows = inner
            .responses
            .get(&candidate.id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(rows
            .iter()
            .map(|row| {
                let question_text = inner
                    .catalog
                    .iter()
                    .find(|c| c.question_id == row.question_id)
                    .map(|c| c.question_text.clone())
                    .unwrap_or_default();
                let option_text = inner
                    .catalog
                    .iter()
                    .find(|c| c.option_id == Some(row.option_id))
                    .and_then(|c| c.option_text.clone());
                SubmittedResponse {
                    question_id: row.question_id,
                    question_text,
                    option_text,
                    rating: row.rating,
                }
            })
            .collect())
    }

    async fn record_api_log(&self, entry: ApiLogEntry) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.api_logs.push(entry);
        Ok(())
    }
}
