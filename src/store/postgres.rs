// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{AssessmentStore, StoreError};
use crate::catalog::CatalogRow;
use crate::models::audit::ApiLogEntry;
use crate::models::candidate::Candidate;
use crate::models::response::{ResponseRow, SubmittedResponse};

/// Postgres-backed persistence gateway.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Postgres error code for unique violations is 23505.
fn map_claim_error(e: sqlx::Error) -> StoreError {
    let text = e.to_string();
    if text.contains("23505") || text.contains("unique constraint") || text.contains("duplicate key")
    {
        StoreError::DuplicateSubmission
    } else {
        StoreError::Database(text)
    }
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn find_candidate(
        &self,
        roll_no: &str,
        exam_name: &str,
    ) -> Result<Option<Candidate>, StoreError> {
        sqlx::query_as::<_, Candidate>(
            r#"
            SELECT id, roll_no, sso_id, exam_name, name
            FROM candidates
            WHERE roll_no = $1 AND exam_name = $2
            "#,
        )
        .bind(roll_no)
        .bind(exam_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn find_candidate_by_sso(&self, sso_id: &str) -> Result<Option<Candidate>, StoreError> {
        sqlx::query_as::<_, Candidate>(
            r#"
            SELECT id, roll_no, sso_id, exam_name, name
            FROM candidates
            WHERE sso_id = $1
            "#,
        )
        .bind(sso_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn has_responses(&self, candidate_id: i64) -> Result<bool, StoreError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM responses WHERE candidate_id = $1)",
        )
        .bind(candidate_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(exists.0)
    }

    async fn insert_responses(
        &self,
        candidate_id: i64,
        ip_address: &str,
        rows: &[ResponseRow],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Claim the one-submission-per-candidate slot first; the unique key
        // on submissions(candidate_id) is the linearization point when two
        // batches race.
        sqlx::query("INSERT INTO submissions (candidate_id, ip_address) VALUES ($1, $2)")
            .bind(candidate_id)
            .bind(ip_address)
            .execute(&mut *tx)
            .await
            .map_err(map_claim_error)?;

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO responses (candidate_id, question_id, option_id, rating, ip_address) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(candidate_id)
                .push_bind(row.question_id)
                .push_bind(row.option_id)
                .push_bind(row.rating)
                .push_bind(ip_address);
        });
        builder.build().execute(&mut *tx).await.map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    async fn catalog_rows(&self) -> Result<Vec<CatalogRow>, StoreError> {
        sqlx::query_as::<_, CatalogRow>(
            r#"
            SELECT
                s.id AS section_id, s.name AS section_name,
                q.id AS question_id, q.question_text AS question_text,
                o.id AS option_id, o.option_text AS option_text, o.rating AS rating
            FROM sections s
            JOIN questions q ON q.section_id = s.id
            LEFT JOIN options o ON o.question_id = q.id
            ORDER BY s.id, q.id, o.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn responses_by_roll_no(
        &self,
        roll_no: &str,
    ) -> Result<Vec<SubmittedResponse>, StoreError> {
        sqlx::query_as::<_, SubmittedResponse>(
            r#"
            SELECT r.question_id, q.question_text, o.option_text, r.rating
            FROM responses r
            JOIN candidates c ON c.id = r.candidate_id
            JOIN questions q ON q.id = r.question_id
            LEFT JOIN options o ON o.id = r.option_id
            WHERE c.roll_no = $1
            ORDER BY r.question_id
            "#,
        )
        .bind(roll_no)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn record_api_log(&self, entry: ApiLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO api_logs
                (api_name, request_body, ip_address, location, user_agent, status, logged_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&entry.api_name)
        .bind(&entry.request_body)
        .bind(&entry.ip_address)
        .bind(&entry.location)
        .bind(&entry.user_agent)
        .bind(entry.status)
        .bind(entry.logged_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
