// src/models/candidate.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'candidates' table in the database.
///
/// Created by an external enrollment process; read-only to this service.
/// (roll_no, exam_name) identifies one candidate per exam; sso_id is the
/// globally unique key issued by the identity provider.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub roll_no: String,
    pub sso_id: String,
    pub exam_name: String,
    pub name: String,
}
