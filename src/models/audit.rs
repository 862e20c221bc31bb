// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the ancillary request audit trail ('api_logs' table).
///
/// Written best-effort off the response path; losing an entry is acceptable,
/// failing a request because of one is not.
#[derive(Debug, Clone, Serialize)]
pub struct ApiLogEntry {
    pub api_name: String,
    pub request_body: String,
    pub ip_address: String,
    pub location: Option<String>,
    pub user_agent: String,
    pub status: i16,
    pub logged_at: DateTime<Utc>,
}
