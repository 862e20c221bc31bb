// src/token.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::{EnvelopeCipher, PayloadCipher};
use crate::store::AssessmentStore;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(3);

/// Decrypted body of the envelope delivered by the SSO redirect.
/// Identity travels pipe-delimited in `value`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SsoEnvelope {
    pub value: String,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
}

/// Identity context handed back to the browser, re-encrypted with the
/// payload codec. The server keeps no copy; each later request re-proves
/// identity and is validated again at submission time.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub sso_id: String,
    pub name: String,
    pub roll_no: String,
    pub exam_name: String,
    pub expires: Option<String>,
    pub session: Option<String>,
}

#[derive(Debug)]
pub enum TokenError {
    MissingToken,
    Decode,
    MalformedIdentity,
    AlreadySubmitted,
    Internal(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::MissingToken => write!(f, "missing session token"),
            TokenError::Decode => write!(f, "undecodable session token"),
            TokenError::MalformedIdentity => write!(f, "malformed identity in token"),
            TokenError::AlreadySubmitted => write!(f, "responses already submitted"),
            TokenError::Internal(msg) => write!(f, "token verification failure: {msg}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Verifies inbound SSO tokens and issues client-held session blobs.
pub struct TokenVerifier {
    envelope: EnvelopeCipher,
    payload: PayloadCipher,
    store: Arc<dyn AssessmentStore>,
    verify_url: Option<String>,
    http: reqwest::Client,
}

impl TokenVerifier {
    pub fn new(
        envelope: EnvelopeCipher,
        payload: PayloadCipher,
        store: Arc<dyn AssessmentStore>,
        verify_url: Option<String>,
    ) -> Self {
        Self {
            envelope,
            payload,
            store,
            verify_url,
            http: reqwest::Client::new(),
        }
    }

    /// Decodes the SSO envelope and, if the candidate has not already
    /// submitted, returns the encrypted session blob for the browser.
    pub async fn establish_session(&self, raw_token: &str) -> Result<String, TokenError> {
        let raw_token = raw_token.trim();
        if raw_token.is_empty() {
            return Err(TokenError::MissingToken);
        }

        let envelope: SsoEnvelope = self
            .envelope
            .decrypt_value(raw_token)
            .map_err(|_| TokenError::Decode)?;
        let context = parse_identity(envelope)?;

        // Refuse to re-open the assessment for a candidate whose responses
        // are already on record; handing out a fresh session here would let
        // them back into the UI only to fail at submission time.
        if let Some(candidate) = self
            .store
            .find_candidate(&context.roll_no, &context.exam_name)
            .await
            .map_err(internal)?
        {
            if self
                .store
                .has_responses(candidate.id)
                .await
                .map_err(internal)?
            {
                return Err(TokenError::AlreadySubmitted);
            }
        }

        self.confirm_upstream(raw_token).await;

        self.payload
            .encrypt_value(&context)
            .map_err(|e| TokenError::Internal(e.to_string()))
    }

    /// Best-effort check against the upstream SSO validation endpoint, when
    /// one is configured. Ancillary: transport failures and rejections are
    /// logged and never block session establishment.
    async fn confirm_upstream(&self, raw_token: &str) {
        let Some(url) = &self.verify_url else {
            return;
        };

        let result = self
            .http
            .post(url)
            .timeout(UPSTREAM_TIMEOUT)
            .json(&serde_json::json!({ "token": raw_token }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(status = %response.status(), "SSO verification endpoint rejected token");
            }
            Err(e) => {
                tracing::warn!("SSO verification endpoint unreachable: {}", e);
            }
        }
    }
}

fn internal(e: crate::store::StoreError) -> TokenError {
    TokenError::Internal(e.to_string())
}

/// Splits the pipe-delimited identity value into its four fixed fields.
fn parse_identity(envelope: SsoEnvelope) -> Result<SessionContext, TokenError> {
    let parts: Vec<&str> = envelope.value.split('|').collect();
    let &[sso_id, name, roll_no, exam_name] = parts.as_slice() else {
        return Err(TokenError::MalformedIdentity);
    };

    if sso_id.is_empty() || roll_no.is_empty() || exam_name.is_empty() {
        return Err(TokenError::MalformedIdentity);
    }

    Ok(SessionContext {
        sso_id: sso_id.to_string(),
        name: name.to_string(),
        roll_no: roll_no.to_string(),
        exam_name: exam_name.to_string(),
        expires: envelope.expires,
        session: envelope.session,
    })
}
