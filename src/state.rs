use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::crypto::{EnvelopeCipher, PayloadCipher};
use crate::store::AssessmentStore;
use crate::submission::SubmissionValidator;
use crate::token::TokenVerifier;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AssessmentStore>,
    pub config: Config,
    pub payload_cipher: PayloadCipher,
    pub validator: Arc<SubmissionValidator>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Wires the core components around one injected storage handle; no
    /// ambient globals.
    pub fn new(store: Arc<dyn AssessmentStore>, config: Config) -> Self {
        let payload_cipher = PayloadCipher::from_passphrase(&config.payload_secret);
        let envelope = EnvelopeCipher::new(config.token_key, config.token_iv);

        let validator = Arc::new(SubmissionValidator::new(
            payload_cipher.clone(),
            store.clone(),
        ));
        let verifier = Arc::new(TokenVerifier::new(
            envelope,
            payload_cipher.clone(),
            store.clone(),
            config.sso_verify_url.clone(),
        ));

        Self {
            store,
            config,
            payload_cipher,
            validator,
            verifier,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for PayloadCipher {
    fn from_ref(state: &AppState) -> Self {
        state.payload_cipher.clone()
    }
}
