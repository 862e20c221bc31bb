// src/config.rs

use dotenvy::dotenv;
use std::env;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Shared passphrase for the candidate payload codec.
    pub payload_secret: String,
    /// Key/IV pair agreed with the upstream SSO system, hex-encoded in the
    /// environment. A distinct trust boundary from `payload_secret`.
    pub token_key: [u8; 32],
    pub token_iv: [u8; 16],
    /// Optional upstream endpoint for best-effort token confirmation.
    pub sso_verify_url: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let payload_secret =
            env::var("PAYLOAD_SECRET_KEY").expect("PAYLOAD_SECRET_KEY must be set");

        let token_key = decode_exact::<32>(
            &env::var("SSO_TOKEN_KEY").expect("SSO_TOKEN_KEY must be set"),
            "SSO_TOKEN_KEY",
        );
        let token_iv = decode_exact::<16>(
            &env::var("SSO_TOKEN_IV").expect("SSO_TOKEN_IV must be set"),
            "SSO_TOKEN_IV",
        );

        let sso_verify_url = env::var("SSO_VERIFY_URL").ok().filter(|v| !v.is_empty());
        if let Some(raw) = &sso_verify_url {
            Url::parse(raw).expect("SSO_VERIFY_URL must be a valid URL");
        }

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            payload_secret,
            token_key,
            token_iv,
            sso_verify_url,
            rust_log,
        }
    }
}

/// Hex-decodes key material that must be exactly N bytes long.
fn decode_exact<const N: usize>(value: &str, var: &str) -> [u8; N] {
    let bytes = hex::decode(value.trim()).unwrap_or_else(|_| panic!("{var} must be hex-encoded"));
    bytes
        .try_into()
        .unwrap_or_else(|_: Vec<u8>| panic!("{var} must decode to {N} bytes"))
}
