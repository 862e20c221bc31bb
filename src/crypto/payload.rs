// src/crypto/payload.rs

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use super::CodecError;

const NONCE_LEN: usize = 12;

/// Symmetric codec for JSON payloads exchanged with the candidate client.
///
/// The key is derived from a shared passphrase (SHA-256); messages travel as
/// base64(nonce || ciphertext) with a fresh 96-bit nonce per message, so the
/// same plaintext never encrypts to the same wire string twice.
#[derive(Clone)]
pub struct PayloadCipher {
    key: [u8; 32],
}

impl PayloadCipher {
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        Self { key: digest.into() }
    }

    /// Serializes `value` to JSON and encrypts it for transport.
    pub fn encrypt_value<T: Serialize>(&self, value: &T) -> Result<String, CodecError> {
        let plain = serde_json::to_vec(value).map_err(|_| CodecError::Encode)?;
        let cipher = Aes256Gcm::new((&self.key).into());
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plain.as_ref())
            .map_err(|_| CodecError::Encode)?;

        let mut wire = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        wire.extend_from_slice(nonce.as_slice());
        wire.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(wire))
    }

    /// Decrypts and deserializes a wire string produced by [`encrypt_value`].
    ///
    /// Fails closed: bad transport encoding, a failed tag check and
    /// non-UTF-8/non-JSON plaintext all collapse into `CodecError::Decode`.
    ///
    /// [`encrypt_value`]: Self::encrypt_value
    pub fn decrypt_value<T: DeserializeOwned>(&self, data: &str) -> Result<T, CodecError> {
        let plain = self.decrypt_bytes(data)?;
        serde_json::from_slice(&plain).map_err(|_| CodecError::Decode)
    }

    fn decrypt_bytes(&self, data: &str) -> Result<Vec<u8>, CodecError> {
        let raw = BASE64.decode(data.trim()).map_err(|_| CodecError::Decode)?;
        if raw.len() <= NONCE_LEN {
            return Err(CodecError::Decode);
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new((&self.key).into());
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CodecError::Decode)
    }
}
