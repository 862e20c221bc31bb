// src/crypto/envelope.rs

use aes::Aes256;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Serialize, de::DeserializeOwned};

use super::CodecError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Codec for the envelope issued by the upstream SSO system.
///
/// Deliberately a separate instance and scheme from [`PayloadCipher`]: the
/// envelope sits on a different trust boundary and uses the fixed key/IV pair
/// agreed with the identity provider (AES-256-CBC, PKCS#7, base64 transport).
///
/// [`PayloadCipher`]: super::PayloadCipher
#[derive(Clone)]
pub struct EnvelopeCipher {
    key: [u8; 32],
    iv: [u8; 16],
}

impl EnvelopeCipher {
    pub fn new(key: [u8; 32], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    pub fn encrypt_value<T: Serialize>(&self, value: &T) -> Result<String, CodecError> {
        let plain = serde_json::to_vec(value).map_err(|_| CodecError::Encode)?;
        let ciphertext = Aes256CbcEnc::new((&self.key).into(), (&self.iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(&plain);
        Ok(BASE64.encode(ciphertext))
    }

    /// Fails closed: bad base64, wrong key/IV, padding errors and non-JSON
    /// plaintext all surface as `CodecError::Decode`.
    pub fn decrypt_value<T: DeserializeOwned>(&self, data: &str) -> Result<T, CodecError> {
        let raw = BASE64.decode(data.trim()).map_err(|_| CodecError::Decode)?;
        let plain = Aes256CbcDec::new((&self.key).into(), (&self.iv).into())
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|_| CodecError::Decode)?;
        serde_json::from_slice(&plain).map_err(|_| CodecError::Decode)
    }
}
