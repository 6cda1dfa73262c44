//! Payload Codec
//!
//! Reversible, confidentiality-preserving encoding of JSON-serializable
//! payloads into URL-safe opaque tokens. Uses AES-256-GCM so that a
//! tampered or wrong-key token fails the authentication tag check instead
//! of decrypting to garbage.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::aead::{Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey, AES_256_GCM};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("token is not valid base64")]
    Malformed,
    #[error("token failed decryption")]
    Decrypt,
    #[error("payload encryption failed")]
    Encrypt,
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("system rng failure")]
    Rng,
}

/// Symmetric codec keyed by a server-held secret string.
///
/// The key is the SHA-256 digest of the secret, so any non-empty string
/// works as configuration input. Each token carries its own random
/// 96-bit nonce prepended to the ciphertext.
pub struct PayloadCodec {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl PayloadCodec {
    pub fn new(secret: &str) -> Self {
        let key_bytes = digest::digest(&digest::SHA256, secret.as_bytes());
        // SHA-256 output is exactly the AES-256 key length
        let unbound = UnboundKey::new(&AES_256_GCM, key_bytes.as_ref())
            .expect("SHA-256 digest is a valid AES-256 key");
        Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        }
    }

    /// Encrypt a payload into a URL-safe opaque token.
    pub fn encode<T: Serialize>(&self, payload: &T) -> Result<String, CodecError> {
        let mut in_out = serde_json::to_vec(payload)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce_bytes).map_err(|_| CodecError::Rng)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CodecError::Encrypt)?;

        let mut token = Vec::with_capacity(NONCE_LEN + in_out.len());
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&in_out);
        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    /// Decrypt and parse a token produced by [`encode`](Self::encode).
    ///
    /// Fails deterministically on malformed base64, truncation, bit flips,
    /// or a key mismatch.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, CodecError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| CodecError::Malformed)?;
        if raw.len() <= NONCE_LEN {
            return Err(CodecError::Malformed);
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| CodecError::Malformed)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CodecError::Decrypt)?;

        Ok(serde_json::from_slice(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        email: String,
        count: u32,
    }

    fn sample() -> Sample {
        Sample {
            email: "test@example.com".to_string(),
            count: 7,
        }
    }

    #[test]
    fn test_roundtrip() {
        let codec = PayloadCodec::new("test secret");
        let token = codec.encode(&sample()).unwrap();
        let decoded: Sample = codec.decode(&token).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_tokens_are_url_safe() {
        let codec = PayloadCodec::new("test secret");
        let token = codec.encode(&sample()).unwrap();
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn test_wrong_key_fails() {
        let codec = PayloadCodec::new("key one");
        let other = PayloadCodec::new("key two");
        let token = codec.encode(&sample()).unwrap();
        assert!(other.decode::<Sample>(&token).is_err());
    }

    #[test]
    fn test_tamper_detection() {
        let codec = PayloadCodec::new("test secret");
        let token = codec.encode(&sample()).unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        // flip one bit in every position; none may decode
        for i in 0..raw.len() {
            raw[i] ^= 0x01;
            let tampered = URL_SAFE_NO_PAD.encode(&raw);
            assert!(
                codec.decode::<Sample>(&tampered).is_err(),
                "bit flip at byte {} was not detected",
                i
            );
            raw[i] ^= 0x01;
        }
    }

    #[test]
    fn test_truncated_token_fails() {
        let codec = PayloadCodec::new("test secret");
        let token = codec.encode(&sample()).unwrap();
        assert!(codec.decode::<Sample>(&token[..token.len() / 2]).is_err());
        assert!(codec.decode::<Sample>("").is_err());
        assert!(codec.decode::<Sample>("not base64 !!!").is_err());
    }
}
