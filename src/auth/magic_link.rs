//! Magic Link Issuer and Verifier
//!
//! A magic link is a URL carrying an encrypted, time-limited, single-use
//! payload that authenticates its bearer without a password. The payload is
//! bound to the browser session that requested it through a nonce, so a
//! forwarded or leaked link is useless from another session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::auth::codec::PayloadCodec;

/// Links are valid for ten minutes, strictly. No grace period.
pub const MAGIC_LINK_MAX_AGE_MINUTES: i64 = 10;

/// Path the verification route is mounted on, relative to the origin.
pub const VALIDATE_PATH: &str = "/validate-magic-link";

/// Contents of the encrypted `?magic=` query parameter. Never persisted
/// server-side; created at link-generation time and discarded once consumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkPayload {
    pub email: String,
    pub nonce: String,
    pub created_at: DateTime<Utc>,
}

/// Why a verification attempt was turned away.
///
/// The variants are distinguishable for logging but the HTTP layer collapses
/// all of them into one user-facing message so probing a link reveals nothing
/// about which check failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("magic link token could not be decrypted")]
    InvalidToken,
    #[error("magic link payload has an invalid shape")]
    MalformedPayload,
    #[error("magic link has expired")]
    Expired,
    #[error("magic link nonce does not match the session")]
    NonceMismatch,
}

pub struct MagicLinkService {
    codec: PayloadCodec,
    origin: Url,
}

impl MagicLinkService {
    pub fn new(secret: &str, origin: Url) -> Self {
        Self {
            codec: PayloadCodec::new(secret),
            origin,
        }
    }

    /// Build a one-time login URL for `email`, bound to `nonce`.
    ///
    /// Pure construction; delivery is the caller's concern. The caller must
    /// also store `nonce` in the requesting session before responding.
    pub fn generate_magic_link(&self, email: &str, nonce: &str) -> anyhow::Result<String> {
        let payload = MagicLinkPayload {
            email: email.to_string(),
            nonce: nonce.to_string(),
            created_at: Utc::now(),
        };
        let token = self.codec.encode(&payload)?;

        let mut url = self.origin.clone();
        url.set_path(VALIDATE_PATH);
        url.query_pairs_mut().clear().append_pair("magic", &token);
        Ok(url.to_string())
    }

    /// Validate an incoming token against time and replay constraints.
    ///
    /// The pipeline short-circuits in order: decode, structural check,
    /// expiry, nonce match. Pure with respect to session state; the caller
    /// performs the atomic nonce consumption on success.
    pub fn verify(
        &self,
        token: &str,
        session_nonce: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MagicLinkPayload, RejectReason> {
        let decrypted: serde_json::Value = self
            .codec
            .decode(token)
            .map_err(|_| RejectReason::InvalidToken)?;

        let payload: MagicLinkPayload =
            serde_json::from_value(decrypted).map_err(|_| RejectReason::MalformedPayload)?;
        if payload.email.is_empty() || payload.nonce.is_empty() {
            return Err(RejectReason::MalformedPayload);
        }

        let expires_at = payload.created_at + Duration::minutes(MAGIC_LINK_MAX_AGE_MINUTES);
        if now > expires_at {
            return Err(RejectReason::Expired);
        }

        match session_nonce {
            Some(nonce) if nonce == payload.nonce => Ok(payload),
            _ => Err(RejectReason::NonceMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> MagicLinkService {
        MagicLinkService::new(
            "magic test secret",
            Url::parse("https://recipes.example.com").unwrap(),
        )
    }

    fn token_for(svc: &MagicLinkService, payload: &MagicLinkPayload) -> String {
        svc.codec.encode(payload).unwrap()
    }

    fn extract_token(link: &str) -> String {
        let url = Url::parse(link).unwrap();
        url.query_pairs()
            .find(|(k, _)| k == "magic")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn test_generate_targets_validation_path() {
        let link = service()
            .generate_magic_link("test@example.com", "nonce-1")
            .unwrap();
        let url = Url::parse(&link).unwrap();
        assert_eq!(url.host_str(), Some("recipes.example.com"));
        assert_eq!(url.path(), VALIDATE_PATH);
        assert!(url.query_pairs().any(|(k, _)| k == "magic"));
    }

    #[test]
    fn test_generated_link_verifies() {
        let svc = service();
        let link = svc
            .generate_magic_link("test@example.com", "nonce-1")
            .unwrap();
        let payload = svc
            .verify(&extract_token(&link), Some("nonce-1"), Utc::now())
            .unwrap();
        assert_eq!(payload.email, "test@example.com");
        assert_eq!(payload.nonce, "nonce-1");
    }

    #[test]
    fn test_garbage_token_rejected() {
        let err = service()
            .verify("definitely-not-a-token", Some("n"), Utc::now())
            .unwrap_err();
        assert_eq!(err, RejectReason::InvalidToken);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = MagicLinkService::new(
            "another secret",
            Url::parse("https://recipes.example.com").unwrap(),
        );
        let link = issuer
            .generate_magic_link("test@example.com", "nonce-1")
            .unwrap();
        let err = service()
            .verify(&extract_token(&link), Some("nonce-1"), Utc::now())
            .unwrap_err();
        assert_eq!(err, RejectReason::InvalidToken);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let svc = service();
        // structurally wrong shape, validly encrypted
        let token = svc
            .codec
            .encode(&serde_json::json!({ "email": "a@b.com" }))
            .unwrap();
        let err = svc.verify(&token, Some("n"), Utc::now()).unwrap_err();
        assert_eq!(err, RejectReason::MalformedPayload);

        // empty fields are as bad as missing ones
        let token = token_for(
            &svc,
            &MagicLinkPayload {
                email: String::new(),
                nonce: "n".to_string(),
                created_at: Utc::now(),
            },
        );
        let err = svc.verify(&token, Some("n"), Utc::now()).unwrap_err();
        assert_eq!(err, RejectReason::MalformedPayload);
    }

    #[test]
    fn test_expiry_boundary() {
        let svc = service();
        let now = Utc::now();
        let max_age = Duration::minutes(MAGIC_LINK_MAX_AGE_MINUTES);

        let just_expired = token_for(
            &svc,
            &MagicLinkPayload {
                email: "test@example.com".to_string(),
                nonce: "n".to_string(),
                created_at: now - max_age - Duration::milliseconds(1),
            },
        );
        assert_eq!(
            svc.verify(&just_expired, Some("n"), now).unwrap_err(),
            RejectReason::Expired
        );

        let still_valid = token_for(
            &svc,
            &MagicLinkPayload {
                email: "test@example.com".to_string(),
                nonce: "n".to_string(),
                created_at: now - max_age + Duration::milliseconds(1),
            },
        );
        assert!(svc.verify(&still_valid, Some("n"), now).is_ok());
    }

    #[test]
    fn test_nonce_mismatch_rejected() {
        let svc = service();
        let link = svc
            .generate_magic_link("test@example.com", "nonce-1")
            .unwrap();
        let token = extract_token(&link);

        // different session nonce
        let err = svc.verify(&token, Some("nonce-2"), Utc::now()).unwrap_err();
        assert_eq!(err, RejectReason::NonceMismatch);

        // session never requested a link at all
        let err = svc.verify(&token, None, Utc::now()).unwrap_err();
        assert_eq!(err, RejectReason::NonceMismatch);
    }
}
