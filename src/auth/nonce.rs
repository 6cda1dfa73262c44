//! One-time nonce registry.
//!
//! The session store is cookie-backed, so two near-simultaneous requests
//! carrying the same cookie both see the same still-set nonce. The registry
//! is the process-wide serialization point: `consume` is an atomic remove,
//! so exactly one of two racing verification attempts wins.
//!
//! Entries outlive the magic-link window only until the next issue call
//! prunes them, which bounds the map size without a background task.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::auth::magic_link::MAGIC_LINK_MAX_AGE_MINUTES;

#[derive(Default)]
pub struct NonceRegistry {
    issued: DashMap<String, DateTime<Utc>>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint and register a fresh nonce for a login attempt.
    pub fn issue(&self) -> String {
        self.prune();
        let nonce = Uuid::new_v4().to_string();
        self.issued.insert(nonce.clone(), Utc::now());
        nonce
    }

    /// Atomically consume a nonce. Returns false if it was never issued,
    /// already consumed, or has aged out.
    pub fn consume(&self, nonce: &str) -> bool {
        match self.issued.remove(nonce) {
            Some((_, issued_at)) => {
                Utc::now() <= issued_at + Duration::minutes(MAGIC_LINK_MAX_AGE_MINUTES)
            }
            None => false,
        }
    }

    fn prune(&self) {
        let cutoff = Utc::now() - Duration::minutes(MAGIC_LINK_MAX_AGE_MINUTES);
        self.issued.retain(|_, issued_at| *issued_at >= cutoff);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.issued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_consume_is_single_use() {
        let registry = NonceRegistry::new();
        let nonce = registry.issue();
        assert!(registry.consume(&nonce));
        assert!(!registry.consume(&nonce));
    }

    #[test]
    fn test_unknown_nonce_rejected() {
        let registry = NonceRegistry::new();
        assert!(!registry.consume("never-issued"));
    }

    #[test]
    fn test_issue_prunes_stale_entries() {
        let registry = NonceRegistry::new();
        let stale = Uuid::new_v4().to_string();
        registry.issued.insert(
            stale.clone(),
            Utc::now() - Duration::minutes(MAGIC_LINK_MAX_AGE_MINUTES + 1),
        );
        registry.issue();
        assert!(!registry.consume(&stale));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_consume_single_winner() {
        let registry = Arc::new(NonceRegistry::new());
        let nonce = registry.issue();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let nonce = nonce.clone();
            handles.push(tokio::spawn(async move { registry.consume(&nonce) }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
