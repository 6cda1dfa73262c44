//! Session Binder
//!
//! Converts a verified email into an authenticated session. The nonce is
//! cleared as the first mutating step: whatever happens downstream (store
//! errors included), the session must not be left holding a consumable
//! nonce.

use anyhow::Result;
use async_trait::async_trait;

use crate::auth::session::Session;
use crate::database::models::User;

/// Seam between the binder and the relational store, so the bind sequence
/// is testable without a database.
#[async_trait]
pub trait UserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn create(&self, email: &str, first_name: &str, last_name: &str) -> Result<User>;
}

/// Bind a verified email to the session.
///
/// Looks the user up by email; when absent, creates a shell record with
/// empty names that the sign-up form completes later. Either way the
/// session ends up authenticated and nonce-free.
pub async fn bind(email: &str, session: &mut Session, store: &impl UserStore) -> Result<User> {
    // single-use: must happen before any store round trip
    session.clear_nonce();

    let user = match store.find_by_email(email).await? {
        Some(user) => user,
        None => store.create(email, "", "").await?,
    };

    session.set_user_id(user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct MemoryStore {
        users: Mutex<Vec<User>>,
        fail_lookup: bool,
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            if self.fail_lookup {
                anyhow::bail!("store unavailable");
            }
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn create(&self, email: &str, first_name: &str, last_name: &str) -> Result<User> {
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.users.lock().unwrap().push(user.clone());
            Ok(user)
        }
    }

    fn session_with_nonce() -> Session {
        let mut session = Session::default();
        session.set_nonce("nonce-1");
        session
    }

    #[tokio::test]
    async fn test_bind_existing_user() {
        let store = MemoryStore::default();
        let existing = store.create("test@example.com", "Jan", "Doe").await.unwrap();

        let mut session = session_with_nonce();
        let user = bind("test@example.com", &mut session, &store).await.unwrap();

        assert_eq!(user.id, existing.id);
        assert_eq!(session.user_id(), Some(existing.id));
        assert_eq!(session.nonce(), None);
        assert!(user.profile_complete());
    }

    #[tokio::test]
    async fn test_bind_creates_shell_user() {
        let store = MemoryStore::default();
        let mut session = session_with_nonce();

        let user = bind("new@example.com", &mut session, &store).await.unwrap();
        assert_eq!(user.email, "new@example.com");
        assert!(!user.profile_complete());
        assert_eq!(session.user_id(), Some(user.id));
        assert_eq!(store.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nonce_cleared_even_when_store_fails() {
        let store = MemoryStore {
            fail_lookup: true,
            ..Default::default()
        };
        let mut session = session_with_nonce();

        let result = bind("test@example.com", &mut session, &store).await;
        assert!(result.is_err());
        assert_eq!(session.nonce(), None);
        assert_eq!(session.user_id(), None);
    }

    #[tokio::test]
    async fn test_session_never_holds_nonce_and_user() {
        let store = MemoryStore::default();
        let mut session = session_with_nonce();
        bind("test@example.com", &mut session, &store).await.unwrap();
        assert!(session.user_id().is_some() && session.nonce().is_none());
    }
}
