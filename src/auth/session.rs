//! Cookie-backed session store.
//!
//! Session state travels inside the cookie itself, sealed with the payload
//! codec under a dedicated session secret. A session holds at most one
//! pending `nonce` (set when a magic link is issued, cleared once consumed)
//! and at most one `userId` (set once authenticated); it never holds both
//! after a bind completes.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::auth::codec::PayloadCodec;

pub const SESSION_COOKIE: &str = "recipes_session";

const NONCE_KEY: &str = "nonce";
const USER_ID_KEY: &str = "userId";

/// In-memory view of one browser session. Mutations are applied to this
/// value and only reach the client when the handler commits it back into
/// a `Set-Cookie` header.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Session {
    values: Map<String, Value>,
}

impl Session {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn unset(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn nonce(&self) -> Option<&str> {
        self.get(NONCE_KEY).and_then(Value::as_str)
    }

    pub fn set_nonce(&mut self, nonce: &str) {
        self.set(NONCE_KEY, Value::String(nonce.to_string()));
    }

    pub fn clear_nonce(&mut self) {
        self.unset(NONCE_KEY);
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.get(USER_ID_KEY)
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    pub fn set_user_id(&mut self, user_id: Uuid) {
        self.set(USER_ID_KEY, Value::String(user_id.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Seals sessions into cookies and opens them back up.
pub struct SessionStorage {
    codec: PayloadCodec,
}

impl SessionStorage {
    pub fn new(secret: &str) -> Self {
        Self {
            codec: PayloadCodec::new(secret),
        }
    }

    /// Parse the session out of the request's cookie jar. A missing,
    /// corrupted, or re-keyed cookie yields a fresh empty session rather
    /// than an error.
    pub fn load(&self, jar: &CookieJar) -> Session {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Session::default();
        };
        match self.codec.decode::<Map<String, Value>>(cookie.value()) {
            Ok(values) => Session { values },
            Err(err) => {
                tracing::debug!("discarding unreadable session cookie: {}", err);
                Session::default()
            }
        }
    }

    /// Serialize the session into a cookie for the response.
    pub fn commit(&self, session: &Session) -> anyhow::Result<Cookie<'static>> {
        let sealed = self.codec.encode(&session.values)?;
        let mut cookie = Cookie::new(SESSION_COOKIE, sealed);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_max_age(time::Duration::days(30));
        Ok(cookie)
    }

    /// Expire the session cookie, logging the user out.
    pub fn destroy(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, "");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_max_age(time::Duration::ZERO);
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SessionStorage {
        SessionStorage::new("session test secret")
    }

    fn jar_with(cookie: Cookie<'static>) -> CookieJar {
        CookieJar::new().add(cookie)
    }

    #[test]
    fn test_get_set_unset() {
        let mut session = Session::default();
        assert!(session.is_empty());

        session.set_nonce("abc");
        assert_eq!(session.nonce(), Some("abc"));

        session.clear_nonce();
        assert_eq!(session.nonce(), None);
        assert!(session.is_empty());
    }

    #[test]
    fn test_commit_load_roundtrip() {
        let storage = storage();
        let mut session = Session::default();
        let user_id = Uuid::new_v4();
        session.set_user_id(user_id);

        let cookie = storage.commit(&session).unwrap();
        let restored = storage.load(&jar_with(cookie));
        assert_eq!(restored.user_id(), Some(user_id));
        assert_eq!(restored, session);
    }

    #[test]
    fn test_missing_cookie_yields_empty_session() {
        let session = storage().load(&CookieJar::new());
        assert!(session.is_empty());
    }

    #[test]
    fn test_tampered_cookie_yields_empty_session() {
        let storage = storage();
        let mut session = Session::default();
        session.set_nonce("abc");
        let cookie = storage.commit(&session).unwrap();

        let mut value = cookie.value().to_string();
        let flipped = if value.starts_with('A') { "B" } else { "A" };
        value.replace_range(0..1, flipped);
        let restored = storage.load(&jar_with(Cookie::new(SESSION_COOKIE, value)));
        assert!(restored.is_empty());
    }

    #[test]
    fn test_rekeyed_cookie_yields_empty_session() {
        let mut session = Session::default();
        session.set_user_id(Uuid::new_v4());
        let cookie = storage().commit(&session).unwrap();

        let other = SessionStorage::new("rotated secret");
        assert!(other.load(&jar_with(cookie)).is_empty());
    }

    #[test]
    fn test_destroy_expires_cookie() {
        let cookie = storage().destroy();
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.value(), "");
    }
}
