//! Auth routes: magic-link login, verification, sign-up completion,
//! session info, and logout.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json as AxumJson};
use axum::{Extension, Json, Router, routing::{get, post}};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::binder::bind;
use crate::auth::magic_link::RejectReason;
use crate::auth::middleware::CurrentUser;
use crate::error::AppError;
use crate::server::AppState;
use crate::validation::{require_email, require_nonblank};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct MagicLinkParams {
    pub magic: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSignupRequest {
    pub first_name: String,
    pub last_name: String,
}

/// Start a login: mint a nonce, bind it to the session, and build the
/// magic link. Link delivery is an external concern; it is logged at
/// debug level for development.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    require_email(&email)?;

    let mut session = state.sessions.load(&jar);
    if session.user_id().is_some() {
        return Ok((jar, AxumJson(json!({ "message": "already logged in" }))));
    }

    let nonce = state.nonces.issue();
    let link = state.magic_links.generate_magic_link(&email, &nonce)?;
    tracing::debug!("magic link for {}: {}", email, link);
    tracing::info!("issued magic link for {}", email);

    // the nonce must reach the session before we respond, or the link is
    // dead on arrival
    session.set_nonce(&nonce);
    let cookie = state.sessions.commit(&session)?;

    Ok((
        jar.add(cookie),
        AxumJson(json!({ "message": "Check your email to finish logging in" })),
    ))
}

/// Verify an incoming magic link and bind the session.
///
/// The registry consume is the atomic check-and-clear: of two racing
/// requests carrying the same link and cookie, exactly one passes. The
/// session nonce is cleared inside `bind` before any store round trip.
pub async fn validate_magic_link(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<MagicLinkParams>,
) -> Result<impl IntoResponse, AppError> {
    let token = params.magic.ok_or(RejectReason::InvalidToken)?;

    let mut session = state.sessions.load(&jar);
    let payload = state
        .magic_links
        .verify(&token, session.nonce(), Utc::now())?;

    consume_nonce(&state.nonces, &payload.nonce)?;

    let user = bind(&payload.email, &mut session, state.db.as_ref()).await?;
    let cookie = state.sessions.commit(&session)?;

    let status = if user.profile_complete() {
        "authenticated"
    } else {
        "signup_required"
    };
    Ok((
        jar.add(cookie),
        AxumJson(json!({ "status": status, "user": user })),
    ))
}

/// A nonce that is unknown to the registry, already consumed, or aged out
/// is indistinguishable from a session mismatch to the caller.
fn consume_nonce(
    nonces: &crate::auth::nonce::NonceRegistry,
    nonce: &str,
) -> Result<(), RejectReason> {
    if nonces.consume(nonce) {
        Ok(())
    } else {
        Err(RejectReason::NonceMismatch)
    }
}

/// Fill in the name on a shell user created at verification time.
pub async fn complete_signup(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CompleteSignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_nonblank("firstName", &payload.first_name, "name cannot be blank")?;
    require_nonblank("lastName", &payload.last_name, "name cannot be blank")?;

    let user = state
        .db
        .update_user_name(user.id, payload.first_name.trim(), payload.last_name.trim())
        .await?;
    Ok(AxumJson(json!({ "user": user })))
}

/// Return the user the session points at.
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    AxumJson(json!({ "user": user }))
}

/// Delete session data to log the user out.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        jar.add(state.sessions.destroy()),
        AxumJson(json!({ "message": "successfully logged out" })),
    )
}

/// Routes that must work without an authenticated session.
pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/validate-magic-link", get(validate_magic_link))
        .route("/api/auth/logout", get(logout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::magic_link::MagicLinkService;
    use crate::auth::nonce::NonceRegistry;
    use url::Url;

    fn token_of(link: &str) -> String {
        Url::parse(link)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "magic")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn test_second_verification_of_same_link_fails() {
        // replaying the exact same link from the exact same browser session:
        // the payload still verifies, but the registry only pays out once
        let magic_links =
            MagicLinkService::new("test secret", Url::parse("https://recipes.example.com").unwrap());
        let nonces = NonceRegistry::new();

        let nonce = nonces.issue();
        let link = magic_links
            .generate_magic_link("test@example.com", &nonce)
            .unwrap();
        let token = token_of(&link);

        let payload = magic_links
            .verify(&token, Some(nonce.as_str()), Utc::now())
            .unwrap();
        assert!(consume_nonce(&nonces, &payload.nonce).is_ok());

        let payload = magic_links
            .verify(&token, Some(nonce.as_str()), Utc::now())
            .unwrap();
        assert_eq!(
            consume_nonce(&nonces, &payload.nonce).unwrap_err(),
            RejectReason::NonceMismatch
        );
    }
}
