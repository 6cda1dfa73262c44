//! Session authentication middleware.
//!
//! Loads the sealed session cookie, resolves the user it points at, and
//! injects a [`CurrentUser`] extension for downstream handlers. Requests
//! without a valid authenticated session are turned away with 401.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::database::models::User;
use crate::error::AppError;
use crate::server::AppState;

/// The authenticated user for this request, as resolved from the session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub async fn require_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = state.sessions.load(&jar);
    let Some(user_id) = session.user_id() else {
        return Err(AppError::Unauthorized("not logged in".to_string()));
    };

    let user = state
        .db
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("not logged in".to_string()))?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
