use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::error::ApiError;
use crate::models::UserId;
use crate::store::ClassStore;

/// Resolves the caller from an optional bearer token. No token, or one the
/// auth provider rejects, means an anonymous caller rather than an error.
pub async fn current_user(
    store: &dyn ClassStore,
    auth: Option<Authorization<Bearer>>,
) -> Result<Option<UserId>, ApiError> {
    let Some(auth) = auth else {
        return Ok(None);
    };
    let token = auth.token().trim();
    if token.is_empty() {
        return Ok(None);
    }
    Ok(store.resolve_user(token).await?)
}

/// Like [`current_user`] but for endpoints that change per-user data.
pub async fn require_user(
    store: &dyn ClassStore,
    auth: Option<Authorization<Bearer>>,
) -> Result<UserId, ApiError> {
    current_user(store, auth)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Sign in to manage saved classes".into()))
}
