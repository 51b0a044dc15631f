//! Session/access guard
//!
//! Extractors authenticate a request's session snapshot; role policies
//! and capability checks authorize it.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;

use super::session::{SESSION_COOKIE, Session, verify_session_token};
use crate::AppState;
use crate::data::UserRole;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
}

/// Extractor for the current authenticated session
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(session): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", session.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let state = AppState::from_ref(state);
        let token =
            extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthenticated)?;
        let session = verify_session_token(&token, &state.config.auth.session_secret)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeUser(Some(session)));
        }

        let app_state = AppState::from_ref(state);
        let session = extract_token_from_headers(&parts.headers).and_then(|token| {
            verify_session_token(&token, &app_state.config.auth.session_secret).ok()
        });

        if let Some(session) = &session {
            parts.extensions.insert(session.clone());
        }

        Ok(MaybeUser(session))
    }
}

/// A set of roles allowed to perform an operation
#[derive(Debug, Clone, Copy)]
pub struct RolePolicy {
    allowed: &'static [UserRole],
}

/// Upload and media mutation policy
pub const UPLOADER_OR_ADMIN: RolePolicy = RolePolicy {
    allowed: &[UserRole::Uploader, UserRole::Admin],
};

/// Account management policy
pub const ADMIN_ONLY: RolePolicy = RolePolicy {
    allowed: &[UserRole::Admin],
};

impl RolePolicy {
    /// Check the session's role against the policy.
    ///
    /// The check runs against the snapshot, so a role change made by an
    /// admin mid-session takes effect only after the next re-sync.
    pub fn authorize<'a>(&self, session: &'a Session) -> Result<&'a Session, AppError> {
        if self.allowed.contains(&session.role) {
            Ok(session)
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Capability check for media mutation.
///
/// Uploaders and admins may mutate any record; a viewer may mutate only
/// records they own. The owner reference is a weak lookup, never a
/// lifetime tie.
pub fn can_mutate_media(session: &Session, owner_id: Option<i64>) -> bool {
    matches!(session.role, UserRole::Uploader | UserRole::Admin) || owner_id == Some(session.id)
}

/// Capability check for playlist mutation.
///
/// An unowned playlist is mutable by any authenticated identity; an
/// owned one only by its owner or an admin.
pub fn can_mutate_playlist(session: &Session, owner_id: Option<i64>) -> bool {
    match owner_id {
        None => true,
        Some(owner_id) => owner_id == session.id || session.role == UserRole::Admin,
    }
}
