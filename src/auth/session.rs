//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{User, UserRole};

/// Cookie carrying the signed session token
pub const SESSION_COOKIE: &str = "session";
/// Cookie carrying the CSRF state token during the OAuth round trip
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
/// Cookie stashing the rejected email for the unauthorized page
pub const UNAUTHORIZED_EMAIL_COOKIE: &str = "unauthorized_email";

/// User session data
///
/// A denormalized snapshot of the account row at last refresh, not a
/// live join. It can go stale when an admin changes a role mid-session;
/// the home page re-sync is the point where it is refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Account id
    pub id: i64,
    /// Normalized email
    pub email: String,
    /// Display name
    pub name: Option<String>,
    /// Avatar URL from the identity provider
    pub picture: Option<String>,
    /// Role at the time of the snapshot
    pub role: UserRole,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Snapshot a user row into a session valid for `max_age_seconds`
    pub fn from_user(user: &User, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            role: user.role,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let payload = serde_json::to_string(session)
        .map_err(|e| crate::error::AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Internal(anyhow::anyhow!("hmac init: {e}")))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns `Unauthenticated` if the token is malformed, the signature
/// does not verify, or the session has expired.
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(crate::error::AppError::Unauthenticated);
    }

    let payload_b64 = parts[0];
    let signature_b64 = parts[1];

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Internal(anyhow::anyhow!("hmac init: {e}")))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| crate::error::AppError::Unauthenticated)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| crate::error::AppError::Unauthenticated)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| crate::error::AppError::Unauthenticated)?;

    let payload_str =
        String::from_utf8(payload_bytes).map_err(|_| crate::error::AppError::Unauthenticated)?;

    let session: Session =
        serde_json::from_str(&payload_str).map_err(|_| crate::error::AppError::Unauthenticated)?;

    if session.is_expired() {
        return Err(crate::error::AppError::Unauthenticated);
    }

    Ok(session)
}

/// Build a cookie with the attributes every MediaLodge cookie carries
pub fn build_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie
}

/// Build the removal counterpart of [`build_cookie`]
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            email: "user@example.com".to_string(),
            name: Some("User".to_string()),
            picture: None,
            role: UserRole::Uploader,
            active: true,
        }
    }

    const SECRET: &str = "test-secret-key-32-bytes-long!!!";

    #[test]
    fn token_roundtrip_preserves_snapshot() {
        let session = Session::from_user(&sample_user(), 3600);
        let token = create_session_token(&session, SECRET).unwrap();
        let decoded = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.email, "user@example.com");
        assert_eq!(decoded.role, UserRole::Uploader);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let session = Session::from_user(&sample_user(), 3600);
        let token = create_session_token(&session, SECRET).unwrap();
        let mut tampered = token.clone();
        tampered.replace_range(0..1, "X");
        assert!(verify_session_token(&tampered, SECRET).is_err());
        assert!(verify_session_token(&token, "another-secret-32-bytes-long!!!!").is_err());
    }

    #[test]
    fn expired_session_is_rejected() {
        let mut session = Session::from_user(&sample_user(), 3600);
        session.expires_at = Utc::now() - Duration::seconds(1);
        let token = create_session_token(&session, SECRET).unwrap();
        assert!(verify_session_token(&token, SECRET).is_err());
    }
}
