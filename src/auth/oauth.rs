//! Google OIDC sign-in flow
//!
//! Implements the OAuth 2.0 authorization code flow. The identity
//! exchange itself is isolated behind [`IdentityResolver`] so the rest
//! of the application treats the provider as a black box returning a
//! verified profile.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::session::{
    OAUTH_STATE_COOKIE, SESSION_COOKIE, Session, UNAUTHORIZED_EMAIL_COOKIE, build_cookie,
    create_session_token, removal_cookie,
};
use crate::AppState;
use crate::config::AuthConfig;
use crate::error::AppError;

/// Profile attributes returned by a successful identity exchange
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// External identity collaborator.
///
/// Exchanges an authorization code for a verified profile via the
/// provider's token and userinfo endpoints. Endpoints come from
/// configuration so tests can point at a stub server.
pub struct IdentityResolver {
    http: reqwest::Client,
    config: crate::config::GoogleOAuthConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl IdentityResolver {
    pub fn new(auth: &AuthConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("MediaLodge/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            config: auth.google.clone(),
        })
    }

    /// Build the provider authorization URL for the given CSRF state
    pub fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let mut url = url::Url::parse(&self.config.authorize_endpoint)
            .map_err(|e| AppError::Config(format!("invalid authorize endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scope)
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchange an authorization code for a verified profile.
    ///
    /// # Errors
    /// `Identity` when the provider rejects the exchange or the profile
    /// fetch fails; `Validation` when the profile carries no email.
    pub async fn resolve(&self, code: &str) -> Result<ResolvedIdentity, AppError> {
        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_url),
            ])
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Identity(format!(
                "token exchange failed with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("malformed token response: {e}")))?;

        let response = self
            .http
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("userinfo fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Identity(format!(
                "userinfo fetch failed with status {}",
                response.status()
            )));
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("malformed userinfo response: {e}")))?;

        let email = info
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| {
                AppError::Validation("identity provider returned no email".to_string())
            })?;

        Ok(ResolvedIdentity {
            email,
            name: info.name,
            picture: info.picture,
        })
    }
}

/// Create authentication router
///
/// Routes:
/// - GET /auth/login - Redirect to the provider
/// - GET /auth/callback - OAuth callback
/// - GET /auth/logout - Clear session
/// - GET /auth/status - Session introspection
/// - GET /auth-required - Sign-in prompt page
/// - GET /auth/unauthorized - Access-denied page
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", get(logout))
        .route("/auth/status", get(auth_status))
        .route("/auth-required", get(auth_required))
        .route("/auth/unauthorized", get(unauthorized))
}

/// Generate a random CSRF state token
fn generate_state_token() -> String {
    use rand::{Rng, distributions::Alphanumeric};

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// GET /auth/login
///
/// Stores a CSRF state token in a cookie and redirects to the
/// provider's authorization page.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let csrf = generate_state_token();
    let url = state.identity.authorize_url(&csrf)?;

    let secure = state.config.should_use_secure_cookies();
    let jar = jar.add(build_cookie(OAUTH_STATE_COOKIE, csrf, secure));

    Ok((jar, Redirect::to(&url)))
}

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
    state: String,
}

/// GET /auth/callback
///
/// # Steps
/// 1. Verify CSRF state against the cookie
/// 2. Exchange the code for a verified profile
/// 3. Look up (or auto-provision) the account; must be active
/// 4. Store the session snapshot cookie
/// 5. Redirect to home
async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let Some(expected) = jar.get(OAUTH_STATE_COOKIE) else {
        return Err(AppError::InvalidState);
    };
    if expected.value() != query.state {
        return Err(AppError::InvalidState);
    }
    let jar = jar.remove(removal_cookie(OAUTH_STATE_COOKIE));

    let identity = match state.identity.resolve(&query.code).await {
        Ok(identity) => identity,
        Err(AppError::Validation(msg)) => return Err(AppError::Validation(msg)),
        Err(error) => {
            tracing::warn!(%error, "identity resolution failed");
            let jar = jar.remove(removal_cookie(SESSION_COOKIE));
            return Ok((jar, Redirect::to("/auth-required")).into_response());
        }
    };

    let user = state
        .db
        .ensure_user(
            &identity.email,
            identity.name.as_deref(),
            identity.picture.as_deref(),
            state.config.auth.allow_auto_signup,
        )
        .await?;

    let Some(user) = user.filter(|user| user.active) else {
        tracing::info!(email = %identity.email, "sign-in rejected: no active account");
        let secure = state.config.should_use_secure_cookies();
        let jar = jar
            .remove(removal_cookie(SESSION_COOKIE))
            .add(build_cookie(UNAUTHORIZED_EMAIL_COOKIE, identity.email, secure));
        return Ok((jar, Redirect::to("/auth/unauthorized")).into_response());
    };

    let session = Session::from_user(&user, state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    let secure = state.config.should_use_secure_cookies();
    let jar = jar
        .remove(removal_cookie(UNAUTHORIZED_EMAIL_COOKIE))
        .add(build_cookie(SESSION_COOKIE, token, secure));

    tracing::info!(email = %user.email, role = %user.role.as_str(), "user signed in");

    Ok((jar, Redirect::to("/")).into_response())
}

/// GET /auth/logout
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar
        .remove(removal_cookie(SESSION_COOKIE))
        .remove(removal_cookie(OAUTH_STATE_COOKIE));
    (jar, Redirect::to("/"))
}

/// GET /auth/status
async fn auth_status(user: super::middleware::MaybeUser) -> Json<serde_json::Value> {
    match user.0 {
        Some(session) => Json(serde_json::json!({
            "authenticated": true,
            "user": crate::api::SessionUserResponse::from(&session),
        })),
        None => Json(serde_json::json!({ "authenticated": false })),
    }
}

/// GET /auth-required
///
/// JSON stand-in for the sign-in prompt page.
async fn auth_required(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "app_name": state.config.app_name,
        "title": "Authentication Required",
        "login_url": "/auth/login",
    }))
}

/// GET /auth/unauthorized
///
/// JSON stand-in for the access-denied page; surfaces and clears the
/// stashed email.
async fn unauthorized(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    let email = jar
        .get(UNAUTHORIZED_EMAIL_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    let jar = jar.remove(removal_cookie(UNAUTHORIZED_EMAIL_COOKIE));

    (
        jar,
        Json(serde_json::json!({
            "app_name": state.config.app_name,
            "title": "Access Denied",
            "email": email,
        })),
    )
}
