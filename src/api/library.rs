//! Library view endpoints
//!
//! The home page is also the session re-sync point: the snapshot is
//! refreshed from the account store and the user is re-validated as
//! still active.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::dto::{LibraryPageResponse, SessionUserResponse};
use crate::AppState;
use crate::auth::session::{
    SESSION_COOKIE, Session, UNAUTHORIZED_EMAIL_COOKIE, build_cookie, create_session_token,
    removal_cookie,
};
use crate::auth::{CurrentUser, UPLOADER_OR_ADMIN};
use crate::data::UserRole;
use crate::error::AppError;
use crate::library::{LibraryFilter, build_view, category_filter};

pub fn library_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/library/:category", get(category_view))
}

/// Optional CSV filter parameters
#[derive(Debug, Default, Deserialize)]
pub struct LibraryQuery {
    types: Option<String>,
    tags: Option<String>,
    playlist_tags: Option<String>,
}

fn csv(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// GET /
///
/// Re-syncs the session snapshot from the account store, evicting
/// sessions whose account vanished or was deactivated, then renders
/// the full library view.
async fn index(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    jar: CookieJar,
    Query(query): Query<LibraryQuery>,
) -> Result<Response, AppError> {
    let user = state
        .db
        .ensure_user(
            &session.email,
            session.name.as_deref(),
            session.picture.as_deref(),
            false,
        )
        .await?;

    let secure = state.config.should_use_secure_cookies();
    let Some(user) = user.filter(|user| user.active) else {
        tracing::info!(email = %session.email, "session evicted: account missing or inactive");
        let jar = jar
            .remove(removal_cookie(SESSION_COOKIE))
            .add(build_cookie(UNAUTHORIZED_EMAIL_COOKIE, session.email, secure));
        return Ok((jar, Redirect::to("/auth/unauthorized")).into_response());
    };

    // Refresh the snapshot; role changes take effect from here on.
    let refreshed = Session::from_user(&user, state.config.auth.session_max_age);
    let token = create_session_token(&refreshed, &state.config.auth.session_secret)?;
    let jar = jar.add(build_cookie(SESSION_COOKIE, token, secure));

    let records = state.db.list_media().await?;
    let mut filter = LibraryFilter::default();
    filter.extend(csv(&query.types), csv(&query.tags), csv(&query.playlist_tags));
    let media_items = build_view(&records, &filter);

    let body = LibraryPageResponse {
        app_name: state.config.app_name.clone(),
        title: "Library".to_string(),
        subtitle: "Upload, view, and play your media".to_string(),
        user: SessionUserResponse::from(&refreshed),
        filters: filter,
        media_items,
        can_upload: UPLOADER_OR_ADMIN.authorize(&refreshed).is_ok(),
        is_admin: refreshed.role == UserRole::Admin,
    };

    Ok((jar, Json(body)).into_response())
}

/// GET /library/:category
///
/// Category landing page with its pre-selected filter; extra CSV query
/// filters narrow it further.
async fn category_view(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<LibraryQuery>,
) -> Result<Json<LibraryPageResponse>, AppError> {
    let category = state
        .config
        .library
        .categories
        .iter()
        .find(|category| category.slug == slug)
        .ok_or(AppError::NotFound)?;

    let records = state.db.list_media().await?;
    let mut filter = category_filter(category, &records);
    filter.extend(csv(&query.types), csv(&query.tags), csv(&query.playlist_tags));
    let media_items = build_view(&records, &filter);

    Ok(Json(LibraryPageResponse {
        app_name: state.config.app_name.clone(),
        title: category.title.clone(),
        subtitle: format!("Your {} collection", category.title.to_lowercase()),
        user: SessionUserResponse::from(&session),
        filters: filter,
        media_items,
        can_upload: UPLOADER_OR_ADMIN.authorize(&session).is_ok(),
        is_admin: session.role == UserRole::Admin,
    }))
}
