//! Admin API endpoints
//!
//! Account management. All routes require the admin role; the role
//! check runs against the session snapshot.

use axum::{
    Router,
    extract::{Form, Path, State},
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;

use super::dto::UserResponse;
use crate::AppState;
use crate::auth::{ADMIN_ONLY, CurrentUser};
use crate::data::UserRole;
use crate::error::AppError;

/// Create admin router
///
/// Routes:
/// - GET /admin/users - List accounts
/// - POST /admin/users - Provision or reactivate an account
/// - POST /admin/users/:id/role - Change an account's role
/// - POST /admin/users/:id/active - Toggle an account's active flag
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(add_user))
        .route("/users/:id/role", post(change_role))
        .route("/users/:id/active", post(change_active))
}

/// GET /admin/users
async fn list_users(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    ADMIN_ONLY.authorize(&session)?;
    let users = state.db.list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct AddUserForm {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<String>,
}

/// POST /admin/users
///
/// Idempotent provisioning: creates the account or reactivates an
/// existing one, always leaving it active.
async fn add_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Form(form): Form<AddUserForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    ADMIN_ONLY.authorize(&session)?;

    if form.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    let role = match form.role.as_deref() {
        None | Some("") => UserRole::Viewer,
        Some(value) => UserRole::parse(value)
            .ok_or_else(|| AppError::Validation(format!("Unknown role: {value}")))?,
    };

    let (user, created) = state
        .db
        .add_or_activate_user(&form.email, form.name.as_deref(), role)
        .await?;

    Ok(Json(serde_json::json!({
        "user": UserResponse::from(&user),
        "created": created,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// POST /admin/users/:id/role
async fn change_role(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<RoleForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    ADMIN_ONLY.authorize(&session)?;

    let role = UserRole::parse(&form.role)
        .ok_or_else(|| AppError::Validation(format!("Unknown role: {}", form.role)))?;
    state.db.update_user_role(id, role).await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    pub active: String,
}

/// POST /admin/users/:id/active
async fn change_active(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<ActiveForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    ADMIN_ONLY.authorize(&session)?;

    let active = form.active.trim().eq_ignore_ascii_case("true");
    state.db.set_user_active(id, active).await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
