use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taskhub_shared::protocol::{MessageBody, NewUser, User, UserPatch};
use taskhub_shared::types::UserId;
use taskhub_shared::validation::{validate_new_user, validate_user_patch};
use taskhub_store::{Database, StoreError};
use tracing::info;

use super::AppState;
use crate::auth::{hash_password, AuthUser};
use crate::error::ServerError;

fn duplicate_message(field: &str) -> &'static str {
    match field {
        "email" => "Email already exists",
        _ => "Phone number already exists",
    }
}

/// Reject an email or phone number held by another account.
fn ensure_unique(
    db: &Database,
    email: Option<&str>,
    tel: Option<&str>,
    exclude: Option<UserId>,
) -> Result<(), ServerError> {
    match db.conflicting_user_field(email, tel, exclude)? {
        Some(field) => Err(ServerError::conflict(field, duplicate_message(field))),
        None => Ok(()),
    }
}

pub(super) async fn list(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_users()?))
}

pub(super) async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    auth.require_user_admin()?;
    validate_new_user(&user, None)?;

    let hash = hash_password(&user.password)?;

    let db = state.db.lock().await;
    ensure_unique(&db, Some(&user.email), Some(&user.tel), None)?;
    let created = db.create_user(&user, &hash)?;
    info!(id = created.id, role = %created.role, "user created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>, ServerError> {
    auth.require_self_or_admin(id)?;
    if patch.role.is_some() || patch.status.is_some() {
        auth.require_user_admin()?;
    }
    validate_user_patch(&patch)?;

    let db = state.db.lock().await;
    db.get_user(id).map_err(|e| not_found(e, id))?;
    ensure_unique(&db, patch.email.as_deref(), patch.tel.as_deref(), Some(id))?;

    let updated = db.update_user(id, &patch).map_err(|e| not_found(e, id))?;
    info!(id, by = auth.id(), "user updated");
    Ok(Json(updated))
}

pub(super) async fn remove(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<MessageBody>, ServerError> {
    auth.require_user_admin()?;

    let db = state.db.lock().await;
    let deleted = db.delete_user(id).map_err(|e| match e {
        StoreError::Constraint(_) => ServerError::BadRequest(
            "User still manages projects or has tasks assigned".into(),
        ),
        other => other.into(),
    })?;
    if !deleted {
        return Err(ServerError::NotFound(format!("User {id} not found")));
    }
    info!(id, by = auth.id(), "user deleted");
    Ok(Json(MessageBody {
        message: "User deleted successfully".into(),
    }))
}

fn not_found(err: StoreError, id: UserId) -> ServerError {
    match err {
        StoreError::NotFound => ServerError::NotFound(format!("User {id} not found")),
        other => other.into(),
    }
}
