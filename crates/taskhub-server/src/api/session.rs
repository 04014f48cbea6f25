use axum::extract::State;
use axum::Json;
use taskhub_shared::protocol::{AckBody, ChangePasswordRequest, LoginRequest, LoginResponse};
use taskhub_shared::validation::validate_password_change;
use tracing::{info, warn};

use super::AppState;
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::{AckFailure, ServerError};

pub(super) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    let credentials = {
        let db = state.db.lock().await;
        db.get_credentials(&req.email)?
    };
    let Some(credentials) = credentials else {
        return Err(ServerError::NotFound("User not found".into()));
    };

    if !verify_password(&req.password, &credentials.password_hash)? {
        warn!(user = credentials.user.id, "login rejected: wrong password");
        return Err(ServerError::Unauthorized("Invalid password".into()));
    }

    let token = state.tokens.issue(&credentials.user)?;
    info!(user = credentials.user.id, role = %credentials.user.role, "login");
    Ok(Json(LoginResponse {
        user_data: credentials.user,
        token,
    }))
}

pub(super) async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<AckBody>, AckFailure> {
    if req.user_id != auth.id() {
        return Err(ServerError::Forbidden("You can only change your own password".into()).into());
    }
    validate_password_change(&req.old_password, &req.new_password, None)?;

    let current = {
        let db = state.db.lock().await;
        db.get_password_hash(req.user_id)
            .map_err(|_| ServerError::NotFound("User not found".into()))?
    };
    if !verify_password(&req.old_password, &current)? {
        return Err(ServerError::Unauthorized("Old password is incorrect".into()).into());
    }

    let hash = hash_password(&req.new_password)?;
    let db = state.db.lock().await;
    if !db.set_password_hash(req.user_id, &hash)? {
        return Err(ServerError::NotFound("User not found".into()).into());
    }
    info!(user = req.user_id, "password changed");
    Ok(Json(AckBody {
        success: true,
        message: "Password changed successfully".into(),
    }))
}
