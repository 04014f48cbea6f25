use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taskhub_shared::protocol::{Category, MessageBody, NewCategory, NewProject, Project};
use taskhub_shared::types::{ProjectId, ProjectStatus};
use taskhub_shared::validation::{validate_new_category, validate_new_project, validate_project};
use tracing::info;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::ServerError;

const INCOMPLETE_TASKS: &str =
    "Project status cannot be set to completed because there are incomplete tasks in this project.";

pub(super) async fn list(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_projects()?))
}

/// Answers with a one-element array, which is what clients of this route
/// have always received.
pub(super) async fn get_one(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
) -> Result<Json<Vec<Project>>, ServerError> {
    let db = state.db.lock().await;
    match db.get_project(id) {
        Ok(project) => Ok(Json(vec![project])),
        Err(taskhub_store::StoreError::NotFound) => {
            Err(ServerError::NotFound(format!("Project {id} not found")))
        }
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(project): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), ServerError> {
    auth.require_project_manager()?;
    validate_new_project(&project)?;

    let db = state.db.lock().await;
    let created = db.create_project(&project)?;
    info!(id = created.id, by = auth.id(), "project created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Full replace. Completing a project requires every one of its tasks to be
/// completed first.
pub(super) async fn replace(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
    Json(mut project): Json<Project>,
) -> Result<Json<Project>, ServerError> {
    auth.require_project_manager()?;
    project.id = id;
    validate_project(&project)?;

    let db = state.db.lock().await;
    if project.status == ProjectStatus::Completed && db.count_incomplete_tasks(id)? > 0 {
        return Err(ServerError::conflict("status", INCOMPLETE_TASKS));
    }

    let updated = db.replace_project(&project).map_err(|e| match e {
        taskhub_store::StoreError::NotFound => ServerError::NotFound(format!("Project {id} not found")),
        other => other.into(),
    })?;
    info!(id, status = %updated.status, "project updated");
    Ok(Json(updated))
}

pub(super) async fn remove(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
) -> Result<Json<MessageBody>, ServerError> {
    auth.require_project_manager()?;

    let db = state.db.lock().await;
    if !db.delete_project(id)? {
        return Err(ServerError::NotFound(format!("Project {id} not found")));
    }
    info!(id, "project deleted");
    Ok(Json(MessageBody {
        message: "Project deleted successfully".into(),
    }))
}

pub(super) async fn list_categories(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_categories()?))
}

pub(super) async fn create_category(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(category): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), ServerError> {
    auth.require_project_manager()?;
    validate_new_category(&category)?;

    let db = state.db.lock().await;
    let created = db.create_category(&category)?;
    info!(id = created.id, "category created");
    Ok((StatusCode::CREATED, Json(created)))
}
