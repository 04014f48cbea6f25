use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taskhub_shared::protocol::{MessageBody, NewTask, Task, TaskPatch};
use taskhub_shared::types::{ProjectId, ProjectStatus, Role, TaskId, TaskStatus, UserId};
use taskhub_shared::validation::{validate_new_task, validate_task_patch};
use taskhub_store::{Database, StoreError};
use tracing::info;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::ServerError;

/// Tasks may only be assigned to existing developer accounts.
fn ensure_developer(db: &Database, user_id: UserId) -> Result<(), ServerError> {
    match db.get_user(user_id) {
        Ok(user) if user.role == Role::Developer => Ok(()),
        Ok(_) => Err(ServerError::conflict(
            "assigned_to",
            "Tasks can only be assigned to developers",
        )),
        Err(StoreError::NotFound) => Err(ServerError::conflict("assigned_to", "Unknown user")),
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn list(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Task>>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_tasks()?))
}

pub(super) async fn list_for_project(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
) -> Result<Json<Vec<Task>>, ServerError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_tasks_for_project(project_id)?))
}

pub(super) async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(task): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ServerError> {
    auth.require_project_manager()?;
    validate_new_task(&task)?;

    let db = state.db.lock().await;
    let project = db.get_project(task.project_id).map_err(|e| match e {
        StoreError::NotFound => ServerError::conflict("project_id", "Unknown project"),
        other => other.into(),
    })?;
    if project.status == ProjectStatus::Completed {
        return Err(ServerError::conflict(
            "project_id",
            "Tasks cannot be added to a completed project",
        ));
    }
    ensure_developer(&db, task.assigned_to)?;

    let created = db.create_task(&task)?;
    info!(id = created.id, project_id = created.project_id, "task created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Partial update. Developers may only move tasks assigned to them, and no
/// task of a completed project may leave the completed state.
pub(super) async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ServerError> {
    validate_task_patch(&patch)?;

    let db = state.db.lock().await;
    let current = db.get_task(id).map_err(|e| not_found(e, id))?;
    if !auth.role().can_manage_projects() && current.assigned_to != auth.id() {
        return Err(ServerError::Forbidden("This task is not assigned to you".into()));
    }
    if let Some(assignee) = patch.assigned_to {
        auth.require_project_manager()?;
        ensure_developer(&db, assignee)?;
    }
    if matches!(patch.status, Some(status) if status != TaskStatus::Completed) {
        let project = db.get_project(current.project_id)?;
        if project.status == ProjectStatus::Completed {
            return Err(ServerError::conflict(
                "status",
                "Tasks of a completed project cannot be reopened",
            ));
        }
    }

    let updated = db.update_task(id, &patch).map_err(|e| not_found(e, id))?;
    info!(id, status = %updated.status, by = auth.id(), "task updated");
    Ok(Json(updated))
}

pub(super) async fn remove(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<Json<MessageBody>, ServerError> {
    auth.require_project_manager()?;

    let db = state.db.lock().await;
    if !db.delete_task(id)? {
        return Err(ServerError::NotFound(format!("Task {id} not found")));
    }
    info!(id, "task deleted");
    Ok(Json(MessageBody {
        message: "Task deleted successfully".into(),
    }))
}

fn not_found(err: StoreError, id: TaskId) -> ServerError {
    match err {
        StoreError::NotFound => ServerError::NotFound(format!("Task {id} not found")),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use taskhub_shared::types::Role;

    use crate::api::test_util::{app, TestApp};

    async fn project(app: &TestApp, token: &str, manager_id: i64) -> i64 {
        let category = app.category("Web").await;
        let (_, body) = app
            .send(
                Method::POST,
                "/projects",
                Some(token),
                Some(json!({
                    "name": "Website",
                    "description": "Public site",
                    "category_id": category,
                    "manager_id": manager_id
                })),
            )
            .await;
        body["id"].as_i64().unwrap()
    }

    fn new_task(project_id: i64, assigned_to: i64) -> Value {
        json!({
            "title": "Landing page",
            "description": "Hero and footer",
            "project_id": project_id,
            "priority": "high",
            "assigned_to": assigned_to,
            "deadline": "2025-05-01"
        })
    }

    #[tokio::test]
    async fn create_list_and_filter_by_project() {
        let app = app();
        let (manager, token) = app.user("Mara", Role::Manager).await;
        let (dev, _) = app.user("Dan", Role::Developer).await;
        let project_id = project(&app, &token, manager.id).await;

        let (status, task) = app
            .send(Method::POST, "/tasks", Some(&token), Some(new_task(project_id, dev.id)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["status"], "new");

        let (_, all) = app.send(Method::GET, "/tasks", Some(&token), None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);

        let (_, scoped) = app
            .send(Method::GET, &format!("/tasks/project/{project_id}"), Some(&token), None)
            .await;
        assert_eq!(scoped[0]["id"], task["id"]);

        let (_, none) = app.send(Method::GET, "/tasks/project/999", Some(&token), None).await;
        assert!(none.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn assignee_must_be_a_developer() {
        let app = app();
        let (manager, token) = app.user("Mara", Role::Manager).await;
        let project_id = project(&app, &token, manager.id).await;

        let (status, body) = app
            .send(Method::POST, "/tasks", Some(&token), Some(new_task(project_id, manager.id)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "assigned_to");
    }

    #[tokio::test]
    async fn developer_moves_own_task_only() {
        let app = app();
        let (manager, token) = app.user("Mara", Role::Manager).await;
        let (dev, dev_token) = app.user("Dan", Role::Developer).await;
        let (_, other_token) = app.user("Eve", Role::Developer).await;
        let project_id = project(&app, &token, manager.id).await;
        let (_, task) = app
            .send(Method::POST, "/tasks", Some(&token), Some(new_task(project_id, dev.id)))
            .await;
        let uri = format!("/tasks/{}", task["id"]);

        let (status, body) = app
            .send(Method::PATCH, &uri, Some(&dev_token), Some(json!({ "status": "in progress" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "in progress");
        assert_eq!(body["title"], "Landing page");

        let (status, _) = app
            .send(Method::PATCH, &uri, Some(&other_token), Some(json!({ "status": "completed" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send(Method::PATCH, "/tasks/999", Some(&token), Some(json!({ "status": "paused" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn complete_project(app: &TestApp, token: &str, project_id: i64) {
        let (_, rows) = app
            .send(Method::GET, &format!("/projects/{project_id}"), Some(token), None)
            .await;
        let mut project = rows[0].clone();
        project["status"] = json!("completed");
        let (status, _) = app
            .send(Method::PUT, &format!("/projects/{project_id}"), Some(token), Some(project))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn completed_project_takes_no_new_tasks() {
        let app = app();
        let (manager, token) = app.user("Mara", Role::Manager).await;
        let (dev, _) = app.user("Dan", Role::Developer).await;
        let project_id = project(&app, &token, manager.id).await;
        complete_project(&app, &token, project_id).await;

        let (status, body) = app
            .send(Method::POST, "/tasks", Some(&token), Some(new_task(project_id, dev.id)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "project_id");

        let (_, scoped) = app
            .send(Method::GET, &format!("/tasks/project/{project_id}"), Some(&token), None)
            .await;
        assert!(scoped.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tasks_of_completed_project_stay_completed() {
        let app = app();
        let (manager, token) = app.user("Mara", Role::Manager).await;
        let (dev, dev_token) = app.user("Dan", Role::Developer).await;
        let project_id = project(&app, &token, manager.id).await;
        let (_, task) = app
            .send(Method::POST, "/tasks", Some(&token), Some(new_task(project_id, dev.id)))
            .await;
        let uri = format!("/tasks/{}", task["id"]);
        let (status, _) = app
            .send(Method::PATCH, &uri, Some(&dev_token), Some(json!({ "status": "completed" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        complete_project(&app, &token, project_id).await;

        let (status, body) = app
            .send(Method::PATCH, &uri, Some(&dev_token), Some(json!({ "status": "returned" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "status");

        // Edits that keep the task completed still go through.
        let (status, body) = app
            .send(Method::PATCH, &uri, Some(&token), Some(json!({ "title": "Landing page v2" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
    }

    #[tokio::test]
    async fn delete_task() {
        let app = app();
        let (manager, token) = app.user("Mara", Role::Manager).await;
        let (dev, dev_token) = app.user("Dan", Role::Developer).await;
        let project_id = project(&app, &token, manager.id).await;
        let (_, task) = app
            .send(Method::POST, "/tasks", Some(&token), Some(new_task(project_id, dev.id)))
            .await;
        let uri = format!("/tasks/{}", task["id"]);

        let (status, _) = app.send(Method::DELETE, &uri, Some(&dev_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
