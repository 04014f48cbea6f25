use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taskhub_shared::protocol::{Message, MessageCreated, NewMessage};
use taskhub_shared::types::TaskId;
use taskhub_shared::validation::validate_new_message;
use taskhub_store::StoreError;
use tracing::{debug, info};

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{AckFailure, ServerError};

pub(super) async fn history(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let db = state.db.lock().await;
    let messages = db.get_messages_for_task(task_id)?;
    debug!(task_id, count = messages.len(), "message history");
    Ok(Json(messages))
}

pub(super) async fn send(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<NewMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageCreated>), AckFailure> {
    let Json(message) = payload.map_err(|_| {
        ServerError::BadRequest("task_id, sender_id and message are required".into())
    })?;
    if message.sender_id != auth.id() {
        return Err(ServerError::Forbidden("Messages can only be sent as yourself".into()).into());
    }
    validate_new_message(&message)?;

    let db = state.db.lock().await;
    if let Err(e) = db.get_task(message.task_id) {
        return Err(match e {
            StoreError::NotFound => {
                ServerError::NotFound(format!("Task {} not found", message.task_id)).into()
            }
            other => other.into(),
        });
    }
    let stored = db.insert_message(&message)?;
    info!(id = stored.id, task_id = stored.task_id, "message stored");

    Ok((
        StatusCode::CREATED,
        Json(MessageCreated {
            success: true,
            new_message: stored,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use taskhub_shared::protocol::{NewProject, NewTask};
    use taskhub_shared::types::{Role, TaskPriority};

    use crate::api::test_util::app;

    #[tokio::test]
    async fn send_then_read_history() {
        let app = app();
        let (manager, _) = app.user("Mara", Role::Manager).await;
        let (dev, token) = app.user("Dan", Role::Developer).await;
        let category = app.category("Web").await;
        let task_id = {
            let db = app.state.db.lock().await;
            let project = db
                .create_project(&NewProject {
                    name: "Website".into(),
                    description: "Public site".into(),
                    category_id: category,
                    manager_id: manager.id,
                    deadline: None,
                })
                .unwrap();
            db.create_task(&NewTask {
                title: "Landing".into(),
                description: None,
                project_id: project.id,
                priority: TaskPriority::Low,
                assigned_to: dev.id,
                deadline: None,
            })
            .unwrap()
            .id
        };

        let (status, body) = app
            .send(
                Method::POST,
                "/api/messages",
                Some(&token),
                Some(json!({ "task_id": task_id, "sender_id": dev.id, "message": "On it" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["newMessage"]["message"], "On it");

        let (status, history) = app
            .send(Method::GET, &format!("/messages/{task_id}"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history[0]["sender_name"], "Dan");
    }

    #[tokio::test]
    async fn malformed_or_foreign_messages_are_refused() {
        let app = app();
        let (dev, token) = app.user("Dan", Role::Developer).await;

        let (status, body) = app
            .send(Method::POST, "/api/messages", Some(&token), Some(json!({ "message": "hi" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = app
            .send(
                Method::POST,
                "/api/messages",
                Some(&token),
                Some(json!({ "task_id": 1, "sender_id": dev.id + 1, "message": "hi" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/messages",
                Some(&token),
                Some(json!({ "task_id": 77, "sender_id": dev.id, "message": "hi" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
