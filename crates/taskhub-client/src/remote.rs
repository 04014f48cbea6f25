//! Typed HTTP client for the TaskHub API.
//!
//! One method per domain operation. The client owns no entity state, only the
//! bearer token of the current session.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use taskhub_shared::protocol::{
    AckBody, Category, ChangePasswordRequest, FieldErrorBody, LoginRequest, LoginResponse,
    Message, MessageBody, MessageCreated, NewCategory, NewMessage, NewProject, NewTask, NewUser,
    Project, Task, TaskPatch, User, UserPatch,
};
use taskhub_shared::types::{ProjectId, TaskId, UserId};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;

type Result<T> = std::result::Result<T, ClientError>;

/// `GET /health` body.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// HTTP client for the TaskHub API, shared by every cache.
pub struct ApiClient {
    http: reqwest::Client,
    /// Service root without a trailing slash.
    base_url: String,
    /// Extra attempts for a GET that failed in transport. Writes never retry.
    get_retries: u32,
    /// Bearer token of the signed-in session.
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            get_retries: config.get_retries,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Install (or clear) the bearer token sent with every request.
    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.request(Method::GET, path).send().await {
                Ok(resp) => return decode(resp).await,
                Err(e) if attempt < self.get_retries => {
                    attempt += 1;
                    warn!(%path, attempt, error = %e, "GET failed, retrying");
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.request(method, path).json(body).send().await?;
        decode(resp).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let resp = self.request(Method::DELETE, path).send().await?;
        let _: MessageBody = decode(resp).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Projects & categories
    // ------------------------------------------------------------------

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get("/projects").await
    }

    pub async fn get_project(&self, id: ProjectId) -> Result<Project> {
        let rows: Vec<Project> = self.get(&format!("/projects/{id}")).await?;
        rows.into_iter().next().ok_or(ClientError::NotFound)
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
        self.send(Method::POST, "/projects", project).await
    }

    pub async fn update_project(&self, project: &Project) -> Result<Project> {
        self.send(Method::PUT, &format!("/projects/{}", project.id), project)
            .await
    }

    pub async fn delete_project(&self, id: ProjectId) -> Result<()> {
        self.delete(&format!("/projects/{id}")).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get("/categories").await
    }

    pub async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        self.send(Method::POST, "/categories", category).await
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.get("/users").await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.send(Method::POST, "/users", user).await
    }

    pub async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<User> {
        self.send(Method::PATCH, &format!("/users/{id}"), patch).await
    }

    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        self.delete(&format!("/users/{id}")).await
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.get("/tasks").await
    }

    pub async fn list_tasks_for_project(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        self.get(&format!("/tasks/project/{project_id}")).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        self.send(Method::POST, "/tasks", task).await
    }

    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        self.send(Method::PATCH, &format!("/tasks/{id}"), patch).await
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        self.delete(&format!("/tasks/{id}")).await
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    pub async fn list_messages(&self, task_id: TaskId) -> Result<Vec<Message>> {
        self.get(&format!("/messages/{task_id}")).await
    }

    pub async fn send_message(&self, message: &NewMessage) -> Result<Message> {
        let created: MessageCreated = self.send(Method::POST, "/api/messages", message).await?;
        Ok(created.new_message)
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// Exchange credentials for a session. An unknown email or a wrong
    /// password both come back as [`ClientError::Auth`].
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        match self.send(Method::POST, "/login", &req).await {
            Err(ClientError::NotFound) => Err(ClientError::Auth("User not found".into())),
            other => other,
        }
    }

    pub async fn change_password(&self, req: &ChangePasswordRequest) -> Result<AckBody> {
        self.send(Method::POST, "/change-password", req).await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("/health").await
    }
}

/// Turn a response into `T`, or into the matching [`ClientError`].
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<T>()
            .await
            .map_err(|e| ClientError::Transport(format!("invalid response body: {e}")));
    }

    let body = resp.text().await.unwrap_or_default();
    let err = error_from_body(status, &body);
    debug!(status = status.as_u16(), error = %err, "request rejected");
    Err(err)
}

fn error_from_body(status: StatusCode, body: &str) -> ClientError {
    if status == StatusCode::BAD_REQUEST {
        if let Ok(FieldErrorBody { field, error }) = serde_json::from_str(body) {
            return ClientError::Conflict { field, error };
        }
    }

    let message = serde_json::from_str::<MessageBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });

    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth(message),
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    }
}
