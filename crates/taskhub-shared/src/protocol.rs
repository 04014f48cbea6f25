//! Request and response bodies of the TaskHub REST API.
//!
//! Field names are the snake_case column names, except for the handful of
//! auth payloads that the mobile client has always sent in camelCase
//! (`userData`, `userId`, `oldPassword`, ...).

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CategoryId, MessageId, ProjectId, ProjectStatus, Role, TaskId, TaskPriority, TaskStatus,
    UserId, UserStatus,
};

// ---------------------------------------------------------------------------
// Projects & categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub manager_id: UserId,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, with = "deadline_format")]
    pub deadline: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// Writable fields of a project. New projects always start as `new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub manager_id: UserId,
    #[serde(default, with = "deadline_format")]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub title: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A user account as the API returns it. The password never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub tel: String,
    pub role: Role,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub tel: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("tel", &self.tel)
            .field("role", &self.role)
            .field("location", &self.location)
            .field("status", &self.status)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Partial update of a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_id: ProjectId,
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    pub assigned_to: UserId,
    #[serde(default, with = "deadline_format")]
    pub deadline: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// Writable fields of a task. New tasks always start as `new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_id: ProjectId,
    #[serde(default)]
    pub priority: TaskPriority,
    pub assigned_to: UserId,
    #[serde(default, with = "deadline_format")]
    pub deadline: Option<NaiveDate>,
}

/// Partial update of a task. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(
        default,
        with = "deadline_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Shorthand for the most common edit: a developer moving a task along.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub task_id: TaskId,
    pub sender_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Joined from the users table by the history endpoint only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub task_id: TaskId,
    pub sender_id: UserId,
    pub message: String,
}

/// `POST /api/messages` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreated {
    pub success: bool,
    #[serde(rename = "newMessage")]
    pub new_message: Message,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "userData")]
    pub user_data: User,
    pub token: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub user_id: UserId,
    pub old_password: String,
    pub new_password: String,
}

impl fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePasswordRequest")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Generic bodies
// ---------------------------------------------------------------------------

/// `{message}` acknowledgment, also used as the generic error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// `{success, message}` body of the change-password and message endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckBody {
    pub success: bool,
    pub message: String,
}

/// `{field, error}` body of a uniqueness or field-level rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrorBody {
    pub field: String,
    pub error: String,
}

// ---------------------------------------------------------------------------
// Deadlines
// ---------------------------------------------------------------------------

/// Parse a deadline sent either as a plain date or as a full RFC 3339
/// timestamp (older rows were stored with a time component).
pub fn parse_deadline(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, crate::constants::DEADLINE_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

/// Serde adapter for optional deadlines: `YYYY-MM-DD` out, date or timestamp
/// in, and an empty string means "no deadline".
pub mod deadline_format {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::constants::DEADLINE_FORMAT;

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.serialize_str(&date.format(DEADLINE_FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_deadline(s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid deadline: {s}"))),
        }
    }
}
