use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

// Server-assigned row identifiers.
pub type ProjectId = i64;
pub type CategoryId = i64;
pub type UserId = i64;
pub type TaskId = i64;
pub type MessageId = i64;

/// Declares a unit enum whose wire and column form is a fixed lowercase string.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Lifecycle of a project.
    ProjectStatus, "project status" {
        New => "new",
        InProgress => "in progress",
        Completed => "completed",
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::New
    }
}

text_enum! {
    /// Lifecycle of a task.
    TaskStatus, "task status" {
        New => "new",
        InProgress => "in progress",
        Paused => "paused",
        ToCheck => "to check",
        Completed => "completed",
        Returned => "returned",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::New
    }
}

text_enum! {
    /// Account role. Drives which screens and writes a session may reach.
    Role, "role" {
        Root => "root",
        Admin => "admin",
        Manager => "manager",
        Developer => "developer",
    }
}

impl Role {
    /// Root and admin accounts see the users tab and manage accounts.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Root | Role::Admin)
    }

    /// Everyone but developers creates, edits and deletes projects and tasks.
    pub fn can_manage_projects(&self) -> bool {
        !matches!(self, Role::Developer)
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Developer
    }
}

text_enum! {
    /// Account state.
    UserStatus, "user status" {
        Active => "active",
        Inactive => "inactive",
        Blocked => "blocked",
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Task priority.
///
/// Anything the server sends that is not one of the three known levels decodes
/// as [`TaskPriority::Unknown`] and sorts after `low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl TaskPriority {
    pub const KNOWN: &'static [TaskPriority] =
        &[TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
            TaskPriority::Unknown => "unknown",
        }
    }

    /// Sort rank: high=1, medium=2, low=3, anything else 4.
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::High => 1,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 3,
            TaskPriority::Unknown => 4,
        }
    }

    /// Case-insensitive parse that never fails.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => TaskPriority::High,
            "medium" => TaskPriority::Medium,
            "low" => TaskPriority::Low,
            _ => TaskPriority::Unknown,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
