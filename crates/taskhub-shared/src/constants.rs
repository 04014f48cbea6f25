/// Application name
pub const APP_NAME: &str = "TaskHub";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Lifetime of a bearer token issued by `/login`, in days
pub const TOKEN_TTL_DAYS: i64 = 30;

/// Minimum length of a project name or description
pub const MIN_PROJECT_TEXT_LEN: usize = 3;

/// Minimum password length when an account is created
pub const MIN_NEW_USER_PASSWORD_LEN: usize = 6;

/// Minimum password length accepted by the change-password flow
pub const MIN_CHANGED_PASSWORD_LEN: usize = 8;

/// How many in-progress projects the home screen lists
pub const HOME_RECENT_PROJECTS: usize = 4;

/// Date format used for deadlines on the wire
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";
