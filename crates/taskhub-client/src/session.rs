//! The signed-in identity, persisted across restarts.
//!
//! A session is either anonymous or holds the user and bearer token returned
//! by `POST /login`. It is stored as one JSON row in a small SQLite file so a
//! restart can resume without a network call.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use taskhub_shared::protocol::{ChangePasswordRequest, User};
use taskhub_shared::validation::validate_password_change;
use tracing::{info, warn};

use crate::error::ClientError;
use crate::remote::ApiClient;

type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "userData")]
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Session),
}

/// Single-row session table in a local SQLite file.
pub(crate) struct SessionFile {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SessionFile {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                json TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    fn load(&self) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        Ok(conn
            .query_row("SELECT json FROM session WHERE id = 1", [], |row| row.get(0))
            .optional()?)
    }

    pub(crate) fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session)
            .map_err(|e| ClientError::Storage(format!("Failed to serialize session: {e}")))?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT OR REPLACE INTO session (id, json) VALUES (1, ?1)",
            params![json],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM session", [])?;
        Ok(())
    }
}

pub struct SessionStore {
    file: SessionFile,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Open the session file in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("com", "TaskHub", "taskhub").ok_or_else(|| {
            ClientError::Storage("Could not determine a data directory".into())
        })?;
        Self::open(&dirs.data_dir().join("session.db"))
    }

    /// Open (or create) the session file at an explicit path. Starts anonymous;
    /// call [`SessionStore::restore`] to pick up a saved session.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: SessionFile::open(path)?,
            current: RwLock::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn state(&self) -> SessionState {
        match self.read().clone() {
            Some(session) => SessionState::Authenticated(session),
            None => SessionState::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    /// Root and admin sessions reach the users screens.
    pub fn can_manage_users(&self) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|s| s.user.role.can_manage_users())
    }

    pub fn can_manage_projects(&self) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|s| s.user.role.can_manage_projects())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }

    fn install(&self, api: &ApiClient, session: Session) {
        api.set_token(Some(session.token.clone()));
        *self.write() = Some(session);
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Anonymous → Authenticated. The session is persisted before it is
    /// installed, so a storage failure leaves the store anonymous.
    pub async fn login(&self, api: &ApiClient, email: &str, password: &str) -> Result<User> {
        if self.is_authenticated() {
            return Err(ClientError::InvalidState("Already signed in; log out first".into()));
        }

        let resp = api.login(email, password).await.inspect_err(|e| {
            warn!(error = %e, "login failed");
        })?;
        let session = Session {
            user: resp.user_data,
            token: resp.token,
        };
        self.file.save(&session)?;

        let user = session.user.clone();
        self.install(api, session);
        info!(user = user.id, role = %user.role, "signed in");
        Ok(user)
    }

    /// Resume the saved session without touching the network. Returns whether
    /// a session was found. The token's expiry is not checked here; the first
    /// rejected request surfaces it.
    pub fn restore(&self, api: &ApiClient) -> Result<bool> {
        let Some(json) = self.file.load()? else {
            return Ok(false);
        };
        match serde_json::from_str::<Session>(&json) {
            Ok(session) => {
                info!(user = session.user.id, "session restored");
                self.install(api, session);
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable saved session");
                self.file.clear()?;
                Ok(false)
            }
        }
    }

    /// Replace the signed-in user after a confirmed profile edit.
    pub fn update_profile(&self, user: User) -> Result<()> {
        let mut current = self.write();
        let Some(session) = current.as_mut() else {
            return Err(ClientError::InvalidState("Not signed in".into()));
        };
        if session.user.id != user.id {
            return Err(ClientError::InvalidState(
                "Profile belongs to a different user".into(),
            ));
        }

        let updated = Session {
            user,
            token: session.token.clone(),
        };
        self.file.save(&updated)?;
        *session = updated;
        Ok(())
    }

    /// Authenticated → Anonymous. Logging out while anonymous does nothing.
    pub fn logout(&self, api: &ApiClient) -> Result<()> {
        self.file.clear()?;
        api.set_token(None);
        if let Some(session) = self.write().take() {
            info!(user = session.user.id, "signed out");
        }
        Ok(())
    }

    /// Change the signed-in user's password after checking the local rules.
    pub async fn change_password(
        &self,
        api: &ApiClient,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        let Some(user) = self.current_user() else {
            return Err(ClientError::InvalidState("Not signed in".into()));
        };
        validate_password_change(old_password, new_password, Some(confirm_password))?;

        let req = ChangePasswordRequest {
            user_id: user.id,
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        api.change_password(&req).await?;
        info!(user = user.id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use taskhub_shared::types::{Role, UserStatus};

    use super::*;
    use crate::config::ClientConfig;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            tel: "0712345678".into(),
            role,
            location: None,
            status: UserStatus::Active,
        }
    }

    fn api() -> ApiClient {
        ApiClient::new(&ClientConfig::default()).unwrap()
    }

    fn saved(dir: &Path, session: &Session) -> PathBuf {
        let path = dir.join("session.db");
        SessionFile::open(&path).unwrap().save(session).unwrap();
        path
    }

    #[test]
    fn restore_without_saved_session_stays_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(&dir.path().join("session.db")).unwrap();
        assert!(!store.restore(&api()).unwrap());
        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(!store.can_manage_projects());
    }

    #[test]
    fn restore_installs_token_and_user() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session {
            user: user(3, Role::Admin),
            token: "tok".into(),
        };
        let path = saved(dir.path(), &session);

        let api = api();
        let store = SessionStore::open(&path).unwrap();
        assert!(store.restore(&api).unwrap());
        assert_eq!(store.state(), SessionState::Authenticated(session));
        assert_eq!(api.token().as_deref(), Some("tok"));
        assert!(store.can_manage_users());
    }

    #[test]
    fn saved_json_uses_user_data_key() {
        let session = Session {
            user: user(1, Role::Developer),
            token: "t".into(),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["userData"]["id"], 1);
    }

    #[test]
    fn update_profile_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = saved(
            dir.path(),
            &Session {
                user: user(3, Role::Developer),
                token: "tok".into(),
            },
        );
        let api = api();
        let store = SessionStore::open(&path).unwrap();

        let mut renamed = user(3, Role::Developer);
        renamed.name = "Ana Maria".into();
        assert!(matches!(
            store.update_profile(renamed.clone()),
            Err(ClientError::InvalidState(_))
        ));

        store.restore(&api).unwrap();
        assert!(matches!(
            store.update_profile(user(4, Role::Developer)),
            Err(ClientError::InvalidState(_))
        ));
        store.update_profile(renamed).unwrap();

        let reopened = SessionStore::open(&path).unwrap();
        reopened.restore(&api).unwrap();
        assert_eq!(reopened.current_user().unwrap().name, "Ana Maria");
    }

    #[test]
    fn logout_erases_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = saved(
            dir.path(),
            &Session {
                user: user(3, Role::Manager),
                token: "tok".into(),
            },
        );
        let api = api();
        let store = SessionStore::open(&path).unwrap();
        store.restore(&api).unwrap();

        store.logout(&api).unwrap();
        assert!(!store.is_authenticated());
        assert!(api.token().is_none());
        assert!(!SessionStore::open(&path).unwrap().restore(&api).unwrap());
    }

    #[test]
    fn corrupt_session_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");
        {
            let file = SessionFile::open(&path).unwrap();
            let conn = file.conn.lock().unwrap();
            conn.execute("INSERT INTO session (id, json) VALUES (1, 'not json')", [])
                .unwrap();
        }
        let store = SessionStore::open(&path).unwrap();
        assert!(!store.restore(&api()).unwrap());
    }

    #[tokio::test]
    async fn change_password_checks_locally_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(&dir.path().join("session.db")).unwrap();
        let api = api();

        let err = store
            .change_password(&api, "oldpass12", "newpass123", "newpass123")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));

        let path = saved(
            dir.path(),
            &Session {
                user: user(3, Role::Developer),
                token: "tok".into(),
            },
        );
        let store = SessionStore::open(&path).unwrap();
        store.restore(&api).unwrap();
        let err = store
            .change_password(&api, "oldpass12", "newpass123", "mismatch99")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
