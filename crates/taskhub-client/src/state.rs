//! Application state shared by every screen.
//!
//! [`AppState`] is built once at startup. It owns the HTTP client, the
//! persisted session and one cache per entity kind; screens hold an
//! `Arc<AppState>` and never talk to the service directly.

use std::path::Path;
use std::sync::Arc;

use taskhub_shared::protocol::{User, UserPatch};
use taskhub_shared::types::{ProjectId, TaskId};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::focus::FocusScope;
use crate::messages::MessageThread;
use crate::projects::ProjectsCache;
use crate::remote::ApiClient;
use crate::session::SessionStore;
use crate::tasks::TasksCache;
use crate::users::UsersCache;

type Result<T> = std::result::Result<T, ClientError>;

/// Outcome of [`AppState::bootstrap`].
#[derive(Debug)]
pub enum Startup {
    /// No saved session; show the login screen.
    Anonymous,
    /// Session restored and every cache loaded.
    SignedIn,
    /// Session restored, but the caches could not be loaded. They keep
    /// whatever they held (nothing on a cold start) until the next load.
    SignedInOffline(ClientError),
}

/// Central client state.
///
/// Holds the HTTP client, the persisted session and one cache per entity
/// kind. Signing out clears the caches and starts a new cache epoch, so a
/// response to a request made under the previous session is discarded.
pub struct AppState {
    /// Settings the HTTP client was built from.
    pub config: ClientConfig,

    /// HTTP client shared by every cache. Carries the session's bearer token.
    pub api: Arc<ApiClient>,

    /// Anonymous or signed-in identity, persisted across restarts.
    pub session: SessionStore,

    /// Projects and categories.
    pub projects: ProjectsCache,

    /// Accounts; also resolves task assignees.
    pub users: UsersCache,

    /// Tasks of every project, with the task-screen views.
    pub tasks: TasksCache,
}

impl AppState {
    /// Build the state around a session file at `session_path`.
    pub fn new(config: ClientConfig, session_path: &Path) -> Result<Self> {
        Self::with_session(config, SessionStore::open(session_path)?)
    }

    /// Build the state with the session file in the platform data directory.
    pub fn open_default(config: ClientConfig) -> Result<Self> {
        Self::with_session(config, SessionStore::open_default()?)
    }

    fn with_session(config: ClientConfig, session: SessionStore) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config)?);
        Ok(Self {
            projects: ProjectsCache::new(api.clone()),
            users: UsersCache::new(api.clone()),
            tasks: TasksCache::new(api.clone()),
            config,
            api,
            session,
        })
    }

    /// Startup: resume a saved session and, if there was one, fill the
    /// caches. `Err` is reserved for session storage failures; a failed load
    /// after a successful restore is [`Startup::SignedInOffline`].
    pub async fn bootstrap(&self) -> Result<Startup> {
        if !self.session.restore(&self.api)? {
            debug!("no saved session");
            return Ok(Startup::Anonymous);
        }
        match self.load_all().await {
            Ok(()) => Ok(Startup::SignedIn),
            Err(e) => {
                warn!(error = %e, "signed in, but the caches could not be loaded");
                Ok(Startup::SignedInOffline(e))
            }
        }
    }

    /// Sign in and fill the caches.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let user = self.session.login(&self.api, email, password).await?;
        self.load_all().await?;
        Ok(user)
    }

    /// Sign out and drop everything cached for the previous user.
    pub fn sign_out(&self) -> Result<()> {
        self.session.logout(&self.api)?;
        self.projects.projects().clear();
        self.projects.categories().clear();
        self.users.cache().clear();
        self.tasks.cache().clear();
        Ok(())
    }

    /// Fetch every collection concurrently.
    pub async fn load_all(&self) -> Result<()> {
        let (_, users, tasks) = tokio::try_join!(
            self.projects.load_all(),
            self.users.load_all(),
            self.tasks.load_all(),
        )?;
        info!(
            projects = self.projects.projects().len(),
            users,
            tasks,
            "caches loaded"
        );
        Ok(())
    }

    /// Edit the signed-in user's own profile and keep the session in step.
    pub async fn update_profile(&self, patch: &UserPatch) -> Result<User> {
        let Some(me) = self.session.current_user() else {
            return Err(ClientError::InvalidState("Not signed in".into()));
        };
        let user = self.users.update_user(me.id, patch).await?;
        self.session.update_profile(user.clone())?;
        Ok(user)
    }

    /// Re-fetch one project's tasks for a screen that just gained focus and
    /// return its completion percentage. `Ok(None)` means the screen lost
    /// focus, or the session ended, before the response arrived and nothing
    /// was merged.
    pub async fn refresh_project_progress(
        &self,
        project_id: ProjectId,
        scope: &FocusScope,
    ) -> Result<Option<u8>> {
        let snapshot = self.tasks.snapshot_project(project_id);
        let Some(fetched) = scope.run(self.api.list_tasks_for_project(project_id)).await else {
            return Ok(None);
        };
        if !self.tasks.merge_project_tasks(snapshot, fetched?) {
            return Ok(None);
        }
        Ok(Some(self.tasks.completion_percentage(project_id)))
    }

    pub fn message_thread(&self, task_id: TaskId) -> MessageThread {
        MessageThread::new(self.api.clone(), task_id)
    }
}
