//! Projects and their categories.

use std::sync::Arc;

use taskhub_shared::constants::HOME_RECENT_PROJECTS;
use taskhub_shared::ordering::{sort_categories_by_title, sort_projects_by_recent};
use taskhub_shared::protocol::{Category, NewCategory, NewProject, Project};
use taskhub_shared::types::{CategoryId, ProjectId, ProjectStatus};
use taskhub_shared::validation::{
    ensure_project_completable, validate_new_category, validate_new_project, validate_project,
};
use tracing::info;

use crate::cache::{EntityCache, UpdateOutcome};
use crate::error::ClientError;
use crate::remote::ApiClient;
use crate::tasks::TasksCache;

type Result<T> = std::result::Result<T, ClientError>;

pub struct ProjectsCache {
    api: Arc<ApiClient>,
    projects: EntityCache<Project>,
    categories: EntityCache<Category>,
}

impl ProjectsCache {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            projects: EntityCache::new(),
            categories: EntityCache::new(),
        }
    }

    pub fn projects(&self) -> &EntityCache<Project> {
        &self.projects
    }

    pub fn categories(&self) -> &EntityCache<Category> {
        &self.categories
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Fetch projects and categories together.
    pub async fn load_all(&self) -> Result<()> {
        tokio::try_join!(self.load_projects(), self.load_categories())?;
        Ok(())
    }

    pub async fn load_projects(&self) -> Result<usize> {
        self.projects.load_with(|| self.api.list_projects()).await
    }

    pub async fn load_categories(&self) -> Result<usize> {
        self.categories.load_with(|| self.api.list_categories()).await
    }

    /// Re-read one project from the service and merge it in.
    pub async fn refresh_project(&self, id: ProjectId) -> Result<Project> {
        let epoch = self.projects.epoch();
        let project = self.api.get_project(id).await?;
        self.projects.upsert_in(epoch, project.clone());
        Ok(project)
    }

    // ------------------------------------------------------------------
    // Writes: service first, cache second
    // ------------------------------------------------------------------

    pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
        validate_new_project(project)?;
        let epoch = self.projects.epoch();
        let created = self.api.create_project(project).await?;
        self.projects.add_in(epoch, created.clone());
        info!(id = created.id, "project created");
        Ok(created)
    }

    /// Save a full project. Completing it is refused locally, without a
    /// request, while any of its cached tasks is still open.
    pub async fn update_project(&self, project: Project, tasks: &TasksCache) -> Result<Project> {
        validate_project(&project)?;
        tasks
            .cache()
            .with_items(|all| ensure_project_completable(&project, all))?;

        let epoch = self.projects.epoch();
        let confirmed = self.api.update_project(&project).await?;
        if self.projects.upsert_in(epoch, confirmed.clone()) == Some(UpdateOutcome::Stale) {
            return Ok(self.projects.get_by_id(confirmed.id).unwrap_or(confirmed));
        }
        info!(id = confirmed.id, status = %confirmed.status, "project updated");
        Ok(confirmed)
    }

    /// Delete a project and forget its tasks.
    pub async fn delete_project(&self, id: ProjectId, tasks: &TasksCache) -> Result<()> {
        self.api.delete_project(id).await?;
        self.projects.remove(id);
        let dropped = tasks.forget_project(id);
        info!(id, dropped_tasks = dropped, "project deleted");
        Ok(())
    }

    pub async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        validate_new_category(category)?;
        let epoch = self.categories.epoch();
        let created = self.api.create_category(category).await?;
        self.categories.add_in(epoch, created.clone());
        info!(id = created.id, "category created");
        Ok(created)
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn get(&self, id: ProjectId) -> Option<Project> {
        self.projects.get_by_id(id)
    }

    /// Most recently updated first.
    pub fn by_recent(&self) -> Vec<Project> {
        let mut projects = self.projects.get_all();
        sort_projects_by_recent(&mut projects);
        projects
    }

    /// In-progress projects for the home screen, most recent first.
    pub fn recent_in_progress(&self, limit: usize) -> Vec<Project> {
        self.by_recent()
            .into_iter()
            .filter(|p| p.status == ProjectStatus::InProgress)
            .take(limit)
            .collect()
    }

    /// [`recent_in_progress`](Self::recent_in_progress) with the home-screen size.
    pub fn home_projects(&self) -> Vec<Project> {
        self.recent_in_progress(HOME_RECENT_PROJECTS)
    }

    pub fn categories_by_title(&self) -> Vec<Category> {
        let mut categories = self.categories.get_all();
        sort_categories_by_title(&mut categories);
        categories
    }

    pub fn category_title(&self, id: CategoryId) -> Option<String> {
        self.categories.get_by_id(id).map(|c| c.title)
    }
}
