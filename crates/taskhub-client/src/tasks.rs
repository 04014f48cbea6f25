//! Tasks, with the ordering and progress views of the task screens.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use taskhub_shared::ordering::sort_tasks;
use taskhub_shared::progress::{progress_for_day, project_completion, DayProgress};
use taskhub_shared::protocol::{NewTask, Task, TaskPatch};
use taskhub_shared::types::{ProjectId, Role, TaskId};
use taskhub_shared::validation::{validate_new_task, validate_task_patch};
use taskhub_shared::ValidationErrors;
use tracing::{debug, info};

use crate::cache::{CacheEpoch, EntityCache, UpdateOutcome};
use crate::error::ClientError;
use crate::remote::ApiClient;
use crate::users::UsersCache;

type Result<T> = std::result::Result<T, ClientError>;

/// The tasks of one project as cached when its listing was requested.
///
/// Only these ids may be pruned by the listing: a task confirmed while the
/// request was in flight is absent from the response but still exists.
#[derive(Debug, Clone)]
pub struct ProjectTasksSnapshot {
    project_id: ProjectId,
    epoch: CacheEpoch,
    ids: HashSet<TaskId>,
}

pub struct TasksCache {
    api: Arc<ApiClient>,
    tasks: EntityCache<Task>,
}

impl TasksCache {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            tasks: EntityCache::new(),
        }
    }

    pub fn cache(&self) -> &EntityCache<Task> {
        &self.tasks
    }

    pub async fn load_all(&self) -> Result<usize> {
        self.tasks.load_with(|| self.api.list_tasks()).await
    }

    /// Fetch the tasks of one project from the service on every call and merge
    /// them in. Cached tasks of that project missing from the listing are
    /// dropped, unless they were confirmed after the request went out.
    /// Returns the project's tasks in display order.
    pub async fn get_by_project_id(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        let snapshot = self.snapshot_project(project_id);
        let fresh = self.api.list_tasks_for_project(project_id).await?;
        self.merge_project_tasks(snapshot, fresh);
        Ok(self.for_project(project_id))
    }

    /// Take this before requesting a project's tasks.
    pub fn snapshot_project(&self, project_id: ProjectId) -> ProjectTasksSnapshot {
        let epoch = self.tasks.epoch();
        let ids: HashSet<TaskId> = self.tasks.with_items(|all| {
            all.iter()
                .filter(|t| t.project_id == project_id)
                .map(|t| t.id)
                .collect()
        });
        ProjectTasksSnapshot {
            project_id,
            epoch,
            ids,
        }
    }

    /// Merge a listing of one project's tasks with the revision check.
    ///
    /// Snapshot ids missing from the listing were deleted on the service and
    /// are dropped. Returns false when the cache was cleared in the meantime
    /// and nothing was merged.
    pub fn merge_project_tasks(&self, snapshot: ProjectTasksSnapshot, fresh: Vec<Task>) -> bool {
        let ProjectTasksSnapshot {
            project_id,
            epoch,
            ids: known,
        } = snapshot;
        let listed: HashSet<TaskId> = fresh.iter().map(|t| t.id).collect();

        let Some(gone) = self.tasks.retain_in(epoch, |t| {
            t.project_id != project_id || !known.contains(&t.id) || listed.contains(&t.id)
        }) else {
            return false;
        };
        let mut stale = 0;
        for task in fresh {
            match self.tasks.upsert_in(epoch, task) {
                Some(UpdateOutcome::Applied) => {}
                Some(UpdateOutcome::Stale) => stale += 1,
                None => return false,
            }
        }
        debug!(project_id, gone, stale, "project tasks merged");
        true
    }

    // ------------------------------------------------------------------
    // Writes: service first, cache second
    // ------------------------------------------------------------------

    /// Create a task. The assignee must be a developer known to `users`.
    pub async fn create_task(&self, task: &NewTask, users: &UsersCache) -> Result<Task> {
        validate_new_task(task)?;
        match users.get(task.assigned_to) {
            Some(user) if user.role == Role::Developer => {}
            _ => {
                return Err(ValidationErrors::single(
                    "assigned_to",
                    "Tasks can only be assigned to developers",
                )
                .into())
            }
        }

        let epoch = self.tasks.epoch();
        let created = self.api.create_task(task).await?;
        self.tasks.add_in(epoch, created.clone());
        info!(id = created.id, project_id = created.project_id, "task created");
        Ok(created)
    }

    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        validate_task_patch(patch)?;
        let epoch = self.tasks.epoch();
        let confirmed = self.api.update_task(id, patch).await?;
        match self.tasks.upsert_in(epoch, confirmed.clone()) {
            Some(UpdateOutcome::Stale) => Ok(self.tasks.get_by_id(id).unwrap_or(confirmed)),
            Some(UpdateOutcome::Applied) | None => {
                info!(id, status = %confirmed.status, "task updated");
                Ok(confirmed)
            }
        }
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        self.api.delete_task(id).await?;
        self.tasks.remove(id);
        info!(id, "task deleted");
        Ok(())
    }

    /// Drop every cached task of a deleted project.
    pub fn forget_project(&self, project_id: ProjectId) -> usize {
        self.tasks.retain(|t| t.project_id != project_id)
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.get_by_id(id)
    }

    /// Priority first (high, medium, low, unknown), then earliest deadline,
    /// tasks without a deadline last.
    pub fn sorted(&self) -> Vec<Task> {
        let mut tasks = self.tasks.get_all();
        sort_tasks(&mut tasks);
        tasks
    }

    pub fn for_project(&self, project_id: ProjectId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .with_items(|all| all.iter().filter(|t| t.project_id == project_id).cloned().collect());
        sort_tasks(&mut tasks);
        tasks
    }

    pub fn due_on(&self, date: NaiveDate) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .with_items(|all| all.iter().filter(|t| t.deadline == Some(date)).cloned().collect());
        sort_tasks(&mut tasks);
        tasks
    }

    /// Number of tasks due on each date that has any.
    pub fn counts_by_due_date(&self) -> BTreeMap<NaiveDate, usize> {
        self.tasks.with_items(|all| {
            let mut counts = BTreeMap::new();
            for deadline in all.iter().filter_map(|t| t.deadline) {
                *counts.entry(deadline).or_insert(0) += 1;
            }
            counts
        })
    }

    pub fn today_progress(&self, today: NaiveDate) -> DayProgress {
        self.tasks.with_items(|all| progress_for_day(all, today))
    }

    pub fn completion_percentage(&self, project_id: ProjectId) -> u8 {
        self.tasks.with_items(|all| project_completion(project_id, all))
    }
}
