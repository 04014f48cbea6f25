//! CRUD operations for tasks.

use chrono::Utc;
use rusqlite::params;
use taskhub_shared::protocol::{NewTask, Task, TaskPatch};
use taskhub_shared::types::{ProjectId, TaskId, TaskPriority, TaskStatus};

use crate::database::{date_col, date_param, enum_col, timestamp_col, Database};
use crate::error::{Result, StoreError};

const TASK_COLUMNS: &str =
    "id, title, description, project_id, priority, status, assigned_to, deadline, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a task. New tasks always start with status `new`.
    pub fn create_task(&self, task: &NewTask) -> Result<Task> {
        self.conn()
            .execute(
                "INSERT INTO tasks (title, description, project_id, priority, status, assigned_to, deadline, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    task.title.trim(),
                    task.description,
                    task.project_id,
                    task.priority.as_str(),
                    TaskStatus::New.as_str(),
                    task.assigned_to,
                    date_param(task.deadline),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(StoreError::from_write)?;

        self.get_task(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_task(&self, id: TaskId) -> Result<Task> {
        self.conn()
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .map_err(StoreError::from_read)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.query_tasks(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id ASC"), None)
    }

    pub fn list_tasks_for_project(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY id ASC"),
            Some(project_id),
        )
    }

    /// Number of tasks of `project_id` whose status is not `completed`.
    pub fn count_incomplete_tasks(&self, project_id: ProjectId) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM tasks WHERE project_id = ?1 AND status != ?2",
            params![project_id, TaskStatus::Completed.as_str()],
            |row| row.get(0),
        )?)
    }

    fn query_tasks(&self, sql: &str, project_id: Option<ProjectId>) -> Result<Vec<Task>> {
        let mut stmt = self.conn().prepare(sql)?;

        let rows = match project_id {
            Some(id) => stmt.query_map(params![id], row_to_task)?,
            None => stmt.query_map([], row_to_task)?,
        };

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial update in one statement and bump `updated_at`.
    pub fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        let affected = self
            .conn()
            .execute(
                "UPDATE tasks SET
                    title       = COALESCE(?1, title),
                    description = COALESCE(?2, description),
                    priority    = COALESCE(?3, priority),
                    status      = COALESCE(?4, status),
                    deadline    = COALESCE(?5, deadline),
                    assigned_to = COALESCE(?6, assigned_to),
                    updated_at  = ?7
                 WHERE id = ?8",
                params![
                    patch.title.as_deref().map(str::trim),
                    patch.description,
                    patch.priority.map(|p| p.as_str()),
                    patch.status.map(|s| s.as_str()),
                    date_param(patch.deadline),
                    patch.assigned_to,
                    Utc::now().to_rfc3339(),
                    id,
                ],
            )
            .map_err(StoreError::from_write)?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_task(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a task and its messages. Returns `true` if a row was deleted.
    pub fn delete_task(&self, id: TaskId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])
            .map_err(StoreError::from_write)?;
        Ok(affected > 0)
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        project_id: row.get(3)?,
        priority: TaskPriority::from_str_lossy(&row.get::<_, String>(4)?),
        status: enum_col(row, 5)?,
        assigned_to: row.get(6)?,
        deadline: date_col(row, 7)?,
        updated_at: timestamp_col(row, 8)?,
    })
}
