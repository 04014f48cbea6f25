//! CRUD operations for projects.

use chrono::Utc;
use rusqlite::params;
use taskhub_shared::protocol::{NewProject, Project};
use taskhub_shared::types::{ProjectId, ProjectStatus};

use crate::database::{date_col, date_param, enum_col, timestamp_col, Database};
use crate::error::{Result, StoreError};

const PROJECT_COLUMNS: &str =
    "id, name, description, category_id, manager_id, status, deadline, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a project. New projects always start with status `new`.
    pub fn create_project(&self, project: &NewProject) -> Result<Project> {
        self.conn()
            .execute(
                "INSERT INTO projects (name, description, category_id, manager_id, status, deadline, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    project.name.trim(),
                    project.description.trim(),
                    project.category_id,
                    project.manager_id,
                    ProjectStatus::New.as_str(),
                    date_param(project.deadline),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(StoreError::from_write)?;

        self.get_project(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_project(&self, id: ProjectId) -> Result<Project> {
        self.conn()
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                row_to_project,
            )
            .map_err(StoreError::from_read)
    }

    /// List all projects, most recently updated first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY updated_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map([], row_to_project)?;

        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite every writable column of `project.id` and bump `updated_at`.
    pub fn replace_project(&self, project: &Project) -> Result<Project> {
        let affected = self
            .conn()
            .execute(
                "UPDATE projects SET
                    name        = ?1,
                    description = ?2,
                    category_id = ?3,
                    manager_id  = ?4,
                    status      = ?5,
                    deadline    = ?6,
                    updated_at  = ?7
                 WHERE id = ?8",
                params![
                    project.name.trim(),
                    project.description.trim(),
                    project.category_id,
                    project.manager_id,
                    project.status.as_str(),
                    date_param(project.deadline),
                    Utc::now().to_rfc3339(),
                    project.id,
                ],
            )
            .map_err(StoreError::from_write)?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_project(project.id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a project and, through the cascade, its tasks and their
    /// messages. Returns `true` if a row was deleted.
    pub fn delete_project(&self, id: ProjectId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .map_err(StoreError::from_write)?;
        Ok(affected > 0)
    }
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category_id: row.get(3)?,
        manager_id: row.get(4)?,
        status: enum_col(row, 5)?,
        deadline: date_col(row, 6)?,
        updated_at: timestamp_col(row, 7)?,
    })
}
