//! CRUD operations for user accounts.
//!
//! Password hashes are stored next to the profile but never travel with a
//! [`User`]; callers that need them go through [`Database::get_credentials`].

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use taskhub_shared::protocol::{NewUser, User, UserPatch};
use taskhub_shared::types::UserId;

use crate::database::{enum_col, Database};
use crate::error::{Result, StoreError};

const USER_COLUMNS: &str = "id, name, email, tel, role, location, status";

/// A user together with the stored password hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user. `password_hash` must already be hashed.
    pub fn create_user(&self, user: &NewUser, password_hash: &str) -> Result<User> {
        self.conn()
            .execute(
                "INSERT INTO users (name, email, tel, role, location, status, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.name.trim(),
                    user.email.trim(),
                    user.tel.trim(),
                    user.role.as_str(),
                    user.location,
                    user.status.as_str(),
                    password_hash,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(StoreError::from_write)?;

        self.get_user(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .map_err(StoreError::from_read)
    }

    /// List all users in insertion order.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    pub fn count_users(&self) -> Result<i64> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    /// Look up an account by email for a login attempt.
    pub fn get_credentials(&self, email: &str) -> Result<Option<UserCredentials>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
                params![email.trim()],
                |row| {
                    Ok(UserCredentials {
                        user: row_to_user(row)?,
                        password_hash: row.get(7)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn get_password_hash(&self, id: UserId) -> Result<String> {
        self.conn()
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(StoreError::from_read)
    }

    /// Name the first unique field (`email`, then `tel`) already taken by an
    /// account other than `exclude`.
    pub fn conflicting_user_field(
        &self,
        email: Option<&str>,
        tel: Option<&str>,
        exclude: Option<UserId>,
    ) -> Result<Option<&'static str>> {
        let taken = |column: &str, value: &str| -> Result<bool> {
            let found: Option<UserId> = self
                .conn()
                .query_row(
                    &format!("SELECT id FROM users WHERE {column} = ?1 AND id != ?2 LIMIT 1"),
                    params![value.trim(), exclude.unwrap_or(-1)],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        };

        if let Some(email) = email {
            if taken("email", email)? {
                return Ok(Some("email"));
            }
        }
        if let Some(tel) = tel {
            if taken("tel", tel)? {
                return Ok(Some("tel"));
            }
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial update in one statement. Unset fields keep their value.
    pub fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<User> {
        let affected = self
            .conn()
            .execute(
                "UPDATE users SET
                    email    = COALESCE(?1, email),
                    name     = COALESCE(?2, name),
                    role     = COALESCE(?3, role),
                    tel      = COALESCE(?4, tel),
                    location = COALESCE(?5, location),
                    status   = COALESCE(?6, status)
                 WHERE id = ?7",
                params![
                    patch.email.as_deref().map(str::trim),
                    patch.name.as_deref().map(str::trim),
                    patch.role.map(|r| r.as_str()),
                    patch.tel.as_deref().map(str::trim),
                    patch.location,
                    patch.status.map(|s| s.as_str()),
                    id,
                ],
            )
            .map_err(StoreError::from_write)?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    /// Replace the stored hash. Returns `false` if the user does not exist.
    pub fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a user. Returns `true` if a row was deleted.
    ///
    /// Fails with [`StoreError::Constraint`] while the user still manages a
    /// project or has tasks assigned.
    pub fn delete_user(&self, id: UserId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(StoreError::from_write)?;
        Ok(affected > 0)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        tel: row.get(3)?,
        role: enum_col(row, 4)?,
        location: row.get(5)?,
        status: enum_col(row, 6)?,
    })
}
