//! CRUD operations for project categories.

use rusqlite::params;
use taskhub_shared::protocol::{Category, NewCategory};
use taskhub_shared::types::CategoryId;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    pub fn create_category(&self, category: &NewCategory) -> Result<Category> {
        self.conn()
            .execute(
                "INSERT INTO categories (title) VALUES (?1)",
                params![category.title.trim()],
            )
            .map_err(StoreError::from_write)?;

        self.get_category(self.conn().last_insert_rowid())
    }

    pub fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.conn()
            .query_row(
                "SELECT id, title FROM categories WHERE id = ?1",
                params![id],
                row_to_category,
            )
            .map_err(StoreError::from_read)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, title FROM categories ORDER BY id ASC")?;

        let rows = stmt.query_map([], row_to_category)?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }
}

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        title: row.get(1)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_list() {
        let db = Database::open_in_memory().unwrap();
        let web = db.create_category(&NewCategory { title: " Web ".into() }).unwrap();
        db.create_category(&NewCategory { title: "Mobile".into() }).unwrap();

        assert_eq!(web.title, "Web");
        let all = db.list_categories().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], web);
        assert!(matches!(db.get_category(42), Err(StoreError::NotFound)));
    }
}
