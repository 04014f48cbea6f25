use chrono::Utc;
use rusqlite::params;
use taskhub_shared::protocol::{Message, NewMessage};
use taskhub_shared::types::{MessageId, TaskId};

use crate::database::{timestamp_col, Database};
use crate::error::{Result, StoreError};

impl Database {
    /// Store a message with a server-side `created_at`.
    pub fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        self.conn()
            .execute(
                "INSERT INTO messages (task_id, sender_id, message, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    message.task_id,
                    message.sender_id,
                    message.message,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(StoreError::from_write)?;

        self.get_message_by_id(self.conn().last_insert_rowid())
    }

    /// Chat history of a task, oldest first, with the sender's name joined in.
    pub fn get_messages_for_task(&self, task_id: TaskId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT m.id, m.task_id, m.sender_id, m.message, m.created_at, u.name
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.task_id = ?1
             ORDER BY m.created_at ASC, m.id ASC",
        )?;

        let rows = stmt.query_map(params![task_id], |row| {
            let mut message = row_to_message(row)?;
            message.sender_name = row.get(5)?;
            Ok(message)
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn get_message_by_id(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, task_id, sender_id, message, created_at
                 FROM messages WHERE id = ?1",
                params![id],
                row_to_message,
            )
            .map_err(StoreError::from_read)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        task_id: row.get(1)?,
        sender_id: row.get(2)?,
        message: row.get(3)?,
        created_at: timestamp_col(row, 4)?,
        sender_name: None,
    })
}
