//! Chat history of one task, grouped under day headers.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use taskhub_shared::protocol::{Message, NewMessage};
use taskhub_shared::types::{TaskId, UserId};
use taskhub_shared::validation::validate_new_message;
use tracing::info;

use crate::error::ClientError;
use crate::remote::ApiClient;

type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadEntry {
    DateSeparator(NaiveDate),
    Message(Message),
}

pub struct MessageThread {
    api: Arc<ApiClient>,
    task_id: TaskId,
    offset: FixedOffset,
    entries: RwLock<Vec<ThreadEntry>>,
}

impl MessageThread {
    /// Thread whose day headers follow the device's current UTC offset.
    pub fn new(api: Arc<ApiClient>, task_id: TaskId) -> Self {
        Self::with_offset(api, task_id, *Local::now().offset())
    }

    pub fn with_offset(api: Arc<ApiClient>, task_id: TaskId, offset: FixedOffset) -> Self {
        Self {
            api,
            task_id,
            offset,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Fetch the whole history, oldest first. Returns the message count.
    pub async fn load(&self) -> Result<usize> {
        let mut messages = self.api.list_messages(self.task_id).await?;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let count = messages.len();
        *self.write() = build_entries(messages, self.offset);
        Ok(count)
    }

    /// Send `text` as `sender_id`. The message shows up only once the
    /// service stored it.
    pub async fn send(&self, sender_id: UserId, text: &str) -> Result<Message> {
        let message = NewMessage {
            task_id: self.task_id,
            sender_id,
            message: text.trim().to_string(),
        };
        validate_new_message(&message)?;

        let stored = self.api.send_message(&message).await?;
        self.append(stored.clone());
        info!(task_id = self.task_id, id = stored.id, "message sent");
        Ok(stored)
    }

    /// Append a confirmed message, opening a new day when its date differs
    /// from the previous message's.
    pub fn append(&self, message: Message) {
        let mut entries = self.write();
        let day = local_date(message.created_at, self.offset);
        let previous = entries.iter().rev().find_map(|e| match e {
            ThreadEntry::Message(m) => Some(local_date(m.created_at, self.offset)),
            ThreadEntry::DateSeparator(_) => None,
        });
        if previous != Some(day) {
            entries.push(ThreadEntry::DateSeparator(day));
        }
        entries.push(ThreadEntry::Message(message));
    }

    pub fn entries(&self) -> Vec<ThreadEntry> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                ThreadEntry::Message(m) => Some(m),
                ThreadEntry::DateSeparator(_) => None,
            })
            .collect()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<ThreadEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

fn build_entries(messages: Vec<Message>, offset: FixedOffset) -> Vec<ThreadEntry> {
    let mut entries = Vec::with_capacity(messages.len() * 2);
    let mut current: Option<NaiveDate> = None;
    for message in messages {
        let day = local_date(message.created_at, offset);
        if current != Some(day) {
            entries.push(ThreadEntry::DateSeparator(day));
            current = Some(day);
        }
        entries.push(ThreadEntry::Message(message));
    }
    entries
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::config::ClientConfig;

    fn thread(offset_hours: i32) -> MessageThread {
        let api = Arc::new(ApiClient::new(&ClientConfig::new("http://127.0.0.1:9")).unwrap());
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        MessageThread::with_offset(api, 1, offset)
    }

    fn message(id: i64, at: DateTime<Utc>) -> Message {
        Message {
            id,
            task_id: 1,
            sender_id: 2,
            message: format!("m{id}"),
            created_at: at,
            sender_name: None,
        }
    }

    fn separators(entries: &[ThreadEntry]) -> usize {
        entries
            .iter()
            .filter(|e| matches!(e, ThreadEntry::DateSeparator(_)))
            .count()
    }

    #[test]
    fn one_separator_per_day() {
        let t = thread(0);
        t.append(message(1, Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()));
        t.append(message(2, Utc.with_ymd_and_hms(2025, 3, 1, 17, 0, 0).unwrap()));
        assert_eq!(separators(&t.entries()), 1);

        t.append(message(3, Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap()));
        let entries = t.entries();
        assert_eq!(separators(&entries), 2);
        assert_eq!(
            entries[3],
            ThreadEntry::DateSeparator(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap())
        );
        assert_eq!(t.messages().len(), 3);
    }

    #[test]
    fn day_follows_local_offset() {
        // 23:30 UTC is already the next day at UTC+2.
        let t = thread(2);
        t.append(message(1, Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()));
        t.append(message(2, Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap()));
        assert_eq!(separators(&t.entries()), 2);
    }

    #[test]
    fn built_history_matches_appends() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let msgs = vec![
            message(1, Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()),
            message(2, Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()),
            message(3, Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap()),
        ];
        let entries = build_entries(msgs, offset);
        assert_eq!(entries.len(), 5);
        assert_eq!(separators(&entries), 2);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_locally() {
        let t = thread(0);
        let err = t.send(2, "   ").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(t.entries().is_empty());
    }
}
