//! Bounded in-memory message history.

use std::collections::VecDeque;

use chrono::{DateTime, Local, NaiveDate};
use tokio::sync::Mutex;

use crate::{config::DEFAULT_HISTORY_CAPACITY, domain::UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Sticker,
    Voice,
    Photo,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Sticker => "sticker",
            ContentKind::Voice => "voice",
            ContentKind::Photo => "photo",
        }
    }
}

/// Message payload. Media variants carry the platform file handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    Text,
    Sticker { file_id: String },
    Voice { file_id: String },
    Photo { file_id: String },
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Text => ContentKind::Text,
            Content::Sticker { .. } => ContentKind::Sticker,
            Content::Voice { .. } => ContentKind::Voice,
            Content::Photo { .. } => ContentKind::Photo,
        }
    }

    pub fn file_id(&self) -> Option<&str> {
        match self {
            Content::Text => None,
            Content::Sticker { file_id }
            | Content::Voice { file_id }
            | Content::Photo { file_id } => Some(file_id),
        }
    }
}

/// Where a message was received.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatScope {
    Private,
    Group,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Monotonic id, stamped by `MessageLog::append`.
    pub id: u64,
    /// Platform message id, if the event carried one.
    pub source_id: Option<i32>,
    pub sender: UserId,
    pub sender_name: String,
    pub content: Content,
    /// Message text or media caption; may be empty.
    pub text: String,
    pub timestamp: DateTime<Local>,
    pub scope: ChatScope,
}

impl Message {
    pub fn kind(&self) -> ContentKind {
        self.content.kind()
    }
}

/// Append-only ring buffer; the oldest message is evicted once `capacity`
/// is exceeded.
#[derive(Debug)]
pub struct MessageLog {
    capacity: usize,
    inner: Mutex<Ring>,
}

#[derive(Debug)]
struct Ring {
    next_id: u64,
    entries: VecDeque<Message>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MessageLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Ring {
                next_id: 1,
                entries: VecDeque::with_capacity(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `message` under the next id and return the stored copy.
    ///
    /// The id is assigned under the same lock as the insertion, so log order
    /// and id order always agree.
    pub async fn append(&self, mut message: Message) -> Message {
        let mut ring = self.inner.lock().await;
        message.id = ring.next_id;
        ring.next_id += 1;
        if ring.entries.len() == self.capacity {
            ring.entries.pop_front();
        }
        ring.entries.push_back(message.clone());
        message
    }

    /// Copy of the whole log, oldest first.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.inner.lock().await.entries.iter().cloned().collect()
    }

    /// The last `n` messages, oldest first.
    pub async fn recent(&self, n: usize) -> Vec<Message> {
        let ring = self.inner.lock().await;
        let skip = ring.entries.len().saturating_sub(n);
        ring.entries.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Number of stored messages whose local date is on or after `cutoff`.
    pub async fn count_since(&self, cutoff: NaiveDate) -> usize {
        self.inner
            .lock()
            .await
            .entries
            .iter()
            .filter(|m| m.timestamp.date_naive() >= cutoff)
            .count()
    }
}
