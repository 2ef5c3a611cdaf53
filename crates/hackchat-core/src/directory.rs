//! Known recipients and their per-user counters.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use tokio::sync::Mutex;

use crate::domain::UserId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub username: Option<String>,
    pub joined: DateTime<Local>,
    pub message_count: u64,
}

impl User {
    fn new(id: UserId, display_name: &str, username: Option<&str>) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            username: username.map(|s| s.to_string()),
            joined: Local::now(),
            message_count: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    users: HashMap<UserId, User>,
    // First-contact order; snapshots and tie-breaks follow it.
    order: Vec<UserId>,
}

impl Entries {
    fn get_or_create(
        &mut self,
        id: UserId,
        display_name: &str,
        username: Option<&str>,
    ) -> &mut User {
        if !self.users.contains_key(&id) {
            self.order.push(id);
        }
        self.users
            .entry(id)
            .or_insert_with(|| User::new(id, display_name, username))
    }

    fn ordered(&self) -> impl Iterator<Item = &User> {
        self.order.iter().filter_map(|id| self.users.get(id))
    }
}

/// Process-wide user directory.
///
/// Every operation holds the lock only for an in-memory update, so callers can
/// share it freely across tasks.
#[derive(Debug, Default)]
pub struct UserDirectory {
    inner: Mutex<Entries>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user on first contact. Repeat calls return the stored user
    /// unchanged (the original display name is kept).
    pub async fn upsert(&self, id: UserId, display_name: &str) -> User {
        self.upsert_with_username(id, display_name, None).await
    }

    pub async fn upsert_with_username(
        &self,
        id: UserId,
        display_name: &str,
        username: Option<&str>,
    ) -> User {
        let mut entries = self.inner.lock().await;
        entries.get_or_create(id, display_name, username).clone()
    }

    /// Bump the user's message counter, creating the user if unknown.
    pub async fn increment_message_count(&self, id: UserId) -> u64 {
        let mut entries = self.inner.lock().await;
        let user = entries.get_or_create(id, "", None);
        user.message_count += 1;
        user.message_count
    }

    pub async fn get(&self, id: UserId) -> Option<User> {
        self.inner.lock().await.users.get(&id).cloned()
    }

    /// Snapshot of all users in first-contact order.
    pub async fn all(&self) -> Vec<User> {
        self.inner.lock().await.ordered().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.users.len()
    }

    pub async fn total_messages(&self) -> u64 {
        self.inner
            .lock()
            .await
            .users
            .values()
            .map(|u| u.message_count)
            .sum()
    }

    /// The `n` most active users, by message count descending. Ties keep
    /// first-contact order.
    pub async fn top(&self, n: usize) -> Vec<(UserId, u64)> {
        let mut ranked: Vec<(UserId, u64)> = {
            let entries = self.inner.lock().await;
            entries.ordered().map(|u| (u.id, u.message_count)).collect()
        };
        // `sort_by` is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}
