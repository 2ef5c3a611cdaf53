//! Process-wide relay state and its entry points.
//!
//! `Relay` owns the user directory and the message history for the lifetime of
//! the process. Adapters never touch those directly; they call `ingest`,
//! `broadcast`, `stats` and `profile`.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::{sync::Mutex, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    broadcast::{BroadcastDispatcher, BroadcastReport},
    config::Config,
    directory::{User, UserDirectory},
    domain::UserId,
    history::{Message, MessageLog},
    ingest::{AckKind, IngestionHandler, RawEvent},
    messaging::port::MessagingPort,
};

const TOP_USERS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayStats {
    pub user_count: usize,
    /// Sum of per-user counters (not bounded by history capacity).
    pub total_messages: u64,
    pub stored_in_history: usize,
    pub new_today: usize,
    pub top5: Vec<(UserId, u64)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub message_count: u64,
    /// `None` for users the relay has never seen.
    pub joined: Option<DateTime<Local>>,
}

pub struct Relay {
    admin_id: UserId,
    directory: Arc<UserDirectory>,
    history: Arc<MessageLog>,
    ingestion: IngestionHandler,
    dispatcher: BroadcastDispatcher,
    /// Held for a whole fan-out; records when the last one finished.
    broadcast_guard: Mutex<Option<Instant>>,
}

impl Relay {
    pub fn new(admin_id: UserId, history_capacity: usize, dispatcher: BroadcastDispatcher) -> Self {
        let directory = Arc::new(UserDirectory::new());
        let history = Arc::new(MessageLog::with_capacity(history_capacity));
        Self {
            admin_id,
            ingestion: IngestionHandler::new(directory.clone(), history.clone()),
            directory,
            history,
            dispatcher,
            broadcast_guard: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.admin_id,
            cfg.history_capacity,
            BroadcastDispatcher::new(cfg.broadcast_pacing),
        )
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        user_id == self.admin_id
    }

    /// First contact (e.g. `/start`). Existing users are returned unchanged.
    pub async fn register(&self, id: UserId, display_name: &str, username: Option<&str>) -> User {
        self.directory
            .upsert_with_username(id, display_name, username)
            .await
    }

    pub async fn ingest(
        &self,
        sender: UserId,
        display_name: &str,
        event: RawEvent,
    ) -> (Message, AckKind) {
        self.ingestion.ingest(sender, display_name, event).await
    }

    /// Number of users a broadcast would currently reach.
    pub async fn audience(&self) -> usize {
        self.directory.count().await
    }

    /// Announce `text` to every known user.
    ///
    /// The recipient list is snapshotted up front, so ingestion keeps running
    /// while the (paced) fan-out is in progress. At most one fan-out runs at a
    /// time; a second one waits, then keeps the pacing gap after the first.
    pub async fn broadcast(
        &self,
        is_admin: bool,
        text: &str,
        transport: &dyn MessagingPort,
        cancel: &CancellationToken,
    ) -> BroadcastReport {
        if !is_admin || text.trim().is_empty() {
            // Rejected requests never queue behind a running fan-out.
            return self
                .dispatcher
                .broadcast(is_admin, text, &[], transport, cancel)
                .await;
        }

        let mut last_finished = self.broadcast_guard.lock().await;
        if let Some(last) = *last_finished {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(last + self.dispatcher.pacing()) => {}
            }
        }

        let recipients = self.directory.all().await;
        let report = self
            .dispatcher
            .broadcast(is_admin, text, &recipients, transport, cancel)
            .await;
        *last_finished = Some(Instant::now());
        report
    }

    pub async fn stats(&self) -> RelayStats {
        RelayStats {
            user_count: self.directory.count().await,
            total_messages: self.directory.total_messages().await,
            stored_in_history: self.history.len().await,
            new_today: self.history.count_since(Local::now().date_naive()).await,
            top5: self.directory.top(TOP_USERS).await,
        }
    }

    pub async fn profile(&self, user_id: UserId) -> Profile {
        match self.directory.get(user_id).await {
            Some(user) => Profile {
                message_count: user.message_count,
                joined: Some(user.joined),
            },
            None => Profile {
                message_count: 0,
                joined: None,
            },
        }
    }
}
