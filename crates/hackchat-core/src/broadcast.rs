//! Admin announcements fanned out to every known user.
//!
//! Delivery is sequential with a fixed pacing delay between sends (Telegram
//! caps sends per second per bot token). A failing recipient is recorded and
//! skipped; it never aborts the rest of the run.

use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    config::DEFAULT_BROADCAST_PACING,
    directory::User,
    domain::{ChatId, UserId},
    formatting::escape_html,
    messaging::port::MessagingPort,
    Error, Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastStatus {
    /// Every recipient was attempted.
    Completed,
    /// Shutdown was requested mid-run; the remaining recipients were skipped.
    Cancelled,
    /// Sender is not the admin. Nothing was sent.
    Unauthorized,
    /// Announcement text was empty. Nothing was sent.
    EmptyPayload,
}

#[derive(Debug)]
pub struct DeliveryFailure {
    pub user_id: UserId,
    pub error: Error,
}

#[derive(Debug)]
pub struct BroadcastReport {
    pub status: BroadcastStatus,
    pub succeeded: usize,
    pub failed: Vec<DeliveryFailure>,
}

impl BroadcastReport {
    fn empty(status: BroadcastStatus) -> Self {
        Self {
            status,
            succeeded: 0,
            failed: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    pub fn is_rejected(&self) -> bool {
        matches!(
            self.status,
            BroadcastStatus::Unauthorized | BroadcastStatus::EmptyPayload
        )
    }
}

/// Announcement body as delivered to each recipient (Telegram HTML).
pub fn format_announcement(text: &str) -> String {
    format!(
        "📢 <b>Announcement from admin:</b>\n\n{}",
        escape_html(text.trim())
    )
}

#[derive(Clone, Debug)]
pub struct BroadcastDispatcher {
    pacing: Duration,
}

impl Default for BroadcastDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_PACING)
    }
}

impl BroadcastDispatcher {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Deliver an announcement through a messaging port, one private chat per
    /// recipient.
    pub async fn broadcast(
        &self,
        sender_is_admin: bool,
        text: &str,
        recipients: &[User],
        transport: &dyn MessagingPort,
        cancel: &CancellationToken,
    ) -> BroadcastReport {
        self.broadcast_with(
            sender_is_admin,
            text,
            recipients,
            cancel,
            move |id, html| async move {
                transport.send_html(ChatId::from(id), &html).await.map(|_| ())
            },
        )
        .await
    }

    /// Fan-out with an arbitrary `send` capability.
    ///
    /// `recipients` is a snapshot; no directory lock is held while sending or
    /// pacing.
    pub async fn broadcast_with<F, Fut>(
        &self,
        sender_is_admin: bool,
        text: &str,
        recipients: &[User],
        cancel: &CancellationToken,
        mut send: F,
    ) -> BroadcastReport
    where
        F: FnMut(UserId, String) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if !sender_is_admin {
            return BroadcastReport::empty(BroadcastStatus::Unauthorized);
        }
        if text.trim().is_empty() {
            return BroadcastReport::empty(BroadcastStatus::EmptyPayload);
        }

        let html = format_announcement(text);
        let mut report = BroadcastReport::empty(BroadcastStatus::Completed);

        for (idx, user) in recipients.iter().enumerate() {
            if idx > 0 && !self.pause(cancel).await {
                report.status = BroadcastStatus::Cancelled;
                break;
            }
            if cancel.is_cancelled() {
                report.status = BroadcastStatus::Cancelled;
                break;
            }

            match send(user.id, html.clone()).await {
                Ok(()) => report.succeeded += 1,
                Err(error) => {
                    tracing::warn!(user_id = user.id.0, %error, "broadcast delivery failed");
                    report.failed.push(DeliveryFailure {
                        user_id: user.id,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            recipients = recipients.len(),
            succeeded = report.succeeded,
            failed = report.failed.len(),
            status = ?report.status,
            "broadcast finished"
        );
        report
    }

    /// Wait out the pacing delay. Returns `false` if cancelled meanwhile.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.pacing.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.pacing) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Local;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        domain::{MessageId, MessageRef},
        messaging::types::{InlineKeyboard, MessagingCapabilities},
    };

    fn users(ids: &[i64]) -> Vec<User> {
        ids.iter()
            .map(|&id| User {
                id: UserId(id),
                display_name: format!("u{id}"),
                username: None,
                joined: Local::now(),
                message_count: 0,
            })
            .collect()
    }

    /// Records every send and fails for the configured ids.
    #[derive(Default)]
    struct FakeTransport {
        fail_for: Vec<i64>,
        calls: Mutex<Vec<(ChatId, String, Instant)>>,
    }

    impl FakeTransport {
        fn failing(ids: &[i64]) -> Self {
            Self {
                fail_for: ids.to_vec(),
                ..Default::default()
            }
        }

        fn chats(&self) -> Vec<i64> {
            self.calls.lock().unwrap().iter().map(|c| c.0 .0).collect()
        }
    }

    #[async_trait::async_trait]
    impl MessagingPort for FakeTransport {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_html: true,
                supports_edit: false,
                supports_inline_keyboards: false,
                max_message_len: 4096,
            }
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            self.calls
                .lock()
                .unwrap()
                .push((chat_id, html.to_string(), Instant::now()));
            if self.fail_for.contains(&chat_id.0) {
                return Err(Error::External(
                    "telegram error: Forbidden: bot was blocked by the user".to_string(),
                ));
            }
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn edit_html(&self, _msg: MessageRef, _html: &str) -> Result<()> {
            Ok(())
        }

        async fn send_inline_keyboard(
            &self,
            chat_id: ChatId,
            html: &str,
            _keyboard: InlineKeyboard,
        ) -> Result<MessageRef> {
            self.send_html(chat_id, html).await
        }

        async fn edit_inline_keyboard(
            &self,
            _msg: MessageRef,
            _html: &str,
            _keyboard: InlineKeyboard,
        ) -> Result<()> {
            Ok(())
        }

        async fn answer_callback_query(
            &self,
            _callback_id: &str,
            _text: Option<&str>,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn non_admin_is_refused_without_sending() {
        let transport = FakeTransport::default();
        let report = BroadcastDispatcher::default()
            .broadcast(
                false,
                "hello",
                &users(&[1, 2]),
                &transport,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, BroadcastStatus::Unauthorized);
        assert_eq!(report.attempted(), 0);
        assert!(report.is_rejected());
        assert!(transport.chats().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_is_refused_without_sending() {
        let transport = FakeTransport::default();
        let dispatcher = BroadcastDispatcher::default();
        let cancel = CancellationToken::new();

        let report = dispatcher
            .broadcast(true, "", &users(&[1]), &transport, &cancel)
            .await;
        assert_eq!(report.status, BroadcastStatus::EmptyPayload);

        let report = dispatcher
            .broadcast(true, "   \n", &users(&[1]), &transport, &cancel)
            .await;
        assert_eq!(report.status, BroadcastStatus::EmptyPayload);
        assert!(transport.chats().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_for_one_recipient_does_not_stop_the_rest() {
        let transport = FakeTransport::failing(&[2]);
        let report = BroadcastDispatcher::default()
            .broadcast(
                true,
                "maintenance at 5",
                &users(&[1, 2, 3]),
                &transport,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, BroadcastStatus::Completed);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].user_id, UserId(2));
        assert!(report.failed[0].error.to_string().contains("blocked"));
        assert_eq!(transport.chats(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn sends_are_paced_and_formatted() {
        let transport = FakeTransport::default();
        let start = Instant::now();
        BroadcastDispatcher::new(Duration::from_millis(50))
            .broadcast(
                true,
                "<b>hi</b>",
                &users(&[1, 2, 3]),
                &transport,
                &CancellationToken::new(),
            )
            .await;

        let calls = transport.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].2 - start, Duration::ZERO);
        for pair in calls.windows(2) {
            assert!(pair[1].2 - pair[0].2 >= Duration::from_millis(50));
        }
        // No trailing delay after the last send.
        assert!(Instant::now() - start < Duration::from_millis(150));
        assert!(calls[0].1.starts_with("📢 <b>Announcement from admin:</b>"));
        assert!(calls[0].1.ends_with("&lt;b&gt;hi&lt;/b&gt;"));
    }

    #[tokio::test(start_paused = true)]
    async fn closure_transport_sees_each_recipient_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_send = seen.clone();
        let report = BroadcastDispatcher::default()
            .broadcast_with(
                true,
                "x",
                &users(&[10, 20]),
                &CancellationToken::new(),
                move |id, _html| {
                    seen_in_send.lock().unwrap().push(id);
                    async move { Ok::<(), Error>(()) }
                },
            )
            .await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(*seen.lock().unwrap(), vec![UserId(10), UserId(20)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_keeps_recorded_results() {
        let cancel = CancellationToken::new();
        let cancel_in_send = cancel.clone();
        let report = BroadcastDispatcher::default()
            .broadcast_with(
                true,
                "x",
                &users(&[1, 2, 3, 4]),
                &cancel,
                move |id, _html| {
                    // Shutdown arrives while the second recipient is in flight.
                    if id == UserId(2) {
                        cancel_in_send.cancel();
                    }
                    async move { Ok::<(), Error>(()) }
                },
            )
            .await;

        assert_eq!(report.status, BroadcastStatus::Cancelled);
        assert_eq!(report.succeeded, 2);
        assert!(report.failed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_directory_completes_immediately() {
        let transport = FakeTransport::default();
        let report = BroadcastDispatcher::default()
            .broadcast(true, "x", &[], &transport, &CancellationToken::new())
            .await;
        assert_eq!(report.status, BroadcastStatus::Completed);
        assert_eq!(report.attempted(), 0);
    }
}
