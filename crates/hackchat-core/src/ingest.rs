//! Classification and storage of inbound chat events.

use std::sync::Arc;

use chrono::Local;

use crate::{
    directory::UserDirectory,
    domain::UserId,
    history::{ChatScope, Content, ContentKind, Message, MessageLog},
};

/// Platform-neutral inbound event, built by the messaging adapter.
///
/// Several attachments may be present at once; classification picks one.
#[derive(Clone, Debug, Default)]
pub struct RawEvent {
    pub source_id: Option<i32>,
    pub scope: Option<ChatScope>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub sticker: Option<String>,
    pub voice: Option<String>,
    /// Photo handle (adapters pass the largest size).
    pub photo: Option<String>,
}

impl RawEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Sticker > Voice > Photo > Text.
    pub fn classify(&self) -> Content {
        if let Some(file_id) = &self.sticker {
            return Content::Sticker {
                file_id: file_id.clone(),
            };
        }
        if let Some(file_id) = &self.voice {
            return Content::Voice {
                file_id: file_id.clone(),
            };
        }
        if let Some(file_id) = &self.photo {
            return Content::Photo {
                file_id: file_id.clone(),
            };
        }
        Content::Text
    }

    fn body(&self) -> String {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.caption.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

/// Acknowledgment returned to the sender of an ingested message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckKind {
    Text,
    Sticker,
    Voice,
}

impl From<ContentKind> for AckKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Sticker => AckKind::Sticker,
            ContentKind::Voice => AckKind::Voice,
            ContentKind::Text | ContentKind::Photo => AckKind::Text,
        }
    }
}

impl AckKind {
    /// Reply phrase; `audience` is the number of known users.
    pub fn render(&self, audience: usize) -> String {
        match self {
            AckKind::Text => format!("✅ Message saved!\n👥 Visible to: {audience} users"),
            AckKind::Sticker => "🎭 Sticker saved!".to_string(),
            AckKind::Voice => "🎤 Voice message saved!".to_string(),
        }
    }
}

pub struct IngestionHandler {
    directory: Arc<UserDirectory>,
    history: Arc<MessageLog>,
}

impl IngestionHandler {
    pub fn new(directory: Arc<UserDirectory>, history: Arc<MessageLog>) -> Self {
        Self {
            directory,
            history,
        }
    }

    /// Record an inbound event. Never fails: an event without recognizable
    /// content is stored as empty text.
    pub async fn ingest(
        &self,
        sender: UserId,
        display_name: &str,
        event: RawEvent,
    ) -> (Message, AckKind) {
        self.directory.upsert(sender, display_name).await;
        let count = self.directory.increment_message_count(sender).await;

        let content = event.classify();
        let message = Message {
            id: 0,
            source_id: event.source_id,
            sender,
            sender_name: display_name.to_string(),
            text: event.body(),
            content,
            timestamp: Local::now(),
            scope: event.scope.unwrap_or(ChatScope::Private),
        };
        let message = self.history.append(message).await;

        tracing::debug!(
            user_id = sender.0,
            message_id = message.id,
            kind = message.kind().as_str(),
            count,
            "ingested message"
        );

        let ack = AckKind::from(message.kind());
        (message, ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> (IngestionHandler, Arc<UserDirectory>, Arc<MessageLog>) {
        let dir = Arc::new(UserDirectory::new());
        let log = Arc::new(MessageLog::with_capacity(10));
        (IngestionHandler::new(dir.clone(), log.clone()), dir, log)
    }

    #[test]
    fn classification_precedence() {
        let all = RawEvent {
            text: Some("hi".to_string()),
            sticker: Some("s".to_string()),
            voice: Some("v".to_string()),
            photo: Some("p".to_string()),
            ..Default::default()
        };
        assert_eq!(all.classify().kind(), ContentKind::Sticker);

        let voice_photo = RawEvent {
            voice: Some("v".to_string()),
            photo: Some("p".to_string()),
            ..Default::default()
        };
        assert_eq!(voice_photo.classify().kind(), ContentKind::Voice);

        let photo = RawEvent {
            caption: Some("look".to_string()),
            photo: Some("p".to_string()),
            ..Default::default()
        };
        assert_eq!(
            photo.classify(),
            Content::Photo {
                file_id: "p".to_string()
            }
        );
        assert_eq!(RawEvent::text("x").classify(), Content::Text);
    }

    #[test]
    fn photo_ack_folds_into_text() {
        assert_eq!(AckKind::from(ContentKind::Photo), AckKind::Text);
        assert_eq!(AckKind::from(ContentKind::Voice), AckKind::Voice);
        assert!(AckKind::Text.render(3).contains("3 users"));
    }

    #[tokio::test]
    async fn sticker_with_text_is_stored_as_sticker() {
        let (h, dir, log) = handler();
        let event = RawEvent {
            source_id: Some(77),
            scope: Some(ChatScope::Group),
            text: Some("caption-ish".to_string()),
            sticker: Some("CAACAg".to_string()),
            ..Default::default()
        };

        let (msg, ack) = h.ingest(UserId(5), "Eve", event).await;
        assert_eq!(msg.kind(), ContentKind::Sticker);
        assert_eq!(msg.content.file_id(), Some("CAACAg"));
        assert_eq!(msg.text, "caption-ish");
        assert_eq!(msg.scope, ChatScope::Group);
        assert_eq!(msg.source_id, Some(77));
        assert_eq!(ack, AckKind::Sticker);

        let stored = log.snapshot().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind(), ContentKind::Sticker);
        assert_eq!(dir.get(UserId(5)).await.unwrap().message_count, 1);
    }

    #[tokio::test]
    async fn empty_event_becomes_empty_text() {
        let (h, _dir, log) = handler();
        let (msg, ack) = h.ingest(UserId(1), "A", RawEvent::default()).await;
        assert_eq!(msg.content, Content::Text);
        assert_eq!(msg.text, "");
        assert_eq!(msg.scope, ChatScope::Private);
        assert_eq!(ack, AckKind::Text);
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn caption_is_used_when_text_missing() {
        let (h, _dir, _log) = handler();
        let event = RawEvent {
            caption: Some("sunset".to_string()),
            photo: Some("p1".to_string()),
            ..Default::default()
        };
        let (msg, ack) = h.ingest(UserId(1), "A", event).await;
        assert_eq!(msg.text, "sunset");
        assert_eq!(msg.kind(), ContentKind::Photo);
        assert_eq!(ack, AckKind::Text);
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_sender_is_registered() {
        let (h, dir, _log) = handler();
        let (a, _) = h.ingest(UserId(1), "Alice", RawEvent::text("1")).await;
        let (b, _) = h.ingest(UserId(2), "Bob", RawEvent::text("2")).await;
        let (c, _) = h.ingest(UserId(1), "Renamed", RawEvent::text("3")).await;
        assert!(a.id < b.id && b.id < c.id);

        let alice = dir.get(UserId(1)).await.unwrap();
        assert_eq!(alice.display_name, "Alice");
        assert_eq!(alice.message_count, 2);
        assert_eq!(dir.count().await, 2);
    }
}
