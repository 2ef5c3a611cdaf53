use std::sync::Arc;

use teloxide::prelude::*;

use hackchat_core::{
    audit::AuditEvent,
    domain::{ChatId, UserId},
    history::ChatScope,
    ingest::RawEvent,
};

use crate::router::AppState;

use super::commands::reply;

fn raw_event(msg: &Message) -> RawEvent {
    RawEvent {
        source_id: Some(msg.id.0),
        scope: Some(if msg.chat.is_private() {
            ChatScope::Private
        } else {
            ChatScope::Group
        }),
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
        sticker: msg.sticker().map(|s| s.file.id.clone()),
        voice: msg.voice().map(|v| v.file.id.clone()),
        // Largest size comes last.
        photo: msg
            .photo()
            .and_then(|sizes| sizes.last())
            .map(|p| p.file.id.clone()),
    }
}

/// Store any non-command message and acknowledge it.
pub async fn handle_inbound(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let sender = UserId(user.id.0 as i64);
    let (stored, ack) = state
        .relay
        .ingest(sender, &user.full_name(), raw_event(&msg))
        .await;
    state.audit.record(AuditEvent::message(&stored));

    let audience = state.relay.audience().await;
    reply(&state, ChatId(msg.chat.id.0), &ack.render(audience)).await;
    Ok(())
}
