use std::sync::Arc;

use teloxide::prelude::*;

use hackchat_core::{
    audit::AuditEvent,
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::{port::MessagingPort, types::InlineKeyboard},
};

use crate::router::AppState;

use super::{commands::reply, views};

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    // Always answer so the client stops its spinner.
    if let Err(e) = state.messenger.answer_callback_query(&q.id, None).await {
        tracing::debug!("answer_callback_query failed: {e}");
    }

    let (Some(message), Some(data)) = (q.message.as_ref(), q.data.as_deref()) else {
        return Ok(());
    };
    let chat_id = ChatId(message.chat.id.0);
    let target = MessageRef {
        chat_id,
        message_id: MessageId(message.id.0),
    };
    let user_id = UserId(q.from.id.0 as i64);

    match data {
        "profile" => {
            let profile = state.relay.profile(user_id).await;
            edit(&state, target, &views::profile_summary(&profile), None).await;
        }
        "chat" => {
            let audience = state.relay.audience().await;
            edit(&state, target, &views::chat_info(audience), None).await;
        }
        "stickers" => {
            edit(
                &state,
                target,
                "🎭 <b>Pick a sticker:</b>",
                Some(views::sticker_menu()),
            )
            .await;
        }
        "back" => {
            edit(
                &state,
                target,
                &views::welcome(&q.from.first_name),
                Some(views::main_menu()),
            )
            .await;
        }
        "help" => reply(&state, chat_id, views::HELP).await,
        other => match views::sticker_choice(other) {
            Some(sticker) => reply(&state, chat_id, &format!("You picked: {sticker}")).await,
            None => tracing::debug!(data = other, "ignoring unknown callback"),
        },
    }

    Ok(())
}

async fn edit(
    state: &AppState,
    target: MessageRef,
    html: &str,
    keyboard: Option<InlineKeyboard>,
) {
    let res = match keyboard {
        Some(kb) => {
            state
                .messenger
                .edit_inline_keyboard(target, html, kb)
                .await
        }
        None => state.messenger.edit_html(target, html).await,
    };
    if let Err(e) = res {
        tracing::warn!(chat_id = target.chat_id.0, "menu edit failed: {e}");
        state.audit.record(AuditEvent::error(
            target.chat_id.0,
            &e.to_string(),
            "menu edit",
        ));
    }
}
