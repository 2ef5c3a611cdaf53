use std::sync::Arc;

use teloxide::prelude::*;

use hackchat_core::{
    audit::AuditEvent,
    broadcast::BroadcastStatus,
    domain::{ChatId, UserId},
    messaging::port::MessagingPort,
};

use crate::router::AppState;

use super::views;

struct ParsedCommand {
    name: String,
    /// `botname` from `/cmd@botname`, if present.
    target: Option<String>,
    args: String,
}

fn parse_command(text: &str) -> ParsedCommand {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let args = parts.next().unwrap_or("").trim().to_string();

    let mut head = first.trim_start_matches('/').splitn(2, '@');
    let name = head.next().unwrap_or("").to_lowercase();
    let target = head.next().map(str::to_string);

    ParsedCommand { name, target, args }
}

/// Commands addressed to another bot (`/stats@otherbot`) are not ours.
/// Without a known username every command is accepted.
fn is_addressed_to(target: Option<&str>, bot_username: &str) -> bool {
    match target {
        Some(target) if !bot_username.is_empty() => target.eq_ignore_ascii_case(bot_username),
        _ => true,
    }
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let ParsedCommand { name, target, args } = parse_command(text);
    if !is_addressed_to(target.as_deref(), &state.bot_username) {
        tracing::debug!(command = %name, "ignoring command for another bot");
        return Ok(());
    }
    let chat_id = ChatId(msg.chat.id.0);
    let user_id = UserId(user.id.0 as i64);
    let username = user
        .username
        .clone()
        .unwrap_or_else(|| "unknown".to_string());

    match name.as_str() {
        "start" => {
            state
                .relay
                .register(user_id, &user.full_name(), user.username.as_deref())
                .await;
            send_menu(&state, chat_id, &views::welcome(&user.first_name)).await;
        }
        "help" => reply(&state, chat_id, views::HELP).await,
        "chat" => {
            let audience = state.relay.audience().await;
            reply(&state, chat_id, &views::chat_info(audience)).await;
        }
        "profile" => {
            let profile = state.relay.profile(user_id).await;
            let card = views::ProfileCard {
                user_id,
                full_name: &user.full_name(),
                username: user.username.as_deref(),
                bot_username: &state.bot_username,
            };
            reply(&state, chat_id, &views::profile_card(&card, &profile)).await;
        }
        "broadcast" => {
            let is_admin = state.relay.is_admin(user_id);
            let report = state
                .relay
                .broadcast(is_admin, &args, state.messenger.as_ref(), &state.shutdown)
                .await;

            match report.status {
                BroadcastStatus::Unauthorized => {
                    state
                        .audit
                        .record(AuditEvent::denied(user_id.0, &username, "broadcast"));
                    reply(&state, chat_id, views::ADMIN_ONLY).await;
                }
                BroadcastStatus::EmptyPayload => {
                    reply(&state, chat_id, views::BROADCAST_USAGE).await;
                }
                BroadcastStatus::Completed | BroadcastStatus::Cancelled => {
                    for failure in &report.failed {
                        tracing::error!(
                            recipient = failure.user_id.0,
                            "failed to deliver announcement: {}",
                            failure.error
                        );
                        state.audit.record(AuditEvent::error(
                            failure.user_id.0,
                            &failure.error.to_string(),
                            "broadcast",
                        ));
                    }
                    state.audit.record(AuditEvent::broadcast(
                        user_id.0, &username, &args, &report,
                    ));
                    reply(
                        &state,
                        chat_id,
                        &views::broadcast_done(report.succeeded, report.failed.len()),
                    )
                    .await;
                }
            }
        }
        "stats" => {
            if !state.relay.is_admin(user_id) {
                state
                    .audit
                    .record(AuditEvent::denied(user_id.0, &username, "stats"));
                reply(&state, chat_id, views::ADMIN_ONLY).await;
                return Ok(());
            }
            let stats = state.relay.stats().await;
            reply(&state, chat_id, &views::stats(&stats)).await;
        }
        other => {
            tracing::debug!(command = other, "ignoring unknown command");
        }
    }

    Ok(())
}

pub(super) async fn reply(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!(chat_id = chat_id.0, "reply failed: {e}");
        state
            .audit
            .record(AuditEvent::error(chat_id.0, &e.to_string(), "reply"));
    }
}

pub(super) async fn send_menu(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state
        .messenger
        .send_inline_keyboard(chat_id, html, views::main_menu())
        .await
    {
        tracing::warn!(chat_id = chat_id.0, "menu send failed: {e}");
        state
            .audit
            .record(AuditEvent::error(chat_id.0, &e.to_string(), "menu"));
    }
}
