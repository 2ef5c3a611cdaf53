//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - pulls ids/names out of the teloxide update
//! - calls into the `hackchat-core` relay
//! - renders the reply (see `views`)

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use crate::router::AppState;
mod callback;
mod commands;
mod inbound;
mod views;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(msg, state).await;
        }
    }

    inbound::handle_inbound(msg, state).await
}
