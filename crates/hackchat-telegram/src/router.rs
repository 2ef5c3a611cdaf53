use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio_util::sync::CancellationToken;

use hackchat_core::{
    audit::AuditLogger,
    config::Config,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    Relay,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub relay: Arc<Relay>,
    pub messenger: Arc<dyn MessagingPort>,
    pub audit: Arc<AuditLogger>,
    /// Bot `@username`, used for invite links.
    pub bot_username: String,
    /// Cancelled on shutdown; in-flight broadcasts stop at the next recipient.
    pub shutdown: CancellationToken,
}

pub async fn run_polling(cfg: Arc<Config>, relay: Arc<Relay>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            tracing::info!("hackchat started: @{}", me.username());
            me.username().to_string()
        }
        Err(e) => {
            tracing::warn!("get_me failed, invite links will be incomplete: {e}");
            String::new()
        }
    };
    tracing::info!(
        admin_id = cfg.admin_id.0,
        history_capacity = cfg.history_capacity,
        pacing_ms = cfg.broadcast_pacing.as_millis() as u64,
        "relay configured"
    );

    // Throttle every outbound call; the adapter still retries a single 429.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::from(&*cfg),
    ));

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        relay,
        messenger,
        audit: Arc::new(AuditLogger::new(
            cfg.audit_log_path.clone(),
            cfg.audit_log_json,
        )),
        bot_username,
        shutdown: shutdown.clone(),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build();

    let dispatcher_shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!("shutdown requested");
        shutdown.cancel();
        if let Ok(done) = dispatcher_shutdown.shutdown() {
            done.await;
        }
    });

    dispatcher.dispatch().await;
    tracing::info!("dispatcher stopped");

    Ok(())
}
