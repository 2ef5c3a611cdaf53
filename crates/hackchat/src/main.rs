use std::sync::Arc;

use hackchat_core::{config::Config, Relay};

#[tokio::main]
async fn main() -> Result<(), hackchat_core::Error> {
    hackchat_core::logging::init("hackchat")?;

    let cfg = Arc::new(Config::load()?);
    let relay = Arc::new(Relay::from_config(&cfg));

    hackchat_telegram::router::run_polling(cfg, relay)
        .await
        .map_err(|e| hackchat_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
