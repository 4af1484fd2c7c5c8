use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tgb_core::{backend::LONG_POLL_TIMEOUT, config::Config, storage::JsonFileStore, TelegramBackend};
use tgb_telegram::TeloxideApi;

mod host;

use host::{serve_forever, CommandHost};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tgb_core::logging::init("tgb")?;

    let mut cfg = Config::load()?;
    let store = Arc::new(
        JsonFileStore::open(&cfg.state_file)
            .await
            .with_context(|| format!("opening state file {}", cfg.state_file.display()))?,
    );
    let api = Arc::new(TeloxideApi::new(cfg.bot_token.clone(), LONG_POLL_TIMEOUT)?);
    let backend = Arc::new(TelegramBackend::new(&mut cfg, api, store)?);
    let host = CommandHost::new(backend.clone(), &cfg);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                cancel.cancel();
            }
        }
    });

    info!(state_file = %cfg.state_file.display(), "Starting Telegram backend");
    serve_forever(&backend, &host, &cfg, &cancel).await
}
