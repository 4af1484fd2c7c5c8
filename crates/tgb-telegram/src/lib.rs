//! Telegram adapter (teloxide).
//!
//! This crate implements the `tgb-core` BotApi port over the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use tokio::time::sleep;
use tracing::warn;

pub mod convert;

use tgb_core::{
    errors::Error,
    messaging::{
        port::BotApi,
        types::{RawUpdate, RawUser},
    },
    Result,
};

/// HTTP timeout on top of the long-poll wait, so a `getUpdates` call that
/// legitimately blocks for the full poll timeout is not cut off client-side.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TeloxideApi {
    bot: Bot,
}

impl TeloxideApi {
    /// Build a client for `token` able to sustain long polls of `poll_timeout`.
    pub fn new(token: impl Into<String>, poll_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(poll_timeout + HTTP_TIMEOUT_SLACK)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::External(format!("failed to build http client: {e}")))?;
        Ok(Self::from_bot(Bot::with_client(token, client)))
    }

    pub fn from_bot(bot: Bot) -> Self {
        Self { bot }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl BotApi for TeloxideApi {
    async fn get_me(&self) -> Result<RawUser> {
        let me = self.bot.get_me().await.map_err(Self::map_err)?;
        Ok(convert::user(&me.user))
    }

    async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<RawUpdate>> {
        let offset = i32::try_from(offset)
            .map_err(|_| Error::External(format!("update offset out of range: {offset}")))?;
        let timeout = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);

        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .timeout(timeout)
            .await
            .map_err(Self::map_err)?;

        Ok(updates.into_iter().map(convert::update).collect())
    }

    /// Retries once when Telegram's flood control asks us to wait.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let mut retried = false;
        loop {
            match self.bot.send_message(ChatId(chat_id), text).await {
                Ok(_) => return Ok(()),
                Err(teloxide::RequestError::RetryAfter(d)) if !retried => {
                    retried = true;
                    warn!(chat_id, retry_after = ?d, "Telegram flood control, retrying send");
                    sleep(d).await;
                }
                Err(e) => return Err(Self::map_err(e)),
            }
        }
    }
}
