use std::time::Duration;

use async_trait::async_trait;

use crate::{
    messaging::types::{RawUpdate, RawUser},
    Result,
};

/// Provider port: the three Bot API calls the backend needs.
///
/// The Telegram adapter crate implements this over teloxide; tests use
/// scripted fakes.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Authenticate with the configured token and return the bot's own user.
    async fn get_me(&self) -> Result<RawUser>;

    /// Long-poll for updates with id `>= offset`, waiting up to `timeout`
    /// when none are pending. Updates come back in arrival order.
    async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<RawUpdate>>;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
}
