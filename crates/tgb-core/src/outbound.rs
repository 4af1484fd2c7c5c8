use std::sync::Arc;

use tracing::error;

use crate::{
    formatting::markdown_to_text, messaging::port::BotApi, messaging::types::Message, Result,
};

/// Sends host messages to Telegram.
///
/// Holds no loop state, so clones can be used from any task while the
/// polling loop runs.
#[derive(Clone)]
pub struct OutboundSender {
    api: Arc<dyn BotApi>,
}

impl OutboundSender {
    pub fn new(api: Arc<dyn BotApi>) -> Self {
        Self { api }
    }

    /// Render `msg.body` as plain text and deliver it to `msg.to`.
    ///
    /// Size limits are the host's job; the body is expected to fit already.
    pub async fn send(&self, msg: &Message) -> Result<()> {
        let recipient = msg.to.id();
        let text = markdown_to_text(&msg.body);

        if let Err(e) = self.api.send_message(recipient, &text).await {
            error!(
                recipient,
                body = %msg.body,
                error = %e,
                "An error occurred while trying to send a message"
            );
            return Err(e);
        }
        Ok(())
    }
}
