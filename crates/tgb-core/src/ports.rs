use async_trait::async_trait;

use crate::{
    messaging::types::{Message, MessageDraft},
    Result,
};

/// Callbacks into the generic bot runtime that drives this backend.
#[async_trait]
pub trait Host: Send + Sync {
    /// Called once per successful connect, before polling starts.
    fn connect_callback(&self);

    /// Called exactly once whenever polling ends, whatever the reason.
    fn disconnect_callback(&self);

    /// A connect succeeded; the host may reset its reconnect backoff.
    fn reset_reconnection_count(&self) {}

    fn build_message(&self, text: &str) -> MessageDraft {
        MessageDraft::new(text)
    }

    /// Hand a normalized incoming message to the runtime.
    async fn callback_message(&self, msg: Message) -> Result<()>;
}

/// Host-provided key-value persistence.
///
/// The backend only ever stores its update cursor here.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}
