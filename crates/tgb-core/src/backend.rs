//! The Telegram backend: connect, long-poll for updates, dispatch to the host.

use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::Duration,
};

use serde_json::json;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    domain::{Identifier, RemotePerson, RemoteRoom},
    errors::Error,
    messaging::{
        port::BotApi,
        types::{Message, MessageDraft, RawUpdate},
    },
    normalize::normalize_message,
    outbound::OutboundSender,
    ports::{Host, KeyValueStore},
    Result,
};

/// Outbound message size limit the backend imposes on the host.
pub const TELEGRAM_MESSAGE_SIZE_LIMIT: usize = 1024;

/// Store key holding the next update id to request.
pub const UPDATES_OFFSET_KEY: &str = "_telegram_updates_offset";

/// How long a `getUpdates` call may wait server-side for new updates.
pub const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Polling,
    Disconnecting,
    /// The last connect attempt failed; nothing is running.
    Failed,
}

/// How a single `serve_once` run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Cancelled from outside. The host should stop.
    Shutdown,
    /// `getMe` failed; polling never started.
    ConnectFailed,
    /// Fetching updates (or persisting the cursor) failed mid-run.
    StreamError,
}

impl ServeOutcome {
    pub fn is_clean(self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

/// Requested presence. Telegram has no presence API for bots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Presence {
    #[default]
    Online,
    Away,
    DoNotDisturb,
    Offline,
}

pub struct TelegramBackend {
    api: Arc<dyn BotApi>,
    store: Arc<dyn KeyValueStore>,
    sender: OutboundSender,
    identity: RwLock<Option<RemotePerson>>,
    // Written only by the polling loop.
    offset: AtomicI64,
    state: watch::Sender<ConnectionState>,
}

impl TelegramBackend {
    /// Create the backend and lower the host's message size limit to Telegram's.
    pub fn new(
        cfg: &mut Config,
        api: Arc<dyn BotApi>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        if cfg.bot_token.trim().is_empty() {
            return Err(Error::Config(
                "You need to supply a token for me to use. You can obtain a token by \
                 registering your bot with the Bot Father (@BotFather)"
                    .to_string(),
            ));
        }
        cfg.message_size_limit = TELEGRAM_MESSAGE_SIZE_LIMIT;

        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            sender: OutboundSender::new(api.clone()),
            api,
            store,
            identity: RwLock::new(None),
            offset: AtomicI64::new(0),
            state,
        })
    }

    pub fn mode(&self) -> &'static str {
        "telegram"
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// The bot's own identity, known after the first successful connect.
    pub fn bot_identifier(&self) -> Option<RemotePerson> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Next update id the loop will request.
    pub fn offset(&self) -> i64 {
        self.offset.load(Ordering::Acquire)
    }

    /// A sender usable independently of the backend's lifetime.
    pub fn sender(&self) -> OutboundSender {
        self.sender.clone()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        debug!(from = ?prev, to = ?next, "connection state changed");
    }

    /// Connect, then poll until cancelled or the update stream fails.
    ///
    /// Retrying after `ConnectFailed` or `StreamError` is up to the caller.
    pub async fn serve_once(&self, host: &dyn Host, cancel: &CancellationToken) -> ServeOutcome {
        info!("Initializing connection");
        self.set_state(ConnectionState::Connecting);

        let me = match self.api.get_me().await {
            Ok(u) => RemotePerson::from(&u),
            Err(e) => {
                error!(error = %e, "Connection failure");
                self.set_state(ConnectionState::Failed);
                return ServeOutcome::ConnectFailed;
            }
        };
        *self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(me.clone());

        info!(bot_id = me.id(), username = ?me.username(), "Connected");
        host.reset_reconnection_count();
        host.connect_callback();

        let offset = self.load_offset().await;
        self.offset.store(offset, Ordering::Release);

        self.set_state(ConnectionState::Polling);
        let outcome = self.poll(host, &me, cancel).await;

        self.set_state(ConnectionState::Disconnecting);
        debug!("Triggering disconnect callback");
        host.disconnect_callback();
        self.set_state(ConnectionState::Disconnected);

        outcome
    }

    async fn load_offset(&self) -> i64 {
        match self.store.get(UPDATES_OFFSET_KEY).await {
            Ok(Some(v)) => v.as_i64().unwrap_or_else(|| {
                warn!(value = %v, "Stored update offset is not an integer, starting from 0");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Failed to read stored update offset, starting from 0");
                0
            }
        }
    }

    async fn poll(
        &self,
        host: &dyn Host,
        bot: &RemotePerson,
        cancel: &CancellationToken,
    ) -> ServeOutcome {
        loop {
            let offset = self.offset();
            debug!(offset, "Getting updates");

            let batch = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Interrupt received, shutting down..");
                    return ServeOutcome::Shutdown;
                }
                res = self.api.get_updates(offset, LONG_POLL_TIMEOUT) => res,
            };

            let updates = match batch {
                Ok(updates) => updates,
                Err(e) => {
                    error!(offset, error = %e, "Error reading from Telegram updates stream");
                    return ServeOutcome::StreamError;
                }
            };

            for update in updates {
                let update_id = update.update_id;
                let next = update_id.saturating_add(1);
                self.offset.store(next, Ordering::Release);
                if let Err(e) = self.store.set(UPDATES_OFFSET_KEY, json!(next)).await {
                    error!(offset = next, error = %e, "Failed to persist update offset");
                    return ServeOutcome::StreamError;
                }

                debug!(update_id, update = ?update, "Processing update");
                if let Err(e) = self.handle_update(host, bot, update).await {
                    error!(update_id, error = %e, "An error occurred while processing update");
                }
            }

            debug!(offset = self.offset(), "All updates processed");
        }
    }

    async fn handle_update(&self, host: &dyn Host, bot: &RemotePerson, update: RawUpdate) -> Result<()> {
        let Some(raw) = update.message else {
            warn!(update_id = update.update_id, "Unknown update type (no message present)");
            return Ok(());
        };
        match normalize_message(host, bot, raw) {
            Some(msg) => host.callback_message(msg).await,
            None => Ok(()),
        }
    }

    /// Deliver `msg` to its recipient. Failures are logged and returned.
    pub async fn send_message(&self, msg: &Message) -> Result<()> {
        self.sender.send(msg).await
    }

    /// Presence is accepted and ignored.
    pub fn change_presence(&self, status: Presence, message: &str) {
        debug!(?status, status_message = message, "Presence changes are not supported on Telegram");
    }

    /// Parse a textual id supplied by the host.
    pub fn build_identifier(&self, text: &str) -> Result<Identifier> {
        debug!(text, "Building an identifier");
        text.parse()
    }

    /// Build a reply to `msg` sent by the bot.
    ///
    /// Direct messages and private replies go back to the sender; group
    /// replies go to the room.
    pub fn build_reply(&self, msg: &Message, text: &str, private: bool) -> Result<Message> {
        let bot = self.bot_identifier().ok_or(Error::NotConnected)?;
        let to = if private || msg.is_direct() {
            msg.frm.clone()
        } else {
            msg.to.clone()
        };
        Ok(MessageDraft::new(text).address(Identifier::Person(bot), to))
    }

    /// Prefix a group reply with a mention of `identifier`.
    pub fn prefix_groupchat_reply(msg: &mut Message, identifier: &Identifier) {
        let nick = identifier
            .as_person()
            .and_then(|p| {
                p.nick().map(str::to_string).or_else(|| {
                    let full = p.fullname();
                    (!full.is_empty()).then_some(full)
                })
            })
            .unwrap_or_else(|| identifier.id().to_string());
        msg.body = format!("@{nick}: {}", msg.body);
    }

    pub fn query_room(&self, _room: &str) -> Result<RemoteRoom> {
        Err(Error::rooms_not_supported())
    }

    pub fn rooms(&self) -> Result<Vec<RemoteRoom>> {
        Err(Error::rooms_not_supported())
    }
}
