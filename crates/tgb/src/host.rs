//! Minimal bot runtime driving the Telegram backend.

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tgb_core::{
    config::Config,
    domain::{Identifier, Person},
    limits::split_message,
    messaging::types::Message,
    ports::Host,
    Result, TelegramBackend,
};

const HELP: &str = "**Commands**\n\
- `help`: this message\n\
- `echo <text>`: repeat the text\n\
- `whoami`: show what Telegram tells me about you";

/// Answers prefix commands and ignores everything else.
pub struct CommandHost {
    backend: Arc<TelegramBackend>,
    prefix: String,
    size_limit: usize,
    reconnects: AtomicU32,
}

impl CommandHost {
    pub fn new(backend: Arc<TelegramBackend>, cfg: &Config) -> Self {
        Self {
            backend,
            prefix: cfg.command_prefix.clone(),
            size_limit: cfg.message_size_limit,
            reconnects: AtomicU32::new(0),
        }
    }

    /// Count a failed serve attempt and return the new total.
    fn record_reconnect(&self) -> u32 {
        self.reconnects.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    async fn reply(&self, msg: &Message, text: &str) -> Result<()> {
        let mut reply = self.backend.build_reply(msg, text, false)?;
        if msg.is_group() {
            TelegramBackend::prefix_groupchat_reply(&mut reply, &msg.frm);
        }
        for chunk in split_message(&reply.body, self.size_limit) {
            let part = Message {
                body: chunk,
                ..reply.clone()
            };
            self.backend.send_message(&part).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Host for CommandHost {
    fn connect_callback(&self) {
        info!(mode = self.backend.mode(), "Bot connected");
    }

    fn disconnect_callback(&self) {
        info!("Bot disconnected");
    }

    fn reset_reconnection_count(&self) {
        self.reconnects.store(0, Ordering::SeqCst);
    }

    async fn callback_message(&self, msg: Message) -> Result<()> {
        let Some(cmd) = parse_command(&msg.body, &self.prefix) else {
            debug!(from = %msg.frm, to = %msg.to, "Ignoring non-command message");
            return Ok(());
        };
        info!(from = %msg.frm, command = cmd.name, "Handling command");

        let text = match cmd.name {
            "help" => HELP.to_string(),
            "echo" if !cmd.args.is_empty() => cmd.args.to_string(),
            "echo" => "Nothing to echo.".to_string(),
            "whoami" => describe(&msg.frm),
            other => format!("Unknown command `{other}`. Try `{}help`.", self.prefix),
        };
        self.reply(&msg, &text).await
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Command<'a> {
    name: &'a str,
    args: &'a str,
}

fn parse_command<'a>(body: &'a str, prefix: &str) -> Option<Command<'a>> {
    let rest = body.trim_start().strip_prefix(prefix)?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest.trim_end(), ""),
    };
    if name.is_empty() {
        return None;
    }
    Some(Command { name, args })
}

fn describe(who: &Identifier) -> String {
    let Some(person) = who.as_person() else {
        return format!("id: `{}`", who.id());
    };
    let mut lines = vec![format!("id: `{}`", person.id())];
    let fullname = person.fullname();
    if !fullname.is_empty() {
        lines.push(format!("name: {fullname}"));
    }
    if let Some(nick) = person.nick() {
        lines.push(format!("username: @{nick}"));
    }
    if let Identifier::Occupant(member) = who {
        let room = member.room();
        match room.title() {
            Some(title) => lines.push(format!("room: {title} (`{}`)", room.id())),
            None => lines.push(format!("room: `{}`", room.id())),
        }
    }
    lines.join("\n")
}

/// Exponential reconnect delay, `base * 2^(attempt - 1)` capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exp).unwrap_or(max).min(max)
}

/// Serve until cancelled, reconnecting with backoff after failures.
pub async fn serve_forever(
    backend: &TelegramBackend,
    host: &CommandHost,
    cfg: &Config,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let outcome = backend.serve_once(host, cancel).await;
        if outcome.is_clean() || cancel.is_cancelled() {
            info!("Shutdown complete");
            return Ok(());
        }

        let attempt = host.record_reconnect();
        if let Some(max) = cfg.max_reconnects {
            if attempt > max {
                anyhow::bail!("giving up after {max} failed reconnect attempts ({outcome:?})");
            }
        }

        let delay = backoff_delay(attempt, cfg.reconnect_base_delay, cfg.reconnect_max_delay);
        warn!(?outcome, attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Shutdown requested while waiting to reconnect");
                return Ok(());
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tgb_core::{
        domain::{RemotePerson, RemoteRoom, RoomMember},
        errors::Error,
        messaging::{
            port::BotApi,
            types::{RawUpdate, RawUser},
        },
        storage::MemoryStore,
    };

    /// Either refuses to connect or answers with a fixed identity and no updates.
    #[derive(Default)]
    struct FakeApi {
        offline: bool,
        get_me_calls: AtomicU32,
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl BotApi for FakeApi {
        async fn get_me(&self) -> Result<RawUser> {
            self.get_me_calls.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return Err(Error::External("network down".to_string()));
            }
            Ok(RawUser {
                id: 7,
                first_name: "Bot".to_string(),
                last_name: None,
                username: Some("tgbot".to_string()),
            })
        }

        async fn get_updates(&self, _offset: i64, _timeout: Duration) -> Result<Vec<RawUpdate>> {
            std::future::pending().await
        }

        async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn setup(api: Arc<FakeApi>, cfg: &mut Config) -> (Arc<TelegramBackend>, CommandHost) {
        let backend =
            Arc::new(TelegramBackend::new(cfg, api, Arc::new(MemoryStore::new())).unwrap());
        let host = CommandHost::new(backend.clone(), cfg);
        (backend, host)
    }

    fn fast_config() -> Config {
        let mut cfg = Config::new("123:abc");
        cfg.reconnect_base_delay = Duration::from_millis(1);
        cfg.reconnect_max_delay = Duration::from_millis(2);
        cfg
    }

    #[tokio::test]
    async fn gives_up_after_max_reconnects() {
        let api = Arc::new(FakeApi {
            offline: true,
            ..Default::default()
        });
        let mut cfg = fast_config();
        cfg.max_reconnects = Some(2);
        let (backend, host) = setup(api.clone(), &mut cfg);

        let err = serve_forever(&backend, &host, &cfg, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("giving up after 2"));
        assert_eq!(api.get_me_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_ends_serving_cleanly() {
        let api = Arc::new(FakeApi::default());
        let mut cfg = fast_config();
        let (backend, host) = setup(api, &mut cfg);

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.cancel();
        });

        serve_forever(&backend, &host, &cfg, &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn echo_in_group_mentions_the_sender() {
        let api = Arc::new(FakeApi::default());
        let mut cfg = fast_config();
        let (backend, host) = setup(api.clone(), &mut cfg);

        // Connect once so the backend knows who it is.
        let cancel = CancellationToken::new();
        cancel.cancel();
        backend.serve_once(&host, &cancel).await;

        let alice = RemotePerson::with_names(
            42,
            Some("Alice".to_string()),
            None,
            Some("alice".to_string()),
        );
        let room = RemoteRoom::new(-100);
        let msg = Message {
            body: "!echo hi there".to_string(),
            frm: Identifier::Occupant(RoomMember::new(alice, room.clone())),
            to: Identifier::Room(room),
        };
        host.callback_message(msg).await.unwrap();

        let sent = api.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![(-100, "@alice: hi there".to_string())]);
    }

    #[tokio::test]
    async fn plain_chatter_is_ignored() {
        let api = Arc::new(FakeApi::default());
        let mut cfg = fast_config();
        let (_backend, host) = setup(api.clone(), &mut cfg);

        let msg = Message {
            body: "just saying hello".to_string(),
            frm: Identifier::Person(RemotePerson::new(42)),
            to: Identifier::Person(RemotePerson::new(7)),
        };
        host.callback_message(msg).await.unwrap();
        assert!(api.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn parses_prefixed_commands() {
        assert_eq!(
            parse_command("!echo  hello world ", "!"),
            Some(Command {
                name: "echo",
                args: "hello world"
            })
        );
        assert_eq!(
            parse_command("  !help", "!"),
            Some(Command {
                name: "help",
                args: ""
            })
        );
        assert_eq!(parse_command("hello", "!"), None);
        assert_eq!(parse_command("! echo", "!"), None);
        assert_eq!(parse_command("!", "!"), None);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(10);
        assert_eq!(backoff_delay(1, base, max), Duration::from_secs(1));
        assert_eq!(backoff_delay(2, base, max), Duration::from_secs(2));
        assert_eq!(backoff_delay(4, base, max), Duration::from_secs(8));
        assert_eq!(backoff_delay(5, base, max), max);
        assert_eq!(backoff_delay(u32::MAX, base, max), max);
    }

    #[test]
    fn describes_occupants_with_their_room() {
        let alice = RemotePerson::with_names(
            42,
            Some("Alice".to_string()),
            None,
            Some("alice".to_string()),
        );
        let room = RemoteRoom::with_title(-100, Some("Tea party".to_string()));
        let who = Identifier::Occupant(RoomMember::new(alice, room));

        assert_eq!(
            describe(&who),
            "id: `42`\nname: Alice\nusername: @alice\nroom: Tea party (`-100`)"
        );
        assert_eq!(describe(&Identifier::Room(RemoteRoom::new(-1))), "id: `-1`");
    }
}
