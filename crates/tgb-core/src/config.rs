use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Host message size limit before a backend lowers it.
pub const DEFAULT_MESSAGE_SIZE_LIMIT: usize = 10_000;

/// Typed configuration for the bot host and the Telegram backend.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,

    /// Maximum outbound message length. The backend overwrites this with the
    /// provider limit when it is constructed.
    pub message_size_limit: usize,

    pub state_file: PathBuf,
    pub command_prefix: String,

    // Reconnect policy (host side)
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub max_reconnects: Option<u32>,
}

impl Config {
    /// Defaults for everything except the token.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            message_size_limit: DEFAULT_MESSAGE_SIZE_LIMIT,
            state_file: PathBuf::from("./data/tgb-state.json"),
            command_prefix: "!".to_string(),
            reconnect_base_delay: Duration::from_millis(1000),
            reconnect_max_delay: Duration::from_secs(300),
            max_reconnects: None,
        }
    }

    /// Load from the process environment, reading `./.env` first if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = get("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config(
                    "TELEGRAM_BOT_TOKEN is required. You can obtain a token by registering \
                     your bot with the Bot Father (@BotFather)"
                        .to_string(),
                )
            })?;

        let mut cfg = Self::new(bot_token.trim());

        if let Some(p) = get("TGB_STATE_FILE").and_then(non_empty) {
            cfg.state_file = PathBuf::from(p);
        }
        if let Some(p) = get("TGB_COMMAND_PREFIX").and_then(non_empty) {
            cfg.command_prefix = p.trim().to_string();
        }
        if let Some(ms) = parse_u64(&get, "TGB_RECONNECT_BASE_MS")? {
            cfg.reconnect_base_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_u64(&get, "TGB_RECONNECT_MAX_SECS")? {
            cfg.reconnect_max_delay = Duration::from_secs(secs);
        }
        if let Some(n) = parse_u64(&get, "TGB_MAX_RECONNECTS")? {
            let n = u32::try_from(n)
                .map_err(|_| Error::Config(format!("TGB_MAX_RECONNECTS is too large: {n}")))?;
            cfg.max_reconnects = Some(n);
        }

        Ok(cfg)
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = get(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

/// Export `.env` entries that the process environment does not already set.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in parse_dotenv(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// `KEY=value` pairs, skipping comments and blank lines. Accepts an
/// `export ` prefix and strips one layer of matching quotes.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = value.trim();
            let unquoted = ['"', '\'']
                .iter()
                .find_map(|q| value.strip_prefix(*q)?.strip_suffix(*q))
                .unwrap_or(value);
            Some((key.to_string(), unquoted.to_string()))
        })
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("TELEGRAM_BOT_TOKEN")));

        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "   ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", " 123:abc ")])).unwrap();
        assert_eq!(cfg.bot_token, "123:abc");
        assert_eq!(cfg.message_size_limit, DEFAULT_MESSAGE_SIZE_LIMIT);
        assert_eq!(cfg.command_prefix, "!");
        assert_eq!(cfg.reconnect_base_delay, Duration::from_secs(1));
        assert_eq!(cfg.max_reconnects, None);
    }

    #[test]
    fn reads_optional_settings() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TGB_STATE_FILE", "/var/lib/tgb/state.json"),
            ("TGB_COMMAND_PREFIX", "/"),
            ("TGB_RECONNECT_BASE_MS", "250"),
            ("TGB_RECONNECT_MAX_SECS", "60"),
            ("TGB_MAX_RECONNECTS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.state_file, PathBuf::from("/var/lib/tgb/state.json"));
        assert_eq!(cfg.command_prefix, "/");
        assert_eq!(cfg.reconnect_base_delay, Duration::from_millis(250));
        assert_eq!(cfg.reconnect_max_delay, Duration::from_secs(60));
        assert_eq!(cfg.max_reconnects, Some(5));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TGB_MAX_RECONNECTS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("TGB_MAX_RECONNECTS")));
    }

    #[test]
    fn parses_dotenv_lines() {
        let contents = "# token for the test bot\n\
                        TELEGRAM_BOT_TOKEN=\"123:abc\"\n\
                        export TGB_COMMAND_PREFIX='/'\n\
                        \n\
                        not a pair\n\
                        =orphan\n\
                        TGB_STATE_FILE = state.json ";
        assert_eq!(
            parse_dotenv(contents),
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "123:abc".to_string()),
                ("TGB_COMMAND_PREFIX".to_string(), "/".to_string()),
                ("TGB_STATE_FILE".to_string(), "state.json".to_string()),
            ]
        );
    }
}
