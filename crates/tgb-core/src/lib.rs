//! Core of the Telegram backend for a generic chat-bot host.
//!
//! This crate is provider-client agnostic. The Telegram Bot API client lives
//! behind the [`messaging::port::BotApi`] port, implemented in `tgb-telegram`;
//! the bot runtime lives behind [`ports::Host`].

pub mod backend;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod limits;
pub mod logging;
pub mod messaging;
pub mod normalize;
pub mod outbound;
pub mod ports;
pub mod storage;

pub use backend::{ConnectionState, Presence, ServeOutcome, TelegramBackend};
pub use errors::{Error, Result};
