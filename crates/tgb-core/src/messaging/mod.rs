//! Provider-facing abstractions: raw update records, messages and the Bot API port.

pub mod port;
pub mod types;
