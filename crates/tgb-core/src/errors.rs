/// Explanation attached to every room operation the Bot API cannot perform.
pub const ROOMS_NOT_SUPPORTED: &str = "Room operations are not supported on Telegram. \
While Telegram itself has groupchat functionality, it does not expose any APIs to bots \
to get group membership or otherwise interact with groupchats.";

/// Core error type for the Telegram backend.
///
/// Adapter crates map their client errors into `External` so the polling loop
/// and the host can treat every provider failure the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("telegram identifiers must be numeric, got {0:?}")]
    InvalidIdentifier(String),

    #[error("{0}")]
    RoomsNotSupported(String),

    #[error("backend is not connected")]
    NotConnected,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn rooms_not_supported() -> Self {
        Self::RoomsNotSupported(ROOMS_NOT_SUPPORTED.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
