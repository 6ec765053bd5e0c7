use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Media index error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Malformed media id {id:?}: {reason}")]
    MalformedId { id: String, reason: String },

    #[error("{0} is not a playable song")]
    NotPlayable(String),

    #[error("No {kind} with id {id}")]
    NotFound { kind: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
