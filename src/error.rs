//! Error types for the SWIM purge workflow.
//!
//! No `anyhow` leakage. Explicit, typed errors.

#[derive(Debug, thiserror::Error)]
pub enum SwimError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("list images failed ({status}): {body}")]
    Inventory { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("task query failed {status}")]
    TaskQuery { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
