use thiserror::Error;

use crate::protocol::FnId;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Unexpected end of message: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Varint exceeds {max} bytes")]
    VarintTooLong { max: usize },

    #[error("Varint does not fit in 32 bits")]
    VarintOverflow,

    #[error("Invalid update flags: {0:#010b}")]
    InvalidFlags(u8),

    #[error("{0} trailing bytes after message end")]
    TrailingBytes(usize),

    #[error("Message too large: {size} bytes, limit is {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Unknown component type: {0}")]
    UnknownComponent(FnId),

    #[error("Component type already registered: {0}")]
    DuplicateComponent(FnId),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
