use thiserror::Error;

/// Errors raised while building sink objects
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A codec name outside the supported set
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),

    /// The root under which endpoints and agents are served is not a usable
    /// object path prefix
    #[error("Invalid object root '{root}': {reason}")]
    InvalidObjectRoot { root: String, reason: &'static str },
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
