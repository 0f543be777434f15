//! Error types for the bus client

use thiserror::Error;

/// Errors that can occur while talking to the BlueZ daemon
#[derive(Debug, Error)]
pub enum BusError {
    /// Could not open or use the bus connection
    #[error("D-Bus connection error: {0}")]
    Connection(String),

    /// A remote method call or property write was answered with an error
    #[error("Remote call {method} on {path} failed: {message}")]
    RemoteCall {
        method: &'static str,
        path: String,
        message: String,
    },

    /// A string could not be used as a D-Bus object path
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    /// A served object could not be placed on the bus
    #[error("Failed to export object at {path}: {message}")]
    Export { path: String, message: String },

    /// Subscribing to broker notifications failed
    #[error("Signal subscription failed: {0}")]
    Subscription(String),
}

impl BusError {
    /// Wrap a failed remote call
    pub fn remote(method: &'static str, path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::RemoteCall {
            method,
            path: path.into(),
            message: error.to_string(),
        }
    }
}

/// Errors a served agent returns to the daemon
///
/// The daemon relays these to the remote peer, so every variant maps onto a
/// `org.bluez.Error.*` name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// The request is refused (`org.bluez.Error.Rejected`)
    #[error("Rejected: {0}")]
    Rejected(String),
}
