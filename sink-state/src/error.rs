//! Error types for sink-state

use std::fmt;

use bus_client::BusError;
use sink_api::ApiError;

/// Result type for sink-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur while mirroring and preparing adapters
#[derive(Debug)]
pub enum StateError {
    /// A remote call, export or subscription failed
    Bus(BusError),

    /// Invalid sink options
    Api(ApiError),

    /// The adapter already serves a pairing agent
    AgentAlreadyRegistered(String),

    /// No adapter with this name is tracked
    AdapterNotFound(String),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::Bus(err) => write!(f, "Bus error: {}", err),
            StateError::Api(err) => write!(f, "API error: {}", err),
            StateError::AgentAlreadyRegistered(adapter) => {
                write!(f, "Agent already registered for adapter {}", adapter)
            }
            StateError::AdapterNotFound(adapter) => write!(f, "Adapter not found: {}", adapter),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StateError::Bus(err) => Some(err),
            StateError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BusError> for StateError {
    fn from(err: BusError) -> Self {
        StateError::Bus(err)
    }
}

impl From<ApiError> for StateError {
    fn from(err: ApiError) -> Self {
        StateError::Api(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_bus_error_source() {
        let err = StateError::from(BusError::Subscription("denied".to_string()));
        assert!(err.to_string().starts_with("Bus error:"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_adapter_not_found_display() {
        let err = StateError::AdapterNotFound("hci3".to_string());
        assert_eq!(err.to_string(), "Adapter not found: hci3");
        assert!(err.source().is_none());
    }
}
