//! Deterministic object paths and profile identifiers

use crate::{ApiError, Codec, Result};

/// Default root under which endpoints and agents are served
pub const DEFAULT_OBJECT_ROOT: &str = "/test";

/// A2DP sink role UUID, sent as the endpoint's `UUID` property
pub const A2DP_SINK_UUID: &str = "0000110b-0000-1000-8000-00805f9b34fb";

/// AdvancedAudioDistribution service UUID, the only service the agent authorizes
pub const A2DP_SERVICE_UUID: &str = "0000110d-0000-1000-8000-00805f9b34fb";

/// IO capability the agent registers with
pub const AGENT_CAPABILITY: &str = "NoInputNoOutput";

/// `<root>/endpoint_<codec>_<adapter>`
pub fn endpoint_path(root: &str, codec: Codec, adapter: &str) -> String {
    format!("{}/endpoint_{}_{}", root.trim_end_matches('/'), codec.name(), adapter)
}

/// `<root>/agent_<adapter>`
pub fn agent_path(root: &str, adapter: &str) -> String {
    format!("{}/agent_{}", root.trim_end_matches('/'), adapter)
}

/// Check that `root` can prefix served object paths
///
/// D-Bus object paths are `/`-separated elements of `[A-Za-z0-9_]`; the root
/// itself may not be `/` alone since the generated names are appended to it.
pub fn validate_object_root(root: &str) -> Result<()> {
    let invalid = |reason| {
        Err(ApiError::InvalidObjectRoot {
            root: root.to_string(),
            reason,
        })
    };

    if !root.starts_with('/') {
        return invalid("must start with '/'");
    }
    if root.len() == 1 {
        return invalid("must not be the bus root");
    }
    if root.ends_with('/') {
        return invalid("must not end with '/'");
    }
    for element in root[1..].split('/') {
        if element.is_empty() {
            return invalid("must not contain empty elements");
        }
        if !element
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return invalid("elements may only contain [A-Za-z0-9_]");
        }
    }
    Ok(())
}
