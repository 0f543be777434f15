use bus_client::{EndpointProperties, MediaEndpointHandler};
use tracing::{debug, info};

use crate::paths::A2DP_SINK_UUID;
use crate::{Codec, CodecInfo};

/// Served `org.bluez.MediaEndpoint1` object for one codec on one adapter
///
/// Negotiation always answers with the codec's fixed configuration and
/// accepts whatever configuration the daemon settles on. The transport is
/// never acquired, so nothing is kept per connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEndpointService {
    path: String,
    codec: Codec,
    info: CodecInfo,
}

impl MediaEndpointService {
    pub fn new(path: impl Into<String>, codec: Codec) -> Self {
        Self {
            path: path.into(),
            codec,
            info: codec.info(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Properties for `org.bluez.Media1.RegisterEndpoint`
    pub fn registration_properties(&self) -> EndpointProperties {
        EndpointProperties {
            uuid: A2DP_SINK_UUID.to_string(),
            codec: self.info.codec_id,
            delay_reporting: true,
            capabilities: self.info.capabilities.to_vec(),
        }
    }
}

impl MediaEndpointHandler for MediaEndpointService {
    fn select_configuration(&self, capabilities: &[u8]) -> Vec<u8> {
        debug!(
            "SelectConfiguration on {} ({}): peer offered {} capability bytes",
            self.path,
            self.codec,
            capabilities.len()
        );
        self.info.configuration.to_vec()
    }

    fn set_configuration(&self, transport: &str, configuration: &[u8]) {
        info!(
            "SetConfiguration on {} ({}): transport {} configured with {:02x?}",
            self.path, self.codec, transport, configuration
        );
    }

    fn clear_configuration(&self, transport: &str) {
        info!(
            "ClearConfiguration on {} ({}): transport {}",
            self.path, self.codec, transport
        );
    }

    fn release(&self) {
        info!("Endpoint {} ({}) released", self.path, self.codec);
    }
}
