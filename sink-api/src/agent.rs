use bus_client::{AgentError, AgentHandler, PairingRequest};
use tracing::{info, warn};

use crate::paths::A2DP_SERVICE_UUID;

/// Served `org.bluez.Agent1` object for one adapter
///
/// Only the AdvancedAudioDistribution service is authorized. The agent has no
/// input or output, so every request that needs a user decision is declined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingAgentService {
    path: String,
}

impl PairingAgentService {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl AgentHandler for PairingAgentService {
    fn authorize_service(&self, device: &str, uuid: &str) -> Result<(), AgentError> {
        if uuid.eq_ignore_ascii_case(A2DP_SERVICE_UUID) {
            info!("Authorized service {} for {}", uuid, device);
            Ok(())
        } else {
            warn!("Rejected service {} for {}", uuid, device);
            Err(AgentError::Rejected("Service unauthorized".to_string()))
        }
    }

    fn pairing_request(&self, device: &str, request: PairingRequest) -> Result<(), AgentError> {
        match request {
            PairingRequest::DisplayPinCode { pincode } => {
                info!("PIN code for {}: {}", device, pincode);
                Ok(())
            }
            PairingRequest::DisplayPasskey { passkey, entered } => {
                info!("Passkey for {}: {:06} ({} entered)", device, passkey, entered);
                Ok(())
            }
            request if request.needs_input() => {
                warn!("Declined {:?} from {}: no input capability", request, device);
                Err(AgentError::Rejected("No input capability".to_string()))
            }
            request => {
                warn!("Declined {:?} from {}", request, device);
                Err(AgentError::Rejected("Pairing declined".to_string()))
            }
        }
    }

    fn release(&self) {
        info!("Agent {} released", self.path);
    }

    fn cancel(&self) {
        info!("Agent {} request cancelled", self.path);
    }
}
