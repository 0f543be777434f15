//! Private BlueZ client for the A2DP null sink
//!
//! This crate is the only place that knows the daemon is reached over D-Bus.
//! Everything above it talks to the broker through small typed traits, one per
//! capability it consumes:
//!
//! - [`ObjectManagerClient`]: enumerate the managed object tree
//! - [`AdapterPropertiesClient`]: write adapter properties
//! - [`MediaClient`]: register media endpoints
//! - [`AgentManagerClient`]: register the pairing agent
//! - [`ObjectExporter`]: serve endpoint and agent objects
//! - [`NotificationSource`]: object-added/removed and property-change signals
//!
//! [`SystemBus`] implements all of them on top of a blocking zbus connection.
//! With the `test-support` feature, [`mock::MockBus`] implements them in memory
//! and records every call.

mod error;
mod notification;
mod proxies;
mod system;

#[cfg(feature = "test-support")]
pub mod mock;

pub use error::{AgentError, BusError};
pub use notification::{BusNotification, NotificationStream, PropertyValue};
pub use system::SystemBus;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Well-known bus name of the BlueZ daemon
pub const BLUEZ_SERVICE: &str = "org.bluez";
/// Root of every object BlueZ manages
pub const BLUEZ_ROOT_PATH: &str = "/org/bluez";

pub const ADAPTER_INTERFACE: &str = "org.bluez.Adapter1";
pub const DEVICE_INTERFACE: &str = "org.bluez.Device1";
pub const MEDIA_TRANSPORT_INTERFACE: &str = "org.bluez.MediaTransport1";
pub const OBJECT_MANAGER_INTERFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Interface names exposed by one object
pub type InterfaceSet = BTreeSet<String>;

/// Snapshot of the broker's object tree: object path -> interface names
pub type ManagedObjects = BTreeMap<String, InterfaceSet>;

/// Writable boolean properties of `org.bluez.Adapter1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterProperty {
    Powered,
    Discoverable,
    Pairable,
}

impl AdapterProperty {
    /// Property name as BlueZ spells it
    pub fn name(&self) -> &'static str {
        match self {
            AdapterProperty::Powered => "Powered",
            AdapterProperty::Discoverable => "Discoverable",
            AdapterProperty::Pairable => "Pairable",
        }
    }
}

/// Properties sent with `org.bluez.Media1.RegisterEndpoint`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointProperties {
    /// Profile UUID the endpoint serves
    pub uuid: String,
    /// A2DP codec identifier byte
    pub codec: u8,
    pub delay_reporting: bool,
    /// Codec capabilities blob
    pub capabilities: Vec<u8>,
}

/// Pairing interactions BlueZ may ask an agent for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingRequest {
    PinCode,
    Passkey,
    Confirmation { passkey: u32 },
    Authorization,
    DisplayPinCode { pincode: String },
    DisplayPasskey { passkey: u32, entered: u16 },
}

impl PairingRequest {
    /// Whether the request asks the agent to supply a value it would have to
    /// read from a user
    pub fn needs_input(&self) -> bool {
        matches!(self, PairingRequest::PinCode | PairingRequest::Passkey)
    }
}

// ============================================================================
// Served contracts
// ============================================================================

/// Behaviour behind a served `org.bluez.MediaEndpoint1` object
pub trait MediaEndpointHandler: Send + Sync {
    fn select_configuration(&self, capabilities: &[u8]) -> Vec<u8>;
    fn set_configuration(&self, transport: &str, configuration: &[u8]);
    fn clear_configuration(&self, transport: &str);
    fn release(&self);
}

/// Behaviour behind a served `org.bluez.Agent1` object
pub trait AgentHandler: Send + Sync {
    fn authorize_service(&self, device: &str, uuid: &str) -> Result<(), AgentError>;
    fn pairing_request(&self, device: &str, request: PairingRequest) -> Result<(), AgentError>;
    fn release(&self);
    fn cancel(&self);
}

// ============================================================================
// Consumed capabilities
// ============================================================================

/// `org.freedesktop.DBus.ObjectManager` on the BlueZ root
pub trait ObjectManagerClient {
    fn get_managed_objects(&self) -> Result<ManagedObjects, BusError>;
}

/// `org.freedesktop.DBus.Properties` writes on an adapter object
pub trait AdapterPropertiesClient {
    fn set_adapter_property(
        &self,
        adapter_path: &str,
        property: AdapterProperty,
        value: bool,
    ) -> Result<(), BusError>;
}

/// `org.bluez.Media1` on an adapter object
pub trait MediaClient {
    fn register_endpoint(
        &self,
        adapter_path: &str,
        endpoint_path: &str,
        properties: &EndpointProperties,
    ) -> Result<(), BusError>;
}

/// `org.bluez.AgentManager1` on `/org/bluez`
pub trait AgentManagerClient {
    fn register_agent(&self, agent_path: &str, capability: &str) -> Result<(), BusError>;
    fn request_default_agent(&self, agent_path: &str) -> Result<(), BusError>;
}

/// Places served objects on the bus
pub trait ObjectExporter {
    fn export_media_endpoint(
        &self,
        path: &str,
        handler: Arc<dyn MediaEndpointHandler>,
    ) -> Result<(), BusError>;

    fn export_agent(&self, path: &str, handler: Arc<dyn AgentHandler>) -> Result<(), BusError>;
}

/// Broker-wide object and property notifications
pub trait NotificationSource {
    /// Subscribe to object-added, object-removed and properties-changed
    /// notifications. Notifications arrive in broker order.
    fn subscribe(&self) -> Result<NotificationStream, BusError>;
}

/// Everything the sink needs from the broker
pub trait BluezBus:
    ObjectManagerClient
    + AdapterPropertiesClient
    + MediaClient
    + AgentManagerClient
    + ObjectExporter
    + NotificationSource
{
}

impl<T> BluezBus for T where
    T: ObjectManagerClient
        + AdapterPropertiesClient
        + MediaClient
        + AgentManagerClient
        + ObjectExporter
        + NotificationSource
{
}
