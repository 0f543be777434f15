//! zbus proxy definitions for the BlueZ interfaces the sink calls.
//!
//! The `#[proxy]` macro generates both async and `*ProxyBlocking` types; only
//! the blocking ones are used.

use std::collections::HashMap;

use zbus::proxy;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

/// Proxy for org.bluez.Adapter1
#[proxy(interface = "org.bluez.Adapter1", default_service = "org.bluez")]
pub(crate) trait Adapter1 {
    #[zbus(property)]
    fn set_powered(&self, value: bool) -> zbus::Result<()>;

    #[zbus(property)]
    fn set_discoverable(&self, value: bool) -> zbus::Result<()>;

    #[zbus(property)]
    fn set_pairable(&self, value: bool) -> zbus::Result<()>;
}

/// Proxy for org.bluez.Media1, exposed on every adapter object
#[proxy(interface = "org.bluez.Media1", default_service = "org.bluez")]
pub(crate) trait Media1 {
    /// Register a local endpoint with the given codec properties
    fn register_endpoint(
        &self,
        endpoint: &ObjectPath<'_>,
        properties: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<()>;
}

/// Proxy for org.bluez.AgentManager1
#[proxy(
    interface = "org.bluez.AgentManager1",
    default_service = "org.bluez",
    default_path = "/org/bluez"
)]
pub(crate) trait AgentManager1 {
    fn register_agent(&self, agent: &ObjectPath<'_>, capability: &str) -> zbus::Result<()>;

    fn request_default_agent(&self, agent: &ObjectPath<'_>) -> zbus::Result<()>;
}

/// Proxy for org.freedesktop.DBus.ObjectManager on the BlueZ service
#[proxy(
    interface = "org.freedesktop.DBus.ObjectManager",
    default_service = "org.bluez",
    default_path = "/"
)]
pub(crate) trait BluezObjectManager {
    /// Returns: `{ object_path: { interface_name: { property: value } } }`
    fn get_managed_objects(
        &self,
    ) -> zbus::Result<HashMap<OwnedObjectPath, HashMap<String, HashMap<String, OwnedValue>>>>;
}
