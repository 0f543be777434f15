use std::collections::BTreeMap;

use bus_client::{InterfaceSet, PropertyValue, MEDIA_TRANSPORT_INTERFACE};
use tracing::{debug, info, trace};

use super::TransportNode;
use crate::path::{ObjectPathParts, PathLevel};

/// A remote device under an adapter; tracks only its transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNode {
    name: String,
    path: String,
    transports: BTreeMap<String, TransportNode>,
}

impl DeviceNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let node = Self {
            name: name.into(),
            path: path.into(),
            transports: BTreeMap::new(),
        };
        info!("Device {} added", node.path);
        node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn transports(&self) -> &BTreeMap<String, TransportNode> {
        &self.transports
    }

    pub fn lookup_transport(&self, name: &str) -> Option<&TransportNode> {
        self.transports.get(name)
    }

    /// Track a transport below this device
    pub fn on_object_added(&mut self, parts: &ObjectPathParts, path: &str, interfaces: &InterfaceSet) {
        match (parts.level(), parts.transport.as_deref()) {
            (PathLevel::Transport, Some(name)) if interfaces.contains(MEDIA_TRANSPORT_INTERFACE) => {
                let transport = TransportNode::new(name, path);
                if let Some(replaced) = self.transports.insert(name.to_string(), transport) {
                    replaced.teardown();
                }
            }
            _ => trace!("Device {} ignoring added object {}", self.path, path),
        }
    }

    pub fn on_object_removed(&mut self, parts: &ObjectPathParts, path: &str, interfaces: &InterfaceSet) {
        match (parts.level(), parts.transport.as_deref()) {
            (PathLevel::Transport, Some(name)) if interfaces.contains(MEDIA_TRANSPORT_INTERFACE) => {
                if let Some(transport) = self.transports.remove(name) {
                    transport.teardown();
                }
            }
            _ => trace!("Device {} ignoring removed object {}", self.path, path),
        }
    }

    /// Returns false when the change is for a transport that is not tracked
    pub fn on_properties_changed(
        &self,
        parts: &ObjectPathParts,
        interface: &str,
        changed: &BTreeMap<String, PropertyValue>,
        invalidated: &[String],
    ) -> bool {
        match parts.transport.as_deref() {
            Some(name) => match self.transports.get(name) {
                Some(transport) => {
                    transport.on_properties_changed(interface, changed, invalidated);
                    true
                }
                None => false,
            },
            None => {
                debug!(
                    "Device {} {} changed: {:?}",
                    self.path,
                    interface,
                    changed.keys().collect::<Vec<_>>()
                );
                true
            }
        }
    }

    pub fn teardown(self) {
        for transport in self.transports.into_values() {
            transport.teardown();
        }
        info!("Device {} removed", self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_client::mock::interfaces;

    const DEVICE: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF";
    const TRANSPORT: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/fd0";

    fn device() -> DeviceNode {
        DeviceNode::new("dev_AA_BB_CC_DD_EE_FF", DEVICE)
    }

    fn parts(path: &str) -> ObjectPathParts {
        ObjectPathParts::parse(path).unwrap()
    }

    #[test]
    fn test_transport_added_and_removed() {
        let mut device = device();
        let markers = interfaces(&[MEDIA_TRANSPORT_INTERFACE]);

        device.on_object_added(&parts(TRANSPORT), TRANSPORT, &markers);
        assert_eq!(device.lookup_transport("fd0").map(|t| t.path()), Some(TRANSPORT));

        device.on_object_removed(&parts(TRANSPORT), TRANSPORT, &markers);
        assert!(device.transports().is_empty());
    }

    #[test]
    fn test_transport_requires_marker() {
        let mut device = device();
        device.on_object_added(
            &parts(TRANSPORT),
            TRANSPORT,
            &interfaces(&["org.freedesktop.DBus.Properties"]),
        );
        assert!(device.transports().is_empty());
    }

    #[test]
    fn test_duplicate_transport_replaces() {
        let mut device = device();
        let markers = interfaces(&[MEDIA_TRANSPORT_INTERFACE]);
        device.on_object_added(&parts(TRANSPORT), TRANSPORT, &markers);
        device.on_object_added(&parts(TRANSPORT), TRANSPORT, &markers);
        assert_eq!(device.transports().len(), 1);
    }

    #[test]
    fn test_unknown_transport_removal_is_noop() {
        let mut device = device();
        let before = device.clone();
        device.on_object_removed(
            &parts("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/fd7"),
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/fd7",
            &interfaces(&[MEDIA_TRANSPORT_INTERFACE]),
        );
        assert_eq!(device, before);
    }

    #[test]
    fn test_property_change_on_untracked_transport_is_ignored() {
        let device = device();
        let delivered = device.on_properties_changed(
            &parts(TRANSPORT),
            MEDIA_TRANSPORT_INTERFACE,
            &BTreeMap::from([("State".to_string(), PropertyValue::Text("active".to_string()))]),
            &[],
        );
        assert!(!delivered);
        assert!(device.transports().is_empty());
    }
}
