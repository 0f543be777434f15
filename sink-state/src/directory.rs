//! Mirror of the daemon's adapter/device/transport tree
//!
//! [`BusDirectory`] is the single entry point for broker notifications. It is
//! the only writer of the tree and handles one notification at a time, so no
//! node needs locking.

use std::collections::BTreeMap;

use bus_client::{
    BluezBus, BusNotification, InterfaceSet, ManagedObjects, NotificationStream, PropertyValue,
    ADAPTER_INTERFACE,
};
use tracing::{debug, info, trace, warn};

use crate::node::{AdapterNode, StartupReport};
use crate::path::{is_bluez_object, ObjectPathParts, PathLevel};
use crate::{Result, SinkContext, StateError};

/// Tracked adapters keyed by adapter name, plus the context nodes need to
/// talk to the bus
pub struct BusDirectory<B> {
    ctx: SinkContext<B>,
    adapters: BTreeMap<String, AdapterNode>,
}

impl<B: BluezBus> BusDirectory<B> {
    /// Empty directory; nothing is subscribed or enumerated
    pub fn new(ctx: SinkContext<B>) -> Self {
        Self {
            ctx,
            adapters: BTreeMap::new(),
        }
    }

    /// Subscribe to notifications, then build the tree from one enumeration
    ///
    /// Subscribing first means no object can appear between the snapshot and
    /// the stream. The snapshot is replayed as object-added notifications in
    /// path order, so parents are always seen before their children.
    pub fn initialize(ctx: SinkContext<B>) -> Result<(Self, NotificationStream)> {
        let stream = ctx.bus().subscribe()?;
        let objects = ctx.bus().get_managed_objects()?;

        let mut directory = Self::new(ctx);
        directory.replay(&objects);
        info!(
            "Enumerated {} object(s), tracking {} adapter(s)",
            objects.len(),
            directory.adapters.len()
        );

        Ok((directory, stream))
    }

    /// Feed an object snapshot through [`on_object_added`](Self::on_object_added)
    pub fn replay(&mut self, objects: &ManagedObjects) {
        for (path, interfaces) in objects {
            self.on_object_added(path, interfaces);
        }
    }

    pub fn context(&self) -> &SinkContext<B> {
        &self.ctx
    }

    pub fn adapters(&self) -> &BTreeMap<String, AdapterNode> {
        &self.adapters
    }

    pub fn lookup_adapter(&self, name: &str) -> Option<&AdapterNode> {
        self.adapters.get(name)
    }

    pub fn lookup_adapter_mut(&mut self, name: &str) -> Option<&mut AdapterNode> {
        self.adapters.get_mut(name)
    }

    /// Run the startup steps on a tracked adapter
    pub fn prepare_adapter(&mut self, name: &str) -> Result<StartupReport> {
        let adapter = self
            .adapters
            .get_mut(name)
            .ok_or_else(|| StateError::AdapterNotFound(name.to_string()))?;
        Ok(adapter.prepare(&self.ctx))
    }

    /// Only objects below `/org/bluez/` are tracked
    pub fn on_object_added(&mut self, path: &str, interfaces: &InterfaceSet) {
        let Some(parts) = ObjectPathParts::parse(path).filter(|_| is_bluez_object(path)) else {
            trace!("Ignoring added object {}", path);
            return;
        };

        if parts.level() == PathLevel::Adapter && interfaces.contains(ADAPTER_INTERFACE) {
            let mut adapter = AdapterNode::new(parts.adapter.as_str(), path);
            if let Err(e) = adapter.register_agent(&self.ctx) {
                warn!("Agent registration for {} failed: {}", parts.adapter, e);
            }
            if let Some(replaced) = self.adapters.insert(parts.adapter, adapter) {
                replaced.teardown();
            }
            return;
        }

        match self.adapters.get_mut(&parts.adapter) {
            Some(adapter) => adapter.on_object_added(&parts, path, interfaces),
            None => trace!("No adapter {}; ignoring {}", parts.adapter, path),
        }
    }

    pub fn on_object_removed(&mut self, path: &str, interfaces: &InterfaceSet) {
        let Some(parts) = ObjectPathParts::parse(path).filter(|_| is_bluez_object(path)) else {
            trace!("Ignoring removed object {}", path);
            return;
        };

        if parts.level() == PathLevel::Adapter && interfaces.contains(ADAPTER_INTERFACE) {
            if let Some(adapter) = self.adapters.remove(&parts.adapter) {
                adapter.teardown();
            }
            return;
        }

        if let Some(adapter) = self.adapters.get_mut(&parts.adapter) {
            adapter.on_object_removed(&parts, path, interfaces);
        }
    }

    /// Forward a property change to the tracked object at `path`
    ///
    /// Returns whether a tracked object received it.
    pub fn on_properties_changed(
        &self,
        interface: &str,
        changed: &BTreeMap<String, PropertyValue>,
        invalidated: &[String],
        path: &str,
    ) -> bool {
        let Some(parts) = ObjectPathParts::parse(path).filter(|_| is_bluez_object(path)) else {
            return false;
        };

        self.adapters.get(&parts.adapter).is_some_and(|adapter| {
            adapter.on_properties_changed(&parts, interface, changed, invalidated)
        })
    }

    /// Route one notification to its handler
    pub fn dispatch(&mut self, notification: BusNotification) {
        match notification {
            BusNotification::ObjectAdded { path, interfaces } => {
                self.on_object_added(&path, &interfaces)
            }
            BusNotification::ObjectRemoved { path, interfaces } => {
                self.on_object_removed(&path, &interfaces)
            }
            BusNotification::PropertiesChanged {
                interface,
                changed,
                invalidated,
                path,
            } => {
                if !self.on_properties_changed(&interface, &changed, &invalidated, &path) {
                    trace!("No tracked object at {}; ignoring {} change", path, interface);
                }
            }
        }
    }

    /// Handle notifications until the stream ends
    pub fn run(&mut self, stream: NotificationStream) {
        for notification in stream {
            debug!("Notification for {}", notification.path());
            self.dispatch(notification);
        }
        info!("Notification stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SinkOptions;
    use bus_client::mock::{interfaces, MockBus};
    use bus_client::{DEVICE_INTERFACE, MEDIA_TRANSPORT_INTERFACE};

    fn directory(bus: MockBus) -> BusDirectory<MockBus> {
        BusDirectory::new(SinkContext::new(bus, SinkOptions::default()))
    }

    #[test]
    fn test_adapter_added_registers_agent() {
        let mut directory = directory(MockBus::new());
        directory.on_object_added("/org/bluez/hci0", &interfaces(&[ADAPTER_INTERFACE]));

        let adapter = directory.lookup_adapter("hci0").unwrap();
        assert_eq!(adapter.agent(), Some("/test/agent_hci0"));
        assert_eq!(directory.context().bus().calls_to("RegisterAgent").len(), 1);
        assert!(directory.lookup_adapter_mut("hci0").is_some());
        assert!(directory.lookup_adapter_mut("hci1").is_none());
    }

    #[test]
    fn test_agent_failure_still_tracks_adapter() {
        let bus = MockBus::new();
        bus.fail_method("RegisterAgent");
        let mut directory = directory(bus);

        directory.on_object_added("/org/bluez/hci0", &interfaces(&[ADAPTER_INTERFACE]));
        assert!(directory.lookup_adapter("hci0").is_some());
    }

    #[test]
    fn test_adapter_marker_only_counts_at_adapter_level() {
        let mut directory = directory(MockBus::new());
        directory.on_object_added(
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF",
            &interfaces(&[ADAPTER_INTERFACE]),
        );
        assert!(directory.adapters().is_empty());
    }

    #[test]
    fn test_short_paths_are_ignored() {
        let mut directory = directory(MockBus::new());
        directory.on_object_added("/org/bluez", &interfaces(&[ADAPTER_INTERFACE]));
        directory.on_object_removed("/", &interfaces(&[ADAPTER_INTERFACE]));
        assert!(directory.adapters().is_empty());
        assert!(directory.context().bus().calls().is_empty());
    }

    #[test]
    fn test_adapters_outside_bluez_are_ignored() {
        let mut directory = directory(MockBus::new());
        directory.on_object_added("/org/bluez/hci0", &interfaces(&[ADAPTER_INTERFACE]));
        directory.on_object_added("/a/b/c", &interfaces(&[ADAPTER_INTERFACE]));
        directory.on_object_added("/org/bluezz/hci1", &interfaces(&[ADAPTER_INTERFACE]));

        assert_eq!(directory.adapters().keys().collect::<Vec<_>>(), vec!["hci0"]);
        assert_eq!(directory.context().bus().calls_to("RegisterAgent").len(), 1);
        assert!(directory.context().bus().agent("/test/agent_c").is_none());

        // A foreign removal must not drop the tracked adapter of the same name
        directory.on_object_removed("/a/b/hci0", &interfaces(&[ADAPTER_INTERFACE]));
        assert!(directory.lookup_adapter("hci0").is_some());
    }

    #[test]
    fn test_orphaned_device_is_ignored() {
        let mut directory = directory(MockBus::new());
        directory.on_object_added(
            "/org/bluez/hci1/dev_AA_BB_CC_DD_EE_FF",
            &interfaces(&[DEVICE_INTERFACE]),
        );
        assert!(directory.adapters().is_empty());
    }

    #[test]
    fn test_adapter_removal_drops_subtree() {
        let mut directory = directory(MockBus::new());
        directory.on_object_added("/org/bluez/hci0", &interfaces(&[ADAPTER_INTERFACE]));
        directory.on_object_added(
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF",
            &interfaces(&[DEVICE_INTERFACE]),
        );
        directory.on_object_added(
            "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/fd0",
            &interfaces(&[MEDIA_TRANSPORT_INTERFACE]),
        );

        directory.on_object_removed("/org/bluez/hci0", &interfaces(&[ADAPTER_INTERFACE]));
        assert!(directory.lookup_adapter("hci0").is_none());
    }

    #[test]
    fn test_properties_outside_bluez_are_ignored() {
        let mut directory = directory(MockBus::new());
        directory.on_object_added("/org/bluez/hci0", &interfaces(&[ADAPTER_INTERFACE]));
        let before = directory.adapters().clone();

        assert!(!directory.on_properties_changed(
            "org.bluez.MediaEndpoint1",
            &BTreeMap::new(),
            &[],
            "/test/endpoint_sbc_hci0"
        ));
        directory.dispatch(BusNotification::PropertiesChanged {
            interface: "org.bluez.MediaEndpoint1".to_string(),
            changed: BTreeMap::new(),
            invalidated: vec![],
            path: "/test/endpoint_sbc_hci0".to_string(),
        });
        assert_eq!(directory.adapters(), &before);
    }

    #[test]
    fn test_prepare_unknown_adapter() {
        let mut directory = directory(MockBus::new());
        assert!(matches!(
            directory.prepare_adapter("hci0"),
            Err(StateError::AdapterNotFound(name)) if name == "hci0"
        ));
    }

    #[test]
    fn test_initialize_fails_when_enumeration_fails() {
        let bus = MockBus::new();
        bus.fail_method("GetManagedObjects");
        let result = BusDirectory::initialize(SinkContext::new(bus, SinkOptions::default()));
        assert!(matches!(result, Err(StateError::Bus(_))));
    }
}
