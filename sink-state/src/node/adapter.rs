use std::collections::BTreeMap;
use std::sync::Arc;

use bus_client::{AdapterProperty, BluezBus, InterfaceSet, PropertyValue, DEVICE_INTERFACE};
use sink_api::{
    agent_path, endpoint_path, Codec, CodecSelection, MediaEndpointService, PairingAgentService,
    AGENT_CAPABILITY,
};
use tracing::{debug, error, info, trace, warn};

use super::DeviceNode;
use crate::path::{ObjectPathParts, PathLevel};
use crate::{Result, SinkContext, StateError};

/// Outcome of registering an adapter's media endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointReport {
    /// Endpoint paths registered with the daemon, in registration order
    pub registered: Vec<String>,
    /// Endpoint paths that could not be registered, with the error
    pub failed: Vec<(String, String)>,
}

impl EndpointReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of [`AdapterNode::prepare`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// Adapter properties that could not be written
    pub failed_properties: Vec<AdapterProperty>,
    pub endpoints: EndpointReport,
}

impl StartupReport {
    pub fn is_complete(&self) -> bool {
        self.failed_properties.is_empty() && self.endpoints.is_complete()
    }
}

/// A local Bluetooth controller and everything tracked below it
///
/// Power, discoverability and pairability live in the daemon and are only
/// ever written, never cached here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterNode {
    name: String,
    path: String,
    devices: BTreeMap<String, DeviceNode>,
    endpoints: Vec<String>,
    agent: Option<String>,
}

impl AdapterNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let node = Self {
            name: name.into(),
            path: path.into(),
            devices: BTreeMap::new(),
            endpoints: Vec::new(),
            agent: None,
        };
        info!("Adapter {} added", node.path);
        node
    }

    /// Adapter name, e.g. `hci0`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn devices(&self) -> &BTreeMap<String, DeviceNode> {
        &self.devices
    }

    pub fn lookup_device(&self, name: &str) -> Option<&DeviceNode> {
        self.devices.get(name)
    }

    /// Paths of the endpoints registered on this adapter, in registration
    /// order and without duplicates
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Path of the agent served for this adapter
    pub fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    // ------------------------------------------------------------------------
    // Remote property writes
    // ------------------------------------------------------------------------

    pub fn set_power<B: BluezBus>(&self, ctx: &SinkContext<B>, on: bool) -> Result<()> {
        self.write_property(ctx, AdapterProperty::Powered, on)
    }

    pub fn set_discoverable<B: BluezBus>(&self, ctx: &SinkContext<B>, on: bool) -> Result<()> {
        self.write_property(ctx, AdapterProperty::Discoverable, on)
    }

    pub fn set_pairable<B: BluezBus>(&self, ctx: &SinkContext<B>, on: bool) -> Result<()> {
        self.write_property(ctx, AdapterProperty::Pairable, on)
    }

    fn write_property<B: BluezBus>(
        &self,
        ctx: &SinkContext<B>,
        property: AdapterProperty,
        value: bool,
    ) -> Result<()> {
        ctx.bus().set_adapter_property(&self.path, property, value)?;
        info!("Adapter {} {} set to {}", self.name, property.name(), value);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Served objects
    // ------------------------------------------------------------------------

    /// Serve and register one endpoint per selected codec, SBC first
    ///
    /// Every codec is attempted even when an earlier one fails. Meant to run
    /// once per adapter; calling it again registers the endpoints again but
    /// records each path once.
    pub fn register_media_endpoints<B: BluezBus>(
        &mut self,
        ctx: &SinkContext<B>,
        codecs: &CodecSelection,
    ) -> EndpointReport {
        let mut report = EndpointReport::default();

        for &codec in codecs.codecs() {
            let path = endpoint_path(ctx.options().object_root(), codec, &self.name);
            match self.register_endpoint(ctx, codec, &path) {
                Ok(()) => {
                    info!("Registered {} endpoint {}", codec, path);
                    if !self.endpoints.contains(&path) {
                        self.endpoints.push(path.clone());
                    }
                    report.registered.push(path);
                }
                Err(e) => {
                    error!("Failed to register {} endpoint {}: {}", codec, path, e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        report
    }

    fn register_endpoint<B: BluezBus>(
        &self,
        ctx: &SinkContext<B>,
        codec: Codec,
        path: &str,
    ) -> Result<()> {
        let service = MediaEndpointService::new(path, codec);
        let properties = service.registration_properties();

        ctx.bus().export_media_endpoint(path, Arc::new(service))?;
        ctx.bus().register_endpoint(&self.path, path, &properties)?;
        Ok(())
    }

    /// Serve the pairing agent and make it the daemon's default
    ///
    /// The agent identity is recorded as soon as the object is served, so a
    /// second call fails with [`StateError::AgentAlreadyRegistered`] even if
    /// the daemon refused the first registration.
    pub fn register_agent<B: BluezBus>(&mut self, ctx: &SinkContext<B>) -> Result<String> {
        if self.agent.is_some() {
            return Err(StateError::AgentAlreadyRegistered(self.name.clone()));
        }

        let path = agent_path(ctx.options().object_root(), &self.name);
        ctx.bus()
            .export_agent(&path, Arc::new(PairingAgentService::new(path.as_str())))?;
        self.agent = Some(path.clone());

        ctx.bus().register_agent(&path, AGENT_CAPABILITY)?;
        ctx.bus().request_default_agent(&path)?;

        info!("Registered agent {} for adapter {}", path, self.name);
        Ok(path)
    }

    /// Power the adapter, open it for pairing and register the configured
    /// endpoints
    ///
    /// Each step is independent: a failure is logged and the next step runs.
    pub fn prepare<B: BluezBus>(&mut self, ctx: &SinkContext<B>) -> StartupReport {
        let mut report = StartupReport::default();

        let steps = [
            AdapterProperty::Powered,
            AdapterProperty::Discoverable,
            AdapterProperty::Pairable,
        ];
        for property in steps {
            if let Err(e) = self.write_property(ctx, property, true) {
                warn!("Could not set {} on {}: {}", property.name(), self.name, e);
                report.failed_properties.push(property);
            }
        }

        report.endpoints = self.register_media_endpoints(ctx, ctx.options().codecs());
        report
    }

    // ------------------------------------------------------------------------
    // Notification routing
    // ------------------------------------------------------------------------

    pub fn on_object_added(&mut self, parts: &ObjectPathParts, path: &str, interfaces: &InterfaceSet) {
        match (parts.level(), parts.device.as_deref()) {
            (PathLevel::Device, Some(name)) if interfaces.contains(DEVICE_INTERFACE) => {
                let device = DeviceNode::new(name, path);
                if let Some(replaced) = self.devices.insert(name.to_string(), device) {
                    replaced.teardown();
                }
            }
            (_, Some(name)) => match self.devices.get_mut(name) {
                Some(device) => device.on_object_added(parts, path, interfaces),
                None => trace!("No device {} on {}; ignoring {}", name, self.name, path),
            },
            (_, None) => trace!("Adapter {} ignoring added object {}", self.name, path),
        }
    }

    pub fn on_object_removed(&mut self, parts: &ObjectPathParts, path: &str, interfaces: &InterfaceSet) {
        match (parts.level(), parts.device.as_deref()) {
            (PathLevel::Device, Some(name)) if interfaces.contains(DEVICE_INTERFACE) => {
                if let Some(device) = self.devices.remove(name) {
                    device.teardown();
                }
            }
            (_, Some(name)) => {
                if let Some(device) = self.devices.get_mut(name) {
                    device.on_object_removed(parts, path, interfaces);
                }
            }
            (_, None) => trace!("Adapter {} ignoring removed object {}", self.name, path),
        }
    }

    /// Returns false when no tracked object below this adapter took the change
    pub fn on_properties_changed(
        &self,
        parts: &ObjectPathParts,
        interface: &str,
        changed: &BTreeMap<String, PropertyValue>,
        invalidated: &[String],
    ) -> bool {
        match parts.device.as_deref() {
            Some(name) => self.devices.get(name).is_some_and(|device| {
                device.on_properties_changed(parts, interface, changed, invalidated)
            }),
            None => {
                debug!(
                    "Adapter {} {} changed: {:?}",
                    self.name,
                    interface,
                    changed.keys().collect::<Vec<_>>()
                );
                true
            }
        }
    }

    pub fn teardown(self) {
        for device in self.devices.into_values() {
            device.teardown();
        }
        info!("Adapter {} removed", self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SinkOptions;
    use bus_client::mock::{interfaces, MockBus, RecordedCall};
    use bus_client::{MEDIA_TRANSPORT_INTERFACE, MediaEndpointHandler};
    use rstest::rstest;

    const ADAPTER: &str = "/org/bluez/hci0";
    const DEVICE: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF";
    const TRANSPORT: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/fd0";

    fn context(codecs: &str) -> SinkContext<MockBus> {
        let options = SinkOptions::new("/test", CodecSelection::from_list(codecs)).unwrap();
        SinkContext::new(MockBus::new(), options)
    }

    fn parts(path: &str) -> ObjectPathParts {
        ObjectPathParts::parse(path).unwrap()
    }

    #[test]
    fn test_register_two_codecs_plus_sbc() {
        let ctx = context("mp3,aac");
        let mut adapter = AdapterNode::new("hci0", ADAPTER);

        let report = adapter.register_media_endpoints(&ctx, ctx.options().codecs());

        assert!(report.is_complete());
        assert_eq!(
            adapter.endpoints(),
            &[
                "/test/endpoint_sbc_hci0".to_string(),
                "/test/endpoint_mp3_hci0".to_string(),
                "/test/endpoint_aac_hci0".to_string(),
            ]
        );

        let registrations = ctx.bus().calls_to("RegisterEndpoint");
        assert_eq!(registrations.len(), 3);
        match &registrations[0] {
            RecordedCall::RegisterEndpoint {
                adapter_path,
                endpoint_path,
                properties,
            } => {
                assert_eq!(adapter_path, ADAPTER);
                assert_eq!(endpoint_path, "/test/endpoint_sbc_hci0");
                assert_eq!(properties.codec, 0x00);
                assert_eq!(properties.capabilities, vec![0xFF, 0xFF, 0x02, 0x40]);
                assert!(properties.delay_reporting);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_repeated_registration_records_each_endpoint_once() {
        let ctx = context("aac");
        let mut adapter = AdapterNode::new("hci0", ADAPTER);

        adapter.register_media_endpoints(&ctx, ctx.options().codecs());
        let report = adapter.register_media_endpoints(&ctx, ctx.options().codecs());

        assert_eq!(report.registered.len(), 2);
        assert_eq!(ctx.bus().calls_to("RegisterEndpoint").len(), 4);
        assert_eq!(
            adapter.endpoints(),
            &[
                "/test/endpoint_sbc_hci0".to_string(),
                "/test/endpoint_aac_hci0".to_string(),
            ]
        );
    }

    #[test]
    fn test_exported_endpoint_answers_with_fixed_configuration() {
        let ctx = context("aptx");
        let mut adapter = AdapterNode::new("hci0", ADAPTER);
        adapter.register_media_endpoints(&ctx, ctx.options().codecs());

        let endpoint = ctx.bus().media_endpoint("/test/endpoint_aptx_hci0").unwrap();
        assert_eq!(
            endpoint.select_configuration(&[0x01, 0x02]),
            vec![0x4F, 0x00, 0x00, 0x00, 0x01, 0x00, 0x22]
        );
    }

    #[test]
    fn test_failed_endpoint_does_not_stop_the_rest() {
        let ctx = context("mp3,aac");
        ctx.bus()
            .fail_method_at("RegisterEndpoint", "/test/endpoint_mp3_hci0");
        let mut adapter = AdapterNode::new("hci0", ADAPTER);

        let report = adapter.register_media_endpoints(&ctx, ctx.options().codecs());

        assert_eq!(report.registered.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "/test/endpoint_mp3_hci0");
        assert_eq!(ctx.bus().calls_to("RegisterEndpoint").len(), 3);
        assert!(!adapter.endpoints().contains(&"/test/endpoint_mp3_hci0".to_string()));
    }

    #[test]
    fn test_register_agent_once() {
        let ctx = context("none");
        let mut adapter = AdapterNode::new("hci0", ADAPTER);

        let path = adapter.register_agent(&ctx).unwrap();
        assert_eq!(path, "/test/agent_hci0");
        assert_eq!(adapter.agent(), Some("/test/agent_hci0"));
        assert_eq!(
            ctx.bus().calls_to("RegisterAgent"),
            vec![RecordedCall::RegisterAgent {
                agent_path: "/test/agent_hci0".to_string(),
                capability: "NoInputNoOutput".to_string(),
            }]
        );
        assert_eq!(ctx.bus().calls_to("RequestDefaultAgent").len(), 1);

        assert!(matches!(
            adapter.register_agent(&ctx),
            Err(StateError::AgentAlreadyRegistered(name)) if name == "hci0"
        ));
        assert_eq!(ctx.bus().calls_to("RegisterAgent").len(), 1);
    }

    #[test]
    fn test_register_agent_failure_is_reported() {
        let ctx = context("none");
        ctx.bus().fail_method("RegisterAgent");
        let mut adapter = AdapterNode::new("hci0", ADAPTER);

        assert!(matches!(adapter.register_agent(&ctx), Err(StateError::Bus(_))));
        assert!(ctx.bus().calls_to("RequestDefaultAgent").is_empty());
    }

    #[rstest]
    #[case(AdapterProperty::Powered)]
    #[case(AdapterProperty::Discoverable)]
    #[case(AdapterProperty::Pairable)]
    fn test_property_write_failure_surfaces(#[case] property: AdapterProperty) {
        let ctx = context("none");
        ctx.bus().fail_method(property.name());
        let adapter = AdapterNode::new("hci0", ADAPTER);

        let result = match property {
            AdapterProperty::Powered => adapter.set_power(&ctx, true),
            AdapterProperty::Discoverable => adapter.set_discoverable(&ctx, true),
            AdapterProperty::Pairable => adapter.set_pairable(&ctx, true),
        };
        assert!(matches!(result, Err(StateError::Bus(_))));
        // Not retried
        assert_eq!(ctx.bus().calls_to(property.name()).len(), 1);
    }

    #[test]
    fn test_prepare_runs_every_step() {
        let ctx = context("ldac");
        ctx.bus().fail_method("Discoverable");
        let mut adapter = AdapterNode::new("hci0", ADAPTER);

        let report = adapter.prepare(&ctx);

        assert_eq!(report.failed_properties, vec![AdapterProperty::Discoverable]);
        assert_eq!(report.endpoints.registered.len(), 2);
        assert!(!report.is_complete());

        let methods: Vec<&str> = ctx
            .bus()
            .calls()
            .iter()
            .map(|call| call.method())
            .filter(|method| *method != "ExportMediaEndpoint")
            .collect();
        assert_eq!(
            methods,
            vec!["Powered", "Discoverable", "Pairable", "RegisterEndpoint", "RegisterEndpoint"]
        );
    }

    #[test]
    fn test_device_and_transport_routing() {
        let mut adapter = AdapterNode::new("hci0", ADAPTER);
        adapter.on_object_added(&parts(DEVICE), DEVICE, &interfaces(&[DEVICE_INTERFACE]));
        adapter.on_object_added(
            &parts(TRANSPORT),
            TRANSPORT,
            &interfaces(&[MEDIA_TRANSPORT_INTERFACE]),
        );

        let device = adapter.lookup_device("dev_AA_BB_CC_DD_EE_FF").unwrap();
        assert!(device.lookup_transport("fd0").is_some());

        adapter.on_object_removed(&parts(DEVICE), DEVICE, &interfaces(&[DEVICE_INTERFACE]));
        assert!(adapter.devices().is_empty());
    }

    #[test]
    fn test_transport_for_untracked_device_is_ignored() {
        let mut adapter = AdapterNode::new("hci0", ADAPTER);
        adapter.on_object_added(
            &parts(TRANSPORT),
            TRANSPORT,
            &interfaces(&[MEDIA_TRANSPORT_INTERFACE]),
        );
        assert!(adapter.devices().is_empty());
    }

    #[test]
    fn test_device_removal_without_marker_keeps_device() {
        let mut adapter = AdapterNode::new("hci0", ADAPTER);
        adapter.on_object_added(&parts(DEVICE), DEVICE, &interfaces(&[DEVICE_INTERFACE]));
        adapter.on_object_removed(&parts(DEVICE), DEVICE, &interfaces(&["org.bluez.Battery1"]));
        assert!(adapter.lookup_device("dev_AA_BB_CC_DD_EE_FF").is_some());
    }
}
