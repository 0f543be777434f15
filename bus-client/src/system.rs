//! zbus-backed implementation of the broker traits

use std::collections::HashMap;
use std::sync::Arc;

use zbus::blocking::{Connection, MessageIterator};
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};
use zbus::object_server::Interface;
use zbus::{DBusError, MatchRule};

use crate::notification::byte_array;
use crate::proxies::{
    Adapter1ProxyBlocking, AgentManager1ProxyBlocking, BluezObjectManagerProxyBlocking,
    Media1ProxyBlocking,
};
use crate::{
    AdapterPropertiesClient, AdapterProperty, AgentError, AgentHandler, AgentManagerClient,
    BusError, BusNotification, EndpointProperties, ManagedObjects, MediaClient,
    MediaEndpointHandler, NotificationSource, NotificationStream, ObjectExporter,
    ObjectManagerClient, PairingRequest, BLUEZ_ROOT_PATH, BLUEZ_SERVICE,
};

/// Signals queued per subscription before the connection applies back-pressure
const NOTIFICATION_QUEUE: usize = 256;

/// Blocking connection to the system bus
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Clone)]
pub struct SystemBus {
    connection: Connection,
}

impl SystemBus {
    /// Connect to the system bus
    pub fn connect() -> Result<Self, BusError> {
        let connection = Connection::system().map_err(|e| BusError::Connection(e.to_string()))?;
        Ok(Self { connection })
    }

    fn adapter_proxy(&self, adapter_path: &str) -> Result<Adapter1ProxyBlocking<'static>, BusError> {
        Adapter1ProxyBlocking::builder(&self.connection)
            .path(adapter_path.to_string())
            .and_then(|builder| builder.build())
            .map_err(|e| BusError::remote("Adapter1", adapter_path, e))
    }
}

fn object_path(path: &str) -> Result<ObjectPath<'_>, BusError> {
    ObjectPath::try_from(path).map_err(|_| BusError::InvalidPath(path.to_string()))
}

impl ObjectManagerClient for SystemBus {
    fn get_managed_objects(&self) -> Result<ManagedObjects, BusError> {
        let proxy = BluezObjectManagerProxyBlocking::new(&self.connection)
            .map_err(|e| BusError::remote("GetManagedObjects", "/", e))?;
        let objects = proxy
            .get_managed_objects()
            .map_err(|e| BusError::remote("GetManagedObjects", "/", e))?;

        Ok(objects
            .into_iter()
            .map(|(path, interfaces)| (path.as_str().to_string(), interfaces.into_keys().collect()))
            .collect())
    }
}

impl AdapterPropertiesClient for SystemBus {
    fn set_adapter_property(
        &self,
        adapter_path: &str,
        property: AdapterProperty,
        value: bool,
    ) -> Result<(), BusError> {
        let proxy = self.adapter_proxy(adapter_path)?;
        let result = match property {
            AdapterProperty::Powered => proxy.set_powered(value),
            AdapterProperty::Discoverable => proxy.set_discoverable(value),
            AdapterProperty::Pairable => proxy.set_pairable(value),
        };
        result.map_err(|e| BusError::remote(property.name(), adapter_path, e))
    }
}

impl MediaClient for SystemBus {
    fn register_endpoint(
        &self,
        adapter_path: &str,
        endpoint_path: &str,
        properties: &EndpointProperties,
    ) -> Result<(), BusError> {
        let proxy = Media1ProxyBlocking::builder(&self.connection)
            .path(adapter_path.to_string())
            .and_then(|builder| builder.build())
            .map_err(|e| BusError::remote("RegisterEndpoint", adapter_path, e))?;

        let mut dict: HashMap<&str, Value<'_>> = HashMap::new();
        dict.insert("UUID", Value::from(properties.uuid.as_str()));
        dict.insert("Codec", Value::from(properties.codec));
        dict.insert("DelayReporting", Value::from(properties.delay_reporting));
        dict.insert("Capabilities", Value::from(properties.capabilities.clone()));

        proxy
            .register_endpoint(&object_path(endpoint_path)?, dict)
            .map_err(|e| BusError::remote("RegisterEndpoint", adapter_path, e))
    }
}

impl AgentManagerClient for SystemBus {
    fn register_agent(&self, agent_path: &str, capability: &str) -> Result<(), BusError> {
        let proxy = AgentManager1ProxyBlocking::new(&self.connection)
            .map_err(|e| BusError::remote("RegisterAgent", BLUEZ_ROOT_PATH, e))?;
        proxy
            .register_agent(&object_path(agent_path)?, capability)
            .map_err(|e| BusError::remote("RegisterAgent", BLUEZ_ROOT_PATH, e))
    }

    fn request_default_agent(&self, agent_path: &str) -> Result<(), BusError> {
        let proxy = AgentManager1ProxyBlocking::new(&self.connection)
            .map_err(|e| BusError::remote("RequestDefaultAgent", BLUEZ_ROOT_PATH, e))?;
        proxy
            .request_default_agent(&object_path(agent_path)?)
            .map_err(|e| BusError::remote("RequestDefaultAgent", BLUEZ_ROOT_PATH, e))
    }
}

impl SystemBus {
    /// Serve `iface` at `path`, replacing an instance left by an earlier
    /// export (a re-added adapter serves its agent at the same path)
    fn serve<I: Interface>(&self, path: &str, iface: I) -> Result<(), BusError> {
        let export_error = |e: zbus::Error| BusError::Export {
            path: path.to_string(),
            message: e.to_string(),
        };
        let server = self.connection.object_server();

        match server.remove::<I, _>(path) {
            Ok(_) => tracing::debug!("Replaced {} at {}", I::name(), path),
            Err(zbus::Error::InterfaceNotFound) => {}
            Err(e) => return Err(export_error(e)),
        }

        let added = server.at(path, iface).map_err(export_error)?;
        if added {
            Ok(())
        } else {
            Err(BusError::Export {
                path: path.to_string(),
                message: "interface already served at this path".to_string(),
            })
        }
    }
}

impl ObjectExporter for SystemBus {
    fn export_media_endpoint(
        &self,
        path: &str,
        handler: Arc<dyn MediaEndpointHandler>,
    ) -> Result<(), BusError> {
        self.serve(path, MediaEndpointObject { handler })
    }

    fn export_agent(&self, path: &str, handler: Arc<dyn AgentHandler>) -> Result<(), BusError> {
        self.serve(path, AgentObject { handler })
    }
}

impl NotificationSource for SystemBus {
    fn subscribe(&self) -> Result<NotificationStream, BusError> {
        // InterfacesAdded/Removed and PropertiesChanged are all plain signals
        // from the daemon; the decoder drops everything else.
        let rule = MatchRule::builder()
            .msg_type(zbus::message::Type::Signal)
            .sender(BLUEZ_SERVICE)
            .map_err(|e| BusError::Subscription(e.to_string()))?
            .build();
        let messages = MessageIterator::for_match_rule(rule, &self.connection, Some(NOTIFICATION_QUEUE))
            .map_err(|e| BusError::Subscription(e.to_string()))?;

        Ok(Box::new(messages.filter_map(|message| match message {
            Ok(message) => BusNotification::from_message(&message),
            Err(e) => {
                tracing::warn!("Dropping undecodable bus message: {}", e);
                None
            }
        })))
    }
}

// ============================================================================
// Served objects
// ============================================================================

/// Error replies in the `org.bluez.Error` namespace
#[derive(Debug, DBusError)]
#[zbus(prefix = "org.bluez.Error")]
enum BluezReply {
    #[zbus(error)]
    ZBus(zbus::Error),
    Rejected(String),
}

impl From<AgentError> for BluezReply {
    fn from(error: AgentError) -> Self {
        match error {
            AgentError::Rejected(reason) => BluezReply::Rejected(reason),
        }
    }
}

struct MediaEndpointObject {
    handler: Arc<dyn MediaEndpointHandler>,
}

#[zbus::interface(name = "org.bluez.MediaEndpoint1")]
impl MediaEndpointObject {
    fn select_configuration(&self, capabilities: Vec<u8>) -> Vec<u8> {
        self.handler.select_configuration(&capabilities)
    }

    /// BlueZ passes the transport properties; the negotiated blob is the
    /// `Configuration` entry.
    fn set_configuration(&self, transport: OwnedObjectPath, properties: HashMap<String, OwnedValue>) {
        let configuration = properties
            .get("Configuration")
            .and_then(|value| byte_array(value))
            .unwrap_or_default();
        self.handler.set_configuration(transport.as_str(), &configuration);
    }

    fn clear_configuration(&self, transport: OwnedObjectPath) {
        self.handler.clear_configuration(transport.as_str());
    }

    fn release(&self) {
        self.handler.release();
    }
}

struct AgentObject {
    handler: Arc<dyn AgentHandler>,
}

impl AgentObject {
    fn no_input(&self, device: &OwnedObjectPath, request: PairingRequest) -> BluezReply {
        match self.handler.pairing_request(device.as_str(), request) {
            Ok(()) => BluezReply::Rejected("agent has no input capability".to_string()),
            Err(error) => error.into(),
        }
    }
}

#[zbus::interface(name = "org.bluez.Agent1")]
impl AgentObject {
    fn release(&self) {
        self.handler.release();
    }

    fn request_pin_code(&self, device: OwnedObjectPath) -> Result<String, BluezReply> {
        Err(self.no_input(&device, PairingRequest::PinCode))
    }

    fn display_pin_code(&self, device: OwnedObjectPath, pincode: String) -> Result<(), BluezReply> {
        Ok(self
            .handler
            .pairing_request(device.as_str(), PairingRequest::DisplayPinCode { pincode })?)
    }

    fn request_passkey(&self, device: OwnedObjectPath) -> Result<u32, BluezReply> {
        Err(self.no_input(&device, PairingRequest::Passkey))
    }

    fn display_passkey(&self, device: OwnedObjectPath, passkey: u32, entered: u16) -> Result<(), BluezReply> {
        Ok(self
            .handler
            .pairing_request(device.as_str(), PairingRequest::DisplayPasskey { passkey, entered })?)
    }

    fn request_confirmation(&self, device: OwnedObjectPath, passkey: u32) -> Result<(), BluezReply> {
        Ok(self
            .handler
            .pairing_request(device.as_str(), PairingRequest::Confirmation { passkey })?)
    }

    fn request_authorization(&self, device: OwnedObjectPath) -> Result<(), BluezReply> {
        Ok(self
            .handler
            .pairing_request(device.as_str(), PairingRequest::Authorization)?)
    }

    fn authorize_service(&self, device: OwnedObjectPath, uuid: String) -> Result<(), BluezReply> {
        Ok(self.handler.authorize_service(device.as_str(), &uuid)?)
    }

    fn cancel(&self) {
        self.handler.cancel();
    }
}
