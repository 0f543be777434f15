//! In-memory broker for tests.
//!
//! `MockBus` serves a scripted object tree and notification queue, records
//! every remote call in order, and can be told to fail specific calls so error
//! paths can be exercised without a daemon.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    AdapterPropertiesClient, AdapterProperty, AgentHandler, AgentManagerClient, BusError,
    BusNotification, EndpointProperties, InterfaceSet, ManagedObjects, MediaClient,
    MediaEndpointHandler, NotificationSource, NotificationStream, ObjectExporter,
    ObjectManagerClient,
};

/// A remote call seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    GetManagedObjects,
    Subscribe,
    SetAdapterProperty {
        adapter_path: String,
        property: AdapterProperty,
        value: bool,
    },
    RegisterEndpoint {
        adapter_path: String,
        endpoint_path: String,
        properties: EndpointProperties,
    },
    RegisterAgent {
        agent_path: String,
        capability: String,
    },
    RequestDefaultAgent {
        agent_path: String,
    },
    ExportMediaEndpoint {
        path: String,
    },
    ExportAgent {
        path: String,
    },
}

impl RecordedCall {
    /// D-Bus-ish method name used for failure scripting
    pub fn method(&self) -> &'static str {
        match self {
            RecordedCall::GetManagedObjects => "GetManagedObjects",
            RecordedCall::Subscribe => "Subscribe",
            RecordedCall::SetAdapterProperty { property, .. } => property.name(),
            RecordedCall::RegisterEndpoint { .. } => "RegisterEndpoint",
            RecordedCall::RegisterAgent { .. } => "RegisterAgent",
            RecordedCall::RequestDefaultAgent { .. } => "RequestDefaultAgent",
            RecordedCall::ExportMediaEndpoint { .. } => "ExportMediaEndpoint",
            RecordedCall::ExportAgent { .. } => "ExportAgent",
        }
    }

    /// Object path the call targets, when it has one
    pub fn path(&self) -> Option<&str> {
        match self {
            RecordedCall::GetManagedObjects | RecordedCall::Subscribe => None,
            RecordedCall::SetAdapterProperty { adapter_path, .. } => Some(adapter_path),
            RecordedCall::RegisterEndpoint { endpoint_path, .. } => Some(endpoint_path),
            RecordedCall::RegisterAgent { agent_path, .. }
            | RecordedCall::RequestDefaultAgent { agent_path } => Some(agent_path),
            RecordedCall::ExportMediaEndpoint { path } | RecordedCall::ExportAgent { path } => {
                Some(path)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Failure {
    method: String,
    path: Option<String>,
}

/// Scriptable in-memory implementation of every broker trait
#[derive(Default)]
pub struct MockBus {
    objects: Mutex<ManagedObjects>,
    notifications: Mutex<Vec<BusNotification>>,
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<Vec<Failure>>,
    endpoints: Mutex<BTreeMap<String, Arc<dyn MediaEndpointHandler>>>,
    agents: Mutex<BTreeMap<String, Arc<dyn AgentHandler>>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to the tree returned by `GetManagedObjects`
    pub fn with_object(self, path: &str, interfaces: &[&str]) -> Self {
        self.objects
            .lock()
            .insert(path.to_string(), interfaces.iter().map(|i| i.to_string()).collect());
        self
    }

    /// Queue a notification for the next `subscribe`
    pub fn push_notification(&self, notification: BusNotification) {
        self.notifications.lock().push(notification);
    }

    /// Make every call of `method` fail
    pub fn fail_method(&self, method: &str) {
        self.failures.lock().push(Failure {
            method: method.to_string(),
            path: None,
        });
    }

    /// Make calls of `method` on `path` fail
    pub fn fail_method_at(&self, method: &str, path: &str) {
        self.failures.lock().push(Failure {
            method: method.to_string(),
            path: Some(path.to_string()),
        });
    }

    /// All calls so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Calls with the given method name
    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method() == method)
            .cloned()
            .collect()
    }

    /// Handler exported at `path` as a media endpoint
    pub fn media_endpoint(&self, path: &str) -> Option<Arc<dyn MediaEndpointHandler>> {
        self.endpoints.lock().get(path).cloned()
    }

    /// Handler exported at `path` as an agent
    pub fn agent(&self, path: &str) -> Option<Arc<dyn AgentHandler>> {
        self.agents.lock().get(path).cloned()
    }

    fn record(&self, call: RecordedCall) -> Result<(), BusError> {
        let failed = self.failures.lock().iter().any(|failure| {
            failure.method == call.method()
                && failure
                    .path
                    .as_deref()
                    .map_or(true, |path| call.path() == Some(path))
        });
        let method = call.method();
        let path = call.path().unwrap_or("/").to_string();
        self.calls.lock().push(call);

        if failed {
            Err(BusError::remote(method, path, "org.bluez.Error.Failed"))
        } else {
            Ok(())
        }
    }
}

impl ObjectManagerClient for MockBus {
    fn get_managed_objects(&self) -> Result<ManagedObjects, BusError> {
        self.record(RecordedCall::GetManagedObjects)?;
        Ok(self.objects.lock().clone())
    }
}

impl AdapterPropertiesClient for MockBus {
    fn set_adapter_property(
        &self,
        adapter_path: &str,
        property: AdapterProperty,
        value: bool,
    ) -> Result<(), BusError> {
        self.record(RecordedCall::SetAdapterProperty {
            adapter_path: adapter_path.to_string(),
            property,
            value,
        })
    }
}

impl MediaClient for MockBus {
    fn register_endpoint(
        &self,
        adapter_path: &str,
        endpoint_path: &str,
        properties: &EndpointProperties,
    ) -> Result<(), BusError> {
        self.record(RecordedCall::RegisterEndpoint {
            adapter_path: adapter_path.to_string(),
            endpoint_path: endpoint_path.to_string(),
            properties: properties.clone(),
        })
    }
}

impl AgentManagerClient for MockBus {
    fn register_agent(&self, agent_path: &str, capability: &str) -> Result<(), BusError> {
        self.record(RecordedCall::RegisterAgent {
            agent_path: agent_path.to_string(),
            capability: capability.to_string(),
        })
    }

    fn request_default_agent(&self, agent_path: &str) -> Result<(), BusError> {
        self.record(RecordedCall::RequestDefaultAgent {
            agent_path: agent_path.to_string(),
        })
    }
}

impl ObjectExporter for MockBus {
    fn export_media_endpoint(
        &self,
        path: &str,
        handler: Arc<dyn MediaEndpointHandler>,
    ) -> Result<(), BusError> {
        self.record(RecordedCall::ExportMediaEndpoint {
            path: path.to_string(),
        })?;
        self.endpoints.lock().insert(path.to_string(), handler);
        Ok(())
    }

    fn export_agent(&self, path: &str, handler: Arc<dyn AgentHandler>) -> Result<(), BusError> {
        self.record(RecordedCall::ExportAgent {
            path: path.to_string(),
        })?;
        self.agents.lock().insert(path.to_string(), handler);
        Ok(())
    }
}

impl NotificationSource for MockBus {
    /// Drains the queued notifications; the stream ends when they run out
    fn subscribe(&self) -> Result<NotificationStream, BusError> {
        self.record(RecordedCall::Subscribe)?;
        let queued: Vec<BusNotification> = std::mem::take(&mut *self.notifications.lock());
        Ok(Box::new(queued.into_iter()))
    }
}

/// Interface set from string slices
pub fn interfaces(names: &[&str]) -> InterfaceSet {
    names.iter().map(|name| name.to_string()).collect()
}
