use std::collections::BTreeMap;

use bus_client::PropertyValue;
use tracing::{debug, info};

/// A media transport under a device
///
/// The transport is tracked but never acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportNode {
    name: String,
    path: String,
}

impl TransportNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let node = Self {
            name: name.into(),
            path: path.into(),
        };
        info!("Transport {} added", node.path);
        node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn on_properties_changed(
        &self,
        interface: &str,
        changed: &BTreeMap<String, PropertyValue>,
        invalidated: &[String],
    ) {
        for (name, value) in changed {
            debug!("Transport {} {}.{} = {:?}", self.path, interface, name, value);
        }
        for name in invalidated {
            debug!("Transport {} {}.{} invalidated", self.path, interface, name);
        }
    }

    pub fn teardown(self) {
        info!("Transport {} removed", self.path);
    }
}
