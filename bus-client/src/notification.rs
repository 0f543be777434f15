//! Broker notifications decoded from D-Bus signals

use std::collections::{BTreeMap, HashMap};

use zbus::message::Message;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::{InterfaceSet, OBJECT_MANAGER_INTERFACE, PROPERTIES_INTERFACE};

/// Blocking stream of notifications, in the order the broker sent them
pub type NotificationStream = Box<dyn Iterator<Item = BusNotification>>;

/// One of the three notification classes the sink consumes
#[derive(Debug, Clone, PartialEq)]
pub enum BusNotification {
    /// `ObjectManager.InterfacesAdded`
    ObjectAdded {
        path: String,
        interfaces: InterfaceSet,
    },
    /// `ObjectManager.InterfacesRemoved`
    ObjectRemoved {
        path: String,
        interfaces: InterfaceSet,
    },
    /// `Properties.PropertiesChanged`, with the emitting object's path
    PropertiesChanged {
        interface: String,
        changed: BTreeMap<String, PropertyValue>,
        invalidated: Vec<String>,
        path: String,
    },
}

impl BusNotification {
    /// Object path the notification is about
    pub fn path(&self) -> &str {
        match self {
            BusNotification::ObjectAdded { path, .. }
            | BusNotification::ObjectRemoved { path, .. }
            | BusNotification::PropertiesChanged { path, .. } => path,
        }
    }

    /// Decode a signal message; anything that is not one of the three
    /// notification classes yields `None`
    pub(crate) fn from_message(message: &Message) -> Option<Self> {
        let header = message.header();
        let interface = header.interface()?.as_str();
        let member = header.member()?.as_str();

        match (interface, member) {
            (OBJECT_MANAGER_INTERFACE, "InterfacesAdded") => {
                let (path, interfaces): (
                    OwnedObjectPath,
                    HashMap<String, HashMap<String, OwnedValue>>,
                ) = message.body().deserialize().ok()?;

                Some(BusNotification::ObjectAdded {
                    path: path.as_str().to_string(),
                    interfaces: interfaces.into_keys().collect(),
                })
            }
            (OBJECT_MANAGER_INTERFACE, "InterfacesRemoved") => {
                let (path, interfaces): (OwnedObjectPath, Vec<String>) =
                    message.body().deserialize().ok()?;

                Some(BusNotification::ObjectRemoved {
                    path: path.as_str().to_string(),
                    interfaces: interfaces.into_iter().collect(),
                })
            }
            (PROPERTIES_INTERFACE, "PropertiesChanged") => {
                let path = header.path()?.as_str().to_string();
                let (interface, changed, invalidated): (
                    String,
                    HashMap<String, OwnedValue>,
                    Vec<String>,
                ) = message.body().deserialize().ok()?;

                Some(BusNotification::PropertiesChanged {
                    interface,
                    changed: changed
                        .iter()
                        .map(|(name, value)| (name.clone(), PropertyValue::from(&**value)))
                        .collect(),
                    invalidated,
                    path,
                })
            }
            _ => None,
        }
    }
}

/// Property value carried by a change notification
///
/// Only the shapes BlueZ uses on adapters, devices and transports are kept;
/// everything else collapses to `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Byte(u8),
    U16(u16),
    U32(u32),
    Text(String),
    Path(String),
    Bytes(Vec<u8>),
    Other,
}

impl From<&Value<'_>> for PropertyValue {
    fn from(value: &Value<'_>) -> Self {
        match value {
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::U8(b) => PropertyValue::Byte(*b),
            Value::U16(n) => PropertyValue::U16(*n),
            Value::U32(n) => PropertyValue::U32(*n),
            Value::Str(s) => PropertyValue::Text(s.as_str().to_string()),
            Value::ObjectPath(p) => PropertyValue::Path(p.as_str().to_string()),
            Value::Array(_) => byte_array(value)
                .map(PropertyValue::Bytes)
                .unwrap_or(PropertyValue::Other),
            Value::Value(inner) => PropertyValue::from(&**inner),
            _ => PropertyValue::Other,
        }
    }
}

/// Extract an `ay` value
pub(crate) fn byte_array(value: &Value<'_>) -> Option<Vec<u8>> {
    match value {
        Value::Array(array) => array
            .iter()
            .map(|item| match item {
                Value::U8(b) => Some(*b),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}
