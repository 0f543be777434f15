//! Object path segmentation
//!
//! BlueZ names its objects hierarchically:
//!
//! ```text
//! /org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/fd0
//!  │   │     │    │                     └─ transport (segment 5)
//!  │   │     │    └─ device (segment 4)
//!  │   │     └─ adapter (segment 3)
//! ```
//!
//! Identity at every level of the mirrored tree is taken from these segments.

use bus_client::BLUEZ_ROOT_PATH;

/// Tree level an object path addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLevel {
    Adapter,
    Device,
    Transport,
}

/// Identity segments of an object path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPathParts {
    pub adapter: String,
    pub device: Option<String>,
    pub transport: Option<String>,
}

impl ObjectPathParts {
    /// Split a path into its identity segments
    ///
    /// Returns `None` when the path is too short to name an adapter. Empty
    /// segments count as missing; anything below the transport is ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        let segment = |index: usize| {
            segments
                .get(index)
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_string())
        };

        let adapter = segment(3)?;
        let device = segment(4);
        let transport = device.as_ref().and_then(|_| segment(5));

        Some(Self {
            adapter,
            device,
            transport,
        })
    }

    pub fn level(&self) -> PathLevel {
        match (&self.device, &self.transport) {
            (None, _) => PathLevel::Adapter,
            (Some(_), None) => PathLevel::Device,
            (Some(_), Some(_)) => PathLevel::Transport,
        }
    }
}

/// Whether `path` lies below `/org/bluez/`
pub fn is_bluez_object(path: &str) -> bool {
    path.strip_prefix(BLUEZ_ROOT_PATH)
        .is_some_and(|rest| rest.starts_with('/'))
}
