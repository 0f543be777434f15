//! Object tree mirroring for the A2DP null sink
//!
//! Keeps a local copy of the adapters, devices and media transports the BlueZ
//! daemon manages, and drives per-adapter registration of the sink's media
//! endpoints and pairing agent.
//!
//! # Architecture
//!
//! ```text
//! BlueZ notifications → BusDirectory → AdapterNode → DeviceNode → TransportNode
//!                         (routing by object path segments)
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bus_client::SystemBus;
//! use sink_state::{BusDirectory, SinkContext, SinkOptions};
//!
//! let ctx = SinkContext::new(SystemBus::connect()?, SinkOptions::default());
//! let (mut directory, stream) = BusDirectory::initialize(ctx)?;
//! directory.prepare_adapter("hci0")?;
//! directory.run(stream);
//! ```

pub mod context;
pub mod directory;
pub mod error;
pub mod logging;
pub mod node;
pub mod path;

pub use context::{SinkContext, SinkOptions};
pub use directory::BusDirectory;
pub use error::{Result, StateError};
pub use node::{AdapterNode, DeviceNode, EndpointReport, StartupReport, TransportNode};
pub use path::{ObjectPathParts, PathLevel};
