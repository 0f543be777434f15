//! Nodes of the mirrored object tree
//!
//! Each node owns its children outright; removing a node drops its subtree
//! after an explicit [`teardown`](AdapterNode::teardown).

mod adapter;
mod device;
mod transport;

pub use adapter::{AdapterNode, EndpointReport, StartupReport};
pub use device::DeviceNode;
pub use transport::TransportNode;
