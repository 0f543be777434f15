//! Sink-side services for the A2DP null sink
//!
//! This crate provides the objects the sink serves to BlueZ and the fixed data
//! they are built from. It uses the private `bus-client` crate for the handler
//! contracts; nothing here talks to the bus directly.
//!
//! # Codecs
//!
//! [`Codec`] carries the A2DP codec identifier and the fixed capabilities and
//! configuration blobs for each supported codec. [`CodecSelection`] turns a
//! command-line list into the ordered set of endpoints to register:
//!
//! ```rust
//! use sink_api::{Codec, CodecSelection};
//!
//! let selection = CodecSelection::from_list("aac,mp3");
//! assert_eq!(selection.codecs(), &[Codec::Sbc, Codec::Mp3, Codec::Aac]);
//! ```
//!
//! # Served objects
//!
//! - [`MediaEndpointService`]: one per codec per adapter, always answers
//!   negotiation with the codec's fixed configuration
//! - [`PairingAgentService`]: one per adapter, authorizes only the
//!   AdvancedAudioDistribution service

pub mod agent;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod paths;

pub use agent::PairingAgentService;
pub use codec::{Codec, CodecInfo, CodecSelection};
pub use endpoint::MediaEndpointService;
pub use error::{ApiError, Result};
pub use paths::{
    agent_path, endpoint_path, validate_object_root, A2DP_SERVICE_UUID, A2DP_SINK_UUID,
    AGENT_CAPABILITY, DEFAULT_OBJECT_ROOT,
};
