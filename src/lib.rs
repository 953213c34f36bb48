//! Host-side client for the GM PCM diagnostic dialect of SAE J1850 VPW.
//!
//! The crate is the protocol engine only: message construction and parsing,
//! the request/response retry and timeout discipline, bus-speed negotiation,
//! the PCM unlock challenge, and the kernel-upload + memory-read pipeline.
//! Everything that talks to real hardware — the pass-through adapter, the
//! seed/key derivation for a given vehicle family, user interface, and
//! configuration loading — is consumed through narrow traits ([`Device`],
//! [`KeyAlgorithm`], [`Logger`]) and is never implemented here.

pub mod config;
pub mod constants;
pub mod device;
pub mod engine;
pub mod key_algorithm;
pub mod logger;
pub mod message;
pub mod query;
pub mod response;
pub mod testing;

pub use config::{EngineConfig, PcmInfo};
pub use device::{Device, TimeoutScenario, VpwSpeed};
pub use engine::{BusSpeedState, ProtocolEngine};
pub use key_algorithm::KeyAlgorithm;
pub use logger::{LogCrateLogger, Logger, NullLogger};
pub use message::Message;
pub use response::{Response, ResponseStatus};
