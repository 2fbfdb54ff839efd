//! Beaconet Server: federated beacon query gateway.
//!
//! Accepts a genomic-variant query, fans it out concurrently to every
//! registered downstream service, and returns one aggregated answer, either
//! as a single bounded response or streamed per-service over a WebSocket
//! session. Service membership is a runtime registry with owner-scoped
//! mutation; aggregated results are cached per (fingerprint, registry
//! version).

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod registry;
pub mod security;
pub mod traits;

pub use traits::{DownstreamClient, Registry, RegistryStore, ResultCache, SecurityGate};
