//! Beaconet Core -- registry record types, query fingerprinting, and stream
//! message schemas shared between the gateway server and its clients.

pub mod fingerprint;
pub mod hash;
pub mod messages;
pub mod outcome;
pub mod types;

pub use fingerprint::{QueryFingerprint, QueryParams};
pub use messages::StreamFrame;
pub use outcome::{AggregatedResult, OutcomeStatus, ResultSummary, ServiceOutcome};
pub use types::{RegistrySnapshot, ServicePatch, ServiceRecord, ServiceType};
