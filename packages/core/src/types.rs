//! Registry record types shared between the gateway and its clients.
//!
//! All wire-facing structs use `#[serde(rename_all = "camelCase")]` so the
//! JSON surface matches the GA4GH service-info conventions.

use serde::{Deserialize, Serialize};

/// GA4GH service type taxonomy recognized by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    /// A service registry/catalogue node.
    GA4GHRegistry,
    /// A single beacon data node.
    GA4GHBeacon,
    /// An aggregator that itself fans out to other beacons.
    GA4GHBeaconAggregator,
}

impl ServiceType {
    /// All known service types, in taxonomy order.
    pub const ALL: [ServiceType; 3] = [
        ServiceType::GA4GHRegistry,
        ServiceType::GA4GHBeacon,
        ServiceType::GA4GHBeaconAggregator,
    ];

    /// Stable string form used in wire payloads and query filters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::GA4GHRegistry => "GA4GHRegistry",
            ServiceType::GA4GHBeacon => "GA4GHBeacon",
            ServiceType::GA4GHBeaconAggregator => "GA4GHBeaconAggregator",
        }
    }
}

impl std::str::FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GA4GHRegistry" => Ok(ServiceType::GA4GHRegistry),
            "GA4GHBeacon" => Ok(ServiceType::GA4GHBeacon),
            "GA4GHBeaconAggregator" => Ok(ServiceType::GA4GHBeaconAggregator),
            other => Err(format!("unknown service type: {other}")),
        }
    }
}

/// A registered downstream service.
///
/// The `id` is assigned at registration and immutable afterwards.
/// `owner_key_hash` is an opaque credential binding: the registry only ever
/// compares it for equality, never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    /// Unique, stable identifier assigned by the registry.
    pub id: String,
    /// Human-readable service name.
    pub name: String,
    /// Position of this service in the GA4GH taxonomy.
    pub service_type: ServiceType,
    /// Base query URL of the service. Must be a well-formed HTTP(S) address.
    pub url: String,
    /// API version advertised by the service.
    pub api_version: String,
    /// Opaque owner credential digest. Never serialized to clients.
    #[serde(skip)]
    pub owner_key_hash: String,
    /// Wall-clock millis since epoch when the record was created.
    pub registered_at: i64,
    /// Wall-clock millis since epoch of the last update.
    pub updated_at: i64,
}

/// Partial field set applied by an owner-scoped update.
///
/// `None` fields are left untouched. The record id is immutable and
/// intentionally absent here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePatch {
    pub name: Option<String>,
    pub service_type: Option<ServiceType>,
    pub url: Option<String>,
    pub api_version: Option<String>,
}

impl ServicePatch {
    /// True if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.service_type.is_none()
            && self.url.is_none()
            && self.api_version.is_none()
    }
}

/// Point-in-time view of the registry consumed by one fan-out.
///
/// The version is captured under the same lock as the records, so a snapshot
/// never pairs new records with an old version or vice versa.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    /// Monotonic registry version at snapshot time.
    pub version: u64,
    /// All active services in registration order.
    pub services: Vec<ServiceRecord>,
}

impl RegistrySnapshot {
    /// An empty snapshot at version 0. Used by tests and cold starts.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: 0,
            services: Vec::new(),
        }
    }
}
