//! Seam traits for the gateway's collaborators.
//!
//! Every shared resource the request path touches sits behind one of these
//! traits so tests can substitute in-memory fakes: the durable service
//! registry, its persistence backend, the result cache, the downstream HTTP
//! client, and the security gate.

use async_trait::async_trait;
use std::sync::Arc;

use beaconet_core::{
    AggregatedResult, OutcomeStatus, QueryFingerprint, QueryParams, RegistrySnapshot,
    ServicePatch, ServiceRecord, ServiceType,
};

use crate::error::ApiError;
use crate::registry::{NewService, RegistryError};
use crate::security::{AuthScope, OwnerKey};

/// Durable set of downstream service records with owner-scoped mutation.
///
/// Every mutating call advances the registry version atomically with the
/// record change: no reader ever observes a new record under an old version
/// or vice versa.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Registers a new service under the given owner binding, assigning a
    /// unique, immutable id.
    ///
    /// # Errors
    ///
    /// `Duplicate` if the `(url, serviceType)` pair is already registered,
    /// `InvalidUrl`/`InvalidRecord` on malformed payloads, `Store` on
    /// persistence failure.
    async fn register(
        &self,
        new: NewService,
        owner_key_hash: &str,
    ) -> Result<ServiceRecord, RegistryError>;

    /// Fetches a single record by id.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    async fn get(&self, id: &str) -> Result<ServiceRecord, RegistryError>;

    /// Lists records in registration order, optionally filtered by type.
    async fn list(&self, filter: Option<ServiceType>) -> Vec<ServiceRecord>;

    /// Applies a partial patch to a record. Only the verified owner may
    /// update; the id is immutable.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids, `Forbidden` when the owner key does not
    /// match (the record is left untouched).
    async fn update(
        &self,
        id: &str,
        owner_key_hash: &str,
        patch: ServicePatch,
    ) -> Result<ServiceRecord, RegistryError>;

    /// Deletes a single record, owner-scoped like [`Registry::update`].
    ///
    /// # Errors
    ///
    /// `NotFound` / `Forbidden` as for update.
    async fn delete(&self, id: &str, owner_key_hash: &str) -> Result<(), RegistryError>;

    /// Deletes every record owned by the given key, returning how many were
    /// removed. Removing zero records is not an error.
    ///
    /// # Errors
    ///
    /// `Store` on persistence failure.
    async fn delete_all(&self, owner_key_hash: &str) -> Result<usize, RegistryError>;

    /// Point-in-time snapshot of all active records plus the version they
    /// were observed under. One fan-out consumes exactly one snapshot.
    fn snapshot(&self) -> RegistrySnapshot;

    /// Current registry version.
    fn version(&self) -> u64;
}

/// Minimal persistence backend behind the registry.
///
/// The registry journals every committed mutation through this seam; how the
/// backend stores records is its own concern.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Loads all persisted records, in registration order.
    async fn load_all(&self) -> anyhow::Result<Vec<ServiceRecord>>;

    /// Persists one record (insert or replace by id).
    async fn store(&self, record: &ServiceRecord) -> anyhow::Result<()>;

    /// Removes one record by id. Unknown ids are a no-op.
    async fn delete(&self, id: &str) -> anyhow::Result<()>;

    /// One-time initialization (e.g., create tables, run migrations).
    async fn initialize(&self) -> anyhow::Result<()>;

    /// Releases resources and closes connections.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Memoizes aggregated results per (query fingerprint, registry version).
///
/// Implementations are internally synchronized; a miss race between two
/// identical concurrent queries is resolved by redundant computation, never
/// by blocking one caller on the other.
pub trait ResultCache: Send + Sync {
    /// Returns the cached result for the key pair, if present.
    fn get(&self, fingerprint: QueryFingerprint, version: u64) -> Option<Arc<AggregatedResult>>;

    /// Stores a result under the key pair, evicting older entries when the
    /// configured capacity is exceeded.
    fn put(&self, fingerprint: QueryFingerprint, version: u64, result: Arc<AggregatedResult>);

    /// Drops every entry, regardless of version.
    fn invalidate_all(&self);

    /// Current number of live entries.
    fn len(&self) -> usize;

    /// True when no entries are cached.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Issues one sub-query against one downstream service.
///
/// Never fails: every completion is classified into an [`OutcomeStatus`].
/// The caller bounds the call with its own per-service timeout.
#[async_trait]
pub trait DownstreamClient: Send + Sync {
    async fn query(&self, service: &ServiceRecord, params: &QueryParams) -> OutcomeStatus;
}

/// Validates a caller credential for a given scope, yielding the opaque
/// owner key the registry compares against record bindings.
pub trait SecurityGate: Send + Sync {
    /// # Errors
    ///
    /// `Unauthorized` when the credential is missing or rejected.
    fn authorize(&self, credential: Option<&str>, scope: AuthScope) -> Result<OwnerKey, ApiError>;
}
