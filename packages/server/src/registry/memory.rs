//! In-memory registry with single-writer mutation discipline.
//!
//! Records and the version counter live behind one `RwLock`, so a snapshot
//! always pairs records with the version they were observed under. All
//! mutations additionally serialize on an async writer mutex that is held
//! across the persistence call, so concurrent registrations can never commit
//! duplicate endpoints or interleave version bumps.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use beaconet_core::{RegistrySnapshot, ServicePatch, ServiceRecord, ServiceType};

use super::{canonical_url, validate_endpoint_url, NewService, RegistryError};
use crate::traits::{Registry, RegistryStore};

/// Records plus the version they are current at. Guarded as one unit.
struct RegistryState {
    records: Vec<ServiceRecord>,
    version: u64,
}

/// In-memory [`Registry`] journaling through an injected [`RegistryStore`].
pub struct InMemoryRegistry {
    state: RwLock<RegistryState>,
    writer: Mutex<()>,
    store: Arc<dyn RegistryStore>,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

impl InMemoryRegistry {
    /// Creates an empty registry backed by the given store.
    #[must_use]
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                records: Vec::new(),
                version: 0,
            }),
            writer: Mutex::new(()),
            store,
        }
    }

    /// Initializes the store and loads any persisted records into memory.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Store` when the backend fails.
    pub async fn load(&self) -> Result<(), RegistryError> {
        let _writer = self.writer.lock().await;
        self.store.initialize().await?;
        let records = self.store.load_all().await?;
        let count = records.len();
        let mut state = self.state.write();
        state.records = records;
        if count > 0 {
            state.version += 1;
        }
        info!(services = count, "registry loaded from store");
        Ok(())
    }

    fn find_duplicate(
        state: &RegistryState,
        url: &str,
        service_type: ServiceType,
        excluding_id: Option<&str>,
    ) -> bool {
        state.records.iter().any(|r| {
            r.service_type == service_type
                && canonical_url(&r.url) == canonical_url(url)
                && excluding_id != Some(r.id.as_str())
        })
    }

    fn validate_new(new: &NewService) -> Result<(), RegistryError> {
        if new.name.trim().is_empty() {
            return Err(RegistryError::InvalidRecord("name must not be empty".into()));
        }
        if new.api_version.trim().is_empty() {
            return Err(RegistryError::InvalidRecord(
                "apiVersion must not be empty".into(),
            ));
        }
        validate_endpoint_url(&new.url)
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn register(
        &self,
        new: NewService,
        owner_key_hash: &str,
    ) -> Result<ServiceRecord, RegistryError> {
        Self::validate_new(&new)?;

        let _writer = self.writer.lock().await;
        if Self::find_duplicate(&self.state.read(), &new.url, new.service_type, None) {
            return Err(RegistryError::Duplicate {
                url: new.url,
                service_type: new.service_type.as_str().to_string(),
            });
        }

        let now = now_millis();
        let record = ServiceRecord {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            service_type: new.service_type,
            url: new.url,
            api_version: new.api_version,
            owner_key_hash: owner_key_hash.to_string(),
            registered_at: now,
            updated_at: now,
        };

        // Persist before committing so a store failure leaves no partial state.
        self.store.store(&record).await?;

        let mut state = self.state.write();
        state.records.push(record.clone());
        state.version += 1;
        info!(id = %record.id, url = %record.url, version = state.version, "service registered");
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<ServiceRecord, RegistryError> {
        self.state
            .read()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }

    async fn list(&self, filter: Option<ServiceType>) -> Vec<ServiceRecord> {
        self.state
            .read()
            .records
            .iter()
            .filter(|r| filter.is_none_or(|ty| r.service_type == ty))
            .cloned()
            .collect()
    }

    async fn update(
        &self,
        id: &str,
        owner_key_hash: &str,
        patch: ServicePatch,
    ) -> Result<ServiceRecord, RegistryError> {
        let _writer = self.writer.lock().await;

        let mut updated = {
            let state = self.state.read();
            let record = state
                .records
                .iter()
                .find(|r| r.id == id)
                .ok_or(RegistryError::NotFound)?;
            if record.owner_key_hash != owner_key_hash {
                return Err(RegistryError::Forbidden);
            }
            record.clone()
        };

        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(service_type) = patch.service_type {
            updated.service_type = service_type;
        }
        if let Some(url) = patch.url {
            validate_endpoint_url(&url)?;
            updated.url = url;
        }
        if let Some(api_version) = patch.api_version {
            updated.api_version = api_version;
        }
        if Self::find_duplicate(
            &self.state.read(),
            &updated.url,
            updated.service_type,
            Some(id),
        ) {
            return Err(RegistryError::Duplicate {
                url: updated.url,
                service_type: updated.service_type.as_str().to_string(),
            });
        }
        updated.updated_at = now_millis();

        self.store.store(&updated).await?;

        let mut state = self.state.write();
        if let Some(slot) = state.records.iter_mut().find(|r| r.id == id) {
            *slot = updated.clone();
        }
        state.version += 1;
        debug!(id, version = state.version, "service updated");
        Ok(updated)
    }

    async fn delete(&self, id: &str, owner_key_hash: &str) -> Result<(), RegistryError> {
        let _writer = self.writer.lock().await;

        {
            let state = self.state.read();
            let record = state
                .records
                .iter()
                .find(|r| r.id == id)
                .ok_or(RegistryError::NotFound)?;
            if record.owner_key_hash != owner_key_hash {
                return Err(RegistryError::Forbidden);
            }
        }

        self.store.delete(id).await?;

        let mut state = self.state.write();
        state.records.retain(|r| r.id != id);
        state.version += 1;
        info!(id, version = state.version, "service deleted");
        Ok(())
    }

    async fn delete_all(&self, owner_key_hash: &str) -> Result<usize, RegistryError> {
        let _writer = self.writer.lock().await;

        let owned: Vec<String> = self
            .state
            .read()
            .records
            .iter()
            .filter(|r| r.owner_key_hash == owner_key_hash)
            .map(|r| r.id.clone())
            .collect();
        if owned.is_empty() {
            return Ok(0);
        }

        for id in &owned {
            self.store.delete(id).await?;
        }

        let mut state = self.state.write();
        state.records.retain(|r| r.owner_key_hash != owner_key_hash);
        state.version += 1;
        info!(removed = owned.len(), version = state.version, "bulk delete");
        Ok(owned.len())
    }

    fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read();
        RegistrySnapshot {
            version: state.version,
            services: state.records.clone(),
        }
    }

    fn version(&self) -> u64 {
        self.state.read().version
    }
}
