//! Persistence backends for the registry.
//!
//! The gateway treats durable storage as an external collaborator behind the
//! [`RegistryStore`] seam. [`NullRegistryStore`] discards everything and is
//! the default for development and tests; durable backends are wired in by
//! the embedding deployment.

use async_trait::async_trait;

use beaconet_core::ServiceRecord;

use crate::traits::RegistryStore;

/// A [`RegistryStore`] that persists nothing.
///
/// Every operation succeeds; `load_all` always returns an empty set.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRegistryStore;

#[async_trait]
impl RegistryStore for NullRegistryStore {
    async fn load_all(&self) -> anyhow::Result<Vec<ServiceRecord>> {
        Ok(Vec::new())
    }

    async fn store(&self, _record: &ServiceRecord) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete(&self, _id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
