//! Security gate: API-key validation and opaque owner-key derivation.
//!
//! The gate is the only component that looks at credential material. It
//! hands the registry an opaque SHA-256 digest (`OwnerKey`) to compare
//! against record bindings; the registry never sees the raw key.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::traits::SecurityGate;

/// What a credential is being presented for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    /// Registering a new service (requires the host API key).
    RegisterService,
    /// Updating or deleting an owned record (requires the per-service key
    /// issued at registration).
    MutateService,
}

/// Opaque owner comparison token: the hex SHA-256 digest of a service key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerKey(String);

impl OwnerKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Hex SHA-256 digest of a credential, used as the owner binding stored on
/// a record and as the comparison token for later mutations.
#[must_use]
pub fn digest_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// [`SecurityGate`] backed by a single host API key.
pub struct ApiKeyGate {
    api_key: String,
}

impl ApiKeyGate {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl SecurityGate for ApiKeyGate {
    fn authorize(&self, credential: Option<&str>, scope: AuthScope) -> Result<OwnerKey, ApiError> {
        let credential = credential.ok_or(ApiError::Unauthorized)?;
        match scope {
            AuthScope::RegisterService => {
                // Constant-time comparison; length mismatch yields false
                // without early exit.
                if credential
                    .as_bytes()
                    .ct_eq(self.api_key.as_bytes())
                    .into()
                {
                    Ok(OwnerKey(digest_key(credential)))
                } else {
                    Err(ApiError::Unauthorized)
                }
            }
            // Service keys are verified by the registry comparing digests;
            // the gate only derives the opaque token.
            AuthScope::MutateService => Ok(OwnerKey(digest_key(credential))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_is_unauthorized() {
        let gate = ApiKeyGate::new("hunter2");
        assert!(matches!(
            gate.authorize(None, AuthScope::RegisterService),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            gate.authorize(None, AuthScope::MutateService),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn wrong_api_key_is_unauthorized() {
        let gate = ApiKeyGate::new("hunter2");
        assert!(gate
            .authorize(Some("hunter3"), AuthScope::RegisterService)
            .is_err());
        assert!(gate
            .authorize(Some(""), AuthScope::RegisterService)
            .is_err());
    }

    #[test]
    fn correct_api_key_authorizes_registration() {
        let gate = ApiKeyGate::new("hunter2");
        assert!(gate
            .authorize(Some("hunter2"), AuthScope::RegisterService)
            .is_ok());
    }

    #[test]
    fn mutate_scope_yields_digest_of_service_key() {
        let gate = ApiKeyGate::new("hunter2");
        let owner = gate
            .authorize(Some("my-service-key"), AuthScope::MutateService)
            .unwrap();
        assert_eq!(owner.as_str(), digest_key("my-service-key"));
        assert_ne!(owner.as_str(), "my-service-key");
    }

    #[test]
    fn digest_is_stable_and_hex() {
        let d = digest_key("abc");
        assert_eq!(d.len(), 64);
        assert_eq!(d, digest_key("abc"));
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
