//! Dynamic service registry: records, errors, in-memory implementation, and
//! the persistence seam.

pub mod memory;
pub mod store;

pub use memory::InMemoryRegistry;
pub use store::NullRegistryStore;

use serde::Deserialize;

use beaconet_core::ServiceType;

/// Registration payload for a new downstream service.
///
/// The id and owner binding are assigned by the gateway, never by the
/// caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    pub service_type: ServiceType,
    pub url: String,
    pub api_version: String,
}

/// Errors produced by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown service id")]
    NotFound,
    #[error("owner key does not match the record")]
    Forbidden,
    #[error("duplicate registration for {url} ({service_type})")]
    Duplicate { url: String, service_type: String },
    #[error("malformed endpoint url: {0}")]
    InvalidUrl(String),
    #[error("invalid service record: {0}")]
    InvalidRecord(String),
    #[error("registry store failure")]
    Store(#[from] anyhow::Error),
}

/// Validates that an endpoint URL is a well-formed absolute HTTP(S) address.
///
/// # Errors
///
/// Returns `RegistryError::InvalidUrl` when parsing fails, the scheme is not
/// `http`/`https`, or the authority is missing.
pub fn validate_endpoint_url(url: &str) -> Result<(), RegistryError> {
    let uri: http::Uri = url
        .parse()
        .map_err(|_| RegistryError::InvalidUrl(url.to_string()))?;
    match uri.scheme_str() {
        Some("http" | "https") => {}
        _ => return Err(RegistryError::InvalidUrl(url.to_string())),
    }
    if uri.authority().is_none() {
        return Err(RegistryError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

/// Canonical form used for duplicate detection: trailing slashes ignored.
#[must_use]
pub(crate) fn canonical_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_endpoint_url("https://beacon.example.org/api/").is_ok());
        assert!(validate_endpoint_url("http://localhost:5050/").is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(validate_endpoint_url("ftp://beacon.example.org/").is_err());
        assert!(validate_endpoint_url("beacon.example.org").is_err());
        assert!(validate_endpoint_url("not a url").is_err());
        assert!(validate_endpoint_url("").is_err());
    }

    #[test]
    fn canonical_url_ignores_trailing_slash() {
        assert_eq!(
            canonical_url("https://b.example.org/api/"),
            canonical_url("https://b.example.org/api")
        );
    }
}
