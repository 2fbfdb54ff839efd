//! Query normalization and fingerprinting.
//!
//! A [`QueryFingerprint`] identifies semantically-equivalent variant queries
//! for result caching: two queries that differ only in parameter order or
//! key casing must produce the same fingerprint. The query payload itself is
//! opaque to the gateway (validated upstream), so normalization is purely
//! syntactic.

use serde::{Deserialize, Serialize};

use crate::hash::{combine_hashes, fnv1a_hash};

/// Stable, order-independent digest of a normalized query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryFingerprint(pub u64);

impl std::fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// An opaque, pre-validated variant query: the raw key/value parameters
/// forwarded verbatim to every downstream beacon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    params: Vec<(String, String)>,
}

impl QueryParams {
    /// Builds a query from raw key/value pairs, normalizing as it goes:
    /// keys are lowercased and trimmed, values are trimmed, and pairs with
    /// empty values are dropped.
    #[must_use]
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let params = pairs
            .into_iter()
            .filter_map(|(k, v)| {
                let key = k.as_ref().trim().to_lowercase();
                let value = v.as_ref().trim().to_string();
                if key.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((key, value))
                }
            })
            .collect();
        Self { params }
    }

    /// Returns the normalized parameters in their original order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// True if normalization left no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Computes the order-independent fingerprint of this query.
    ///
    /// Each `key=value` pair is hashed individually and the pair hashes are
    /// combined commutatively, so parameter order never affects the result.
    #[must_use]
    pub fn fingerprint(&self) -> QueryFingerprint {
        let pair_hashes: Vec<u64> = self
            .params
            .iter()
            .map(|(k, v)| fnv1a_hash(&format!("{k}={v}")))
            .collect();
        QueryFingerprint(combine_hashes(&pair_hashes))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn query(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams::new(pairs.iter().copied())
    }

    #[test]
    fn fingerprint_ignores_parameter_order() {
        let a = query(&[("referenceName", "1"), ("start", "3056601"), ("assemblyId", "GRCh38")]);
        let b = query(&[("assemblyId", "GRCh38"), ("referenceName", "1"), ("start", "3056601")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_ignores_key_case_and_whitespace() {
        let a = query(&[("ReferenceName", " MT "), ("start", "9843")]);
        let b = query(&[("referencename", "MT"), (" start ", "9843")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_values() {
        let a = query(&[("referenceName", "1"), ("start", "100")]);
        let b = query(&[("referenceName", "1"), ("start", "101")]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn empty_values_are_dropped() {
        let a = query(&[("referenceName", "1"), ("filter", "")]);
        let b = query(&[("referenceName", "1")]);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn empty_query_is_empty() {
        assert!(query(&[]).is_empty());
        assert!(query(&[("", "x"), ("k", " ")]).is_empty());
    }

    proptest! {
        #[test]
        fn fingerprint_is_permutation_invariant(
            mut pairs in proptest::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9]{1,8}"), 0..8),
            seed in any::<u64>(),
        ) {
            let original = QueryParams::new(pairs.clone()).fingerprint();
            // Cheap deterministic shuffle driven by the seed.
            let len = pairs.len();
            for i in 0..len {
                let j = (seed as usize).wrapping_mul(i + 1) % len.max(1);
                pairs.swap(i, j);
            }
            let shuffled = QueryParams::new(pairs).fingerprint();
            prop_assert_eq!(original, shuffled);
        }
    }
}
