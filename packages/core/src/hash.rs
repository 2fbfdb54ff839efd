//! FNV-1a hash utilities for query fingerprinting.
//!
//! Provides a 64-bit FNV-1a hash over UTF-8 bytes plus an order-independent
//! combinator. Query fingerprints must be stable across parameter reordering,
//! so individual parameter hashes are combined with wrapping addition, which
//! is commutative and associative.

/// FNV-1a offset basis (64-bit).
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a prime (64-bit).
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Computes a 64-bit FNV-1a hash of a string's UTF-8 bytes.
///
/// # Examples
///
/// ```
/// use beaconet_core::hash::fnv1a_hash;
///
/// assert_eq!(fnv1a_hash(""), 0xcbf2_9ce4_8422_2325); // FNV offset basis
/// assert_ne!(fnv1a_hash("referenceName=1"), fnv1a_hash("referenceName=2"));
/// ```
#[must_use]
pub fn fnv1a_hash(s: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Combines multiple hash values into a single order-independent hash.
///
/// Uses wrapping addition, so the result is identical for any permutation
/// of the input slice.
///
/// # Examples
///
/// ```
/// use beaconet_core::hash::combine_hashes;
///
/// let a = combine_hashes(&[10, 20, 30]);
/// let b = combine_hashes(&[30, 10, 20]);
/// assert_eq!(a, b);
/// ```
#[must_use]
pub fn combine_hashes(hashes: &[u64]) -> u64 {
    let mut result: u64 = 0;
    for &h in hashes {
        result = result.wrapping_add(h);
    }
    result
}
