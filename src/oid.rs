//! Identifier conventions.
//!
//! OIDs are opaque strings, but the store still needs to distinguish an
//! OID from an NPID at the boundary (e.g. when resolving the start of a
//! traversal, spec §4.6 step 1). We fix the open question in spec §6 by
//! minting OIDs as UUIDv5 strings under a fixed discriminator prefix;
//! `is_plus_oid` is the syntactic test that recognizes them.

use uuid::Uuid;

const OID_PREFIX: &str = "plus:";

/// A namespace UUID used to derive stable, content-addressed OIDs via
/// UUIDv5. Arbitrary but fixed for the lifetime of a store.
const OID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x3b, 0x1e, 0x6a, 0x02, 0x9f, 0x44, 0x4c, 0x77, 0x9a, 0xaf, 0x0a, 0x1d, 0x6e, 0x2f, 0x88, 0x01,
]);

/// Mint a fresh, random OID.
pub fn new_oid() -> String {
    format!("{OID_PREFIX}{}", Uuid::new_v4())
}

/// Mint a deterministic OID derived from a seed string (useful for
/// idempotent bootstrap entities such as the default workflow).
pub fn oid_from_seed(seed: &str) -> String {
    format!("{OID_PREFIX}{}", Uuid::new_v5(&OID_NAMESPACE, seed.as_bytes()))
}

/// Syntactic test distinguishing an OID from an NPID (spec §4.6 step 1,
/// §6 identifier conventions). Does not check that the OID resolves to
/// an existing node.
pub fn is_plus_oid(s: &str) -> bool {
    match s.strip_prefix(OID_PREFIX) {
        Some(rest) => Uuid::parse_str(rest).is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_oid_is_recognized() {
        let oid = new_oid();
        assert!(is_plus_oid(&oid));
    }

    #[test]
    fn seeded_oid_is_deterministic() {
        assert_eq!(oid_from_seed("default-workflow"), oid_from_seed("default-workflow"));
        assert_ne!(oid_from_seed("default-workflow"), oid_from_seed("unknown-activity"));
    }

    #[test]
    fn npid_is_not_a_plus_oid() {
        assert!(!is_plus_oid("abc123"));
        assert!(!is_plus_oid("md5:deadbeef"));
        assert!(!is_plus_oid("plus:not-a-uuid"));
    }
}
