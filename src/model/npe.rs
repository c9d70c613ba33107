//! NonProvenanceEdge (NPE) and its target (spec §3).

/// The target of an NPE: either an existing [`super::PLUSObject`] or an
/// external identifier (NPID), auto-created if missing (spec §3
/// invariant 3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NpeTarget {
    /// An existing provenance object, referenced by OID.
    Object(String),
    /// An external identifier (hash, URL, DB key).
    Npid(String),
}

impl NpeTarget {
    /// The raw identifier string, regardless of which variant.
    pub fn id(&self) -> &str {
        match self {
            NpeTarget::Object(oid) => oid,
            NpeTarget::Npid(npid) => npid,
        }
    }
}

/// A typed relation linking a [`super::PLUSObject`] to an external
/// identifier (or, occasionally, another object) that is not itself a
/// lineage claim (spec §3, glossary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NonProvenanceEdge {
    /// Unique NPE identifier.
    pub npeid: String,
    /// OID of the source object. Must already exist (spec §3 invariant 3).
    pub from: String,
    /// The edge's destination.
    pub to: NpeTarget,
    /// Free-form relation type (e.g. `"md5"`, `"doi"`).
    pub edge_type: String,
    /// Epoch-ms creation time.
    pub created: i64,
}
