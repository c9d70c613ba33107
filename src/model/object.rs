//! PLUSObject: a provenance node (spec §3).

use std::collections::{HashMap, HashSet};

use super::actor::PLUSActor;
use super::kind::ObjectKind;

/// A provenance node: a data artifact, activity, workflow, or
/// invocation, hydrated with its owner and privilege set.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PLUSObject {
    /// Unique object identifier.
    pub oid: String,
    /// The object's type/subtype, as a tagged variant.
    pub kind: ObjectKind,
    /// Display name.
    pub name: String,
    /// Epoch-ms creation time.
    pub created: i64,
    /// Arbitrary user metadata, stripped of the `metadata:` storage
    /// prefix (spec §4.1, §4.4).
    pub metadata: HashMap<String, String>,
    /// Whether taint (and other ancestry markers) propagate through
    /// this object to its descendants (spec §4.7 pass 2).
    pub heritable: bool,
    /// The object's owner, if one was linked at store time (spec §3
    /// invariant 6: at most one).
    pub owner: Option<PLUSActor>,
    /// The set of privilege-class names controlling this object's
    /// visibility (spec §4.5).
    pub privileges: HashSet<String>,
}

impl PLUSObject {
    /// Build a new object with no owner, no privileges, and empty
    /// metadata, suitable as a builder starting point before a writer
    /// fills in the rest.
    pub fn new(oid: impl Into<String>, kind: ObjectKind, name: impl Into<String>, created: i64) -> Self {
        PLUSObject {
            oid: oid.into(),
            kind,
            name: name.into(),
            created,
            metadata: HashMap::new(),
            heritable: true,
            owner: None,
            privileges: HashSet::new(),
        }
    }

    /// Whether this object is a taint marker (spec glossary).
    pub fn is_taint(&self) -> bool {
        self.kind.is_taint()
    }
}
