//! ProvenanceCollection / LineageDAG: the in-memory container writers
//! submit and readers get back (spec §3).

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use indexmap::IndexMap;

use super::actor::PLUSActor;
use super::edge::PLUSEdge;
use super::npe::NonProvenanceEdge;
use super::object::PLUSObject;

/// Timing/statistics recorded for a traversal + post-processing run
/// (spec §3, §9 supplement).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Fingerprint {
    /// Nodes present in the collection when the fingerprint was taken.
    pub node_count: usize,
    /// Edges present in the collection when the fingerprint was taken.
    pub edge_count: usize,
    /// NPEs present in the collection when the fingerprint was taken.
    pub npe_count: usize,
    /// Wall-clock time spent producing the collection, in milliseconds.
    pub elapsed_ms: u128,
}

impl Fingerprint {
    /// Stamp a fingerprint from final counts and an elapsed duration.
    pub fn new(node_count: usize, edge_count: usize, npe_count: usize, elapsed: Duration) -> Self {
        Fingerprint {
            node_count,
            edge_count,
            npe_count,
            elapsed_ms: elapsed.as_millis(),
        }
    }
}

/// An in-memory, order-preserving collection of provenance elements.
/// Used both as the writer's input to `store(collection)` and as the
/// reader's output from traversal (as `LineageDAG`, spec §3).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ProvenanceCollection {
    /// Objects in insertion order, keyed by OID (insertion order
    /// matters for deterministic `report`/`getGraph` output).
    nodes: IndexMap<String, PLUSObject>,
    /// Edges, deduplicated by their full identity tuple.
    edges: HashSet<PLUSEdge>,
    /// Non-provenance edges, deduplicated by `npeid`.
    npes: HashSet<NonProvenanceEdge>,
    /// Actors referenced by the collection.
    actors: HashSet<PLUSActor>,
    /// The traversal's starting OID, if this collection came from a
    /// traversal rather than a flat `report`.
    pub focus: Option<String>,
    /// Per-object annotation tags (e.g. `head`, `foot`,
    /// `more-available`), keyed by OID then tag key (spec §4.7).
    tags: HashMap<String, HashMap<String, String>>,
    /// Timing/statistics for how this collection was produced.
    pub fingerprint: Fingerprint,
}

/// A [`ProvenanceCollection`] produced by a traversal, annotated by the
/// post-processing passes in component C7. Structurally identical to
/// `ProvenanceCollection` (spec §3 groups the two together); the alias
/// exists so call sites can say what they mean.
pub type LineageDAG = ProvenanceCollection;

impl ProvenanceCollection {
    /// An empty collection.
    pub fn new() -> Self {
        ProvenanceCollection::default()
    }

    /// Insert or overwrite an object. Re-inserting an OID already
    /// present keeps insertion order from the first occurrence in
    /// place while replacing the value, matching `IndexMap::insert`.
    pub fn add_node(&mut self, object: PLUSObject) {
        self.nodes.insert(object.oid.clone(), object);
    }

    /// Insert an edge.
    pub fn add_edge(&mut self, edge: PLUSEdge) {
        self.edges.insert(edge);
    }

    /// Insert an NPE.
    pub fn add_npe(&mut self, npe: NonProvenanceEdge) {
        self.npes.insert(npe);
    }

    /// Insert an actor.
    pub fn add_actor(&mut self, actor: PLUSActor) {
        self.actors.insert(actor);
    }

    /// Look up a node already present in this collection by OID.
    pub fn get_node(&self, oid: &str) -> Option<&PLUSObject> {
        self.nodes.get(oid)
    }

    /// Whether a node with this OID is already present.
    pub fn contains_node(&self, oid: &str) -> bool {
        self.nodes.contains_key(oid)
    }

    /// Iterate over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &PLUSObject> {
        self.nodes.values()
    }

    /// Number of nodes currently in the collection.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over edges.
    pub fn edges(&self) -> impl Iterator<Item = &PLUSEdge> {
        self.edges.iter()
    }

    /// Number of edges currently in the collection.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterate over NPEs.
    pub fn npes(&self) -> impl Iterator<Item = &NonProvenanceEdge> {
        self.npes.iter()
    }

    /// Number of NPEs currently in the collection.
    pub fn npe_count(&self) -> usize {
        self.npes.len()
    }

    /// Iterate over actors.
    pub fn actors(&self) -> impl Iterator<Item = &PLUSActor> {
        self.actors.iter()
    }

    /// Set of OIDs currently present, for set-comparison-style tests
    /// (spec §8 testable property 6).
    pub fn node_oids(&self) -> HashSet<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Set a tag on a node (spec §4.7: head/foot/more-available, taint
    /// ancestry).
    pub fn set_tag(&mut self, oid: &str, key: &str, value: impl Into<String>) {
        self.tags
            .entry(oid.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Read a tag value for a node, if set.
    pub fn get_tag(&self, oid: &str, key: &str) -> Option<&str> {
        self.tags.get(oid).and_then(|m| m.get(key)).map(|s| s.as_str())
    }

    /// All tags set on a node.
    pub fn tags_for(&self, oid: &str) -> Option<&HashMap<String, String>> {
        self.tags.get(oid)
    }

    /// Stamp the fingerprint from current counts and an elapsed
    /// duration (spec §9 supplement).
    pub fn stamp_fingerprint(&mut self, elapsed: Duration) {
        self.fingerprint = Fingerprint::new(
            self.node_count(),
            self.edge_count(),
            self.npe_count(),
            elapsed,
        );
    }
}
