//! Graph kernel (component C2).
//!
//! A minimal embedded transactional property graph: typed, labeled
//! nodes with property sets, typed directed relationships, primary-key
//! indices per label, and traversal/path primitives. Built on
//! `petgraph`'s `StableDiGraph`, the way the teacher builds `Graph` on
//! top of the same type.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use graphviz_rust as graphviz;
use graphviz_rust::cmd::{CommandArg, Format};
use graphviz_rust::printer::PrinterContext;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::{dot, Direction};
use serde::{Deserialize, Serialize};

use crate::codec::PropertySet;
use crate::model::EdgeKind;

/// The four node labels the schema declares (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// A `PLUSObject`.
    Provenance,
    /// A `PLUSActor`.
    Actor,
    /// A `PrivilegeClass`.
    PrivilegeClass,
    /// An NPID leaf node.
    NonProvenance,
}

/// A node as the kernel stores it: a label plus its full property set.
/// Domain hydration (component C4) reads out of `properties`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// The node's label.
    pub label: Label,
    /// The node's properties, including `metadata:`-prefixed keys.
    pub properties: PropertySet,
}

/// A relationship as the kernel stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelType {
    /// One of the six provenance relation types (spec §3).
    Provenance(EdgeKind),
    /// A non-provenance edge (spec §3).
    Npe,
    /// `actor -[owns]-> object`.
    Owns,
    /// `object -[controlledBy]-> privilegeClass`.
    ControlledBy,
    /// `privilegeClass -[dominates]-> privilegeClass`.
    Dominates,
}

/// A relationship's properties (workflow/npeid/created, as applicable).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphEdge {
    /// The relationship's type.
    pub rel_type: RelType,
    /// Properties on the relationship (e.g. `workflow`, `npeid`, `created`).
    pub properties: PropertySet,
}

impl Default for RelType {
    fn default() -> Self {
        RelType::Provenance(EdgeKind::Unspecified)
    }
}

/// Primary-key indices per label, enforcing the uniqueness constraints
/// declared in spec §4.3. Each is a simple `HashMap` lookup, standing in
/// for the kernel's auto-indexed property lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Indices {
    oid: HashMap<String, NodeIndex>,
    aid: HashMap<String, NodeIndex>,
    pid: HashMap<String, NodeIndex>,
    npid: HashMap<String, NodeIndex>,
}

/// The graph kernel itself: nodes, relationships, and primary-key
/// indices, all persisted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub(crate) inner: StableDiGraph<GraphNode, GraphEdge>,
    pub(crate) indices: Indices,
}

impl Default for Graph {
    fn default() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            indices: Indices::default(),
        }
    }
}

impl Graph {
    /// A fresh, empty kernel.
    pub fn new() -> Self {
        Graph::default()
    }

    /// Look up a node index by OID.
    pub fn oid_index(&self, oid: &str) -> Option<NodeIndex> {
        self.indices.oid.get(oid).copied()
    }

    /// Look up a node index by AID.
    pub fn aid_index(&self, aid: &str) -> Option<NodeIndex> {
        self.indices.aid.get(aid).copied()
    }

    /// Look up a node index by PID.
    pub fn pid_index(&self, pid: &str) -> Option<NodeIndex> {
        self.indices.pid.get(pid).copied()
    }

    /// Look up a node index by NPID.
    pub fn npid_index(&self, npid: &str) -> Option<NodeIndex> {
        self.indices.npid.get(npid).copied()
    }

    /// Fetch a node's record by index.
    pub fn node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.inner.node_weight(idx)
    }

    /// Insert a node under the primary key implied by its label,
    /// enforcing uniqueness (spec §3 invariant 1: re-insert with an
    /// existing key returns the existing node without mutation).
    /// Returns `(index, was_newly_inserted)`.
    pub fn get_or_insert_node(&mut self, key: &str, node: GraphNode) -> (NodeIndex, bool) {
        if let Some(existing) = self.index_for_label(node.label, key) {
            return (existing, false);
        }
        let label = node.label;
        let idx = self.inner.add_node(node);
        self.register_index(label, key, idx);
        (idx, true)
    }

    fn index_for_label(&self, label: Label, key: &str) -> Option<NodeIndex> {
        match label {
            Label::Provenance => self.oid_index(key),
            Label::Actor => self.aid_index(key),
            Label::PrivilegeClass => self.pid_index(key),
            Label::NonProvenance => self.npid_index(key),
        }
    }

    fn register_index(&mut self, label: Label, key: &str, idx: NodeIndex) {
        match label {
            Label::Provenance => self.indices.oid.insert(key.to_string(), idx),
            Label::Actor => self.indices.aid.insert(key.to_string(), idx),
            Label::PrivilegeClass => self.indices.pid.insert(key.to_string(), idx),
            Label::NonProvenance => self.indices.npid.insert(key.to_string(), idx),
        };
    }

    /// Overwrite a node's properties in place (used when re-storing a
    /// whole object, spec §3 lifecycle: "updated only by explicit
    /// re-store of the whole node").
    pub fn overwrite_node(&mut self, idx: NodeIndex, node: GraphNode) {
        if let Some(slot) = self.inner.node_weight_mut(idx) {
            *slot = node;
        }
    }

    /// Add a directed relationship between two existing nodes.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) {
        self.inner.add_edge(from, to, edge);
    }

    /// Delete a node, optionally requiring it have no incident edges.
    /// Returns an error when `cascade` is false and edges remain (spec
    /// §3 lifecycle delete semantics).
    pub fn delete_node(&mut self, idx: NodeIndex, cascade: bool) -> Result<()> {
        let has_edges = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .next()
            .is_some()
            || self
                .inner
                .edges_directed(idx, Direction::Incoming)
                .next()
                .is_some();

        if has_edges && !cascade {
            return Err(anyhow!(
                "cannot delete node: incident relationships remain and cascade=false"
            ));
        }

        if let Some(node) = self.inner.node_weight(idx).cloned() {
            self.deregister_index(node.label, &node.properties);
        }
        self.inner.remove_node(idx);
        Ok(())
    }

    fn deregister_index(&mut self, label: Label, properties: &PropertySet) {
        let key_prop = match label {
            Label::Provenance => "oid",
            Label::Actor => "aid",
            Label::PrivilegeClass => "pid",
            Label::NonProvenance => "npid",
        };
        if let Some(crate::codec::PropertyValue::Str(key)) = properties.get(key_prop) {
            match label {
                Label::Provenance => self.indices.oid.remove(key),
                Label::Actor => self.indices.aid.remove(key),
                Label::PrivilegeClass => self.indices.pid.remove(key),
                Label::NonProvenance => self.indices.npid.remove(key),
            };
        }
    }

    /// Delete the first relationship matching a predicate between two
    /// nodes (spec §4.3: edges are deleted by matching tuple).
    pub fn delete_edge_matching(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        matches: impl Fn(&GraphEdge) -> bool,
    ) -> bool {
        let edge_idx = self
            .inner
            .edges_connecting(from, to)
            .find(|e| matches(e.weight()))
            .map(|e| e.id());

        if let Some(edge_idx) = edge_idx {
            self.inner.remove_edge(edge_idx);
            true
        } else {
            false
        }
    }

    /// Outgoing relationships from a node, with their target.
    pub fn outgoing(&self, idx: NodeIndex) -> impl Iterator<Item = (&GraphEdge, NodeIndex)> {
        self.inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.weight(), e.target()))
    }

    /// Incoming relationships to a node, with their source.
    pub fn incoming(&self, idx: NodeIndex) -> impl Iterator<Item = (&GraphEdge, NodeIndex)> {
        self.inner
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.weight(), e.source()))
    }

    /// All node indices currently in the graph.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.node_indices()
    }

    /// Total node count.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Render the whole kernel graph to an SVG file at `path`, as a
    /// debugging aid (not part of the store's core contract). Mirrors
    /// the teacher's `Graph::visualize`: format the graph as dot via
    /// `petgraph::dot::Dot`, then shell out to the local `graphviz`
    /// install through `graphviz_rust` to rasterize it.
    pub fn visualize(&self, path: &str) -> Result<String> {
        let as_dot = dot::Dot::new(&self.inner);
        let parsed = graphviz::parse(&format!("{as_dot:?}"))
            .map_err(|s| anyhow!(s))
            .context("failed to parse generated dot graph")?;
        graphviz::exec(
            parsed,
            &mut PrinterContext::default(),
            vec![CommandArg::Format(Format::Svg), CommandArg::Output(path.to_owned())],
        )
        .context("failed to exec graphviz; is it installed?")
    }

    /// Bounded-depth reachability test along relationships matching
    /// `rel_matcher`: is `to` reachable from `from` within
    /// `max_hops` hops? Used by the privilege engine's transitive
    /// dominance check (spec §4.5, bound 100) and generalizes the
    /// teacher's `get_paths`.
    pub fn reachable_within(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        max_hops: usize,
        rel_matcher: impl Fn(&GraphEdge) -> bool,
    ) -> bool {
        use std::collections::HashSet;
        use std::collections::VecDeque;

        if from == to {
            return true;
        }

        let mut frontier: VecDeque<(NodeIndex, usize)> = VecDeque::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        frontier.push_back((from, 0));
        visited.insert(from);

        while let Some((node, depth)) = frontier.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for (edge, target) in self.outgoing(node) {
                if !rel_matcher(edge) {
                    continue;
                }
                if target == to {
                    return true;
                }
                if visited.insert(target) {
                    frontier.push_back((target, depth + 1));
                }
            }
        }
        false
    }
}
