//! Lineage traversal engine (component C6, spec §4.6).

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use anyhow::{anyhow, Result};
use petgraph::stable_graph::NodeIndex;

use crate::factory;
use crate::model::{EdgeKind, LineageDAG, NpeTarget, ProvenanceCollection};
use crate::privilege;
use crate::store::graph::{Label, RelType};
use crate::store::GraphStore;

/// Traversal configuration (spec §4.6 table).
#[derive(Debug, Clone, Copy)]
pub struct TraversalSettings {
    /// Cap on hops from the starting point. Unbounded if `<= 0`.
    pub max_depth: i64,
    /// Cap on total nodes collected. Unbounded if `<= 0`.
    pub n: i64,
    /// BFS if true, DFS if false.
    pub breadth_first: bool,
    /// Follow outgoing provenance relationships.
    pub forward: bool,
    /// Follow incoming provenance relationships.
    pub backward: bool,
    /// Whether visited nodes enter the result.
    pub include_nodes: bool,
    /// Whether traversed edges enter the result.
    pub include_edges: bool,
    /// Whether traversed NPEs enter the result.
    pub include_npes: bool,
    /// Whether traversal steps across NPE edges to reach new
    /// `PLUSObject`s via shared NPIDs.
    pub follow_npids: bool,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        TraversalSettings {
            max_depth: 0,
            n: 0,
            breadth_first: true,
            forward: true,
            backward: false,
            include_nodes: true,
            include_edges: true,
            include_npes: false,
            follow_npids: false,
        }
    }
}

/// Run a bounded traversal from `start_id`, filtering every visited
/// object through the surrogate filter for `viewer_privileges` (spec
/// §4.6). `start_id` may be an OID or an NPID; it is resolved the way
/// `GraphStore::resolve_start` resolves it (spec §4.6 step 1).
pub fn traverse(
    store: &GraphStore,
    start_id: &str,
    viewer_privileges: &HashSet<String>,
    settings: &TraversalSettings,
) -> Result<LineageDAG> {
    let started_at = Instant::now();
    let start_idx = store
        .resolve_start(start_id)
        .ok_or_else(|| anyhow!("not-found: no object or NPID resolves to {start_id}"))?;

    let mut dag = ProvenanceCollection::new();
    let start_label = store.graph().node(start_idx).map(|n| n.label);
    dag.focus = if start_label == Some(Label::Provenance) {
        store.hydrate_object_at(start_idx).ok().map(|o| o.oid)
    } else {
        None
    };

    // Edge case (spec §4.6): the start is an NPID and follow_npids is
    // false -- only the NPID's immediate NPE edges come back.
    if start_label == Some(Label::NonProvenance) && !settings.follow_npids {
        collect_npes_incident(store, start_idx, &mut dag);
        dag.stamp_fingerprint(started_at.elapsed());
        return Ok(dag);
    }

    let max_depth = if settings.max_depth <= 0 {
        usize::MAX
    } else {
        settings.max_depth as usize
    };
    let node_cap = if settings.n <= 0 { usize::MAX } else { settings.n as usize };
    let undirected = settings.forward && settings.backward;
    let any_direction = settings.forward || settings.backward;

    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut visited_edges: HashSet<(NodeIndex, NodeIndex, EdgeKind)> = HashSet::new();
    let mut frontier: VecDeque<(NodeIndex, usize)> = VecDeque::new();
    frontier.push_back((start_idx, 0));
    visited.insert(start_idx);

    while let Some((idx, depth)) = if settings.breadth_first {
        frontier.pop_front()
    } else {
        frontier.pop_back()
    } {
        let label = store.graph().node(idx).map(|n| n.label);

        if label == Some(Label::Provenance) && settings.include_nodes && dag.node_count() < node_cap {
            let object = store.hydrate_object_at(idx)?;
            if let Some(visible) = privilege::version_suitable_for(store, &object, viewer_privileges)? {
                dag.add_node(visible);
            }
        }

        if label == Some(Label::Provenance) && settings.include_edges {
            collect_provenance_edges(store, idx, &mut visited_edges, &mut dag)?;
        }

        if label == Some(Label::Provenance) && settings.include_npes {
            collect_npes_incident(store, idx, &mut dag);
        }

        if depth >= max_depth
            || (!any_direction && !settings.follow_npids)
            || (settings.include_nodes && dag.node_count() >= node_cap)
        {
            continue;
        }

        let mut neighbors: Vec<NodeIndex> = Vec::new();
        if settings.forward || undirected {
            for (edge, target) in store.graph().outgoing(idx) {
                if matches!(edge.rel_type, RelType::Provenance(_))
                    || (edge.rel_type == RelType::Npe && settings.follow_npids)
                {
                    neighbors.push(target);
                }
            }
        }
        if settings.backward || undirected {
            for (edge, source) in store.graph().incoming(idx) {
                if matches!(edge.rel_type, RelType::Provenance(_))
                    || (edge.rel_type == RelType::Npe && settings.follow_npids)
                {
                    neighbors.push(source);
                }
            }
        }

        for next in neighbors {
            if visited.insert(next) {
                frontier.push_back((next, depth + 1));
            }
        }
    }

    dag.stamp_fingerprint(started_at.elapsed());
    Ok(dag)
}

fn collect_provenance_edges(
    store: &GraphStore,
    idx: NodeIndex,
    seen: &mut HashSet<(NodeIndex, NodeIndex, EdgeKind)>,
    dag: &mut LineageDAG,
) -> Result<()> {
    let outgoing: Vec<_> = store
        .graph()
        .outgoing(idx)
        .filter_map(|(edge, target)| match edge.rel_type {
            RelType::Provenance(kind) => Some((idx, target, kind, edge.properties.clone())),
            _ => None,
        })
        .collect();

    for (from, to, kind, properties) in outgoing {
        if !seen.insert((from, to, kind)) {
            continue;
        }
        let from_obj = store.hydrate_object_at(from)?;
        let to_obj = store.hydrate_object_at(to)?;
        dag.add_edge(factory::hydrate_edge(&properties, kind, &from_obj.oid, &to_obj.oid));
    }
    Ok(())
}

fn collect_npes_incident(store: &GraphStore, idx: NodeIndex, dag: &mut LineageDAG) {
    let incident: Vec<_> = store
        .graph()
        .outgoing(idx)
        .filter(|(edge, _)| edge.rel_type == RelType::Npe)
        .map(|(edge, target)| (edge.properties.clone(), target))
        .collect();

    for (properties, target) in incident {
        let from_oid = match store.graph().node(idx).map(|n| n.label) {
            Some(Label::Provenance) => store.hydrate_object_at(idx).ok().map(|o| o.oid),
            _ => None,
        };
        let Some(from_oid) = from_oid else { continue };
        let to = npe_target(store, target);
        if let Ok(npe) = factory::hydrate_npe(&properties, &from_oid, to) {
            dag.add_npe(npe);
        }
    }
}

fn npe_target(store: &GraphStore, idx: NodeIndex) -> NpeTarget {
    match store.graph().node(idx).map(|n| n.label) {
        Some(Label::Provenance) => NpeTarget::Object(
            store.hydrate_object_at(idx).map(|o| o.oid).unwrap_or_default(),
        ),
        _ => {
            let npid = store
                .graph()
                .node(idx)
                .and_then(|n| n.properties.get("npid"))
                .and_then(|v| match v {
                    crate::codec::PropertyValue::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            NpeTarget::Npid(npid)
        }
    }
}
