//! DAG post-processing (component C7, spec §4.7).
//!
//! Five ordered passes run over a freshly-traversed [`LineageDAG`],
//! entirely in memory: the store is never consulted again once a
//! traversal has produced a collection.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{DataSubtype, EdgeKind, LineageDAG, ObjectKind};

/// Run all five passes, in spec order, mutating `dag` in place.
pub fn run(dag: &mut LineageDAG) {
    vote_surrogates(dag);
    trace_indirect_taint(dag);
    draw_inferrable_edges(dag);
    tag_heads_and_feet(dag);
    tag_danglers(dag);
}

/// Pass 1: edge voting for surrogates. A node's surrogate
/// representation is produced once, deterministically, by the
/// privilege engine for a single viewer (component C5), so a given OID
/// never has competing candidates within one traversal's output; this
/// pass is the seam where a future caller merging DAGs from multiple
/// traversals would resolve disagreement by majority vote over
/// incident edges, tie-broken by smaller OID. Left as a no-op under the
/// current single-traversal invariant (see DESIGN.md).
fn vote_surrogates(_dag: &mut LineageDAG) {}

/// Pass 2: propagate a taint marker along every downstream provenance
/// path from each taint node already in the DAG, tagging each reached
/// object with its taint ancestry.
fn trace_indirect_taint(dag: &mut LineageDAG) {
    let taint_oids: Vec<String> = dag
        .nodes()
        .filter(|o| matches!(o.kind, ObjectKind::Data(DataSubtype::Taint)))
        .map(|o| o.oid.clone())
        .collect();

    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in dag.edges() {
        outgoing.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
    }

    for taint_oid in &taint_oids {
        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<String> = VecDeque::new();
        frontier.push_back(taint_oid.clone());
        seen.insert(taint_oid.clone());

        while let Some(current) = frontier.pop_front() {
            let Some(children) = outgoing.get(current.as_str()) else { continue };
            for child in children.iter().map(|c| c.to_string()) {
                if !seen.insert(child.clone()) {
                    continue;
                }
                if &child != taint_oid {
                    append_tag(dag, &child, "taint-ancestor", taint_oid);
                }
                frontier.push_back(child);
            }
        }
    }
}

fn append_tag(dag: &mut LineageDAG, oid: &str, key: &str, value: &str) {
    let existing = dag.get_tag(oid, key).map(|s| s.to_string());
    let updated = match existing {
        Some(current) if current.split(',').any(|v| v == value) => current,
        Some(current) => format!("{current},{value}"),
        None => value.to_string(),
    };
    dag.set_tag(oid, key, updated);
}

/// Pass 3: where two visible nodes are separated only by an
/// intermediate the viewer cannot see (an edge endpoint absent from the
/// DAG), draw a direct `unspecified` edge between them.
fn draw_inferrable_edges(dag: &mut LineageDAG) {
    let present: HashSet<String> = dag.node_oids();

    let mut incoming_to_missing: HashMap<String, Vec<String>> = HashMap::new();
    let mut outgoing_from_missing: HashMap<String, Vec<String>> = HashMap::new();
    for edge in dag.edges() {
        if !present.contains(&edge.to) && present.contains(&edge.from) {
            incoming_to_missing.entry(edge.to.clone()).or_default().push(edge.from.clone());
        }
        if !present.contains(&edge.from) && present.contains(&edge.to) {
            outgoing_from_missing.entry(edge.from.clone()).or_default().push(edge.to.clone());
        }
    }

    let mut inferred = Vec::new();
    for (missing, sources) in &incoming_to_missing {
        let Some(destinations) = outgoing_from_missing.get(missing) else { continue };
        for from in sources {
            for to in destinations {
                if from != to {
                    inferred.push(crate::model::PLUSEdge::new(from.clone(), to.clone(), EdgeKind::Unspecified, None));
                }
            }
        }
    }
    for edge in inferred {
        dag.add_edge(edge);
    }
}

/// Pass 4: nodes with no inbound provenance edge in the DAG are tagged
/// `head`; those with no outbound provenance edge are tagged `foot`.
fn tag_heads_and_feet(dag: &mut LineageDAG) {
    let mut has_incoming: HashSet<String> = HashSet::new();
    let mut has_outgoing: HashSet<String> = HashSet::new();
    for edge in dag.edges() {
        has_outgoing.insert(edge.from.clone());
        has_incoming.insert(edge.to.clone());
    }

    let oids: Vec<String> = dag.nodes().map(|o| o.oid.clone()).collect();
    for oid in oids {
        if !has_incoming.contains(&oid) {
            dag.set_tag(&oid, "head", "true");
        }
        if !has_outgoing.contains(&oid) {
            dag.set_tag(&oid, "foot", "true");
        }
    }
}

/// Pass 5: edges whose endpoint is missing from the DAG mark their
/// surviving endpoint `more-available=true`, so a viewer knows the
/// graph continues past the cut.
fn tag_danglers(dag: &mut LineageDAG) {
    let present: HashSet<String> = dag.node_oids();
    let mut danglers: Vec<String> = Vec::new();
    for edge in dag.edges() {
        let from_present = present.contains(&edge.from);
        let to_present = present.contains(&edge.to);
        if from_present && !to_present {
            danglers.push(edge.from.clone());
        } else if to_present && !from_present {
            danglers.push(edge.to.clone());
        }
    }
    for npe in dag.npes() {
        if let crate::model::NpeTarget::Object(oid) = &npe.to {
            if !present.contains(oid) && present.contains(&npe.from) {
                danglers.push(npe.from.clone());
            }
        }
    }
    for oid in danglers {
        dag.set_tag(&oid, "more-available", "true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObjectKind, PLUSEdge, PLUSObject};

    fn obj(oid: &str, kind: ObjectKind) -> PLUSObject {
        PLUSObject::new(oid, kind, oid, 0)
    }

    #[test]
    fn taint_propagates_downstream() {
        let mut dag = LineageDAG::new();
        dag.add_node(obj("plus:t", ObjectKind::Data(DataSubtype::Taint)));
        dag.add_node(obj("plus:a", ObjectKind::Data(DataSubtype::Generic)));
        dag.add_node(obj("plus:b", ObjectKind::Data(DataSubtype::Generic)));
        dag.add_edge(PLUSEdge::new("plus:t", "plus:a", EdgeKind::Marks, None));
        dag.add_edge(PLUSEdge::new("plus:a", "plus:b", EdgeKind::InputTo, None));

        trace_indirect_taint(&mut dag);

        assert_eq!(dag.get_tag("plus:a", "taint-ancestor"), Some("plus:t"));
        assert_eq!(dag.get_tag("plus:b", "taint-ancestor"), Some("plus:t"));
        assert_eq!(dag.get_tag("plus:t", "taint-ancestor"), None);
    }

    #[test]
    fn inferrable_edge_bridges_missing_intermediate() {
        let mut dag = LineageDAG::new();
        dag.add_node(obj("plus:a", ObjectKind::Data(DataSubtype::Generic)));
        dag.add_node(obj("plus:c", ObjectKind::Data(DataSubtype::Generic)));
        // "plus:b" never entered the DAG (redacted to None by the privilege filter).
        dag.add_edge(PLUSEdge::new("plus:a", "plus:b", EdgeKind::InputTo, None));
        dag.add_edge(PLUSEdge::new("plus:b", "plus:c", EdgeKind::InputTo, None));

        draw_inferrable_edges(&mut dag);

        assert!(dag
            .edges()
            .any(|e| e.from == "plus:a" && e.to == "plus:c" && e.edge_type == EdgeKind::Unspecified));
    }

    #[test]
    fn heads_feet_and_danglers_are_tagged() {
        let mut dag = LineageDAG::new();
        dag.add_node(obj("plus:a", ObjectKind::Data(DataSubtype::Generic)));
        dag.add_node(obj("plus:b", ObjectKind::Data(DataSubtype::Generic)));
        dag.add_edge(PLUSEdge::new("plus:a", "plus:b", EdgeKind::InputTo, None));
        dag.add_edge(PLUSEdge::new("plus:b", "plus:missing", EdgeKind::InputTo, None));

        tag_heads_and_feet(&mut dag);
        tag_danglers(&mut dag);

        assert_eq!(dag.get_tag("plus:a", "head"), Some("true"));
        assert_eq!(dag.get_tag("plus:a", "foot"), None);
        assert_eq!(dag.get_tag("plus:b", "foot"), None);
        assert_eq!(dag.get_tag("plus:b", "more-available"), Some("true"));
    }
}
