//! Schema & storage (component C3) plus the graph kernel (component
//! C2) it's built on.
//!
//! `GraphStore` is the only component in this crate permitted to touch
//! persistent state (spec §4.2). Every public write opens a
//! [`txn::WriteTxn`], mutates a private working copy, and commits it
//! back atomically; every read either borrows the committed graph
//! directly or runs inside the same working copy when called from
//! within a transaction (read-your-writes, spec §5).

pub mod graph;
pub mod schema;
pub mod txn;

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use petgraph::stable_graph::NodeIndex;

use crate::codec::PropertyValue;
use crate::config::GraphConfig;
use crate::factory;
use crate::logging::{debug, warn};
use crate::model::{
    ActorType, EdgeKind, NonProvenanceEdge, NpeTarget, PLUSActor, PLUSEdge, PLUSObject,
    PrivilegeClass, ProvenanceCollection,
};
use crate::oid::is_plus_oid;

use self::graph::{Graph, GraphEdge, GraphNode, Label, RelType};
use self::txn::WriteTxn;

/// The persistent, typed labeled property graph store.
pub struct GraphStore {
    config: GraphConfig,
    graph: Graph,
}

lazy_static! {
    static ref GLOBAL_STORE: Mutex<Option<Arc<Mutex<GraphStore>>>> = Mutex::new(None);
}

impl GraphStore {
    /// Open (or create) the store at `config.db_location`, running
    /// bootstrap if needed (spec §4.3, §5, §6).
    pub fn open(config: GraphConfig) -> Result<Self> {
        let graph = if config.db_location.join("graph.bincode").exists() {
            Self::load_graph(&config.db_location).context("loading persisted graph")?
        } else {
            fs::create_dir_all(&config.db_location).context("creating store directory")?;
            Graph::new()
        };

        let mut store = GraphStore { config, graph };
        store.bootstrap_if_needed()?;
        store.save().context("persisting store after open")?;
        Ok(store)
    }

    /// Open using configuration resolved from the environment (spec §6).
    pub fn open_default() -> Result<Self> {
        Self::open(GraphConfig::load()?)
    }

    /// Return the process-wide store handle, opening it on first use
    /// (spec §5: "a process-wide initializer, guarded by a mutex,
    /// opens the store on first use"). Callers are responsible for
    /// calling [`GraphStore::close`] on the returned handle before
    /// process exit; there is no automatic shutdown hook in a library
    /// context (see DESIGN.md).
    pub fn global() -> Result<Arc<Mutex<GraphStore>>> {
        let mut slot = GLOBAL_STORE
            .lock()
            .map_err(|_| anyhow!("global store mutex poisoned"))?;
        if slot.is_none() {
            let store = GraphStore::open_default()?;
            *slot = Some(Arc::new(Mutex::new(store)));
        }
        Ok(slot.as_ref().unwrap().clone())
    }

    /// Persist the current graph to `db_location` and drop this handle.
    /// Use after shutdown is undefined (spec §5).
    pub fn close(self) -> Result<()> {
        self.save()
    }

    fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.config.db_location)?;
        let path = self.config.db_location.join("graph.bincode");
        let bytes = bincode::serialize(&self.graph).context("serializing graph")?;
        fs::write(path, bytes).context("writing graph to disk")?;
        Ok(())
    }

    fn load_graph(dir: &Path) -> Result<Graph> {
        let bytes = fs::read(dir.join("graph.bincode"))?;
        bincode::deserialize(&bytes).context("deserializing graph")
    }

    /// The resolved configuration this store was opened with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Idempotent bootstrap: declares the lattice, default workflow,
    /// unknown activity, and built-in users, triggered whenever the
    /// default workflow OID is absent (spec §4.3).
    fn bootstrap_if_needed(&mut self) -> Result<()> {
        let default_workflow_oid = schema::default_workflow_oid();
        if self.graph.oid_index(&default_workflow_oid).is_some() {
            return Ok(());
        }
        debug!("bootstrapping provenance store");

        let mut txn = WriteTxn::new(&mut self.graph);

        // Privilege lattice.
        let mut pid_index: std::collections::HashMap<&str, NodeIndex> = Default::default();
        for name in schema::bootstrap_privilege_classes() {
            let class = PrivilegeClass::new(name.to_string());
            let node = GraphNode {
                label: Label::PrivilegeClass,
                properties: factory::encode_privilege_class(&class),
            };
            let (idx, _) = txn.graph_mut().get_or_insert_node(&class.pid, node);
            pid_index.insert(name, idx);
        }
        for (dominator, dominated) in schema::bootstrap_dominance_edges() {
            let from = *pid_index.get(dominator).ok_or_else(|| anyhow!("unknown class"))?;
            let to = *pid_index.get(dominated).ok_or_else(|| anyhow!("unknown class"))?;
            txn.graph_mut().add_edge(
                from,
                to,
                GraphEdge {
                    rel_type: RelType::Dominates,
                    properties: Default::default(),
                },
            );
        }

        // Built-in actors.
        let god = PLUSActor::new(schema::GOD_AID, "GOD", ActorType::Actor);
        txn.graph_mut().get_or_insert_node(
            &god.aid,
            GraphNode {
                label: Label::Actor,
                properties: factory::encode_actor(&god),
            },
        );
        let public_user = PLUSActor::new(schema::PUBLIC_USER_AID, "PUBLIC", ActorType::Actor);
        txn.graph_mut().get_or_insert_node(
            &public_user.aid,
            GraphNode {
                label: Label::Actor,
                properties: factory::encode_actor(&public_user),
            },
        );

        // Default workflow and unknown activity.
        let now = now_ms();
        let default_workflow = PLUSObject::new(
            default_workflow_oid,
            crate::model::ObjectKind::Workflow,
            "default workflow",
            now,
        );
        txn.graph_mut().get_or_insert_node(
            &default_workflow.oid,
            GraphNode {
                label: Label::Provenance,
                properties: factory::encode_object(&default_workflow),
            },
        );
        let unknown_activity = PLUSObject::new(
            schema::unknown_activity_oid(),
            crate::model::ObjectKind::Activity,
            "unknown activity",
            now,
        );
        txn.graph_mut().get_or_insert_node(
            &unknown_activity.oid,
            GraphNode {
                label: Label::Provenance,
                properties: factory::encode_object(&unknown_activity),
            },
        );

        txn.commit();
        Ok(())
    }

    // --- writes -----------------------------------------------------

    /// Insert an actor (spec §4.3). Duplicate `aid` returns the
    /// existing actor, unmutated (spec §3 invariant 1).
    pub fn store_actor(&mut self, actor: &PLUSActor) -> Result<PLUSActor> {
        let mut txn = WriteTxn::new(&mut self.graph);
        let result = Self::store_actor_in(&mut txn, actor)?;
        txn.commit();
        Ok(result)
    }

    fn store_actor_in(txn: &mut WriteTxn, actor: &PLUSActor) -> Result<PLUSActor> {
        let node = GraphNode {
            label: Label::Actor,
            properties: factory::encode_actor(actor),
        };
        let (idx, inserted) = txn.graph_mut().get_or_insert_node(&actor.aid, node);
        if !inserted {
            warn!("actor {} already exists; skipping insert", actor.aid);
            let existing = txn.graph().node(idx).unwrap();
            return factory::hydrate_actor(&existing.properties);
        }
        Ok(actor.clone())
    }

    /// Insert an object (spec §4.3): writes first-class properties and
    /// metadata, links the owner via `owns`, and ensures/links each
    /// declared privilege class via `controlledBy`.
    pub fn store_object(&mut self, object: &PLUSObject) -> Result<PLUSObject> {
        let mut txn = WriteTxn::new(&mut self.graph);
        let result = Self::store_object_in(&mut txn, object)?;
        txn.commit();
        Ok(result)
    }

    fn store_object_in(txn: &mut WriteTxn, object: &PLUSObject) -> Result<PLUSObject> {
        let node = GraphNode {
            label: Label::Provenance,
            properties: factory::encode_object(object),
        };
        let (idx, inserted) = txn.graph_mut().get_or_insert_node(&object.oid, node);
        if !inserted {
            warn!("object {} already exists; skipping insert", object.oid);
            return hydrate_object_from(txn.graph(), idx);
        }

        if let Some(owner) = &object.owner {
            let owner_idx = txn
                .graph()
                .aid_index(&owner.aid)
                .ok_or_else(|| anyhow!("owner actor {} does not exist", owner.aid))?;

            let existing_owner = txn
                .graph()
                .incoming(idx)
                .any(|(edge, _)| edge.rel_type == RelType::Owns);
            if existing_owner {
                warn!(
                    "object {} already has an owner; ignoring additional owns edge",
                    object.oid
                );
            } else {
                txn.graph_mut().add_edge(
                    owner_idx,
                    idx,
                    GraphEdge {
                        rel_type: RelType::Owns,
                        properties: Default::default(),
                    },
                );
            }
        }

        for privilege_name in &object.privileges {
            let class = PrivilegeClass::new(privilege_name.clone());
            let class_node = GraphNode {
                label: Label::PrivilegeClass,
                properties: factory::encode_privilege_class(&class),
            };
            let (class_idx, _) = txn.graph_mut().get_or_insert_node(&class.pid, class_node);
            txn.graph_mut().add_edge(
                idx,
                class_idx,
                GraphEdge {
                    rel_type: RelType::ControlledBy,
                    properties: Default::default(),
                },
            );
        }

        Ok(object.clone())
    }

    /// Insert an edge (spec §4.3): both endpoints must already exist.
    pub fn store_edge(&mut self, edge: &PLUSEdge) -> Result<()> {
        let mut txn = WriteTxn::new(&mut self.graph);
        Self::store_edge_in(&mut txn, edge)?;
        txn.commit();
        Ok(())
    }

    fn store_edge_in(txn: &mut WriteTxn, edge: &PLUSEdge) -> Result<()> {
        let from = txn
            .graph()
            .oid_index(&edge.from)
            .ok_or_else(|| anyhow!("dangling edge: \"from\" object {} does not exist", edge.from))?;
        let to = txn
            .graph()
            .oid_index(&edge.to)
            .ok_or_else(|| anyhow!("dangling edge: \"to\" object {} does not exist", edge.to))?;

        txn.graph_mut().add_edge(
            from,
            to,
            GraphEdge {
                rel_type: RelType::Provenance(edge.edge_type),
                properties: factory::encode_edge_properties(edge),
            },
        );
        Ok(())
    }

    /// Insert a non-provenance edge (spec §4.3): `from` must exist;
    /// `to` resolves to an existing object or is auto-created as an
    /// NPID.
    pub fn store_npe(&mut self, npe: &NonProvenanceEdge) -> Result<()> {
        let mut txn = WriteTxn::new(&mut self.graph);
        Self::store_npe_in(&mut txn, npe)?;
        txn.commit();
        Ok(())
    }

    fn store_npe_in(txn: &mut WriteTxn, npe: &NonProvenanceEdge) -> Result<()> {
        let from = txn
            .graph()
            .oid_index(&npe.from)
            .ok_or_else(|| anyhow!("dangling NPE: \"from\" object {} does not exist", npe.from))?;

        let to = match &npe.to {
            NpeTarget::Object(oid) => txn
                .graph()
                .oid_index(oid)
                .ok_or_else(|| anyhow!("dangling NPE: \"to\" object {} does not exist", oid))?,
            NpeTarget::Npid(npid) => {
                if let Some(idx) = txn.graph().npid_index(npid) {
                    idx
                } else {
                    let mut properties = crate::codec::PropertySet::new();
                    properties.insert("npid".to_string(), PropertyValue::Str(npid.clone()));
                    let (idx, _) = txn.graph_mut().get_or_insert_node(
                        npid,
                        GraphNode {
                            label: Label::NonProvenance,
                            properties,
                        },
                    );
                    idx
                }
            }
        };

        txn.graph_mut().add_edge(
            from,
            to,
            GraphEdge {
                rel_type: RelType::Npe,
                properties: factory::encode_npe_properties(npe),
            },
        );
        Ok(())
    }

    /// Persist a whole collection in a single transaction: actors,
    /// then objects, then edges, then NPEs (spec §4.3). Returns the
    /// count of newly-persisted elements (pre-existing keys don't
    /// count, spec §8 testable property 2: atomicity).
    pub fn store_collection(&mut self, collection: &ProvenanceCollection) -> Result<usize> {
        let mut txn = WriteTxn::new(&mut self.graph);
        let mut persisted = 0usize;

        for actor in collection.actors() {
            let existed = txn.graph().aid_index(&actor.aid).is_some();
            Self::store_actor_in(&mut txn, actor)?;
            if !existed {
                persisted += 1;
            }
        }
        for object in collection.nodes() {
            let existed = txn.graph().oid_index(&object.oid).is_some();
            Self::store_object_in(&mut txn, object)?;
            if !existed {
                persisted += 1;
            }
        }
        for edge in collection.edges() {
            Self::store_edge_in(&mut txn, edge)?;
            persisted += 1;
        }
        for npe in collection.npes() {
            Self::store_npe_in(&mut txn, npe)?;
            persisted += 1;
        }

        txn.commit();
        Ok(persisted)
    }

    // --- deletes ------------------------------------------------------

    /// Delete an object. If `cascade` is true, incident relationships
    /// are deleted first; otherwise the call fails when any remain
    /// (spec §3 lifecycle).
    pub fn delete_object(&mut self, oid: &str, cascade: bool) -> Result<()> {
        let mut txn = WriteTxn::new(&mut self.graph);
        let idx = txn
            .graph()
            .oid_index(oid)
            .ok_or_else(|| anyhow!("object {oid} not found"))?;

        if cascade {
            let incident: Vec<_> = txn
                .graph()
                .outgoing(idx)
                .map(|(_, t)| t)
                .chain(txn.graph().incoming(idx).map(|(_, s)| s))
                .collect();
            for other in incident {
                while txn.graph_mut().delete_edge_matching(idx, other, |_| true)
                    || txn.graph_mut().delete_edge_matching(other, idx, |_| true)
                {}
            }
        }

        txn.graph_mut().delete_node(idx, cascade)?;
        txn.commit();
        Ok(())
    }

    /// Delete the first edge matching `(from, to, type, workflow)`,
    /// tolerating `None == None` on workflow (spec §4.3).
    pub fn delete_edge(&mut self, edge: &PLUSEdge) -> Result<bool> {
        let mut txn = WriteTxn::new(&mut self.graph);
        let from = match txn.graph().oid_index(&edge.from) {
            Some(i) => i,
            None => return Ok(false),
        };
        let to = match txn.graph().oid_index(&edge.to) {
            Some(i) => i,
            None => return Ok(false),
        };

        let edge_type = edge.edge_type;
        let workflow = edge.workflow.clone();
        let deleted = txn.graph_mut().delete_edge_matching(from, to, |e| {
            matches!(e.rel_type, RelType::Provenance(t) if t == edge_type)
                && match e.properties.get("workflow") {
                    Some(PropertyValue::Str(w)) => Some(w.as_str()) == workflow.as_deref(),
                    _ => workflow.is_none(),
                }
        });
        txn.commit();
        Ok(deleted)
    }

    // --- reads ----------------------------------------------------------

    /// The underlying kernel graph (read-only).
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Render the whole store to an SVG file at `path` -- a debugging
    /// aid carried from the teacher, not part of the store's core
    /// contract (SPEC_FULL.md §3).
    pub fn visualize(&self, path: &str) -> Result<String> {
        self.graph.visualize(path)
    }

    /// Look up a node index by OID or NPID, resolving via
    /// [`is_plus_oid`] (spec §4.6 step 1).
    pub fn resolve_start(&self, id: &str) -> Option<NodeIndex> {
        if is_plus_oid(id) {
            self.graph.oid_index(id)
        } else {
            self.graph.npid_index(id).or_else(|| self.graph.oid_index(id))
        }
    }

    /// Whether an object with this OID exists.
    pub fn exists_oid(&self, oid: &str) -> bool {
        self.graph.oid_index(oid).is_some()
    }

    /// Whether an actor with this AID exists.
    pub fn exists_aid(&self, aid: &str) -> bool {
        self.graph.aid_index(aid).is_some()
    }

    /// Whether a privilege class with this PID exists.
    pub fn exists_pid(&self, pid: &str) -> bool {
        self.graph.pid_index(pid).is_some()
    }

    /// Whether an NPID exists.
    pub fn exists_npid(&self, npid: &str) -> bool {
        self.graph.npid_index(npid).is_some()
    }

    /// Fetch a hydrated object by OID, including owner and privileges.
    pub fn get_object(&self, oid: &str) -> Result<Option<PLUSObject>> {
        let idx = match self.graph.oid_index(oid) {
            Some(i) => i,
            None => return Ok(None),
        };
        Ok(Some(self.hydrate_object_at(idx)?))
    }

    /// Hydrate the object at `idx`, reading owner/privileges off the
    /// live graph (spec §4.4 population order (c), (d)).
    pub(crate) fn hydrate_object_at(&self, idx: NodeIndex) -> Result<PLUSObject> {
        hydrate_object_from(&self.graph, idx)
    }

    /// Fetch a hydrated actor by AID.
    pub fn get_actor(&self, aid: &str) -> Result<Option<PLUSActor>> {
        match self.graph.aid_index(aid) {
            Some(idx) => Ok(Some(factory::hydrate_actor(&self.graph.node(idx).unwrap().properties)?)),
            None => Ok(None),
        }
    }

    /// Fetch a hydrated privilege class by PID.
    pub fn get_privilege_class(&self, pid: &str) -> Result<Option<PrivilegeClass>> {
        match self.graph.pid_index(pid) {
            Some(idx) => Ok(Some(factory::hydrate_privilege_class(
                &self.graph.node(idx).unwrap().properties,
            )?)),
            None => Ok(None),
        }
    }

    /// The most-recent `limit` actors, ordered by name descending
    /// (spec §4.3). A non-positive limit is clamped, not an error.
    pub fn get_actors(&self, limit: usize) -> Result<Vec<PLUSActor>> {
        let mut actors: Vec<PLUSActor> = self
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.node(idx))
            .filter(|n| n.label == Label::Actor)
            .map(|n| factory::hydrate_actor(&n.properties))
            .collect::<Result<_>>()?;
        actors.sort_by(|a, b| b.name.cmp(&a.name));
        actors.truncate(limit);
        Ok(actors)
    }

    /// The most recent `limit` edges whose `workflow` property matches,
    /// together with their hydrated endpoints (spec §4.3).
    pub fn get_members(&self, workflow: &str, limit: usize) -> Result<Vec<(PLUSEdge, PLUSObject, PLUSObject)>> {
        let mut members = Vec::new();
        for idx in self.graph.node_indices() {
            for (edge, target) in self.graph.outgoing(idx) {
                let RelType::Provenance(kind) = edge.rel_type else { continue };
                let matches_workflow = matches!(
                    edge.properties.get("workflow"),
                    Some(PropertyValue::Str(w)) if w == workflow
                );
                if !matches_workflow {
                    continue;
                }
                let from_obj = self.hydrate_object_at(idx)?;
                let to_obj = self.hydrate_object_at(target)?;
                let plus_edge = factory::hydrate_edge(&edge.properties, kind, &from_obj.oid, &to_obj.oid);
                members.push((plus_edge, from_obj, to_obj));
            }
        }
        // "most recent" -- order by the created timestamp of the destination object, descending.
        members.sort_by(|a, b| b.2.created.cmp(&a.2.created));
        members.truncate(limit);
        Ok(members)
    }
}

fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc() - time::OffsetDateTime::UNIX_EPOCH).whole_milliseconds() as i64
}

/// Hydrate the object at `idx` off `graph`, reading owner/privileges
/// from the live relationships (spec §4.4 population order (c), (d)).
/// Shared by reads against the committed graph and writes that re-hydrate
/// an already-existing node inside an in-progress transaction (spec §3
/// invariant 1: re-insert with an existing key returns the existing node).
fn hydrate_object_from(graph: &Graph, idx: NodeIndex) -> Result<PLUSObject> {
    let node = graph.node(idx).ok_or_else(|| anyhow!("dangling node index"))?;

    let owner = graph
        .incoming(idx)
        .filter(|(edge, _)| edge.rel_type == RelType::Owns)
        .map(|(_, source)| source)
        .next()
        .and_then(|owner_idx| graph.node(owner_idx))
        .map(|n| factory::hydrate_actor(&n.properties))
        .transpose()?;

    let privileges: HashSet<String> = graph
        .outgoing(idx)
        .filter(|(edge, _)| edge.rel_type == RelType::ControlledBy)
        .filter_map(|(_, target)| graph.node(target))
        .filter_map(|n| match n.properties.get("name") {
            Some(PropertyValue::Str(s)) => Some(s.clone()),
            _ => None,
        })
        .collect();

    factory::hydrate_object(&node.properties, owner, privileges)
}

#[cfg(test)]
pub mod test_util {
    use super::*;

    /// Build a store in a fresh temp directory, for tests.
    pub fn temp_store() -> (GraphStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = GraphConfig {
            db_location: dir.path().to_path_buf(),
            ..GraphConfig::default()
        };
        let store = GraphStore::open(config).expect("open store");
        (store, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::temp_store;
    use super::*;
    use crate::model::ObjectKind;

    fn obj(oid: &str, name: &str) -> PLUSObject {
        PLUSObject::new(oid, ObjectKind::Data(crate::model::DataSubtype::Generic), name, 0)
    }

    #[test]
    fn bootstrap_creates_lattice_and_builtins() {
        let (store, _dir) = temp_store();
        assert!(store.exists_aid(schema::GOD_AID));
        assert!(store.exists_aid(schema::PUBLIC_USER_AID));
        assert!(store.exists_oid(&schema::default_workflow_oid()));
        for name in schema::bootstrap_privilege_classes() {
            assert!(store.exists_pid(&PrivilegeClass::new(name).pid));
        }
    }

    #[test]
    fn duplicate_object_insert_is_idempotent() -> Result<()> {
        let (mut store, _dir) = temp_store();
        let o = obj("plus:dup", "dup");
        store.store_object(&o)?;
        store.store_object(&o)?;
        assert_eq!(store.graph.node_indices().filter(|i| store.graph.node(*i).unwrap().label == Label::Provenance).count(),
            3 /* default workflow + unknown activity + dup */);
        Ok(())
    }

    #[test]
    fn edge_requires_existing_endpoints() -> Result<()> {
        let (mut store, _dir) = temp_store();
        store.store_object(&obj("plus:a", "a"))?;
        let edge = PLUSEdge::new("plus:a", "plus:missing", EdgeKind::InputTo, None);
        assert!(store.store_edge(&edge).is_err());
        Ok(())
    }

    #[test]
    fn store_collection_persists_actors_nodes_edges_atomically() -> Result<()> {
        let (mut store, _dir) = temp_store();
        let mut collection = ProvenanceCollection::new();
        collection.add_node(obj("plus:1", "one"));
        collection.add_node(obj("plus:2", "two"));
        collection.add_edge(PLUSEdge::new("plus:1", "plus:2", EdgeKind::InputTo, None));

        let persisted = store.store_collection(&collection)?;
        assert_eq!(persisted, 3);
        assert!(store.exists_oid("plus:1"));
        assert!(store.exists_oid("plus:2"));
        Ok(())
    }

    #[test]
    fn delete_edge_matches_tuple_tolerating_null_workflow() -> Result<()> {
        let (mut store, _dir) = temp_store();
        store.store_object(&obj("plus:a", "a"))?;
        store.store_object(&obj("plus:b", "b"))?;
        let edge = PLUSEdge::new("plus:a", "plus:b", EdgeKind::InputTo, None);
        store.store_edge(&edge)?;
        assert!(store.delete_edge(&edge)?);
        assert!(!store.delete_edge(&edge)?);
        Ok(())
    }
}
