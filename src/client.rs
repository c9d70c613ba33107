//! Client facade (component C8, spec §4.8).
//!
//! The stable, user-parameterized surface the rest of this crate's
//! machinery sits behind. Every operation normalizes its underlying
//! `anyhow::Error` down to a [`GraphError`] at this boundary (spec §7),
//! while the internals it calls into keep using `anyhow::Result`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::config::{clamp_limit, clamp_signed_limit, DEFAULT_LIST_LIMIT, DEFAULT_QUERY_LIMIT};
use crate::error::{GraphError, GraphResult};
use crate::logging::warn;
use crate::model::privilege::{ADMIN, PUBLIC};
use crate::model::{
    ActorType, DataSubtype, EdgeKind, ObjectKind, PLUSActor, PLUSObject, ProvenanceCollection,
};
use crate::model::actor::{ADMIN_AID, PUBLIC_AID};
use crate::oid::new_oid;
use crate::postprocess;
use crate::privilege;
use crate::store::GraphStore;
use crate::traversal::{self, TraversalSettings};

/// A calling viewer: an actor identity plus the privilege-class names
/// their clearance grants (spec §4.5/§4.8 — every client operation is
/// parameterized by the calling user).
#[derive(Debug, Clone)]
pub struct User {
    /// The viewer's actor identifier.
    pub aid: String,
    /// Privilege-class names this viewer's clearance grants.
    pub privileges: HashSet<String>,
}

impl User {
    /// Build a viewer with an explicit privilege set.
    pub fn new(aid: impl Into<String>, privileges: impl IntoIterator<Item = String>) -> Self {
        User {
            aid: aid.into(),
            privileges: privileges.into_iter().collect(),
        }
    }

    /// The built-in admin user: dominates every privilege class.
    pub fn god() -> Self {
        User::new(ADMIN_AID, [ADMIN.to_string()])
    }

    /// The built-in anonymous/public user.
    pub fn public() -> Self {
        User::new(PUBLIC_AID, [PUBLIC.to_string()])
    }
}

/// The client facade: wraps a [`GraphStore`] handle behind the
/// operations external callers use (spec §4.8).
pub struct Client {
    store: Arc<Mutex<GraphStore>>,
}

impl Client {
    /// Wrap an existing store handle (e.g. from [`GraphStore::global`]).
    pub fn new(store: Arc<Mutex<GraphStore>>) -> Self {
        Client { store }
    }

    /// Open the process-wide store and wrap it.
    pub fn open_default() -> GraphResult<Self> {
        let store = GraphStore::global().map_err(to_graph_error)?;
        Ok(Client::new(store))
    }

    fn lock(&self) -> GraphResult<std::sync::MutexGuard<'_, GraphStore>> {
        self.store
            .lock()
            .map_err(|_| GraphError::storage(anyhow::anyhow!("store mutex poisoned")))
    }

    /// `report(collection)`: persist a whole collection atomically,
    /// returning the count of newly-persisted elements.
    pub fn report(&self, collection: &ProvenanceCollection) -> GraphResult<usize> {
        self.lock()?.store_collection(collection).map_err(to_graph_error)
    }

    /// `exists(oid)`: whether an object with this OID exists.
    pub fn exists(&self, oid: &str) -> GraphResult<bool> {
        Ok(self.lock()?.exists_oid(oid))
    }

    /// `getGraph(oid, settings)`: traverse from `oid`, filter by
    /// `user`'s privileges, and run the post-processing passes (spec
    /// §4.6, §4.7).
    pub fn get_graph(&self, oid: &str, settings: &TraversalSettings, user: &User) -> GraphResult<ProvenanceCollection> {
        let store = self.lock()?;
        let mut dag = traversal::traverse(&store, oid, &user.privileges, settings).map_err(to_graph_error)?;
        postprocess::run(&mut dag);
        Ok(dag)
    }

    /// `latest()`: the default workflow's own object, the closest
    /// analogue this core has to "the most recently active workflow"
    /// without a time-ordered workflow index.
    pub fn latest(&self) -> GraphResult<Option<PLUSObject>> {
        let oid = crate::store::schema::default_workflow_oid();
        self.lock()?.get_object(&oid).map_err(to_graph_error)
    }

    /// `getActors(max)`: up to `max` actors, most-recent-name-first.
    /// Non-positive `max` clamps to [`DEFAULT_LIST_LIMIT`].
    pub fn get_actors(&self, max: i64) -> GraphResult<Vec<PLUSActor>> {
        let limit = clamp_signed_limit(max, DEFAULT_LIST_LIMIT);
        self.lock()?.get_actors(limit).map_err(to_graph_error)
    }

    /// `listWorkflows(max, user)`: every `Workflow`-kinded object visible
    /// to `user`, up to `max` (spec §3 invariant 7, §6).
    pub fn list_workflows(&self, max: i64, user: &User) -> GraphResult<Vec<PLUSObject>> {
        let limit = clamp_signed_limit(max, DEFAULT_LIST_LIMIT);
        let store = self.lock()?;
        let mut workflows: Vec<PLUSObject> = store
            .graph()
            .node_indices()
            .filter_map(|idx| store.hydrate_object_at(idx).ok())
            .filter(|o| matches!(o.kind, ObjectKind::Workflow))
            .filter_map(|o| privilege::version_suitable_for(&store, &o, &user.privileges).transpose())
            .collect::<Result<_, _>>()
            .map_err(to_graph_error)?;
        workflows.sort_by(|a, b| b.created.cmp(&a.created));
        workflows.truncate(limit);
        Ok(workflows)
    }

    /// `getWorkflowMembers(oid, max, user)`: the most recent `max` edges
    /// recorded under workflow `oid`, together with their endpoints,
    /// each endpoint surrogate-filtered for `user`; a member whose
    /// endpoint is entirely unauthorized for `user` is dropped.
    pub fn get_workflow_members(
        &self,
        oid: &str,
        max: i64,
        user: &User,
    ) -> GraphResult<Vec<(crate::model::PLUSEdge, PLUSObject, PLUSObject)>> {
        let limit = clamp_signed_limit(max, DEFAULT_LIST_LIMIT);
        let store = self.lock()?;
        let members = store.get_members(oid, limit).map_err(to_graph_error)?;
        let mut visible = Vec::with_capacity(members.len());
        for (edge, from, to) in members {
            let Some(from) = privilege::version_suitable_for(&store, &from, &user.privileges).map_err(to_graph_error)? else {
                continue;
            };
            let Some(to) = privilege::version_suitable_for(&store, &to, &user.privileges).map_err(to_graph_error)? else {
                continue;
            };
            visible.push((edge, from, to));
        }
        Ok(visible)
    }

    /// `getSingleNode(oid)`: fetch and surrogate-filter a single object
    /// for `user`, without traversal.
    pub fn get_single_node(&self, oid: &str, user: &User) -> GraphResult<Option<PLUSObject>> {
        let store = self.lock()?;
        let Some(object) = store.get_object(oid).map_err(to_graph_error)? else {
            return Ok(None);
        };
        privilege::version_suitable_for(&store, &object, &user.privileges).map_err(to_graph_error)
    }

    /// `actorExists(aid)`: whether an actor with this AID exists.
    pub fn actor_exists(&self, aid: &str) -> GraphResult<bool> {
        Ok(self.lock()?.exists_aid(aid))
    }

    /// `dominates(a, b)`: privilege-lattice dominance test (spec §4.5).
    pub fn dominates(&self, a: &str, b: &str) -> GraphResult<bool> {
        privilege::dominates(&self.lock()?, a, b).map_err(to_graph_error)
    }

    /// `taint(obj, user, description)`: mint a new taint object owned by
    /// `user` and link it `taint -[marks]-> obj`. Returns the new taint
    /// object.
    pub fn taint(&self, obj: &str, user: &User, description: &str) -> GraphResult<PLUSObject> {
        let mut store = self.lock()?;
        if !store.exists_oid(obj) {
            return Err(GraphError::NotFound(format!("object {obj} does not exist")));
        }

        let owner = store.get_actor(&user.aid).map_err(to_graph_error)?.unwrap_or_else(|| {
            PLUSActor::new(user.aid.clone(), user.aid.clone(), ActorType::Actor)
        });
        if store.get_actor(&user.aid).map_err(to_graph_error)?.is_none() {
            store.store_actor(&owner).map_err(to_graph_error)?;
        }

        let mut taint_object = PLUSObject::new(
            new_oid(),
            ObjectKind::Data(DataSubtype::Taint),
            description,
            now_ms(),
        );
        taint_object.owner = Some(owner);
        store.store_object(&taint_object).map_err(to_graph_error)?;
        store
            .store_edge(&crate::model::PLUSEdge::new(
                taint_object.oid.clone(),
                obj.to_string(),
                EdgeKind::Marks,
                None,
            ))
            .map_err(to_graph_error)?;

        Ok(taint_object)
    }

    /// `removeTaints(obj)`: drop every `marks` edge into `obj` from a
    /// taint object, without deleting the taint objects themselves (they
    /// may still mark other downstream objects).
    pub fn remove_taints(&self, obj: &str) -> GraphResult<usize> {
        let mut store = self.lock()?;
        let admin_privileges = HashSet::from([ADMIN.to_string()]);
        let taint_oids: Vec<String> = taint_sources(&store, obj, &admin_privileges)
            .map_err(to_graph_error)?
            .into_iter()
            .map(|t| t.oid)
            .collect();

        let mut removed = 0;
        for taint_oid in taint_oids {
            let edge = crate::model::PLUSEdge::new(taint_oid, obj.to_string(), EdgeKind::Marks, None);
            if store.delete_edge(&edge).map_err(to_graph_error)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// `getAllTaintSources(obj, user)`: every taint object reachable
    /// upstream of `obj` that is visible to `user`, via a backward
    /// traversal restricted to taint-kinded nodes (spec §8 property 7).
    pub fn get_all_taint_sources(&self, obj: &str, user: &User) -> GraphResult<Vec<PLUSObject>> {
        taint_sources(&self.lock()?, obj, &user.privileges).map_err(to_graph_error)
    }

    /// `search(term, max, user)`: objects whose name or metadata
    /// contains `term` (case-insensitive substring), surrogate-filtered
    /// for `user`, up to `max` (spec §3 invariant 7, §6).
    pub fn search(&self, term: &str, max: i64, user: &User) -> GraphResult<Vec<PLUSObject>> {
        if term.trim().is_empty() {
            return Err(GraphError::InvalidArgument("search term must not be empty".to_string()));
        }
        let limit = clamp_signed_limit(max, DEFAULT_QUERY_LIMIT);
        let needle = term.to_lowercase();
        let store = self.lock()?;
        let mut hits: Vec<PLUSObject> = store
            .graph()
            .node_indices()
            .filter_map(|idx| store.hydrate_object_at(idx).ok())
            .filter(|o| {
                o.name.to_lowercase().contains(&needle)
                    || o.metadata.values().any(|v| v.to_lowercase().contains(&needle))
            })
            .filter_map(|o| privilege::version_suitable_for(&store, &o, &user.privileges).transpose())
            .collect::<Result<_, _>>()
            .map_err(to_graph_error)?;
        hits.truncate(limit);
        Ok(hits)
    }

    /// `query(textual-query, user)`: a thin stand-in for the kernel's
    /// parameterized pattern-query primitive (spec §4.2, §6). Accepts
    /// space-separated `key:value` tokens matched against first-class
    /// properties and metadata; a bare token matches the object name.
    /// Every hit is surrogate-filtered for `user` before returning (spec
    /// §3 invariant 7). Limited to [`DEFAULT_QUERY_LIMIT`] results.
    pub fn query(&self, textual_query: &str, user: &User) -> GraphResult<Vec<PLUSObject>> {
        let store = self.lock()?;
        let clauses: Vec<(Option<&str>, &str)> = textual_query
            .split_whitespace()
            .map(|token| match token.split_once(':') {
                Some((k, v)) => (Some(k), v),
                None => (None, token),
            })
            .collect();
        if clauses.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<PLUSObject> = store
            .graph()
            .node_indices()
            .filter_map(|idx| store.hydrate_object_at(idx).ok())
            .filter(|o| clauses.iter().all(|(key, value)| matches_clause(o, *key, value)))
            .filter_map(|o| privilege::version_suitable_for(&store, &o, &user.privileges).transpose())
            .collect::<Result<_, _>>()
            .map_err(to_graph_error)?;
        hits.truncate(clamp_limit(store.config().query_limit, DEFAULT_QUERY_LIMIT));
        Ok(hits)
    }
}

fn taint_sources(store: &GraphStore, obj: &str, viewer_privileges: &HashSet<String>) -> anyhow::Result<Vec<PLUSObject>> {
    let settings = TraversalSettings {
        forward: false,
        backward: true,
        include_edges: false,
        ..TraversalSettings::default()
    };
    let dag = traversal::traverse(store, obj, viewer_privileges, &settings)?;
    Ok(dag
        .nodes()
        .filter(|o| matches!(o.kind, ObjectKind::Data(DataSubtype::Taint)))
        .cloned()
        .collect())
}

fn matches_clause(object: &PLUSObject, key: Option<&str>, value: &str) -> bool {
    let needle = value.to_lowercase();
    match key {
        Some("name") => object.name.to_lowercase().contains(&needle),
        Some("type") => object.kind.type_str().eq_ignore_ascii_case(value),
        Some("subtype") => object.kind.subtype_str().eq_ignore_ascii_case(value),
        Some("oid") => object.oid == value,
        Some(metadata_key) => object
            .metadata
            .get(metadata_key)
            .is_some_and(|v| v.to_lowercase().contains(&needle)),
        None => object.name.to_lowercase().contains(&needle),
    }
}

fn to_graph_error(err: anyhow::Error) -> GraphError {
    let message = err.to_string();
    if message.contains("not found") || message.contains("not-found") {
        GraphError::NotFound(message)
    } else if message.contains("dangling") {
        GraphError::DanglingEdge(message)
    } else if message.contains("already exists") {
        GraphError::ConstraintViolation(message)
    } else {
        warn!("storage failure: {message}");
        GraphError::storage(err)
    }
}

fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc() - time::OffsetDateTime::UNIX_EPOCH).whole_milliseconds() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PLUSEdge;
    use crate::store::test_util::temp_store;

    fn client_over(store: GraphStore) -> Client {
        Client::new(Arc::new(Mutex::new(store)))
    }

    fn obj(oid: &str, name: &str) -> PLUSObject {
        PLUSObject::new(oid, ObjectKind::Data(DataSubtype::Generic), name, 0)
    }

    #[test]
    fn report_then_get_graph_round_trips_scenario_s1() -> GraphResult<()> {
        let (store, _dir) = temp_store();
        let client = client_over(store);

        let mut collection = ProvenanceCollection::new();
        collection.add_node(obj("plus:o1", "O1"));
        collection.add_node(obj("plus:o2", "O2"));
        collection.add_node(obj("plus:o3", "O3"));
        collection.add_edge(PLUSEdge::new("plus:o1", "plus:o2", EdgeKind::InputTo, None));
        collection.add_edge(PLUSEdge::new("plus:o2", "plus:o3", EdgeKind::Generated, None));
        client.report(&collection)?;

        assert!(client.exists("plus:o1")?);
        assert!(client.exists("plus:o2")?);
        assert!(client.exists("plus:o3")?);

        let settings = TraversalSettings {
            n: 10,
            forward: true,
            backward: false,
            ..TraversalSettings::default()
        };
        let dag = client.get_graph("plus:o1", &settings, &User::public())?;
        assert_eq!(dag.node_oids(), HashSet::from(["plus:o1".to_string(), "plus:o2".to_string(), "plus:o3".to_string()]));
        Ok(())
    }

    #[test]
    fn backward_traversal_tags_head_and_foot_scenario_s2() -> GraphResult<()> {
        let (store, _dir) = temp_store();
        let client = client_over(store);
        let mut collection = ProvenanceCollection::new();
        collection.add_node(obj("plus:o1", "O1"));
        collection.add_node(obj("plus:o2", "O2"));
        collection.add_node(obj("plus:o3", "O3"));
        collection.add_edge(PLUSEdge::new("plus:o1", "plus:o2", EdgeKind::InputTo, None));
        collection.add_edge(PLUSEdge::new("plus:o2", "plus:o3", EdgeKind::Generated, None));
        client.report(&collection)?;

        let settings = TraversalSettings {
            n: 10,
            forward: false,
            backward: true,
            ..TraversalSettings::default()
        };
        let dag = client.get_graph("plus:o3", &settings, &User::public())?;
        assert_eq!(dag.get_tag("plus:o1", "head"), Some("true"));
        assert_eq!(dag.get_tag("plus:o3", "foot"), Some("true"));
        Ok(())
    }

    #[test]
    fn taint_then_remove_taints_scenario_s3_and_property_7() -> GraphResult<()> {
        let (store, _dir) = temp_store();
        let client = client_over(store);
        client.report(&{
            let mut c = ProvenanceCollection::new();
            c.add_node(obj("plus:o1", "O1"));
            c
        })?;

        let taint = client.taint("plus:o1", &User::god(), "bad")?;
        let sources = client.get_all_taint_sources("plus:o1", &User::god())?;
        assert!(sources.iter().any(|o| o.oid == taint.oid));

        client.remove_taints("plus:o1")?;
        let sources = client.get_all_taint_sources("plus:o1", &User::god())?;
        assert!(sources.is_empty());
        Ok(())
    }

    #[test]
    fn privileged_object_is_hidden_from_public_viewer_scenario_s4() -> GraphResult<()> {
        let (store, _dir) = temp_store();
        let client = client_over(store);
        let mut secret = obj("plus:secret", "classified");
        secret.privileges.insert("NATIONAL_SECURITY".to_string());
        let mut collection = ProvenanceCollection::new();
        collection.add_node(secret.clone());
        collection.add_node(obj("plus:public", "open"));
        collection.add_edge(PLUSEdge::new("plus:secret", "plus:public", EdgeKind::InputTo, None));
        client.report(&collection)?;

        let settings = TraversalSettings { n: 10, ..TraversalSettings::default() };
        let dag = client.get_graph("plus:secret", &settings, &User::public())?;
        let seen = dag.get_node("plus:secret").unwrap();
        assert_ne!(seen.name, secret.name);
        Ok(())
    }

    #[test]
    fn query_matches_key_value_clauses() -> GraphResult<()> {
        let (store, _dir) = temp_store();
        let client = client_over(store);
        let mut object = obj("plus:o1", "readme");
        object.metadata.insert("source".to_string(), "crawler".to_string());
        let mut collection = ProvenanceCollection::new();
        collection.add_node(object);
        client.report(&collection)?;

        let hits = client.query("source:crawler", &User::public())?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].oid, "plus:o1");
        Ok(())
    }

    #[test]
    fn search_and_query_surrogate_filter_hits_for_public_viewer() -> GraphResult<()> {
        let (store, _dir) = temp_store();
        let client = client_over(store);
        let mut secret = obj("plus:secret", "classified-report");
        secret.privileges.insert("NATIONAL_SECURITY".to_string());
        let mut collection = ProvenanceCollection::new();
        collection.add_node(secret.clone());
        client.report(&collection)?;

        let hits = client.search("classified", 10, &User::public())?;
        assert_eq!(hits.len(), 1);
        assert_ne!(hits[0].name, secret.name);

        let hits = client.search("classified", 10, &User::god())?;
        assert_eq!(hits[0].name, secret.name);
        Ok(())
    }

    #[test]
    fn list_workflows_and_members_surrogate_filter_for_public_viewer() -> GraphResult<()> {
        let (store, _dir) = temp_store();
        let client = client_over(store);
        let mut workflow = PLUSObject::new("plus:wf", ObjectKind::Workflow, "classified-workflow", 0);
        workflow.privileges.insert("NATIONAL_SECURITY".to_string());
        let member = obj("plus:m1", "member");
        let mut collection = ProvenanceCollection::new();
        collection.add_node(workflow.clone());
        collection.add_node(member.clone());
        collection.add_edge(PLUSEdge::new(
            "plus:wf",
            "plus:m1",
            EdgeKind::InputTo,
            Some("plus:wf".to_string()),
        ));
        client.report(&collection)?;

        let workflows = client.list_workflows(10, &User::public())?;
        assert_eq!(workflows.len(), 1);
        assert_ne!(workflows[0].name, workflow.name);

        let members = client.get_workflow_members("plus:wf", 10, &User::public())?;
        assert_eq!(members.len(), 1);
        assert_ne!(members[0].1.name, workflow.name);
        assert_eq!(members[0].2.name, member.name);
        Ok(())
    }
}
