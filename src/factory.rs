//! Object factory (component C4).
//!
//! Polymorphic hydration from the kernel's raw node/relationship
//! records into the typed domain model (spec §4.4). Population order
//! inside one transaction, per spec: (a) first-class properties via
//! the codec, (b) metadata with the `metadata:` prefix stripped, (c)
//! owner from the inbound `owns` edge, (d) privilege set from outbound
//! `controlledBy` edges. Those last two are supplied by the caller
//! (`crate::store`), which is the component that actually walks the
//! relationships; this module only knows how to turn property sets
//! into typed values.

use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};

use crate::codec::{decode_metadata, PropertySet, PropertyValue};
use crate::model::{
    ActorType, DataSubtype, EdgeKind, NonProvenanceEdge, NpeTarget, ObjectKind, PLUSActor,
    PLUSEdge, PLUSObject, PrivilegeClass,
};

fn get_str(properties: &PropertySet, key: &str) -> Result<String> {
    match properties.get(key) {
        Some(PropertyValue::Str(s)) => Ok(s.clone()),
        Some(other) => Err(anyhow!("property {key} has unexpected shape: {other:?}")),
        None => Err(anyhow!("missing required property: {key}")),
    }
}

fn get_str_opt(properties: &PropertySet, key: &str) -> Option<String> {
    match properties.get(key) {
        Some(PropertyValue::Str(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn get_i64(properties: &PropertySet, key: &str) -> Result<i64> {
    match properties.get(key) {
        Some(PropertyValue::Int(i)) => Ok(*i),
        other => Err(anyhow!("property {key} is not an integer: {other:?}")),
    }
}

fn get_bool(properties: &PropertySet, key: &str, default: bool) -> bool {
    match properties.get(key) {
        Some(PropertyValue::Bool(b)) => *b,
        _ => default,
    }
}

/// Hydrate a `Provenance`-labeled node's properties into a
/// [`PLUSObject`], dispatching on `(type, subtype)` (spec §4.4).
/// `owner` and `privileges` are supplied by the caller, which is
/// responsible for walking the `owns`/`controlledBy` relationships.
pub fn hydrate_object(
    properties: &PropertySet,
    owner: Option<PLUSActor>,
    privileges: HashSet<String>,
) -> Result<PLUSObject> {
    let oid = get_str(properties, "oid").context("hydrating object")?;
    let object_type = get_str(properties, "type").context("hydrating object")?;
    let subtype = get_str(properties, "subtype").context("hydrating object")?;
    let name = get_str(properties, "name").context("hydrating object")?;
    let created = get_i64(properties, "created").context("hydrating object")?;
    let heritable = get_bool(properties, "heritable", true);

    Ok(PLUSObject {
        oid,
        kind: ObjectKind::from_type_subtype(&object_type, &subtype),
        name,
        created,
        metadata: decode_metadata(properties),
        heritable,
        owner,
        privileges,
    })
}

/// Encode a [`PLUSObject`] into the property set the kernel stores
/// (the write-side counterpart of [`hydrate_object`]).
pub fn encode_object(object: &PLUSObject) -> PropertySet {
    let mut properties = PropertySet::new();
    properties.insert("oid".to_string(), PropertyValue::Str(object.oid.clone()));
    properties.insert(
        "type".to_string(),
        PropertyValue::Str(object.kind.type_str().to_string()),
    );
    properties.insert(
        "subtype".to_string(),
        PropertyValue::Str(object.kind.subtype_str().to_string()),
    );
    properties.insert("name".to_string(), PropertyValue::Str(object.name.clone()));
    properties.insert("created".to_string(), PropertyValue::Int(object.created));
    properties.insert("heritable".to_string(), PropertyValue::Bool(object.heritable));
    properties.extend(crate::codec::encode_metadata(&object.metadata));
    properties
}

/// Hydrate an `Actor`-labeled node's properties into a [`PLUSActor`].
pub fn hydrate_actor(properties: &PropertySet) -> Result<PLUSActor> {
    let aid = get_str(properties, "aid").context("hydrating actor")?;
    let name = get_str(properties, "name").context("hydrating actor")?;
    let actor_type = match get_str(properties, "type").context("hydrating actor")?.as_str() {
        "user" => ActorType::User,
        "openid-user" => ActorType::OpenIdUser,
        _ => ActorType::Actor,
    };
    Ok(PLUSActor {
        aid,
        name,
        actor_type,
        display_name: get_str_opt(properties, "displayName"),
        email: get_str_opt(properties, "email"),
    })
}

/// Encode a [`PLUSActor`] into the property set the kernel stores.
pub fn encode_actor(actor: &PLUSActor) -> PropertySet {
    let mut properties = PropertySet::new();
    properties.insert("aid".to_string(), PropertyValue::Str(actor.aid.clone()));
    properties.insert("name".to_string(), PropertyValue::Str(actor.name.clone()));
    let type_str = match actor.actor_type {
        ActorType::User => "user",
        ActorType::OpenIdUser => "openid-user",
        ActorType::Actor => "actor",
    };
    properties.insert("type".to_string(), PropertyValue::Str(type_str.to_string()));
    if let Some(d) = &actor.display_name {
        properties.insert("displayName".to_string(), PropertyValue::Str(d.clone()));
    }
    if let Some(e) = &actor.email {
        properties.insert("email".to_string(), PropertyValue::Str(e.clone()));
    }
    properties
}

/// Hydrate a `PrivilegeClass`-labeled node's properties.
pub fn hydrate_privilege_class(properties: &PropertySet) -> Result<PrivilegeClass> {
    Ok(PrivilegeClass {
        pid: get_str(properties, "pid").context("hydrating privilege class")?,
        name: get_str(properties, "name").context("hydrating privilege class")?,
    })
}

/// Encode a [`PrivilegeClass`] into the property set the kernel stores.
pub fn encode_privilege_class(class: &PrivilegeClass) -> PropertySet {
    let mut properties = PropertySet::new();
    properties.insert("pid".to_string(), PropertyValue::Str(class.pid.clone()));
    properties.insert("name".to_string(), PropertyValue::Str(class.name.clone()));
    properties
}

/// Hydrate a provenance relationship into a [`PLUSEdge`]. `workflow`
/// resolves the edge's `workflow` property; the well-known default
/// workflow OID is recognized by the caller (spec §4.4).
pub fn hydrate_edge(
    properties: &PropertySet,
    edge_type: EdgeKind,
    from_oid: &str,
    to_oid: &str,
) -> PLUSEdge {
    let workflow = get_str_opt(properties, "workflow");
    PLUSEdge::new(from_oid, to_oid, edge_type, workflow)
}

/// Encode a [`PLUSEdge`]'s properties (its endpoints/type are carried
/// by the kernel relationship itself, not the property set).
pub fn encode_edge_properties(edge: &PLUSEdge) -> PropertySet {
    let mut properties = PropertySet::new();
    if let Some(workflow) = &edge.workflow {
        properties.insert("workflow".to_string(), PropertyValue::Str(workflow.clone()));
    }
    properties
}

/// Hydrate an NPE relationship into a [`NonProvenanceEdge`]. `to`
/// reflects whether the kernel resolved the destination to a
/// `Provenance` node or a `NonProvenance` node.
pub fn hydrate_npe(properties: &PropertySet, from_oid: &str, to: NpeTarget) -> Result<NonProvenanceEdge> {
    Ok(NonProvenanceEdge {
        npeid: get_str(properties, "npeid").context("hydrating NPE")?,
        from: from_oid.to_string(),
        to,
        edge_type: get_str(properties, "type").context("hydrating NPE")?,
        created: get_i64(properties, "created").context("hydrating NPE")?,
    })
}

/// Encode an [`NonProvenanceEdge`]'s properties.
pub fn encode_npe_properties(npe: &NonProvenanceEdge) -> PropertySet {
    let mut properties = PropertySet::new();
    properties.insert("npeid".to_string(), PropertyValue::Str(npe.npeid.clone()));
    properties.insert("type".to_string(), PropertyValue::Str(npe.edge_type.clone()));
    properties.insert("created".to_string(), PropertyValue::Int(npe.created));
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn object_round_trips_through_encode_hydrate() -> Result<()> {
        let mut object = PLUSObject::new(
            "plus:1",
            ObjectKind::Data(DataSubtype::File),
            "input.csv",
            1_700_000_000_000,
        );
        object.metadata.insert("source".to_string(), "crawler".to_string());

        let properties = encode_object(&object);
        let hydrated = hydrate_object(&properties, None, HashSet::new())?;

        assert_eq!(hydrated.oid, object.oid);
        assert_eq!(hydrated.kind, object.kind);
        assert_eq!(hydrated.name, object.name);
        assert_eq!(hydrated.created, object.created);
        assert_eq!(hydrated.metadata, object.metadata);
        Ok(())
    }

    #[test]
    fn unrecognized_subtype_falls_back_to_generic() -> Result<()> {
        let mut properties = PropertySet::new();
        properties.insert("oid".to_string(), PropertyValue::Str("plus:1".to_string()));
        properties.insert("type".to_string(), PropertyValue::Str("data".to_string()));
        properties.insert(
            "subtype".to_string(),
            PropertyValue::Str("not-a-real-subtype".to_string()),
        );
        properties.insert("name".to_string(), PropertyValue::Str("thing".to_string()));
        properties.insert("created".to_string(), PropertyValue::Int(0));

        let hydrated = hydrate_object(&properties, None, HashSet::new())?;
        assert_eq!(hydrated.kind, ObjectKind::Data(DataSubtype::Generic));
        Ok(())
    }
}
