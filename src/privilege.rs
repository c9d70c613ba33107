//! Privilege engine (component C5): the dominance lattice and the
//! surrogate view filter (spec §4.5).

use std::collections::HashSet;

use anyhow::Result;

use crate::config::DOMINANCE_PATH_BOUND;
use crate::model::privilege::ADMIN;
use crate::model::{DataSubtype, ObjectKind, PLUSObject};
use crate::store::graph::RelType;
use crate::store::GraphStore;

/// `dominates(a, b)` (spec §4.5): true if `a == b`, or `a == ADMIN`, or
/// the bounded transitive-closure path `(a) -[dominates]*1..100-> (b)`
/// has at least one result.
pub fn dominates(store: &GraphStore, a: &str, b: &str) -> Result<bool> {
    if a == b || a == ADMIN {
        return Ok(true);
    }
    let (Some(from), Some(to)) = (store.graph().pid_index(&pid_for(a)), store.graph().pid_index(&pid_for(b))) else {
        return Ok(false);
    };
    Ok(store.graph().reachable_within(from, to, DOMINANCE_PATH_BOUND, |edge| {
        edge.rel_type == RelType::Dominates
    }))
}

fn pid_for(name: &str) -> String {
    crate::model::PrivilegeClass::new(name).pid
}

/// Whether `viewer_privileges` (the set of privilege-class names a
/// viewer's clearance directly grants) dominates every class in
/// `required` (the privilege set controlling an object). An object
/// with no declared privileges is unrestricted.
pub fn dominates_all(store: &GraphStore, viewer_privileges: &HashSet<String>, required: &HashSet<String>) -> Result<bool> {
    for req in required {
        let mut satisfied = false;
        for granted in viewer_privileges {
            if dominates(store, granted, req)? {
                satisfied = true;
                break;
            }
        }
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The surrogate view filter (spec §4.5): given a hydrated object and a
/// viewer's granted privilege-class names, return either the object
/// itself, a redacted surrogate, or `None` if the viewer is entirely
/// unauthorized. Every object reaching a viewer goes through this
/// function (spec §3 invariant 7).
pub fn version_suitable_for(
    store: &GraphStore,
    object: &PLUSObject,
    viewer_privileges: &HashSet<String>,
) -> Result<Option<PLUSObject>> {
    if dominates_all(store, viewer_privileges, &object.privileges)? {
        return Ok(Some(object.clone()));
    }
    Ok(derive_surrogate(object))
}

/// The surrogate-generation policy: domain code attached to each
/// object's subtype (spec §4.5, left as an open question, resolved in
/// DESIGN.md). Taint markers have no safe surrogate and are hidden
/// entirely rather than partially shown; everything else is reduced to
/// its identity and type with metadata and ownership stripped.
pub fn derive_surrogate(object: &PLUSObject) -> Option<PLUSObject> {
    if matches!(object.kind, ObjectKind::Data(DataSubtype::Taint)) {
        return None;
    }

    let mut surrogate = PLUSObject::new(
        object.oid.clone(),
        object.kind,
        "[redacted]".to_string(),
        object.created,
    );
    surrogate.privileges = object.privileges.clone();
    surrogate.heritable = object.heritable;
    Some(surrogate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema;
    use crate::store::test_util::temp_store;

    fn viewer_with(name: &str) -> HashSet<String> {
        HashSet::from([name.to_string()])
    }

    #[test]
    fn admin_dominates_everything() {
        let (store, _dir) = temp_store();
        for name in schema::bootstrap_privilege_classes() {
            assert!(dominates(&store, ADMIN, name).unwrap());
        }
    }

    #[test]
    fn every_class_dominates_itself() {
        let (store, _dir) = temp_store();
        for name in schema::bootstrap_privilege_classes() {
            assert!(dominates(&store, name, name).unwrap());
        }
    }

    #[test]
    fn public_does_not_dominate_admin() {
        let (store, _dir) = temp_store();
        assert!(!dominates(&store, "PUBLIC", ADMIN).unwrap());
    }

    #[test]
    fn national_security_dominates_public_transitively() {
        let (store, _dir) = temp_store();
        assert!(dominates(&store, "NATIONAL_SECURITY", "PUBLIC").unwrap());
    }

    #[test]
    fn object_with_no_privileges_is_unrestricted() {
        let (store, _dir) = temp_store();
        let object = PLUSObject::new("plus:1", ObjectKind::Data(DataSubtype::Generic), "x", 0);
        let viewer = viewer_with("PUBLIC");
        let seen = version_suitable_for(&store, &object, &viewer).unwrap();
        assert_eq!(seen, Some(object));
    }

    #[test]
    fn underprivileged_viewer_gets_surrogate_or_nothing() {
        let (store, _dir) = temp_store();
        let mut object = PLUSObject::new("plus:secret", ObjectKind::Data(DataSubtype::Generic), "secret-name", 0);
        object.privileges.insert("NATIONAL_SECURITY".to_string());

        let viewer = viewer_with("PUBLIC");
        let seen = version_suitable_for(&store, &object, &viewer).unwrap().unwrap();
        assert_ne!(seen.name, object.name);
        assert_eq!(seen.oid, object.oid);

        let mut taint = PLUSObject::new("plus:taint", ObjectKind::Data(DataSubtype::Taint), "taint", 0);
        taint.privileges.insert("NATIONAL_SECURITY".to_string());
        assert_eq!(version_suitable_for(&store, &taint, &viewer).unwrap(), None);
    }
}
