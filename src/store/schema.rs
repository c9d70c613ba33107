//! Schema & storage (component C3): labels, relationship types, and
//! the one-time bootstrap sequence (spec §4.3).

use crate::model::privilege;
use crate::oid::oid_from_seed;

/// OID of the default workflow, also used as the bootstrap sentinel:
/// bootstrap runs whenever this OID is absent from the store (spec
/// §4.3).
pub fn default_workflow_oid() -> String {
    oid_from_seed("default-workflow")
}

/// OID of the "unknown activity" bootstrap entity.
pub fn unknown_activity_oid() -> String {
    oid_from_seed("unknown-activity")
}

/// AID of the built-in `GOD` user (ADMIN-privileged, spec §4.3).
pub const GOD_AID: &str = "actor:GOD";
/// AID of the built-in `PUBLIC` user (PUBLIC-privileged, spec §4.3).
pub const PUBLIC_USER_AID: &str = "actor:PUBLIC";

/// Every privilege class name created at bootstrap (spec §4.3).
pub fn bootstrap_privilege_classes() -> Vec<&'static str> {
    privilege::bootstrap_class_names()
}

/// The bootstrap `dominates` edges (spec §4.3).
pub fn bootstrap_dominance_edges() -> Vec<(&'static str, &'static str)> {
    privilege::bootstrap_dominance_edges()
}
