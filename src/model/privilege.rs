//! PrivilegeClass: a named node in the privilege lattice (spec §3, §4.3).

/// A node in the privilege-class lattice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PrivilegeClass {
    /// Unique privilege-class identifier.
    pub pid: String,
    /// Human-readable name (also the identity used for uniqueness and
    /// for lattice bootstrap edges, spec §4.3).
    pub name: String,
}

impl PrivilegeClass {
    /// Build a privilege class whose `pid` is derived from its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        PrivilegeClass {
            pid: format!("priv:{name}"),
            name,
        }
    }
}

/// The lattice top: dominates every class (spec §3 invariant 4).
pub const ADMIN: &str = "ADMIN";
/// The lattice bottom: dominated by every class.
pub const PUBLIC: &str = "PUBLIC";
/// Bootstrap lattice class (spec §4.3).
pub const NATIONAL_SECURITY: &str = "NATIONAL_SECURITY";
/// Bootstrap lattice class (spec §4.3).
pub const EMERGENCY_HIGH: &str = "EMERGENCY_HIGH";
/// Bootstrap lattice class (spec §4.3).
pub const EMERGENCY_LOW: &str = "EMERGENCY_LOW";
/// Bootstrap lattice class (spec §4.3).
pub const PRIVATE_MEDICAL: &str = "PRIVATE_MEDICAL";

/// The bootstrap `dominates` edges from spec §4.3, as `(dominator,
/// dominated)` name pairs. Includes the named lattice plus the 10-level
/// numeric chain `L10 ⊲ L9 ⊲ … ⊲ L1`.
pub fn bootstrap_dominance_edges() -> Vec<(&'static str, &'static str)> {
    let mut edges = vec![
        (ADMIN, NATIONAL_SECURITY),
        (NATIONAL_SECURITY, EMERGENCY_HIGH),
        (EMERGENCY_HIGH, EMERGENCY_LOW),
        (ADMIN, PRIVATE_MEDICAL),
        (PRIVATE_MEDICAL, PUBLIC),
        (EMERGENCY_LOW, PUBLIC),
        (NATIONAL_SECURITY, PUBLIC),
    ];
    const NUMERIC_CHAIN: [&str; 10] = [
        "L10", "L9", "L8", "L7", "L6", "L5", "L4", "L3", "L2", "L1",
    ];
    for pair in NUMERIC_CHAIN.windows(2) {
        edges.push((pair[0], pair[1]));
    }
    edges
}

/// Every privilege-class name the bootstrap sequence creates, derived
/// from [`bootstrap_dominance_edges`] so the two can never drift apart.
pub fn bootstrap_class_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = bootstrap_dominance_edges()
        .into_iter()
        .flat_map(|(a, b)| [a, b])
        .collect();
    names.sort();
    names.dedup();
    names
}
