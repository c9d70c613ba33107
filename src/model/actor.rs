//! PLUSActor: an agent (user, system, service) — spec §3.

/// The kind of actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ActorType {
    /// A locally-registered human user.
    User,
    /// A user authenticated via an external OpenID provider.
    OpenIdUser,
    /// A non-human actor (a service, a system process).
    Actor,
}

/// An agent that can own objects and act as a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PLUSActor {
    /// Unique actor identifier.
    pub aid: String,
    /// Display/lookup name.
    pub name: String,
    /// The actor's kind.
    pub actor_type: ActorType,
    /// Optional display name, distinct from `name` (e.g. "Jane Doe" vs.
    /// a login handle), populated for OIDC-style actors.
    pub display_name: Option<String>,
    /// Optional email, populated for OIDC-style actors.
    pub email: Option<String>,
}

impl PLUSActor {
    /// Build a bare system/service actor with no auth metadata.
    pub fn new(aid: impl Into<String>, name: impl Into<String>, actor_type: ActorType) -> Self {
        PLUSActor {
            aid: aid.into(),
            name: name.into(),
            actor_type,
            display_name: None,
            email: None,
        }
    }
}

/// The privilege-lattice top: dominates every class (spec §3 invariant
/// 4, §4.3 bootstrap).
pub const ADMIN_AID: &str = "actor:GOD";
/// The well-known public/anonymous actor, bound to the `PUBLIC`
/// privilege class at bootstrap.
pub const PUBLIC_AID: &str = "actor:PUBLIC";
