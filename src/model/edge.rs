//! PLUSEdge: a typed directed provenance relation (spec §3).

/// The provenance relation types (spec §3). Distinct from
/// `store::schema`'s kernel relationship types, which also include
/// non-provenance relationship types like `owns`/`controlledBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EdgeKind {
    /// `from` was consumed as input by `to`.
    InputTo,
    /// `from` contributed to `to` without being a direct input.
    Contributed,
    /// `from` marks `to` (e.g. a taint object marking a downstream object).
    Marks,
    /// `from` generated `to`.
    Generated,
    /// `from` triggered `to` (e.g. an invocation triggering another).
    Triggered,
    /// No more specific relation applies.
    Unspecified,
}

impl EdgeKind {
    /// Parse the wire/storage string form. Spec §4.3 lists the six
    /// relationship-type strings verbatim.
    pub fn from_str_opt(s: &str) -> Option<EdgeKind> {
        Some(match s {
            "input-to" => EdgeKind::InputTo,
            "contributed" => EdgeKind::Contributed,
            "marks" => EdgeKind::Marks,
            "generated" => EdgeKind::Generated,
            "triggered" => EdgeKind::Triggered,
            "unspecified" => EdgeKind::Unspecified,
            _ => return None,
        })
    }

    /// The storage/wire string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::InputTo => "input-to",
            EdgeKind::Contributed => "contributed",
            EdgeKind::Marks => "marks",
            EdgeKind::Generated => "generated",
            EdgeKind::Triggered => "triggered",
            EdgeKind::Unspecified => "unspecified",
        }
    }
}

/// A typed directed provenance relation between two [`super::PLUSObject`]s.
/// Identified by `(from, to, type, workflow)` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PLUSEdge {
    /// OID of the source object.
    pub from: String,
    /// OID of the destination object.
    pub to: String,
    /// The relation type.
    pub edge_type: EdgeKind,
    /// OID of the workflow this edge was recorded under, if any.
    pub workflow: Option<String>,
}

impl PLUSEdge {
    /// Construct a new edge.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        edge_type: EdgeKind,
        workflow: Option<String>,
    ) -> Self {
        PLUSEdge {
            from: from.into(),
            to: to.into(),
            edge_type,
            workflow,
        }
    }

    /// Whether this edge matches the given `(from, to, type, workflow)`
    /// tuple for delete purposes, treating `None == None` for workflow
    /// (spec §4.3 delete operations: "tolerating both `null == null`").
    pub fn matches(
        &self,
        from: &str,
        to: &str,
        edge_type: EdgeKind,
        workflow: Option<&str>,
    ) -> bool {
        self.from == from
            && self.to == to
            && self.edge_type == edge_type
            && self.workflow.as_deref() == workflow
    }
}
