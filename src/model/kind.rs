//! Tagged-variant domain model for object type/subtype (spec §9 design
//! notes: replaces the source's string `type`/`subtype` dispatch).

/// The four top-level object types from spec §3, with `Data` carrying
/// the finer-grained subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ObjectKind {
    /// A data artifact, refined by [`DataSubtype`].
    Data(DataSubtype),
    /// An activity that consumed and/or produced data.
    Activity,
    /// A named grouping of activities/invocations.
    Workflow,
    /// A single run of a workflow/activity.
    Invocation,
}

/// Refinements of [`ObjectKind::Data`] (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DataSubtype {
    /// No more specific subtype applies.
    Generic,
    /// A string literal value.
    StringLiteral,
    /// A file on a filesystem.
    File,
    /// An image file.
    FileImage,
    /// A URL-addressed resource.
    Url,
    /// A relational-database record or table.
    Relational,
    /// A taint marker object (spec glossary: "Taint").
    Taint,
}

impl ObjectKind {
    /// The `type` string as stored/reported (spec §3).
    pub fn type_str(&self) -> &'static str {
        match self {
            ObjectKind::Data(_) => "data",
            ObjectKind::Activity => "activity",
            ObjectKind::Workflow => "workflow",
            ObjectKind::Invocation => "invocation",
        }
    }

    /// The `subtype` string as stored/reported (spec §3).
    pub fn subtype_str(&self) -> &'static str {
        match self {
            ObjectKind::Data(DataSubtype::Generic) => "generic",
            ObjectKind::Data(DataSubtype::StringLiteral) => "string",
            ObjectKind::Data(DataSubtype::File) => "file",
            ObjectKind::Data(DataSubtype::FileImage) => "file-image",
            ObjectKind::Data(DataSubtype::Url) => "url",
            ObjectKind::Data(DataSubtype::Relational) => "relational",
            ObjectKind::Data(DataSubtype::Taint) => "taint",
            ObjectKind::Activity => "activity",
            ObjectKind::Workflow => "workflow",
            ObjectKind::Invocation => "invocation",
        }
    }

    /// Dispatch a stored `(type, subtype)` string pair to the matching
    /// variant, falling back to `Data(Generic)` when nothing matches
    /// (spec §4.4: "falls back to the generic data-object shape when no
    /// match is found").
    pub fn from_type_subtype(object_type: &str, subtype: &str) -> ObjectKind {
        match (object_type, subtype) {
            ("activity", _) => ObjectKind::Activity,
            ("workflow", _) => ObjectKind::Workflow,
            ("invocation", _) => ObjectKind::Invocation,
            ("data", "string") => ObjectKind::Data(DataSubtype::StringLiteral),
            ("data", "file") => ObjectKind::Data(DataSubtype::File),
            ("data", "file-image") => ObjectKind::Data(DataSubtype::FileImage),
            ("data", "url") => ObjectKind::Data(DataSubtype::Url),
            ("data", "relational") => ObjectKind::Data(DataSubtype::Relational),
            ("data", "taint") => ObjectKind::Data(DataSubtype::Taint),
            _ => ObjectKind::Data(DataSubtype::Generic),
        }
    }

    /// Whether this object is a taint marker (spec glossary, §4.7 pass 2).
    pub fn is_taint(&self) -> bool {
        matches!(self, ObjectKind::Data(DataSubtype::Taint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for kind in [
            ObjectKind::Data(DataSubtype::Generic),
            ObjectKind::Data(DataSubtype::File),
            ObjectKind::Data(DataSubtype::Taint),
            ObjectKind::Activity,
            ObjectKind::Workflow,
            ObjectKind::Invocation,
        ] {
            let roundtripped = ObjectKind::from_type_subtype(kind.type_str(), kind.subtype_str());
            assert_eq!(roundtripped, kind);
        }
    }

    #[test]
    fn unknown_subtype_falls_back_to_generic_data() {
        assert_eq!(
            ObjectKind::from_type_subtype("data", "something-unrecognized"),
            ObjectKind::Data(DataSubtype::Generic)
        );
    }
}
