//! Property codec (component C1).
//!
//! Converts domain attribute values into the storage-safe encoding the
//! graph kernel persists, and back. Metadata keys are namespaced with
//! [`METADATA_PREFIX`] on the way in and stripped on the way out so that
//! user-supplied metadata can never collide with a first-class property
//! (spec §4.1).

use std::collections::{HashMap, HashSet};

/// Prefix applied to user metadata keys before they enter a node's
/// property set.
pub const METADATA_PREFIX: &str = "metadata:";

/// A storage-safe encoding of a single attribute value. The graph
/// kernel (component C2) only ever sees values in this shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PropertyValue {
    /// A scalar string (also used for booleans/integers rendered as
    /// strings, and for `null`, which encodes to `""`).
    Str(String),
    /// An integer/long scalar.
    Int(i64),
    /// A boolean scalar.
    Bool(bool),
    /// An array of strings, produced from any iterable of encodable
    /// values (e.g. a privilege set, a list of tags).
    StrArray(Vec<String>),
}

/// A node or relationship's full property set, as the kernel stores it.
pub type PropertySet = HashMap<String, PropertyValue>;

/// Trait for anything that can be lowered into a [`PropertyValue`].
/// Mirrors spec §4.1's recursive conversion rules.
pub trait Encode {
    /// Lower `self` into a storage-safe property value.
    fn encode(&self) -> PropertyValue;
}

impl Encode for String {
    fn encode(&self) -> PropertyValue {
        PropertyValue::Str(self.clone())
    }
}

impl Encode for &str {
    fn encode(&self) -> PropertyValue {
        PropertyValue::Str(self.to_string())
    }
}

impl Encode for i64 {
    fn encode(&self) -> PropertyValue {
        PropertyValue::Int(*self)
    }
}

impl Encode for bool {
    fn encode(&self) -> PropertyValue {
        PropertyValue::Bool(*self)
    }
}

impl<T: Encode> Encode for Option<T> {
    /// `null` encodes to the empty string (spec §4.1).
    fn encode(&self) -> PropertyValue {
        match self {
            Some(v) => v.encode(),
            None => PropertyValue::Str(String::new()),
        }
    }
}

impl<T> Encode for Vec<T>
where
    T: ToString,
{
    fn encode(&self) -> PropertyValue {
        PropertyValue::StrArray(self.iter().map(|v| v.to_string()).collect())
    }
}

impl<T> Encode for HashSet<T>
where
    T: ToString + Ord,
{
    /// A set of privilege-class names (or any other string-like set)
    /// encodes to a sorted string array, keeping the encoding
    /// deterministic across runs (spec §4.1: "PrivilegeSet -> array of
    /// privilege-class names").
    fn encode(&self) -> PropertyValue {
        let mut items: Vec<String> = self.iter().map(|v| v.to_string()).collect();
        items.sort();
        PropertyValue::StrArray(items)
    }
}

/// Encode a user-supplied metadata map into a namespaced property set,
/// ready to be merged into a node's first-class properties.
pub fn encode_metadata(metadata: &HashMap<String, String>) -> PropertySet {
    metadata
        .iter()
        .map(|(k, v)| (format!("{METADATA_PREFIX}{k}"), v.encode()))
        .collect()
}

/// Inverse of [`encode_metadata`]: pull every `metadata:`-prefixed key
/// back out of a property set and strip the prefix, leaving everything
/// else untouched.
pub fn decode_metadata(properties: &PropertySet) -> HashMap<String, String> {
    properties
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(METADATA_PREFIX).map(|stripped| {
                let s = match v {
                    PropertyValue::Str(s) => s.clone(),
                    PropertyValue::Int(i) => i.to_string(),
                    PropertyValue::Bool(b) => b.to_string(),
                    PropertyValue::StrArray(items) => items.join(","),
                };
                (stripped.to_string(), s)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_encodes_to_empty_string() {
        let v: Option<String> = None;
        assert_eq!(v.encode(), PropertyValue::Str(String::new()));
    }

    #[test]
    fn privilege_set_encodes_sorted() {
        let set: HashSet<String> = ["PUBLIC", "ADMIN"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            set.encode(),
            PropertyValue::StrArray(vec!["ADMIN".to_string(), "PUBLIC".to_string()])
        );
    }

    #[test]
    fn metadata_round_trips_through_prefix() {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "crawler".to_string());
        metadata.insert("version".to_string(), "3".to_string());

        let encoded = encode_metadata(&metadata);
        assert!(encoded.keys().all(|k| k.starts_with(METADATA_PREFIX)));

        let decoded = decode_metadata(&encoded);
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn metadata_keys_cannot_collide_with_first_class_properties() {
        let mut properties: PropertySet = PropertySet::new();
        properties.insert("oid".to_string(), PropertyValue::Str("plus:1".to_string()));
        let mut metadata = HashMap::new();
        metadata.insert("oid".to_string(), "user-supplied-collision".to_string());
        properties.extend(encode_metadata(&metadata));

        // the first-class oid survives untouched
        assert_eq!(
            properties.get("oid"),
            Some(&PropertyValue::Str("plus:1".to_string()))
        );
        assert_eq!(
            properties.get("metadata:oid"),
            Some(&PropertyValue::Str("user-supplied-collision".to_string()))
        );
    }
}
