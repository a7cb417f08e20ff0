//! Merge patches: partial-field writes with atomic field operations.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ModelError;

/// Operation applied to one field of a document
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Replace the field
    Set(Value),
    /// Add to a numeric field; a missing or non-numeric field starts at zero
    Increment(i64),
    /// Append each element not already present
    ArrayUnion(Vec<Value>),
    /// Remove every element equal to one of these
    ArrayRemove(Vec<Value>),
    /// Replaced by the store's clock (epoch milliseconds) when applied
    ServerTimestamp,
    /// Remove the field
    Delete,
}

/// An ordered set of field operations keyed by dotted field path.
///
/// Applying a patch never touches fields it doesn't name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    ops: Vec<(String, FieldOp)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch that sets every top-level field of a serializable value
    pub fn from_fields<T: Serialize>(value: &T) -> Result<Self, ModelError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(map.into_iter().fold(Self::new(), |patch, (k, v)| patch.set(k, v))),
            _ => Err(ModelError::NotAnObject),
        }
    }

    /// Add an operation. A later operation on the same field replaces the earlier one.
    pub fn with(mut self, field: impl Into<String>, op: FieldOp) -> Self {
        let field = field.into();
        self.ops.retain(|(existing, _)| *existing != field);
        self.ops.push((field, op));
        self
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FieldOp::Set(value.into()))
    }

    pub fn increment(self, field: impl Into<String>, by: i64) -> Self {
        self.with(field, FieldOp::Increment(by))
    }

    pub fn array_union(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(field, FieldOp::ArrayUnion(values))
    }

    pub fn array_remove(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(field, FieldOp::ArrayRemove(values))
    }

    pub fn server_timestamp(self, field: impl Into<String>) -> Self {
        self.with(field, FieldOp::ServerTimestamp)
    }

    pub fn delete(self, field: impl Into<String>) -> Self {
        self.with(field, FieldOp::Delete)
    }

    pub fn get(&self, field: &str) -> Option<&FieldOp> {
        self.ops.iter().find(|(f, _)| f == field).map(|(_, op)| op)
    }

    pub fn ops(&self) -> impl Iterator<Item = (&str, &FieldOp)> {
        self.ops.iter().map(|(f, op)| (f.as_str(), op))
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Apply with merge semantics. Intermediate maps on a dotted path are
    /// created as needed; a non-map in the way is replaced by a map.
    pub fn apply(&self, doc: &mut Map<String, Value>, now_millis: i64) {
        for (field, op) in &self.ops {
            apply_op(doc, field, op, now_millis);
        }
    }
}

fn apply_op(doc: &mut Map<String, Value>, path: &str, op: &FieldOp, now_millis: i64) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut target = doc;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            let entry = target
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            target = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
    }

    match op {
        FieldOp::Set(value) => {
            target.insert(leaf.to_string(), value.clone());
        }
        FieldOp::Increment(by) => {
            // Integers stay integers; anything else numeric adds as a float
            let next = match target.get(leaf) {
                Some(Value::Number(n)) => match n.as_i64() {
                    Some(current) => Value::from(current.saturating_add(*by)),
                    _ => Value::from(n.as_f64().unwrap_or_default() + *by as f64),
                },
                _ => Value::from(*by),
            };
            target.insert(leaf.to_string(), next);
        }
        FieldOp::ArrayUnion(values) => {
            let mut array = match target.remove(leaf) {
                Some(Value::Array(array)) => array,
                _ => Vec::new(),
            };
            for value in values {
                if !array.contains(value) {
                    array.push(value.clone());
                }
            }
            target.insert(leaf.to_string(), Value::Array(array));
        }
        FieldOp::ArrayRemove(values) => {
            let mut array = match target.remove(leaf) {
                Some(Value::Array(array)) => array,
                _ => Vec::new(),
            };
            array.retain(|existing| !values.contains(existing));
            target.insert(leaf.to_string(), Value::Array(array));
        }
        FieldOp::ServerTimestamp => {
            target.insert(leaf.to_string(), Value::from(now_millis));
        }
        FieldOp::Delete => {
            target.remove(leaf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_merge_leaves_other_fields() {
        let mut doc = object(json!({ "name": "Room", "listeners": 3 }));
        Patch::new().set("listeners", 2).apply(&mut doc, 0);

        assert_eq!(Value::Object(doc), json!({ "name": "Room", "listeners": 2 }));
    }

    #[test]
    fn test_increment_nested_creates_path() {
        let mut doc = object(json!({ "name": "Mira" }));
        Patch::new().increment("stats.followers", 1).apply(&mut doc, 0);
        Patch::new().increment("stats.followers", 1).apply(&mut doc, 0);

        assert_eq!(doc["stats"]["followers"], json!(2));
    }

    #[test]
    fn test_increment_adds_to_float_counter() {
        let mut doc = object(json!({ "listeners": 2.0 }));
        Patch::new().increment("listeners", 1).apply(&mut doc, 0);

        assert_eq!(doc["listeners"], json!(3.0));
    }

    #[test]
    fn test_increment_replaces_non_number() {
        let mut doc = object(json!({ "listeners": "many" }));
        Patch::new().increment("listeners", 1).apply(&mut doc, 0);

        assert_eq!(doc["listeners"], json!(1));
    }

    #[test]
    fn test_increment_may_go_negative() {
        let mut doc = object(json!({ "listeners": 0 }));
        Patch::new().increment("listeners", -1).apply(&mut doc, 0);

        assert_eq!(doc["listeners"], json!(-1));
    }

    #[test]
    fn test_array_union_skips_duplicates() {
        let mut doc = object(json!({ "ownedItems": ["frame_1"] }));
        Patch::new()
            .array_union("ownedItems", vec![json!("frame_1"), json!("follow_u2")])
            .apply(&mut doc, 0);

        assert_eq!(doc["ownedItems"], json!(["frame_1", "follow_u2"]));
    }

    #[test]
    fn test_array_remove_on_missing_field() {
        let mut doc = Map::new();
        Patch::new()
            .array_remove("ownedItems", vec![json!("follow_u2")])
            .apply(&mut doc, 0);

        assert_eq!(doc["ownedItems"], json!([]));
    }

    #[test]
    fn test_server_timestamp_and_delete() {
        let mut doc = object(json!({ "stale": true }));
        Patch::new()
            .server_timestamp("createdAt")
            .delete("stale")
            .apply(&mut doc, 1_700_000_000_000);

        assert_eq!(Value::Object(doc), json!({ "createdAt": 1_700_000_000_000i64 }));
    }

    #[test]
    fn test_later_op_replaces_earlier() {
        let patch = Patch::new().set("listeners", 5).increment("listeners", 1);

        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("listeners"), Some(&FieldOp::Increment(1)));
    }

    #[test]
    fn test_from_fields_rejects_non_object() {
        assert!(Patch::from_fields(&42).is_err());

        let patch = Patch::from_fields(&json!({ "frame": "gold.png" })).unwrap();
        assert_eq!(patch.get("frame"), Some(&FieldOp::Set(json!("gold.png"))));
    }
}
