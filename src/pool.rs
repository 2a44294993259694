//! The merged field pool.
//!
//! Names are unique; insertion order is preserved so the serialized pool is
//! reproducible (stable key order reflecting merge insertion, not
//! alphabetical). An override replaces the record in place, keeping the
//! name's original position.

use crate::schema::FieldRecord;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct FieldPool {
    records: Vec<FieldRecord>,
    index: HashMap<String, usize>,
}

impl FieldPool {
    pub fn new() -> Self {
        FieldPool::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldRecord> {
        self.index.get(name).map(|&slot| &self.records[slot])
    }

    /// Insert a new record. Panics in debug builds if the name already
    /// exists; callers route duplicates through [`FieldPool::replace`].
    pub fn insert(&mut self, record: FieldRecord) {
        debug_assert!(!self.index.contains_key(&record.name));
        self.index.insert(record.name.clone(), self.records.len());
        self.records.push(record);
    }

    /// Replace the record currently held under the same name, keeping its
    /// insertion position.
    pub fn replace(&mut self, record: FieldRecord) {
        match self.index.get(&record.name) {
            Some(&slot) => self.records[slot] = record,
            None => self.insert(record),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRecord> {
        self.records.iter()
    }

    /// Render the pool as the output document `{fields, _meta}`.
    ///
    /// Record bodies are emitted exactly as authored by the winning source.
    pub fn to_document(&self, meta: Value) -> Value {
        let mut fields = Mapping::new();
        for record in &self.records {
            fields.insert(
                Value::String(record.name.clone()),
                Value::Mapping(record.body.clone()),
            );
        }
        let mut document = Mapping::new();
        document.insert(Value::String("fields".to_string()), Value::Mapping(fields));
        document.insert(Value::String("_meta".to_string()), meta);
        Value::Mapping(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate_record;

    fn record(name: &str, description: &str, origin: &str) -> FieldRecord {
        let body: Value = serde_yaml::from_str(&format!(
            r#"
zh-CN: x
en-US: y
description: {description}
type: string
"#
        ))
        .expect("parse test body");
        validate_record(name, &body, origin).expect("valid record")
    }

    #[test]
    fn preserves_insertion_order() {
        let mut pool = FieldPool::new();
        pool.insert(record("ZETA", "first", "a.yaml"));
        pool.insert(record("ALPHA", "second", "a.yaml"));
        let names: Vec<&str> = pool.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ZETA", "ALPHA"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut pool = FieldPool::new();
        pool.insert(record("ZETA", "first", "a.yaml"));
        pool.insert(record("ALPHA", "second", "a.yaml"));
        pool.replace(record("ZETA", "updated", "b.yaml"));

        let names: Vec<&str> = pool.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ZETA", "ALPHA"]);
        let zeta = pool.get("ZETA").expect("ZETA present");
        assert_eq!(zeta.origin, "b.yaml");
        assert_eq!(
            zeta.body.get("description").and_then(Value::as_str),
            Some("updated")
        );
    }

    #[test]
    fn document_lists_fields_then_meta() {
        let mut pool = FieldPool::new();
        pool.insert(record("FOO", "only", "a.yaml"));
        let document = pool.to_document(Value::Null);
        let mapping = document.as_mapping().expect("document mapping");
        let keys: Vec<&str> = mapping.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["fields", "_meta"]);
        assert!(mapping
            .get("fields")
            .and_then(Value::as_mapping)
            .expect("fields mapping")
            .contains_key("FOO"));
    }
}
