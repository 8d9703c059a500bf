//! Shape extraction and structural comparison.

use crate::schema::{SchemaChange, SchemaDiff, SchemaNode, ROOT_PATH};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Extracts schema trees from JSON documents and compares them
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaTracker;

impl SchemaTracker {
    pub fn new() -> Self {
        Self
    }

    /// Structural shape of `document`.
    ///
    /// A `null` document yields the empty object. Arrays take the shape of
    /// their first element.
    pub fn extract_schema_structure(&self, document: &Value) -> SchemaNode {
        match document {
            Value::Null => SchemaNode::empty(),
            other => shape_of(other),
        }
    }

    /// Classify differences between `current` and `previous`.
    ///
    /// Fields only in `current` are added, fields only in `previous` are
    /// removed. A field whose kind differs on each side is one type change at
    /// that path; the nested fields beneath it are reported as removed on the
    /// old side and added on the new side. A `null` tree on either side counts
    /// as the empty object.
    pub fn compare_schemas(&self, current: &SchemaNode, previous: &SchemaNode) -> SchemaDiff {
        let empty = SchemaNode::empty();
        let current = root_or_empty(current, &empty);
        let previous = root_or_empty(previous, &empty);

        let mut changes = Changes::default();
        changes.walk("", current, previous);
        SchemaDiff::from_changes(changes.added, changes.removed, changes.modified)
    }

    /// Flat `path -> type name` view of a tree. The root itself only appears
    /// (as `$`) when it is a scalar.
    pub fn flatten(&self, tree: &SchemaNode) -> BTreeMap<String, &'static str> {
        let mut out = BTreeMap::new();
        match tree {
            SchemaNode::Object { .. } | SchemaNode::Array { .. } => {
                flatten_children("", tree, &mut out);
            }
            scalar => {
                out.insert(ROOT_PATH.to_string(), scalar.type_name());
            }
        }
        out
    }

    pub fn field_paths(&self, tree: &SchemaNode) -> BTreeSet<String> {
        self.flatten(tree).into_keys().collect()
    }

    /// Type name at `field_path`, if the tree has that field
    pub fn field_type(&self, tree: &SchemaNode, field_path: &str) -> Option<&'static str> {
        self.flatten(tree).get(field_path).copied()
    }
}

fn shape_of(value: &Value) -> SchemaNode {
    match value {
        Value::Null => SchemaNode::Null,
        Value::Bool(_) => SchemaNode::Boolean,
        Value::Number(n) if n.is_f64() => SchemaNode::Float,
        Value::Number(_) => SchemaNode::Integer,
        Value::String(_) => SchemaNode::String,
        Value::Array(elements) => SchemaNode::Array {
            items: elements.first().map(|first| Box::new(shape_of(first))),
        },
        Value::Object(map) => SchemaNode::Object {
            fields: map
                .iter()
                .map(|(key, value)| (key.clone(), shape_of(value)))
                .collect(),
        },
    }
}

fn root_or_empty<'a>(tree: &'a SchemaNode, empty: &'a SchemaNode) -> &'a SchemaNode {
    if matches!(tree, SchemaNode::Null) {
        empty
    } else {
        tree
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn element_path(parent: &str) -> String {
    format!("{parent}[]")
}

/// Record `node` at `path` and everything beneath it
fn flatten_into(path: &str, node: &SchemaNode, out: &mut BTreeMap<String, &'static str>) {
    out.insert(path.to_string(), node.type_name());
    flatten_children(path, node, out);
}

/// Record everything beneath `node`, but not `path` itself
fn flatten_children(path: &str, node: &SchemaNode, out: &mut BTreeMap<String, &'static str>) {
    match node {
        SchemaNode::Object { fields } => {
            for (key, child) in fields {
                flatten_into(&join(path, key), child, out);
            }
        }
        SchemaNode::Array { items: Some(items) } => {
            flatten_into(&element_path(path), items, out);
        }
        _ => {}
    }
}

#[derive(Default)]
struct Changes {
    added: Vec<SchemaChange>,
    removed: Vec<SchemaChange>,
    modified: Vec<SchemaChange>,
}

impl Changes {
    fn walk(&mut self, path: &str, current: &SchemaNode, previous: &SchemaNode) {
        match (current, previous) {
            (SchemaNode::Object { fields: cur }, SchemaNode::Object { fields: prev }) => {
                for (key, node) in cur {
                    let child = join(path, key);
                    match prev.get(key) {
                        Some(old) => self.walk(&child, node, old),
                        None => self.subtree_added(&child, node),
                    }
                }
                for (key, old) in prev {
                    if !cur.contains_key(key) {
                        self.subtree_removed(&join(path, key), old);
                    }
                }
            }
            (SchemaNode::Array { items: cur }, SchemaNode::Array { items: prev }) => {
                let child = element_path(path);
                match (cur.as_deref(), prev.as_deref()) {
                    (Some(node), Some(old)) => self.walk(&child, node, old),
                    (Some(node), None) => self.subtree_added(&child, node),
                    (None, Some(old)) => self.subtree_removed(&child, old),
                    (None, None) => {}
                }
            }
            _ if current.type_name() == previous.type_name() => {}
            _ => {
                self.modified.push(SchemaChange::type_changed(
                    if path.is_empty() { ROOT_PATH } else { path },
                    previous.type_name(),
                    current.type_name(),
                ));
                // Nested fields on each side no longer exist under the new kind
                let mut gone = BTreeMap::new();
                flatten_children(path, previous, &mut gone);
                self.push_removed(gone);

                let mut new = BTreeMap::new();
                flatten_children(path, current, &mut new);
                self.push_added(new);
            }
        }
    }

    fn subtree_added(&mut self, path: &str, node: &SchemaNode) {
        let mut entries = BTreeMap::new();
        flatten_into(path, node, &mut entries);
        self.push_added(entries);
    }

    fn subtree_removed(&mut self, path: &str, node: &SchemaNode) {
        let mut entries = BTreeMap::new();
        flatten_into(path, node, &mut entries);
        self.push_removed(entries);
    }

    fn push_added(&mut self, entries: BTreeMap<String, &'static str>) {
        self.added.extend(
            entries
                .into_iter()
                .map(|(path, type_name)| SchemaChange::added(path, type_name)),
        );
    }

    fn push_removed(&mut self, entries: BTreeMap<String, &'static str>) {
        self.removed.extend(
            entries
                .into_iter()
                .map(|(path, type_name)| SchemaChange::removed(path, type_name)),
        );
    }
}
