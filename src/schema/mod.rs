//! # Schema Tracking
//!
//! Structural shape extraction for JSON documents and drift classification
//! between two shapes. A shape records types, never values, so two responses
//! for different resources of the same endpoint produce the same tree.

pub mod diff;
pub mod tracker;

pub use diff::{ChangeType, SchemaChange, SchemaDiff};
pub use tracker::SchemaTracker;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Path used for a change at the document root itself
pub const ROOT_PATH: &str = "$";

/// Stored schema trees that cannot be interpreted
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed schema tree: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Structural shape of a JSON value.
///
/// Objects keep their fields sorted, so shapes compare and serialize the same
/// regardless of the key order of the source document. An array's shape is the
/// shape of its first element, or `None` when the array was empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaNode {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Object {
        fields: BTreeMap<String, SchemaNode>,
    },
    Array {
        #[serde(default)]
        items: Option<Box<SchemaNode>>,
    },
}

impl SchemaNode {
    /// The empty object, standing in for an absent schema
    pub fn empty() -> Self {
        Self::Object {
            fields: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Object { .. } => "object",
            Self::Array { .. } => "array",
        }
    }

    pub fn is_empty_object(&self) -> bool {
        matches!(self, Self::Object { fields } if fields.is_empty())
    }

    /// Parse a tree previously produced by [`SchemaNode::to_value`]
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        Ok(Self::deserialize(value)?)
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl Default for SchemaNode {
    fn default() -> Self {
        Self::empty()
    }
}
