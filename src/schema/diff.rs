//! Schema drift value objects. Produced fresh by each comparison and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of schema changes that can be detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    FieldAdded,
    FieldRemoved,
    TypeChanged,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldAdded => write!(f, "field_added"),
            Self::FieldRemoved => write!(f, "field_removed"),
            Self::TypeChanged => write!(f, "type_changed"),
        }
    }
}

/// A single difference at one field path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChange {
    pub change_type: ChangeType,
    /// Dot-separated path, `[]` marking array elements (`types[].type.name`)
    pub field_path: String,
    /// Type name on the previous side, absent for additions
    pub old_value: Option<String>,
    /// Type name on the current side, absent for removals
    pub new_value: Option<String>,
}

impl SchemaChange {
    pub fn added(field_path: impl Into<String>, new_type: &str) -> Self {
        Self {
            change_type: ChangeType::FieldAdded,
            field_path: field_path.into(),
            old_value: None,
            new_value: Some(new_type.to_string()),
        }
    }

    pub fn removed(field_path: impl Into<String>, old_type: &str) -> Self {
        Self {
            change_type: ChangeType::FieldRemoved,
            field_path: field_path.into(),
            old_value: Some(old_type.to_string()),
            new_value: None,
        }
    }

    pub fn type_changed(field_path: impl Into<String>, old_type: &str, new_type: &str) -> Self {
        Self {
            change_type: ChangeType::TypeChanged,
            field_path: field_path.into(),
            old_value: Some(old_type.to_string()),
            new_value: Some(new_type.to_string()),
        }
    }
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old = self.old_value.as_deref().unwrap_or("unknown");
        let new = self.new_value.as_deref().unwrap_or("unknown");
        match self.change_type {
            ChangeType::FieldAdded => {
                write!(f, "Added field '{}' with type {}", self.field_path, new)
            }
            ChangeType::FieldRemoved => {
                write!(f, "Removed field '{}' (was type {})", self.field_path, old)
            }
            ChangeType::TypeChanged => write!(
                f,
                "Changed field '{}' type from {} to {}",
                self.field_path, old, new
            ),
        }
    }
}

/// Differences between two schema trees, each list ordered by field path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    added: Vec<SchemaChange>,
    removed: Vec<SchemaChange>,
    modified: Vec<SchemaChange>,
}

impl SchemaDiff {
    pub(crate) fn from_changes(
        mut added: Vec<SchemaChange>,
        mut removed: Vec<SchemaChange>,
        mut modified: Vec<SchemaChange>,
    ) -> Self {
        for changes in [&mut added, &mut removed, &mut modified] {
            changes.sort_by(|a, b| a.field_path.cmp(&b.field_path));
        }

        Self {
            added,
            removed,
            modified,
        }
    }

    pub fn added(&self) -> &[SchemaChange] {
        &self.added
    }

    pub fn removed(&self) -> &[SchemaChange] {
        &self.removed
    }

    /// Type changes
    pub fn modified(&self) -> &[SchemaChange] {
        &self.modified
    }

    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty())
    }

    /// Added, then removed, then modified
    pub fn all_changes(&self) -> impl Iterator<Item = &SchemaChange> {
        self.added
            .iter()
            .chain(self.removed.iter())
            .chain(self.modified.iter())
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_changes() {
            return write!(f, "No schema changes detected");
        }

        let mut parts = Vec::with_capacity(3);
        if !self.added.is_empty() {
            parts.push(format!("{} field(s) added", self.added.len()));
        }
        if !self.removed.is_empty() {
            parts.push(format!("{} field(s) removed", self.removed.len()));
        }
        if !self.modified.is_empty() {
            parts.push(format!("{} field(s) modified", self.modified.len()));
        }

        write!(f, "{}", parts.join(", "))
    }
}
