//! # Schema Drift Detection
//!
//! Ties the schema tracker to persistence: every recorded response is stored,
//! its shape compared with the endpoint's latest known shape, and a new schema
//! version written only when the shape moved.

use crate::database::ResponseRepository;
use crate::error::Result;
use crate::schema::{SchemaDiff, SchemaNode, SchemaTracker};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage the drift detector reads and writes
#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn store_response(&self, endpoint: &str, resource_id: i64, document: &Value)
        -> Result<i64>;

    /// Latest schema tree for an endpoint, if one was ever recorded
    async fn latest_schema(&self, endpoint: &str) -> Result<Option<SchemaNode>>;

    async fn store_schema(&self, endpoint: &str, schema: &SchemaNode) -> Result<i64>;
}

#[async_trait]
impl SchemaStore for ResponseRepository {
    async fn store_response(
        &self,
        endpoint: &str,
        resource_id: i64,
        document: &Value,
    ) -> Result<i64> {
        ResponseRepository::store_response(self, endpoint, resource_id, document).await
    }

    async fn latest_schema(&self, endpoint: &str) -> Result<Option<SchemaNode>> {
        self.get_latest_schema(endpoint)
            .await?
            .map(|stored| stored.tree())
            .transpose()
    }

    async fn store_schema(&self, endpoint: &str, schema: &SchemaNode) -> Result<i64> {
        self.store_schema_version(endpoint, schema).await
    }
}

/// Process-local store for tests and dry runs
#[derive(Debug, Default)]
pub struct InMemorySchemaStore {
    inner: Mutex<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    next_id: i64,
    responses: Vec<(i64, String, i64, Value)>,
    schemas: HashMap<String, Vec<SchemaNode>>,
}

impl InMemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response_count(&self, endpoint: &str) -> usize {
        self.inner
            .lock()
            .responses
            .iter()
            .filter(|(_, stored_endpoint, _, _)| stored_endpoint == endpoint)
            .count()
    }

    pub fn schema_versions(&self, endpoint: &str) -> usize {
        self.inner
            .lock()
            .schemas
            .get(endpoint)
            .map_or(0, |versions| versions.len())
    }
}

#[async_trait]
impl SchemaStore for InMemorySchemaStore {
    async fn store_response(
        &self,
        endpoint: &str,
        resource_id: i64,
        document: &Value,
    ) -> Result<i64> {
        let mut state = self.inner.lock();
        let id = state.allocate_id();
        state
            .responses
            .push((id, endpoint.to_string(), resource_id, document.clone()));
        Ok(id)
    }

    async fn latest_schema(&self, endpoint: &str) -> Result<Option<SchemaNode>> {
        Ok(self
            .inner
            .lock()
            .schemas
            .get(endpoint)
            .and_then(|versions| versions.last().cloned()))
    }

    async fn store_schema(&self, endpoint: &str, schema: &SchemaNode) -> Result<i64> {
        let mut state = self.inner.lock();
        let id = state.allocate_id();
        state
            .schemas
            .entry(endpoint.to_string())
            .or_default()
            .push(schema.clone());
        Ok(id)
    }
}

/// Records responses and reports schema drift per endpoint
pub struct SchemaDriftDetector {
    store: Arc<dyn SchemaStore>,
    tracker: SchemaTracker,
}

impl std::fmt::Debug for SchemaDriftDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaDriftDetector").finish_non_exhaustive()
    }
}

impl SchemaDriftDetector {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self {
            store,
            tracker: SchemaTracker::new(),
        }
    }

    /// Store `document`, compare its shape with the endpoint's latest schema
    /// (the empty object when none exists) and return the differences.
    ///
    /// A schema version is written when none existed yet or the shape changed.
    pub async fn record(
        &self,
        endpoint: &str,
        resource_id: i64,
        document: &Value,
    ) -> Result<SchemaDiff> {
        self.store
            .store_response(endpoint, resource_id, document)
            .await?;

        let current = self.tracker.extract_schema_structure(document);
        let previous = self.store.latest_schema(endpoint).await?;
        let diff = self
            .tracker
            .compare_schemas(&current, previous.as_ref().unwrap_or(&SchemaNode::empty()));

        match previous {
            None => {
                info!(endpoint, resource_id, fields = diff.added().len(), "Recorded baseline schema");
                self.store.store_schema(endpoint, &current).await?;
            }
            Some(_) if diff.has_changes() => {
                warn!(
                    endpoint,
                    resource_id,
                    added = diff.added().len(),
                    removed = diff.removed().len(),
                    modified = diff.modified().len(),
                    summary = %diff,
                    "Schema drift detected"
                );
                for change in diff.all_changes() {
                    debug!(endpoint, change = %change, "Schema change");
                }
                self.store.store_schema(endpoint, &current).await?;
            }
            Some(_) => {
                debug!(endpoint, resource_id, "Schema unchanged");
            }
        }

        Ok(diff)
    }
}
