//! Queries over `api_responses` and `schema_versions`.

use crate::error::Result;
use crate::schema::SchemaNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::debug;

/// A stored API response.
/// Maps to `api_responses` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoredResponse {
    pub id: i64,
    pub endpoint: String,
    pub resource_id: i64,
    pub response_data: Value,
    pub created_at: DateTime<Utc>,
}

/// A recorded schema version.
/// Maps to `schema_versions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoredSchema {
    pub id: i64,
    pub endpoint: String,
    pub schema_structure: Value,
    pub created_at: DateTime<Utc>,
}

impl StoredSchema {
    /// Parse the stored structure back into a schema tree
    pub fn tree(&self) -> Result<SchemaNode> {
        Ok(SchemaNode::from_value(&self.schema_structure)?)
    }
}

#[derive(Debug, Clone)]
pub struct ResponseRepository {
    pool: PgPool,
}

impl ResponseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Store a response, returning its row id
    pub async fn store_response(
        &self,
        endpoint: &str,
        resource_id: i64,
        response_data: &Value,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO api_responses (endpoint, resource_id, response_data)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(endpoint)
        .bind(resource_id)
        .bind(response_data)
        .fetch_one(&self.pool)
        .await?;

        debug!(endpoint, resource_id, id, "Stored API response");
        Ok(id)
    }

    pub async fn get_latest_response(
        &self,
        endpoint: &str,
        resource_id: i64,
    ) -> Result<Option<StoredResponse>> {
        let response = sqlx::query_as::<_, StoredResponse>(
            r#"
            SELECT id, endpoint, resource_id, response_data, created_at
            FROM api_responses
            WHERE endpoint = $1 AND resource_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(endpoint)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(response)
    }

    /// Every stored response for a resource, newest first
    pub async fn get_all_responses(
        &self,
        endpoint: &str,
        resource_id: i64,
    ) -> Result<Vec<StoredResponse>> {
        let responses = sqlx::query_as::<_, StoredResponse>(
            r#"
            SELECT id, endpoint, resource_id, response_data, created_at
            FROM api_responses
            WHERE endpoint = $1 AND resource_id = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(endpoint)
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(responses)
    }

    pub async fn store_schema_version(&self, endpoint: &str, schema: &SchemaNode) -> Result<i64> {
        let structure = schema.to_value()?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO schema_versions (endpoint, schema_structure)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(endpoint)
        .bind(&structure)
        .fetch_one(&self.pool)
        .await?;

        debug!(endpoint, id, "Stored schema version");
        Ok(id)
    }

    pub async fn get_latest_schema(&self, endpoint: &str) -> Result<Option<StoredSchema>> {
        let schema = sqlx::query_as::<_, StoredSchema>(
            r#"
            SELECT id, endpoint, schema_structure, created_at
            FROM schema_versions
            WHERE endpoint = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(endpoint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(schema)
    }

    /// Delete stored responses for one endpoint, or all of them. Returns rows deleted.
    pub async fn clear_responses(&self, endpoint: Option<&str>) -> Result<u64> {
        let result = match endpoint {
            Some(endpoint) => {
                sqlx::query("DELETE FROM api_responses WHERE endpoint = $1")
                    .bind(endpoint)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM api_responses")
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }
}
