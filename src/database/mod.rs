//! # Database Operations
//!
//! PostgreSQL persistence for fetched responses and the schema history used
//! by drift detection.
//!
//! - [`connection`] - pool setup, health check and migrations
//! - [`repository`] - response and schema version queries

pub mod connection;
pub mod repository;

pub use connection::{DatabaseConnection, MIGRATOR};
pub use repository::{ResponseRepository, StoredResponse, StoredSchema};
