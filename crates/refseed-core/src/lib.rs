//! Core contracts and helpers for refseed.
//!
//! This crate defines the table/column/foreign-key value types, the catalog
//! interface that supplies them, schema validation, and the dependency graph
//! used to order table synthesis.

pub mod catalog;
pub mod error;
pub mod graph;
pub mod schema;
pub mod validation;

pub use catalog::{CatalogSnapshot, SchemaCatalog, SnapshotCatalog};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, GraphSummary};
pub use schema::{Column, ForeignKeyEdge, Table, column_key, normalize_type_tag};
pub use validation::{mark_referenced_columns, validate_tables};

/// Current contract version for `schema.json` snapshots.
pub const SNAPSHOT_VERSION: &str = "0.1";
