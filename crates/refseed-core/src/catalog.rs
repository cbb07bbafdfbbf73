use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::Table;
use crate::validation::{mark_referenced_columns, validate_tables};

/// Source of structured table metadata.
///
/// Implementations may talk to a live database; the synthesizer only relies on
/// the already-structured answers.
pub trait SchemaCatalog {
    /// Table identifiers known to the catalog.
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns, flags and outgoing foreign keys for one table.
    fn table_info(&self, table: &str) -> Result<Table>;

    /// Table -> tables it references. Self-references may be omitted.
    fn dependency_edges(&self) -> Result<BTreeMap<String, BTreeSet<String>>>;

    /// Namespace the tables live in, when the catalog knows it.
    fn schema(&self) -> Option<&str> {
        None
    }
}

/// Serialized catalog contents (`schema.json`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSnapshot {
    /// Contract version for this snapshot format.
    pub snapshot_version: String,
    /// Namespace the tables were read from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub tables: Vec<Table>,
}

/// In-memory catalog backed by a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotCatalog {
    tables: Vec<Table>,
    schema: Option<String>,
}

impl SnapshotCatalog {
    /// Build a catalog from a snapshot, binding columns and deriving `has_ref`.
    pub fn new(snapshot: CatalogSnapshot) -> Result<Self> {
        let mut tables = snapshot.tables;
        for table in &mut tables {
            table.bind_columns();
        }
        mark_referenced_columns(&mut tables);
        validate_tables(&tables)?;

        Ok(Self {
            tables,
            schema: snapshot.schema,
        })
    }

    pub fn from_tables(tables: Vec<Table>) -> Result<Self> {
        Self::new(CatalogSnapshot {
            snapshot_version: crate::SNAPSHOT_VERSION.to_string(),
            schema: None,
            tables,
        })
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(contents)?;
        Self::new(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}

impl SchemaCatalog for SnapshotCatalog {
    fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|table| table.name.clone()).collect())
    }

    fn table_info(&self, table: &str) -> Result<Table> {
        self.tables
            .iter()
            .find(|candidate| candidate.name == table)
            .cloned()
            .ok_or_else(|| Error::Catalog(format!("unknown table '{table}'")))
    }

    fn dependency_edges(&self) -> Result<BTreeMap<String, BTreeSet<String>>> {
        Ok(self
            .tables
            .iter()
            .map(|table| (table.name.clone(), table.referenced_tables()))
            .collect())
    }

    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}
