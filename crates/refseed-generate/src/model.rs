use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use refseed_core::column_key;

pub const DEFAULT_MAX_UNIQUE_ATTEMPTS: u32 = 1000;
/// Schema assumed when neither the options nor the catalog name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Options for the synthesis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisOptions {
    /// Attempts per unique column before giving up on a row.
    pub max_unique_attempts: u32,
    /// Namespace prefix of table names (e.g. `public`).
    pub schema: Option<String>,
    /// Key row counts by bare table name, dropping the `schema.` prefix.
    pub ignore_schema: bool,
    /// Foreign keys that take the target value at `row_index - 1`.
    pub access: AccessPolicy,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_unique_attempts: DEFAULT_MAX_UNIQUE_ATTEMPTS,
            schema: None,
            ignore_schema: true,
            access: AccessPolicy::default(),
        }
    }
}

impl SynthesisOptions {
    /// Name under which row counts for `table` are looked up.
    pub fn count_key<'a>(&self, table: &'a str) -> &'a str {
        if !self.ignore_schema {
            return table;
        }
        match &self.schema {
            Some(schema) => table
                .strip_prefix(schema.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(table),
            None => table,
        }
    }
}

/// How a foreign key picks among cached target values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Random,
    Sequential,
}

/// Per (table, target column) sequential-access flags. Everything else is random.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    sequential: BTreeSet<String>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the edge from `table` to `target_table.target_column` as sequential.
    pub fn with_sequential(
        mut self,
        table: &str,
        target_table: &str,
        target_column: &str,
    ) -> Self {
        self.sequential
            .insert(access_key(table, &column_key(target_table, target_column)));
        self
    }

    pub fn set_sequential(&mut self, table: &str, target_key: &str) {
        self.sequential.insert(access_key(table, target_key));
    }

    pub fn access_for(&self, table: &str, target_key: &str) -> Access {
        if self.sequential.contains(&access_key(table, target_key)) {
            Access::Sequential
        } else {
            Access::Random
        }
    }
}

fn access_key(table: &str, target_key: &str) -> String {
    format!("{table}__{target_key}")
}

/// Summary of a synthesized table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub unique_retries: u64,
}

/// Report for a synthesis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub run_id: String,
    pub tables: Vec<TableReport>,
    pub retries_total: u64,
    pub generator_usage: BTreeMap<String, u64>,
    /// Row counts given for tables the catalog does not know.
    pub unused_counts: Vec<String>,
    pub duration_ms: u64,
}

impl SynthesisReport {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            tables: Vec::new(),
            retries_total: 0,
            generator_usage: BTreeMap::new(),
            unused_counts: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_generator_usage(&mut self, id: &str) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += 1;
    }

    pub fn record_table(&mut self, table: TableReport) {
        self.retries_total += table.unique_retries;
        self.tables.push(table);
    }

    pub fn rows_generated(&self) -> u64 {
        self.tables.iter().map(|table| table.rows_generated).sum()
    }
}
