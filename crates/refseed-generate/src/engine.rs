use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use rand::RngCore;
use tracing::{info, warn};

use refseed_core::{DependencyGraph, SchemaCatalog, SnapshotCatalog, Table};

use crate::errors::SynthesisError;
use crate::generators::GeneratorRegistry;
use crate::model::{DEFAULT_SCHEMA, SynthesisOptions, SynthesisReport, TableReport};
use crate::row::{RowGenerator, RowGeneratorFactory};
use crate::synthesizer::RowSynthesizer;
use crate::value::Row;

/// Rows generated for one table, in generation order.
#[derive(Debug, Clone)]
pub struct TableRows {
    pub table: Table,
    pub rows: Vec<Row>,
}

/// Result of a synthesis run. Tables appear in dependency order.
#[derive(Debug, Clone)]
pub struct GeneratedDataset {
    /// Schema used to qualify table and sequence names in SQL output.
    pub schema: String,
    pub tables: Vec<TableRows>,
    pub report: SynthesisReport,
}

impl GeneratedDataset {
    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables
            .iter()
            .find(|entry| entry.table.name == table)
            .map(|entry| entry.rows.as_slice())
    }

    /// Tables owning at least one sequence column, with their row counts.
    pub fn sequence_tables(&self) -> impl Iterator<Item = (&Table, usize)> {
        self.tables
            .iter()
            .filter(|entry| entry.table.has_sequence())
            .map(|entry| (&entry.table, entry.rows.len()))
    }
}

/// Orders tables by their foreign keys and fills them row by row.
pub struct TableSynthesisEngine {
    schema: String,
    tables: Vec<Table>,
    levels: Vec<Vec<String>>,
    options: SynthesisOptions,
    synthesizer: RowSynthesizer,
    row_generators: HashMap<String, RowGeneratorFactory>,
}

impl TableSynthesisEngine {
    /// Load every table from the catalog and fix the processing order.
    ///
    /// Fails with [`SynthesisError::Cycle`] before any row exists when the
    /// foreign keys (ignoring self-references) form a cycle.
    pub fn new(
        catalog: &dyn SchemaCatalog,
        registry: GeneratorRegistry,
        options: SynthesisOptions,
    ) -> Result<Self, SynthesisError> {
        let mut loaded: HashMap<String, Table> = HashMap::new();
        for name in catalog.list_tables()? {
            let table = catalog.table_info(&name)?;
            loaded.insert(name, table);
        }

        let graph = DependencyGraph::new(catalog.dependency_edges()?);
        let levels = graph.levels()?;
        let mut tables = Vec::with_capacity(loaded.len());
        for name in levels.iter().flatten() {
            let table = loaded.remove(name).ok_or_else(|| {
                SynthesisError::Schema(refseed_core::Error::Catalog(format!(
                    "table '{name}' is referenced but not described by the catalog"
                )))
            })?;
            tables.push(table);
        }
        // Tables without any edge entry still get generated, after the graph.
        let mut isolated: Vec<Table> = loaded.into_values().collect();
        isolated.sort_by(|a, b| a.name.cmp(&b.name));
        tables.extend(isolated);

        let schema = options
            .schema
            .clone()
            .or_else(|| catalog.schema().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());

        let summary = graph.summary();
        info!(
            schema = %schema,
            tables = tables.len(),
            edges = summary.edges,
            levels = levels.len(),
            "dependency graph resolved"
        );

        Ok(Self {
            schema,
            tables,
            levels,
            synthesizer: RowSynthesizer::new(registry, &options),
            options,
            row_generators: HashMap::new(),
        })
    }

    /// Engine over in-memory tables; `has_ref` is derived and the schema validated.
    pub fn from_tables(
        tables: Vec<Table>,
        registry: GeneratorRegistry,
        options: SynthesisOptions,
    ) -> Result<Self, SynthesisError> {
        let catalog = SnapshotCatalog::from_tables(tables)?;
        Self::new(&catalog, registry, options)
    }

    /// Use `factory` to build a custom row generator for `table` on every run.
    pub fn register_row_generator(&mut self, table: impl Into<String>, factory: RowGeneratorFactory) {
        self.row_generators.insert(table.into(), factory);
    }

    /// Tables in processing order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Groups of mutually independent tables, in processing order.
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Schema that output statements are qualified with.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    /// Drop the uniqueness and reference state of the previous run.
    pub fn reset(&mut self) {
        self.synthesizer.reset();
    }

    /// Generate `counts[table]` rows for every table.
    ///
    /// Counts are keyed by table name (without the schema prefix when
    /// `ignore_schema` is set). Every run starts from a clean state; a failed
    /// run leaves nothing behind and must be repeated as a whole. The run id is
    /// drawn from `rng`, so a seeded run is reproducible end to end.
    pub fn generate_all(
        &mut self,
        counts: &BTreeMap<String, u64>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedDataset, SynthesisError> {
        let start = Instant::now();
        let mut report = SynthesisReport::new(String::new());
        let plan = self.plan_counts(counts, &mut report)?;

        let mut id_bytes = [0u8; 16];
        rng.fill_bytes(&mut id_bytes);
        let run_id = uuid::Builder::from_random_bytes(id_bytes)
            .into_uuid()
            .to_string();
        report.run_id = run_id.clone();
        self.reset();
        let mut custom: HashMap<String, Box<dyn RowGenerator>> = HashMap::new();

        info!(
            run_id = %run_id,
            tables = self.tables.len(),
            rows = plan.iter().sum::<u64>(),
            "synthesis started"
        );

        let mut generated = Vec::with_capacity(self.tables.len());
        for (table, &requested) in self.tables.iter().zip(plan.iter()) {
            let table_start = Instant::now();
            info!(table = %table.name, rows = requested, "synthesizing table");

            if let Some(factory) = self.lookup_row_generator(&table.name) {
                custom.insert(table.name.clone(), factory(table));
            }

            let mut rows = Vec::new();
            for row_index in 1..=requested {
                let generator = custom
                    .get_mut(&table.name)
                    .map(|generator| generator.as_mut());
                match self
                    .synthesizer
                    .synthesize_with(table, row_index, generator, rng)
                {
                    Ok(row) => rows.push(row),
                    Err(err) => {
                        warn!(
                            run_id = %run_id,
                            table = %table.name,
                            row = row_index,
                            recoverable = err.is_recoverable(),
                            error = %err,
                            "synthesis failed"
                        );
                        return Err(err);
                    }
                }
            }

            let stats = self.synthesizer.take_stats();
            for (id, uses) in stats.generator_usage {
                *report.generator_usage.entry(id).or_insert(0) += uses;
            }
            report.record_table(TableReport {
                table: table.name.clone(),
                rows_requested: requested,
                rows_generated: rows.len() as u64,
                unique_retries: stats.unique_retries,
            });

            info!(
                table = %table.name,
                rows_generated = rows.len(),
                unique_retries = stats.unique_retries,
                duration_ms = table_start.elapsed().as_millis() as u64,
                "table synthesized"
            );
            generated.push(TableRows {
                table: table.clone(),
                rows,
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            tables = report.tables.len(),
            rows = report.rows_generated(),
            retries = report.retries_total,
            duration_ms = report.duration_ms,
            "synthesis completed"
        );

        Ok(GeneratedDataset {
            schema: self.schema.clone(),
            tables: generated,
            report,
        })
    }

    /// Row count per table in processing order, rejecting missing counts up front.
    fn plan_counts(
        &self,
        counts: &BTreeMap<String, u64>,
        report: &mut SynthesisReport,
    ) -> Result<Vec<u64>, SynthesisError> {
        let mut plan = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            let key = self.options.count_key(&table.name);
            let count = counts.get(key).ok_or_else(|| {
                SynthesisError::Configuration(format!("no row count for table '{key}'"))
            })?;
            plan.push(*count);
        }

        for key in counts.keys() {
            let known = self
                .tables
                .iter()
                .any(|table| self.options.count_key(&table.name) == key.as_str());
            if !known {
                warn!(table = %key, "row count given for unknown table");
                report.unused_counts.push(key.clone());
            }
        }
        Ok(plan)
    }

    fn lookup_row_generator(&self, table: &str) -> Option<&RowGeneratorFactory> {
        self.row_generators
            .get(table)
            .or_else(|| self.row_generators.get(self.options.count_key(table)))
    }
}

impl std::fmt::Debug for TableSynthesisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut custom: Vec<&String> = self.row_generators.keys().collect();
        custom.sort();
        f.debug_struct("TableSynthesisEngine")
            .field("schema", &self.schema)
            .field("tables", &self.tables.iter().map(|t| &t.name).collect::<Vec<_>>())
            .field("levels", &self.levels)
            .field("options", &self.options)
            .field("row_generators", &custom)
            .finish()
    }
}
