use std::sync::Arc;

use rand::RngCore;

use refseed_core::{Column, Table};

use crate::errors::SynthesisError;
use crate::value::Row;

/// Custom per-table row source.
///
/// Produces values for some columns of a row; the standard pipeline fills the
/// rest and foreign keys are always resolved afterwards.
pub trait RowGenerator {
    fn generate(&mut self, row_index: u64, rng: &mut dyn RngCore) -> Result<Row, SynthesisError>;

    /// Non-foreign-key columns of `table` that `covered` leaves empty.
    fn uncovered_columns<'t>(&self, table: &'t Table, covered: &Row) -> Vec<&'t Column> {
        table
            .regular_columns()
            .filter(|column| !covered.contains_key(&column.name))
            .collect()
    }
}

/// Builds a fresh row generator for a table at the start of every run.
pub type RowGeneratorFactory = Arc<dyn Fn(&Table) -> Box<dyn RowGenerator> + Send + Sync>;
