use std::collections::BTreeMap;

use rand::RngCore;
use tracing::debug;

use refseed_core::{Column, ForeignKeyEdge, Table};

use crate::cache::ReferenceCache;
use crate::errors::SynthesisError;
use crate::generators::GeneratorRegistry;
use crate::model::{Access, AccessPolicy, SynthesisOptions};
use crate::row::RowGenerator;
use crate::tracker::UniquenessTracker;
use crate::value::{GeneratedValue, Row, Value};

/// Counters accumulated while synthesizing rows.
#[derive(Debug, Default, Clone)]
pub struct SynthesisStats {
    pub unique_retries: u64,
    pub generator_usage: BTreeMap<String, u64>,
}

/// Produces rows one at a time while keeping the per-run uniqueness and
/// reference state.
#[derive(Debug)]
pub struct RowSynthesizer {
    registry: GeneratorRegistry,
    access: AccessPolicy,
    max_unique_attempts: u32,
    tracker: UniquenessTracker,
    cache: ReferenceCache,
    stats: SynthesisStats,
}

impl RowSynthesizer {
    pub fn new(registry: GeneratorRegistry, options: &SynthesisOptions) -> Self {
        Self {
            registry,
            access: options.access.clone(),
            max_unique_attempts: options.max_unique_attempts.max(1),
            tracker: UniquenessTracker::new(),
            cache: ReferenceCache::new(),
            stats: SynthesisStats::default(),
        }
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    pub fn tracker(&self) -> &UniquenessTracker {
        &self.tracker
    }

    /// Forget every value from the previous run.
    pub fn reset(&mut self) {
        self.tracker.clear();
        self.cache.clear();
        self.stats = SynthesisStats::default();
    }

    /// Hand out the counters gathered since the last call.
    pub fn take_stats(&mut self) -> SynthesisStats {
        std::mem::take(&mut self.stats)
    }

    pub fn synthesize(
        &mut self,
        table: &Table,
        row_index: u64,
        rng: &mut dyn RngCore,
    ) -> Result<Row, SynthesisError> {
        self.synthesize_with(table, row_index, None, rng)
    }

    /// Build row `row_index` (1-based) of `table`.
    ///
    /// A custom row generator supplies some columns first; the rest go through
    /// the registry, and foreign keys are resolved last from the cache.
    pub fn synthesize_with(
        &mut self,
        table: &Table,
        row_index: u64,
        custom: Option<&mut (dyn RowGenerator + '_)>,
        rng: &mut dyn RngCore,
    ) -> Result<Row, SynthesisError> {
        let mut row = Row::new();

        let remaining: Vec<&Column> = match custom {
            Some(generator) => {
                let partial = generator.generate(row_index, rng)?;
                let remaining = generator.uncovered_columns(table, &partial);
                self.accept_custom(table, row_index, partial, &mut row)?;
                remaining
            }
            None => table.regular_columns().collect(),
        };

        for column in remaining {
            let value = if column.is_sequence {
                GeneratedValue::new(sequence_value(row_index))
            } else {
                self.generate_column(column, rng)?
            };
            self.record(column, &value);
            row.insert(column.name.clone(), value);
        }

        for edge in &table.foreign_keys {
            let column = table.column(&edge.column).ok_or_else(|| {
                SynthesisError::Schema(refseed_core::Error::InvalidSchema(format!(
                    "foreign key column {}.{} does not exist",
                    table.name, edge.column
                )))
            })?;
            let value = self.resolve_foreign_key(table, column, edge, row_index, rng)?;
            if column.has_ref {
                self.cache.record(&column.qualified_name(), value.clone());
            }
            row.insert(column.name.clone(), value);
        }

        Ok(row)
    }

    /// Enforce sequence, uniqueness and reference bookkeeping on custom values.
    fn accept_custom(
        &mut self,
        table: &Table,
        row_index: u64,
        partial: Row,
        row: &mut Row,
    ) -> Result<(), SynthesisError> {
        for (name, mut value) in partial {
            let column = table.column(&name).ok_or_else(|| {
                SynthesisError::Configuration(format!(
                    "row generator for '{}' produced unknown column '{name}'",
                    table.name
                ))
            })?;
            if table.is_foreign_key_column(&name) {
                continue;
            }
            if column.is_sequence {
                value = GeneratedValue::new(sequence_value(row_index));
            }
            if column.is_unique && !self.tracker.insert(&column.qualified_name(), &value.primary) {
                return Err(SynthesisError::UniquenessExhausted {
                    table: table.name.clone(),
                    column: name,
                    attempts: 1,
                });
            }
            if column.has_ref {
                self.cache.record(&column.qualified_name(), value.clone());
            }
            row.insert(name, value);
        }
        Ok(())
    }

    fn generate_column(
        &mut self,
        column: &Column,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, SynthesisError> {
        let generator = self.registry.resolve(column)?;
        *self
            .stats
            .generator_usage
            .entry(generator.id().to_string())
            .or_insert(0) += 1;

        if !column.is_unique {
            return generator.generate(column, rng);
        }

        let key = column.qualified_name();
        for attempt in 0..self.max_unique_attempts {
            let value = generator.generate(column, rng)?;
            if !self.tracker.contains(&key, &value.primary) {
                self.count_retries(column, attempt);
                return Ok(value);
            }
        }
        Err(self.exhausted(column))
    }

    fn resolve_foreign_key(
        &mut self,
        table: &Table,
        column: &Column,
        edge: &ForeignKeyEdge,
        row_index: u64,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, SynthesisError> {
        let target = edge.target_key();
        if self.cache.is_empty(&target) {
            return Err(SynthesisError::ReferentialGap {
                table: table.name.clone(),
                column: column.name.clone(),
                target,
            });
        }

        let key = column.qualified_name();
        match self.access.access_for(&table.name, &target) {
            Access::Sequential => {
                let position = row_index.saturating_sub(1) as usize;
                let value = self.cache.pick_at(&target, position).cloned().ok_or_else(|| {
                    SynthesisError::SequentialOverrun {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        target: target.clone(),
                        row_index,
                        available: self.cache.len(&target),
                    }
                })?;
                if column.is_unique && !self.tracker.insert(&key, &value.primary) {
                    return Err(SynthesisError::UniquenessExhausted {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        attempts: 1,
                    });
                }
                Ok(value)
            }
            Access::Random => {
                if !column.is_unique {
                    return self
                        .cache
                        .pick_random(&target, rng)
                        .cloned()
                        .ok_or_else(|| gap(table, column, &target));
                }
                for attempt in 0..self.max_unique_attempts {
                    let value = self
                        .cache
                        .pick_random(&target, rng)
                        .cloned()
                        .ok_or_else(|| gap(table, column, &target))?;
                    if self.tracker.insert(&key, &value.primary) {
                        self.count_retries(column, attempt);
                        return Ok(value);
                    }
                }
                Err(self.exhausted(column))
            }
        }
    }

    fn record(&mut self, column: &Column, value: &GeneratedValue) {
        if column.is_unique {
            self.tracker.insert(&column.qualified_name(), &value.primary);
        }
        if column.has_ref {
            self.cache.record(&column.qualified_name(), value.clone());
        }
    }

    fn count_retries(&mut self, column: &Column, attempt: u32) {
        if attempt == 0 {
            return;
        }
        self.stats.unique_retries += u64::from(attempt);
        debug!(
            table = %column.table,
            column = %column.name,
            retries = attempt,
            "unique value resampled"
        );
    }

    fn exhausted(&self, column: &Column) -> SynthesisError {
        SynthesisError::UniquenessExhausted {
            table: column.table.clone(),
            column: column.name.clone(),
            attempts: self.max_unique_attempts,
        }
    }
}

fn sequence_value(row_index: u64) -> Value {
    Value::Int(row_index as i64)
}

fn gap(table: &Table, column: &Column, target: &str) -> SynthesisError {
    SynthesisError::ReferentialGap {
        table: table.name.clone(),
        column: column.name.clone(),
        target: target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn author() -> Table {
        Table::new(
            "author",
            vec![
                Column::new("", "id", "integer").sequence().referenced(),
                Column::new("", "name", "varchar").with_max_length(12),
            ],
        )
    }

    fn book() -> Table {
        Table::new(
            "book",
            vec![
                Column::new("", "id", "integer").sequence(),
                Column::new("", "author_id", "integer"),
            ],
        )
        .with_foreign_key("author_id", "author", "id")
    }

    fn synthesizer(access: AccessPolicy) -> RowSynthesizer {
        let options = SynthesisOptions {
            access,
            ..SynthesisOptions::default()
        };
        RowSynthesizer::new(GeneratorRegistry::new(), &options)
    }

    #[test]
    fn sequence_columns_follow_row_index_and_feed_cache() {
        let mut synth = synthesizer(AccessPolicy::new());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let author = author();

        for index in 1..=3 {
            let row = synth.synthesize(&author, index, &mut rng).unwrap();
            assert_eq!(row["id"].primary, Value::Int(index as i64));
        }
        assert_eq!(synth.cache().len("author.id"), 3);
    }

    #[test]
    fn foreign_keys_require_cached_targets() {
        let mut synth = synthesizer(AccessPolicy::new());
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        match synth.synthesize(&book(), 1, &mut rng) {
            Err(SynthesisError::ReferentialGap { table, column, target }) => {
                assert_eq!(table, "book");
                assert_eq!(column, "author_id");
                assert_eq!(target, "author.id");
            }
            other => panic!("expected referential gap, got {other:?}"),
        }
    }

    #[test]
    fn sequential_access_walks_targets_in_order() {
        let mut synth = synthesizer(AccessPolicy::new().with_sequential("book", "author", "id"));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for index in 1..=2 {
            synth.synthesize(&author(), index, &mut rng).unwrap();
        }

        for index in 1..=2 {
            let row = synth.synthesize(&book(), index, &mut rng).unwrap();
            assert_eq!(row["author_id"].primary, Value::Int(index as i64));
        }
        assert!(matches!(
            synth.synthesize(&book(), 3, &mut rng),
            Err(SynthesisError::SequentialOverrun { available: 2, row_index: 3, .. })
        ));
    }

    #[test]
    fn unique_foreign_key_draws_distinct_targets() {
        let profile = Table::new(
            "profile",
            vec![Column::new("", "author_id", "integer").unique()],
        )
        .with_foreign_key("author_id", "author", "id");
        let mut synth = synthesizer(AccessPolicy::new());
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for index in 1..=4 {
            synth.synthesize(&author(), index, &mut rng).unwrap();
        }

        let mut seen = HashSet::new();
        for index in 1..=4 {
            let row = synth.synthesize(&profile, index, &mut rng).unwrap();
            assert!(seen.insert(row["author_id"].primary.clone()));
        }
        assert!(matches!(
            synth.synthesize(&profile, 5, &mut rng),
            Err(SynthesisError::UniquenessExhausted { .. })
        ));
    }

    #[test]
    fn reset_clears_run_state() {
        let mut synth = synthesizer(AccessPolicy::new());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        synth.synthesize(&author(), 1, &mut rng).unwrap();
        assert!(synth.take_stats().generator_usage.contains_key("builtin.text"));

        synth.reset();
        assert!(synth.cache().is_empty("author.id"));
        assert!(synth.take_stats().generator_usage.is_empty());
    }
}
