use std::collections::BTreeMap;

use rand::RngCore;
use rand::seq::IndexedRandom;

use crate::value::GeneratedValue;

/// Values generated for referenced columns, keyed by `table.column`.
///
/// Append-only within a run; insertion order is the generation order.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    values: BTreeMap<String, Vec<GeneratedValue>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, column_key: &str, value: GeneratedValue) {
        match self.values.get_mut(column_key) {
            Some(values) => values.push(value),
            None => {
                self.values.insert(column_key.to_string(), vec![value]);
            }
        }
    }

    pub fn candidates(&self, column_key: &str) -> &[GeneratedValue] {
        self.values
            .get(column_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self, column_key: &str) -> usize {
        self.candidates(column_key).len()
    }

    pub fn is_empty(&self, column_key: &str) -> bool {
        self.candidates(column_key).is_empty()
    }

    /// Uniform pick among the cached values.
    pub fn pick_random(
        &self,
        column_key: &str,
        rng: &mut dyn RngCore,
    ) -> Option<&GeneratedValue> {
        self.candidates(column_key).choose(rng)
    }

    /// The value generated at `position` (zero-based).
    pub fn pick_at(&self, column_key: &str, position: usize) -> Option<&GeneratedValue> {
        self.candidates(column_key).get(position)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::value::Value;

    fn cache_with_ids(n: i64) -> ReferenceCache {
        let mut cache = ReferenceCache::new();
        for id in 1..=n {
            cache.record("author.id", Value::Int(id).into());
        }
        cache
    }

    #[test]
    fn keeps_generation_order() {
        let cache = cache_with_ids(3);
        let ids: Vec<i64> = cache
            .candidates("author.id")
            .iter()
            .filter_map(|value| value.primary.as_i64())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(cache.pick_at("author.id", 1).unwrap().primary, Value::Int(2));
        assert!(cache.pick_at("author.id", 3).is_none());
    }

    #[test]
    fn random_pick_stays_within_candidates() {
        let cache = cache_with_ids(4);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let picked = cache.pick_random("author.id", &mut rng).unwrap();
            assert!((1..=4).contains(&picked.primary.as_i64().unwrap()));
        }
    }

    #[test]
    fn unknown_column_has_no_candidates() {
        let mut cache = cache_with_ids(2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert!(cache.is_empty("book.id"));
        assert!(cache.pick_random("book.id", &mut rng).is_none());

        cache.clear();
        assert_eq!(cache.len("author.id"), 0);
    }
}
