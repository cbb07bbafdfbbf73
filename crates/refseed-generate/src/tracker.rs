use std::collections::{HashMap, HashSet};

use crate::value::Value;

/// Values already assigned to unique columns during one run, keyed by `table.column`.
#[derive(Debug, Default)]
pub struct UniquenessTracker {
    seen: HashMap<String, HashSet<Value>>,
}

impl UniquenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for `column_key` unless it was already assigned.
    ///
    /// Returns `false` and leaves the tracker unchanged when the value is a duplicate.
    pub fn insert(&mut self, column_key: &str, value: &Value) -> bool {
        match self.seen.get_mut(column_key) {
            Some(values) => {
                if values.contains(value) {
                    return false;
                }
                values.insert(value.clone());
                true
            }
            None => {
                self.seen
                    .insert(column_key.to_string(), HashSet::from([value.clone()]));
                true
            }
        }
    }

    pub fn contains(&self, column_key: &str, value: &Value) -> bool {
        self.seen
            .get(column_key)
            .is_some_and(|values| values.contains(value))
    }

    pub fn len(&self, column_key: &str) -> usize {
        self.seen.get(column_key).map_or(0, HashSet::len)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicates_per_column() {
        let mut tracker = UniquenessTracker::new();
        let slug = Value::Text("intro".to_string());

        assert!(tracker.insert("tag.slug", &slug));
        assert!(!tracker.insert("tag.slug", &slug));
        assert!(tracker.insert("post.slug", &slug));
        assert_eq!(tracker.len("tag.slug"), 1);
        assert!(tracker.contains("post.slug", &slug));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut tracker = UniquenessTracker::new();
        tracker.insert("user.email", &Value::Text("a@b.com".to_string()));
        tracker.clear();

        assert_eq!(tracker.len("user.email"), 0);
        assert!(tracker.insert("user.email", &Value::Text("a@b.com".to_string())));
    }
}
