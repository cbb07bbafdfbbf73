use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::Table;

/// Summary of dependency graph structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Table dependency graph: each table maps to the tables it references.
///
/// Self-references are dropped on construction; a table referencing itself can
/// draw from its own earlier rows and never blocks ordering.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    references: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new(edges: BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut references: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (table, targets) in edges {
            for target in &targets {
                references.entry(target.clone()).or_default();
            }
            let entry = references.entry(table.clone()).or_default();
            entry.extend(targets.into_iter().filter(|target| *target != table));
        }

        Self { references }
    }

    pub fn from_tables(tables: &[Table]) -> Self {
        Self::new(
            tables
                .iter()
                .map(|table| (table.name.clone(), table.referenced_tables()))
                .collect(),
        )
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.references.len(),
            edges: self.references.values().map(BTreeSet::len).sum(),
        }
    }

    pub fn references(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.references.get(table)
    }

    /// Deterministic processing order: every table follows the tables it references.
    pub fn order(&self) -> Result<Vec<String>> {
        Ok(self.levels()?.into_iter().flatten().collect())
    }

    /// Tables grouped into layers; tables within one layer do not depend on each other.
    pub fn levels(&self) -> Result<Vec<Vec<String>>> {
        let dependents = self.dependents();
        let mut indegree: BTreeMap<&str, usize> = self
            .references
            .iter()
            .map(|(node, targets)| (node.as_str(), targets.len()))
            .collect();

        let mut ready: BTreeSet<&str> = indegree
            .iter()
            .filter_map(|(node, count)| if *count == 0 { Some(*node) } else { None })
            .collect();

        let mut levels = Vec::new();
        let mut placed = 0;

        while !ready.is_empty() {
            let level: Vec<&str> = std::mem::take(&mut ready).into_iter().collect();
            for node in &level {
                indegree.remove(node);
                let Some(children) = dependents.get(node) else {
                    continue;
                };
                for child in children {
                    if let Some(count) = indegree.get_mut(child) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            ready.insert(*child);
                        }
                    }
                }
            }
            placed += level.len();
            levels.push(level.into_iter().map(str::to_string).collect());
        }

        if placed == self.references.len() {
            Ok(levels)
        } else {
            let blocked = indegree.into_keys().map(str::to_string).collect();
            Err(Error::DependencyCycle(blocked))
        }
    }

    fn dependents(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (node, targets) in &self.references {
            for target in targets {
                dependents
                    .entry(target.as_str())
                    .or_default()
                    .insert(node.as_str());
            }
        }
        dependents
    }
}
