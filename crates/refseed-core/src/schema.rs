use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A table with its columns and outgoing foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyEdge>,
}

/// Column metadata including the constraint flags the synthesizer honours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    /// Owning table. Filled in from the enclosing table when omitted.
    #[serde(default)]
    pub table: String,
    pub name: String,
    /// Normalized data type tag (e.g. `integer`, `character varying`).
    pub data_type: String,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub is_unique: bool,
    /// Target of at least one foreign key.
    #[serde(default)]
    pub has_ref: bool,
    /// Backed by an identity/serial sequence.
    #[serde(default)]
    pub is_sequence: bool,
    /// Name of the backing sequence, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
}

/// Single-column foreign key from the owning table to `target_table.target_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyEdge {
    pub column: String,
    pub target_table: String,
    pub target_column: String,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let mut table = Self {
            name: name.into(),
            columns,
            foreign_keys: Vec::new(),
        };
        table.bind_columns();
        table
    }

    pub fn with_foreign_key(
        mut self,
        column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyEdge {
            column: column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
        });
        self
    }

    /// Point every column back at this table and normalize its type tag.
    pub fn bind_columns(&mut self) {
        for column in &mut self.columns {
            column.table = self.name.clone();
            column.data_type = normalize_type_tag(&column.data_type);
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn is_foreign_key_column(&self, name: &str) -> bool {
        self.foreign_keys.iter().any(|fk| fk.column == name)
    }

    /// Columns that are not the source of a foreign key, in declaration order.
    pub fn regular_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|column| !self.is_foreign_key_column(&column.name))
    }

    pub fn sequence_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| column.is_sequence)
    }

    pub fn has_sequence(&self) -> bool {
        self.columns.iter().any(|column| column.is_sequence)
    }

    /// Tables this table references, excluding itself.
    pub fn referenced_tables(&self) -> BTreeSet<String> {
        self.foreign_keys
            .iter()
            .filter(|fk| !fk.is_self_reference(&self.name))
            .map(|fk| fk.target_table.clone())
            .collect()
    }
}

impl Column {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: impl AsRef<str>,
    ) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            data_type: normalize_type_tag(data_type.as_ref()),
            is_nullable: false,
            max_length: None,
            is_unique: false,
            has_ref: false,
            is_sequence: false,
            sequence: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn referenced(mut self) -> Self {
        self.has_ref = true;
        self
    }

    pub fn sequence(mut self) -> Self {
        self.is_sequence = true;
        self
    }

    pub fn with_sequence_name(mut self, name: impl Into<String>) -> Self {
        self.is_sequence = true;
        self.sequence = Some(name.into());
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// `table.column` identity used by caches and overrides.
    pub fn qualified_name(&self) -> String {
        column_key(&self.table, &self.name)
    }

    /// Backing sequence name, falling back to the serial naming convention.
    pub fn sequence_name(&self) -> String {
        self.sequence
            .clone()
            .unwrap_or_else(|| format!("{}_{}_seq", self.table, self.name))
    }
}

impl ForeignKeyEdge {
    /// `target_table.target_column` identity of the referenced column.
    pub fn target_key(&self) -> String {
        column_key(&self.target_table, &self.target_column)
    }

    pub fn is_self_reference(&self, table: &str) -> bool {
        self.target_table == table
    }
}

/// Lowercase a type name and drop any modifiers, so `VARCHAR(255)` becomes `varchar`.
pub fn normalize_type_tag(raw: &str) -> String {
    raw.split('(')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_lowercase()
}

pub fn column_key(table: &str, column: &str) -> String {
    format!("{table}.{column}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_type_modifiers() {
        assert_eq!(normalize_type_tag("VARCHAR(255)"), "varchar");
        assert_eq!(
            normalize_type_tag(" Character Varying "),
            "character varying"
        );
    }

    #[test]
    fn regular_columns_skip_foreign_keys() {
        let table = Table::new(
            "book",
            vec![
                Column::new("", "id", "integer").sequence(),
                Column::new("", "author_id", "integer"),
                Column::new("", "title", "text"),
            ],
        )
        .with_foreign_key("author_id", "author", "id");

        let names: Vec<&str> = table
            .regular_columns()
            .map(|column| column.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "title"]);
        assert_eq!(table.columns[1].table, "book");
    }

    #[test]
    fn referenced_tables_exclude_self() {
        let table = Table::new(
            "category",
            vec![
                Column::new("", "id", "integer"),
                Column::new("", "parent_id", "integer").nullable(),
            ],
        )
        .with_foreign_key("parent_id", "category", "id");

        assert!(table.referenced_tables().is_empty());
    }

    #[test]
    fn sequence_name_defaults_to_serial_convention() {
        let column = Column::new("author", "id", "integer").sequence();
        assert_eq!(column.sequence_name(), "author_id_seq");

        let named = Column::new("author", "id", "integer").with_sequence_name("public.author_seq");
        assert_eq!(named.sequence_name(), "public.author_seq");
    }
}
