use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::schema::Table;

const SEQUENCE_TYPES: &[&str] = &["smallint", "integer", "bigint", "int2", "int4", "int8"];

/// Validate internal consistency of a set of tables.
///
/// This checks:
/// - duplicate tables/columns
/// - foreign key source columns and referenced targets exist
/// - sequence columns have an integer type
pub fn validate_tables(tables: &[Table]) -> Result<()> {
    let mut catalog: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for table in tables {
        if catalog.contains_key(table.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.name
            )));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    table.name, column.name
                )));
            }
            if column.is_sequence && !SEQUENCE_TYPES.contains(&column.data_type.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "sequence column {}.{} has non-integer type '{}'",
                    table.name, column.name, column.data_type
                )));
            }
        }

        catalog.insert(table.name.as_str(), columns);
    }

    for table in tables {
        let columns = catalog.get(table.name.as_str()).ok_or_else(|| {
            Error::InvalidSchema(format!("missing table in catalog: {}", table.name))
        })?;

        for fk in &table.foreign_keys {
            if !columns.contains(fk.column.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "foreign key column not found: {}.{}",
                    table.name, fk.column
                )));
            }

            let ref_columns = catalog.get(fk.target_table.as_str()).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "referenced table not found: {} (from {}.{})",
                    fk.target_table, table.name, fk.column
                ))
            })?;

            if !ref_columns.contains(fk.target_column.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "referenced column not found: {}",
                    fk.target_key()
                )));
            }
        }
    }

    Ok(())
}

/// Set `has_ref` on every column that some foreign key points at.
pub fn mark_referenced_columns(tables: &mut [Table]) {
    let targets: BTreeSet<String> = tables
        .iter()
        .flat_map(|table| table.foreign_keys.iter().map(|fk| fk.target_key()))
        .collect();

    for table in tables.iter_mut() {
        for column in &mut table.columns {
            if targets.contains(&column.qualified_name()) {
                column.has_ref = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn author() -> Table {
        Table::new(
            "author",
            vec![
                Column::new("", "id", "integer").sequence(),
                Column::new("", "name", "text"),
            ],
        )
    }

    #[test]
    fn accepts_consistent_tables() {
        let book = Table::new(
            "book",
            vec![
                Column::new("", "id", "integer").sequence(),
                Column::new("", "author_id", "integer"),
            ],
        )
        .with_foreign_key("author_id", "author", "id");

        validate_tables(&[author(), book]).expect("valid tables");
    }

    #[test]
    fn rejects_missing_target_column() {
        let book = Table::new("book", vec![Column::new("", "author_id", "integer")])
            .with_foreign_key("author_id", "author", "uuid");

        let err = validate_tables(&[author(), book]).unwrap_err();
        assert!(err.to_string().contains("author.uuid"));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let table = Table::new(
            "tag",
            vec![Column::new("", "slug", "text"), Column::new("", "slug", "text")],
        );
        assert!(matches!(
            validate_tables(&[table]),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn rejects_text_sequence() {
        let table = Table::new("tag", vec![Column::new("", "slug", "text").sequence()]);
        assert!(validate_tables(&[table]).is_err());
    }

    #[test]
    fn marks_fk_targets() {
        let book = Table::new("book", vec![Column::new("", "author_id", "integer")])
            .with_foreign_key("author_id", "author", "id");
        let mut tables = vec![author(), book];

        mark_referenced_columns(&mut tables);

        assert!(tables[0].column("id").unwrap().has_ref);
        assert!(!tables[0].column("name").unwrap().has_ref);
        assert!(!tables[1].column("author_id").unwrap().has_ref);
    }
}
