use crate::engine::GeneratedDataset;
use crate::output::{
    RenderedStatements, StatementRenderer, emitted_columns, qualify, sequence_restarts,
};

/// One `INSERT ... OVERRIDING SYSTEM VALUE` per row, then sequence restarts.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertRenderer {
    truncate: bool,
}

impl InsertRenderer {
    /// With `truncate`, every table is emptied and its identities reset first.
    pub fn new(truncate: bool) -> Self {
        Self { truncate }
    }
}

impl StatementRenderer for InsertRenderer {
    fn render(&self, dataset: &GeneratedDataset) -> RenderedStatements {
        let preface = if self.truncate {
            dataset
                .tables
                .iter()
                .map(|entry| {
                    format!(
                        "TRUNCATE TABLE {} RESTART IDENTITY CASCADE;",
                        qualify(&dataset.schema, &entry.table.name)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            String::new()
        };

        let mut statements = Vec::new();
        for entry in &dataset.tables {
            let table = qualify(&dataset.schema, &entry.table.name);
            let columns = emitted_columns(&entry.table, &entry.rows);
            let column_list = columns.join(", ");
            for row in &entry.rows {
                let values: Vec<String> = columns
                    .iter()
                    .map(|name| {
                        row.get(*name)
                            .map(|value| value.primary.to_sql_literal())
                            .unwrap_or_else(|| "NULL".to_string())
                    })
                    .collect();
                statements.push(format!(
                    "INSERT INTO {table} ({column_list}) OVERRIDING SYSTEM VALUE VALUES ({});",
                    values.join(", ")
                ));
            }
            if let Some(last) = statements.last_mut() {
                if !entry.rows.is_empty() {
                    last.push('\n');
                }
            }
            for (sequence, next) in sequence_restarts(&dataset.schema, &entry.table, entry.rows.len()) {
                statements.push(format!("ALTER SEQUENCE {sequence} RESTART WITH {next};\n"));
            }
        }

        RenderedStatements {
            preface,
            statements,
        }
    }
}
