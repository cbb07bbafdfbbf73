use crate::engine::GeneratedDataset;
use crate::output::{
    RenderedStatements, StatementRenderer, emitted_columns, qualify, sequence_restarts,
};

const SESSION_PREAMBLE: &[&str] = &[
    "SET statement_timeout = 0;",
    "SET lock_timeout = 0;",
    "SET idle_in_transaction_session_timeout = 0;",
    "SET client_encoding = 'UTF8';",
    "SET standard_conforming_strings = on;",
    "SELECT pg_catalog.set_config('search_path', '', false);",
    "SET check_function_bodies = false;",
    "SET xmloption = content;",
    "SET client_min_messages = warning;",
    "SET row_security = off;",
];

/// `COPY ... FROM stdin` blocks with tab-separated rows, then `setval` per sequence.
///
/// The preamble empties `search_path`, so tables and sequences are schema-qualified.
///
/// Only primary values are written, so hashed columns never leak their plaintext.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyRenderer;

impl StatementRenderer for CopyRenderer {
    fn render(&self, dataset: &GeneratedDataset) -> RenderedStatements {
        let mut statements = vec![format!("{}\n", SESSION_PREAMBLE.join("\n"))];

        for entry in &dataset.tables {
            if !entry.rows.is_empty() {
                let columns = emitted_columns(&entry.table, &entry.rows);
                let mut block = format!(
                    "COPY {} ({}) FROM stdin;\n",
                    qualify(&dataset.schema, &entry.table.name),
                    columns.join(", ")
                );
                for row in &entry.rows {
                    let fields: Vec<String> = columns
                        .iter()
                        .map(|name| {
                            row.get(*name)
                                .map(|value| value.primary.to_copy_field())
                                .unwrap_or_else(|| "\\N".to_string())
                        })
                        .collect();
                    block.push_str(&fields.join("\t"));
                    block.push('\n');
                }
                block.push_str("\\.\n");
                statements.push(block);
            }
            for (sequence, next) in sequence_restarts(&dataset.schema, &entry.table, entry.rows.len()) {
                statements.push(format!(
                    "SELECT pg_catalog.setval('{sequence}', {next}, false);\n"
                ));
            }
        }

        RenderedStatements {
            preface: String::new(),
            statements,
        }
    }
}
