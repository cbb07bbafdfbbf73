pub mod copy;
pub mod insert;

use std::fmt;
use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use refseed_core::Table;

use crate::engine::GeneratedDataset;
use crate::errors::SynthesisError;
use crate::value::Row;

pub use copy::CopyRenderer;
pub use insert::InsertRenderer;

/// SQL rendering of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `INSERT` per row.
    Insert,
    /// `COPY ... FROM stdin` bulk load.
    Copy,
}

impl FromStr for OutputFormat {
    type Err = SynthesisError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "copy" => Ok(Self::Copy),
            other => Err(SynthesisError::Configuration(format!(
                "unknown output format '{other}' (expected insert or copy)"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("insert"),
            Self::Copy => f.write_str("copy"),
        }
    }
}

impl OutputFormat {
    pub fn renderer(self, truncate: bool) -> Box<dyn StatementRenderer> {
        match self {
            Self::Insert => Box::new(InsertRenderer::new(truncate)),
            Self::Copy => Box::new(CopyRenderer),
        }
    }
}

/// Statements ready to be written, preceded by an optional preface block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedStatements {
    pub preface: String,
    pub statements: Vec<String>,
}

/// Turns generated rows into SQL text.
pub trait StatementRenderer {
    fn render(&self, dataset: &GeneratedDataset) -> RenderedStatements;
}

/// Full file contents: header comment, preface, then statements.
pub fn render_document(
    renderer: &dyn StatementRenderer,
    dataset: &GeneratedDataset,
    generated_at: DateTime<Local>,
) -> String {
    let rendered = renderer.render(dataset);
    let mut out = String::new();
    out.push_str("/**\n");
    out.push_str("  GENERATED AUTOMATICALLY. DO NOT ALTER THESE MANUALLY!\n");
    out.push_str(&format!(
        "  This file was generated on {}.\n",
        generated_at.format("%b %d %Y at %H:%M:%S")
    ));
    out.push_str(&format!("  run {}\n", dataset.report.run_id));
    out.push_str("*/\n\n");
    if !rendered.preface.is_empty() {
        out.push_str(&rendered.preface);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&rendered.statements.join("\n"));
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Render `dataset` and write it to `path` atomically. Returns bytes written.
pub fn write_statements(
    path: &Path,
    format: OutputFormat,
    dataset: &GeneratedDataset,
    truncate: bool,
) -> Result<u64, SynthesisError> {
    let renderer = format.renderer(truncate);
    let document = render_document(renderer.as_ref(), dataset, Local::now());
    write_bytes_atomic(path, document.as_bytes())?;
    Ok(document.len() as u64)
}

/// Write through a sibling temp file and rename, so readers never see a partial file.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = non_empty_parent(path) {
        create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    if let Err(err) = file.write_all(data).and_then(|()| file.sync_all()) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err);
    }

    std::fs::rename(&tmp_path, path)?;
    if let Some(parent) = non_empty_parent(path) {
        sync_dir(parent)?;
    }
    Ok(())
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "invalid path for atomic write")
    })?;
    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}

/// Columns present in the generated rows, in declaration order.
pub(crate) fn emitted_columns<'t>(table: &'t Table, rows: &[Row]) -> Vec<&'t str> {
    table
        .columns
        .iter()
        .filter(|column| rows.iter().any(|row| row.contains_key(&column.name)))
        .map(|column| column.name.as_str())
        .collect()
}

/// `schema.name`, unless `name` already carries a schema.
pub(crate) fn qualify(schema: &str, name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{schema}.{name}")
    }
}

/// `(qualified sequence name, next value)` for every sequence column of a table.
pub(crate) fn sequence_restarts(schema: &str, table: &Table, rows: usize) -> Vec<(String, u64)> {
    table
        .sequence_columns()
        .map(|column| (qualify(schema, &column.sequence_name()), rows as u64 + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_qualified_once() {
        assert_eq!(qualify("public", "author"), "public.author");
        assert_eq!(qualify("public", "audit.author_id_seq"), "audit.author_id_seq");

        let table = Table::new(
            "author",
            vec![refseed_core::Column::new("", "id", "integer").sequence()],
        );
        assert_eq!(
            sequence_restarts("library", &table, 3),
            vec![("library.author_id_seq".to_string(), 4)]
        );
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("INSERT".parse::<OutputFormat>().unwrap(), OutputFormat::Insert);
        assert_eq!(" copy ".parse::<OutputFormat>().unwrap(), OutputFormat::Copy);
        assert!(matches!(
            "csv".parse::<OutputFormat>(),
            Err(SynthesisError::Configuration(_))
        ));
    }

    #[test]
    fn atomic_write_replaces_file_without_leftovers() {
        let dir = std::env::temp_dir().join(format!("refseed-atomic-{}", uuid::Uuid::new_v4()));
        let path = dir.join("output.sql");

        write_bytes_atomic(&path, b"first").unwrap();
        write_bytes_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
