use thiserror::Error;

/// Errors emitted while synthesizing or rendering rows.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// No generator resolves for the column's data type.
    #[error("unsupported data type '{data_type}' for column {table}.{column}; register an override generator")]
    UnsupportedType {
        table: String,
        column: String,
        data_type: String,
    },
    /// A foreign key has no cached candidate values to draw from.
    #[error("no generated values for {target} referenced by {table}.{column}")]
    ReferentialGap {
        table: String,
        column: String,
        target: String,
    },
    /// Sequential access asked for a candidate past the end of the cache.
    #[error(
        "sequential access for {table}.{column} needs row {row_index} of {target}, only {available} generated"
    )]
    SequentialOverrun {
        table: String,
        column: String,
        target: String,
        row_index: u64,
        available: usize,
    },
    /// The dependency graph has a cycle once self-references are removed.
    #[error("foreign key cycle between tables: {}", .tables.join(", "))]
    Cycle { tables: Vec<String> },
    /// A unique column ran out of fresh values within the retry budget.
    #[error("could not find a new unique value for {table}.{column} after {attempts} attempts")]
    UniquenessExhausted {
        table: String,
        column: String,
        attempts: u32,
    },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("schema error: {0}")]
    Schema(refseed_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SynthesisError {
    /// True for conditions a caller may retry with a different generator or value space.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SynthesisError::UniquenessExhausted { .. })
    }
}

impl From<refseed_core::Error> for SynthesisError {
    fn from(err: refseed_core::Error) -> Self {
        match err {
            refseed_core::Error::DependencyCycle(tables) => SynthesisError::Cycle { tables },
            other => SynthesisError::Schema(other),
        }
    }
}
