use thiserror::Error;

/// Core error type shared across refseed crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// Foreign keys form a cycle once self-references are removed.
    #[error("dependency cycle between tables: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
    /// A catalog could not answer a request.
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results returned by refseed crates.
pub type Result<T> = std::result::Result<T, Error>;
