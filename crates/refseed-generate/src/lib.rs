//! Referential test-data synthesis for refseed.
//!
//! Tables are filled in foreign-key order. Referenced values are cached so
//! dependent rows only point at values that exist, unique columns are tracked
//! across the run, and the result renders to `INSERT` or `COPY` SQL.

pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod output;
pub mod row;
pub mod synthesizer;
pub mod tracker;
pub mod value;

pub use cache::ReferenceCache;
pub use config::SynthesisConfig;
pub use engine::{GeneratedDataset, TableRows, TableSynthesisEngine};
pub use errors::SynthesisError;
pub use generators::{
    BuiltinGenerator, ChoiceGenerator, EmailPolicy, FnGenerator, Generator, GeneratorRegistry,
    ResolvedBy,
};
pub use model::{Access, AccessPolicy, SynthesisOptions, SynthesisReport, TableReport};
pub use output::{OutputFormat, StatementRenderer, write_statements};
pub use row::{RowGenerator, RowGeneratorFactory};
pub use synthesizer::RowSynthesizer;
pub use tracker::UniquenessTracker;
pub use value::{GeneratedValue, Row, Value};
