use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::SynthesisError;
use crate::generators::{BuiltinGenerator, EmailPolicy, GeneratorRegistry};
use crate::model::{AccessPolicy, DEFAULT_MAX_UNIQUE_ATTEMPTS, SynthesisOptions};
use crate::output::OutputFormat;

/// Run configuration, usually read from `refseed.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub seed: Option<u64>,
    pub schema: Option<String>,
    pub ignore_schema: bool,
    pub max_unique_attempts: u32,
    /// `insert` or `copy`.
    pub format: Option<String>,
    pub truncate: bool,
    /// Enable the built-in person/credential generators matched by column name.
    /// They rank below every configured override.
    pub standard_columns: bool,
    pub rows: BTreeMap<String, u64>,
    pub generators: GeneratorOverrides,
    pub sequential_access: Vec<SequentialAccessRule>,
    pub email: EmailConfig,
}

/// Built-in generator ids keyed by type tag, column name or `table.column`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOverrides {
    pub by_type: BTreeMap<String, String>,
    pub by_column: BTreeMap<String, String>,
    pub by_qualified_column: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequentialAccessRule {
    pub table: String,
    /// Referenced column as `table.column`.
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub staff_tables: Option<Vec<String>>,
    pub staff_domain: Option<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            seed: None,
            schema: None,
            ignore_schema: true,
            max_unique_attempts: DEFAULT_MAX_UNIQUE_ATTEMPTS,
            format: None,
            truncate: false,
            standard_columns: true,
            rows: BTreeMap::new(),
            generators: GeneratorOverrides::default(),
            sequential_access: Vec::new(),
            email: EmailConfig::default(),
        }
    }
}

impl SynthesisConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, SynthesisError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, SynthesisError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Output format, defaulting to `insert`.
    pub fn output_format(&self) -> Result<OutputFormat, SynthesisError> {
        match &self.format {
            Some(raw) => raw.parse(),
            None => Ok(OutputFormat::Insert),
        }
    }

    pub fn email_policy(&self) -> EmailPolicy {
        let mut policy = EmailPolicy::default();
        if let Some(tables) = &self.email.staff_tables {
            policy.staff_tables = tables.clone();
        }
        if let Some(domain) = &self.email.staff_domain {
            policy.staff_domain = domain.clone();
        }
        policy
    }

    pub fn options(&self) -> Result<SynthesisOptions, SynthesisError> {
        let mut access = AccessPolicy::new();
        for rule in &self.sequential_access {
            if rule.target.rsplit_once('.').is_none() {
                return Err(SynthesisError::Configuration(format!(
                    "sequential access target '{}' for table '{}' must be table.column",
                    rule.target, rule.table
                )));
            }
            access.set_sequential(&rule.table, &rule.target);
        }

        Ok(SynthesisOptions {
            max_unique_attempts: self.max_unique_attempts,
            schema: self.schema.clone(),
            ignore_schema: self.ignore_schema,
            access,
        })
    }

    /// Registry with the configured overrides layered over the built-in defaults.
    pub fn build_registry(&self) -> Result<GeneratorRegistry, SynthesisError> {
        let email = self.email_policy();
        let mut registry = if self.standard_columns {
            GeneratorRegistry::with_standard_columns(email.clone())
        } else {
            GeneratorRegistry::new()
        };

        for (data_type, id) in &self.generators.by_type {
            let generator = lookup_builtin(id, &email)?;
            registry.register_type(data_type, Arc::new(generator));
        }
        for (column, id) in &self.generators.by_column {
            let generator = lookup_builtin(id, &email)?;
            registry.register_column(column.clone(), Arc::new(generator));
        }
        for (qualified, id) in &self.generators.by_qualified_column {
            let generator = lookup_builtin(id, &email)?;
            registry.register_qualified_column(qualified.clone(), Arc::new(generator));
        }
        Ok(registry)
    }
}

fn lookup_builtin(id: &str, email: &EmailPolicy) -> Result<BuiltinGenerator, SynthesisError> {
    BuiltinGenerator::from_id(id, email).ok_or_else(|| {
        SynthesisError::Configuration(format!(
            "unknown generator id '{id}' (known: {})",
            BuiltinGenerator::IDS.join(", ")
        ))
    })
}
