mod builtin;
mod words;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use rand::seq::IndexedRandom;

use refseed_core::{Column, normalize_type_tag};

use crate::errors::SynthesisError;
use crate::value::{GeneratedValue, Value};

pub use builtin::{BuiltinGenerator, EmailPolicy};

/// Value-producing capability for a column.
pub trait Generator: Send + Sync {
    /// Stable identifier used in reports.
    fn id(&self) -> &str;

    fn generate(
        &self,
        column: &Column,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, SynthesisError>;
}

/// Which layer of the registry produced a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    QualifiedColumn,
    ColumnName,
    DataType,
    Default,
}

/// Layered generator lookup owned by one engine.
///
/// Resolution order, first match wins: qualified column (`table.column`),
/// bare column name, data type tag, then the built-ins (by column name for
/// people and credentials, otherwise by type tag).
#[derive(Clone)]
pub struct GeneratorRegistry {
    by_qualified_column: HashMap<String, Arc<dyn Generator>>,
    by_column: HashMap<String, Arc<dyn Generator>>,
    by_type: HashMap<String, Arc<dyn Generator>>,
    builtin_columns: HashMap<String, Arc<dyn Generator>>,
    defaults: HashMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Registry with the built-in type defaults and no overrides.
    pub fn new() -> Self {
        let mut defaults: HashMap<String, Arc<dyn Generator>> = HashMap::new();
        for (tag, generator) in builtin::type_defaults() {
            defaults.insert(tag.to_string(), Arc::new(generator));
        }

        Self {
            by_qualified_column: HashMap::new(),
            by_column: HashMap::new(),
            by_type: HashMap::new(),
            builtin_columns: HashMap::new(),
            defaults,
        }
    }

    /// Registry that also knows the built-in people and credential columns.
    ///
    /// These sit below every override, so a `register_type` still wins for them.
    pub fn with_standard_columns(email: EmailPolicy) -> Self {
        let mut registry = Self::new();
        for (name, generator) in builtin::standard_columns(email) {
            let generator: Arc<dyn Generator> = Arc::new(generator);
            registry.builtin_columns.insert(name.to_string(), generator);
        }
        registry
    }

    pub fn register_qualified_column(
        &mut self,
        key: impl Into<String>,
        generator: Arc<dyn Generator>,
    ) -> &mut Self {
        self.by_qualified_column.insert(key.into(), generator);
        self
    }

    pub fn register_column(
        &mut self,
        name: impl Into<String>,
        generator: Arc<dyn Generator>,
    ) -> &mut Self {
        self.by_column.insert(name.into(), generator);
        self
    }

    pub fn register_type(&mut self, data_type: &str, generator: Arc<dyn Generator>) -> &mut Self {
        self.by_type.insert(normalize_type_tag(data_type), generator);
        self
    }

    pub fn resolve(&self, column: &Column) -> Result<&dyn Generator, SynthesisError> {
        self.resolve_with_layer(column)
            .map(|(_, generator)| generator)
    }

    pub fn resolve_with_layer(
        &self,
        column: &Column,
    ) -> Result<(ResolvedBy, &dyn Generator), SynthesisError> {
        if let Some(generator) = self.by_qualified_column.get(&column.qualified_name()) {
            return Ok((ResolvedBy::QualifiedColumn, generator.as_ref()));
        }
        if let Some(generator) = self.by_column.get(&column.name) {
            return Ok((ResolvedBy::ColumnName, generator.as_ref()));
        }
        if let Some(generator) = self.by_type.get(&column.data_type) {
            return Ok((ResolvedBy::DataType, generator.as_ref()));
        }
        if let Some(generator) = self.builtin_columns.get(&column.name) {
            return Ok((ResolvedBy::Default, generator.as_ref()));
        }
        if let Some(generator) = self.defaults.get(&column.data_type) {
            return Ok((ResolvedBy::Default, generator.as_ref()));
        }

        Err(SynthesisError::UnsupportedType {
            table: column.table.clone(),
            column: column.name.clone(),
            data_type: column.data_type.clone(),
        })
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = |map: &HashMap<String, Arc<dyn Generator>>| {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            keys
        };
        f.debug_struct("GeneratorRegistry")
            .field("by_qualified_column", &keys(&self.by_qualified_column))
            .field("by_column", &keys(&self.by_column))
            .field("by_type", &keys(&self.by_type))
            .field("builtin_columns", &keys(&self.builtin_columns))
            .field("defaults", &keys(&self.defaults))
            .finish()
    }
}

/// Uniform pick from a fixed pool of values.
#[derive(Debug, Clone)]
pub struct ChoiceGenerator {
    id: String,
    values: Vec<Value>,
}

impl ChoiceGenerator {
    pub fn new(id: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }
}

impl Generator for ChoiceGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(
        &self,
        column: &Column,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, SynthesisError> {
        self.values
            .choose(rng)
            .cloned()
            .map(GeneratedValue::new)
            .ok_or_else(|| {
                SynthesisError::Configuration(format!(
                    "generator '{}' for {} has no values",
                    self.id,
                    column.qualified_name()
                ))
            })
    }
}

type GenerateFn =
    dyn Fn(&Column, &mut dyn RngCore) -> Result<GeneratedValue, SynthesisError> + Send + Sync;

/// Generator backed by a closure.
pub struct FnGenerator {
    id: String,
    func: Box<GenerateFn>,
}

impl FnGenerator {
    pub fn new<F>(id: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Column, &mut dyn RngCore) -> Result<GeneratedValue, SynthesisError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            func: Box::new(func),
        }
    }
}

impl Generator for FnGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(
        &self,
        column: &Column,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, SynthesisError> {
        (self.func)(column, rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn constant(id: &str, text: &str) -> Arc<dyn Generator> {
        Arc::new(ChoiceGenerator::new(id, vec![Value::Text(text.to_string())]))
    }

    #[test]
    fn resolution_prefers_most_specific_override() {
        let column = Column::new("user", "email", "character varying");
        let mut registry = GeneratorRegistry::new();

        assert_eq!(
            registry.resolve_with_layer(&column).unwrap().0,
            ResolvedBy::Default
        );

        registry.register_type("CHARACTER VARYING", constant("by_type", "t"));
        assert_eq!(registry.resolve(&column).unwrap().id(), "by_type");

        registry.register_column("email", constant("by_name", "n"));
        assert_eq!(registry.resolve(&column).unwrap().id(), "by_name");

        registry.register_qualified_column("user.email", constant("by_qualified", "q"));
        let (layer, generator) = registry.resolve_with_layer(&column).unwrap();
        assert_eq!(layer, ResolvedBy::QualifiedColumn);
        assert_eq!(generator.id(), "by_qualified");

        let other = Column::new("admin", "email", "character varying");
        assert_eq!(registry.resolve(&other).unwrap().id(), "by_name");
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let registry = GeneratorRegistry::new();
        let column = Column::new("place", "location", "geometry");

        match registry.resolve(&column) {
            Err(SynthesisError::UnsupportedType {
                table,
                column,
                data_type,
            }) => {
                assert_eq!(table, "place");
                assert_eq!(column, "location");
                assert_eq!(data_type, "geometry");
            }
            other => panic!("expected unsupported type, got {:?}", other.map(|g| g.id().to_string())),
        }
    }

    #[test]
    fn standard_columns_cover_people_and_credentials() {
        let registry = GeneratorRegistry::with_standard_columns(EmailPolicy::default());
        for name in ["first_name", "last_name", "email", "phone", "password"] {
            let column = Column::new("member", name, "text");
            assert_eq!(
                registry.resolve_with_layer(&column).unwrap().0,
                ResolvedBy::Default,
                "{name}"
            );
        }
    }

    #[test]
    fn type_override_beats_builtin_column_generators() {
        let mut registry = GeneratorRegistry::with_standard_columns(EmailPolicy::default());
        registry.register_type("text", constant("user.by_type", "t"));

        let email = Column::new("customer", "email", "text");
        let (layer, generator) = registry.resolve_with_layer(&email).unwrap();
        assert_eq!(layer, ResolvedBy::DataType);
        assert_eq!(generator.id(), "user.by_type");

        let phone = Column::new("customer", "phone", "varchar");
        assert_eq!(registry.resolve(&phone).unwrap().id(), "person.phone");

        registry.register_column("phone", constant("user.by_column", "p"));
        assert_eq!(registry.resolve(&phone).unwrap().id(), "user.by_column");
    }

    #[test]
    fn empty_choice_is_a_configuration_error() {
        let generator = ChoiceGenerator::new("empty", Vec::new());
        let column = Column::new("tag", "slug", "text");
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(matches!(
            generator.generate(&column, &mut rng),
            Err(SynthesisError::Configuration(_))
        ));
    }

    #[test]
    fn fn_generator_calls_closure() {
        let generator = FnGenerator::new("fixed", |_, _| Ok(Value::Int(9).into()));
        let column = Column::new("t", "c", "integer");
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(
            generator.generate(&column, &mut rng).unwrap().primary,
            Value::Int(9)
        );
    }
}
