//! Schema Registry
//!
//! Holds every compiled schema, grouped by API version. A registry is
//! assembled once through [`RegistryBuilder`] and is read-only afterwards, so
//! it can be shared across test threads behind an `Arc`.

use jsonschema::Draft;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::checksum::Checksum;
use crate::config::SchemaConfig;
use crate::error::{Result, SchemaError};
use crate::loader;
use crate::schema::{SchemaDefinition, SchemaHolder};

/// Components registered under one version, in registration order
#[derive(Debug, Default)]
pub struct VersionSet {
    holders: Vec<SchemaHolder>,
    by_key: HashMap<String, usize>,
}

impl VersionSet {
    /// Exact lookup by key text
    pub fn get(&self, component: &str) -> Option<&SchemaHolder> {
        self.by_key.get(component).map(|&idx| &self.holders[idx])
    }

    /// Holders in registration order
    pub fn holders(&self) -> &[SchemaHolder] {
        &self.holders
    }

    /// Component keys in registration order
    pub fn keys(&self) -> Vec<String> {
        self.holders.iter().map(|h| h.key().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

/// The main schema registry
#[derive(Debug)]
pub struct SchemaRegistry {
    versions: BTreeMap<String, VersionSet>,
    checksum: Checksum,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry of the schema bundle shipped with the crate
    pub fn embedded() -> Result<Self> {
        Ok(Self::builder().load_embedded()?.build())
    }

    /// Registry described by `config`
    pub fn from_config(config: &SchemaConfig) -> Result<Self> {
        let mut builder = Self::builder().draft(config.validation.draft.as_jsonschema());
        if config.registry.include_embedded {
            builder = builder.load_embedded()?;
        }
        for dir in &config.registry.schema_dirs {
            builder = builder.load_directory(dir)?;
        }
        Ok(builder.build())
    }

    /// Registered versions, sorted
    pub fn versions(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }

    /// The only registered version, if there is exactly one
    pub fn sole_version(&self) -> Option<&str> {
        match self.versions.len() {
            1 => self.versions.keys().next().map(String::as_str),
            _ => None,
        }
    }

    pub fn version(&self, version: &str) -> Option<&VersionSet> {
        self.versions.get(version)
    }

    /// Exact (version, component) lookup, no normalization
    pub fn get(&self, version: &str, component: &str) -> Option<&SchemaHolder> {
        self.versions.get(version)?.get(component)
    }

    /// Total number of (version, component) pairs
    pub fn len(&self) -> usize {
        self.versions.values().map(VersionSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fingerprint over every holder, in version then registration order
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }
}

/// Collects definitions and compiles them into a [`SchemaRegistry`]
#[derive(Debug)]
pub struct RegistryBuilder {
    draft: Draft,
    versions: BTreeMap<String, VersionSet>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            draft: Draft::Draft4,
            versions: BTreeMap::new(),
        }
    }

    /// Draft used for schemas registered after this call
    pub fn draft(mut self, draft: Draft) -> Self {
        self.draft = draft;
        self
    }

    /// Compile and add one definition
    pub fn register(mut self, definition: SchemaDefinition) -> Result<Self> {
        self.insert(definition)?;
        Ok(self)
    }

    /// Add several definitions, stopping at the first failure
    pub fn register_all(mut self, definitions: impl IntoIterator<Item = SchemaDefinition>) -> Result<Self> {
        for definition in definitions {
            self.insert(definition)?;
        }
        Ok(self)
    }

    /// Add the bundle compiled into the crate
    pub fn load_embedded(self) -> Result<Self> {
        self.register_all(loader::load_embedded()?)
    }

    /// Add every definition file below `dir`
    pub fn load_directory(self, dir: impl AsRef<Path>) -> Result<Self> {
        self.register_all(loader::load_from_directory(dir.as_ref())?)
    }

    pub fn build(self) -> SchemaRegistry {
        let checksum = Checksum::combine(
            self.versions
                .values()
                .flat_map(|set| set.holders.iter().map(SchemaHolder::checksum)),
        );

        let registry = SchemaRegistry {
            versions: self.versions,
            checksum,
        };
        tracing::info!(
            versions = ?registry.versions(),
            components = registry.len(),
            checksum = registry.checksum.short(),
            "schema registry built"
        );
        registry
    }

    fn insert(&mut self, definition: SchemaDefinition) -> Result<()> {
        let set = self.versions.entry(definition.version.clone()).or_default();
        if set.by_key.contains_key(&definition.component) {
            return Err(SchemaError::DuplicateComponent {
                version: definition.version,
                component: definition.component,
            });
        }

        tracing::debug!(
            version = %definition.version,
            component = %definition.component,
            operations = ?definition.operations.keys().collect::<Vec<_>>(),
            "registering schema"
        );

        let holder = SchemaHolder::compile(definition, self.draft)?;
        set.by_key.insert(holder.key().to_string(), set.holders.len());
        set.holders.push(holder);
        Ok(())
    }
}
