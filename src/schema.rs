//! Schema definitions and compiled schema holders

use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::checksum::Checksum;
use crate::component::ComponentKey;
use crate::error::{Result, SchemaError, Violation};

/// Registration record for one (version, component) pair.
///
/// This is also the on-disk format of the files under `schemas/`:
///
/// ```json
/// {
///   "version": "v1",
///   "component": "/me",
///   "definitions": { "user": { "type": "object" } },
///   "operations": {
///     "get": { "type": "object", "properties": { "results": { "type": "array" } } }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// API version namespace (e.g. "v1")
    pub version: String,
    /// Literal path or regular expression
    pub component: String,
    /// Shared definitions merged into every operation schema
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub definitions: Map<String, Value>,
    /// Operation name -> JSON Schema
    #[serde(default)]
    pub operations: BTreeMap<String, Value>,
}

impl SchemaDefinition {
    pub fn new(version: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            component: component.into(),
            definitions: Map::new(),
            operations: BTreeMap::new(),
        }
    }

    pub fn with_operation(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.operations.insert(name.into(), schema);
        self
    }

    pub fn with_definition(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.definitions.insert(name.into(), schema);
        self
    }

    /// Fingerprint of the whole record
    pub fn checksum(&self) -> Checksum {
        Checksum::from_json(&serde_json::to_value(self).unwrap_or(Value::Null))
    }

    /// Display name used in errors, e.g. `v1:/me`
    pub fn label(&self) -> String {
        format!("{}:{}", self.version, self.component)
    }

    /// Structural checks that do not need a compiler
    pub(crate) fn check(&self) -> Result<()> {
        let invalid = |reason: &str| SchemaError::InvalidDefinition {
            name: self.label(),
            reason: reason.to_string(),
        };

        if self.version.trim().is_empty() {
            return Err(invalid("version is empty"));
        }
        if self.component.trim().is_empty() {
            return Err(invalid("component is empty"));
        }
        if self.operations.is_empty() {
            return Err(invalid("no operations declared"));
        }
        if let Some((name, _)) = self.operations.iter().find(|(_, s)| !s.is_object()) {
            return Err(invalid(&format!("operation '{}' is not a JSON object", name)));
        }
        if let Some(name) = self.operations.keys().find(|n| n.trim().is_empty()) {
            return Err(invalid(&format!("operation name '{}' is blank", name)));
        }
        Ok(())
    }
}

/// An operation schema with its definitions merged in, plus its compiled validator
pub struct Operation {
    schema: Value,
    validator: JSONSchema,
}

impl Operation {
    /// Merged schema document
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate `instance`, keeping at most `limit` failures
    pub fn validate(&self, instance: &Value, limit: usize) -> Vec<Violation> {
        match self.validator.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .take(limit.max(1))
                .map(|e| Violation::from_error(&e))
                .collect(),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("schema", &self.schema).finish_non_exhaustive()
    }
}

/// Immutable, compiled schemas for one (version, component)
#[derive(Debug)]
pub struct SchemaHolder {
    version: String,
    key: ComponentKey,
    definitions: Map<String, Value>,
    operations: BTreeMap<String, Operation>,
    checksum: Checksum,
}

impl SchemaHolder {
    /// Check and compile a definition
    pub fn compile(definition: SchemaDefinition, draft: Draft) -> Result<Self> {
        definition.check()?;
        let checksum = definition.checksum();

        let SchemaDefinition {
            version,
            component,
            definitions,
            operations,
        } = definition;

        let mut compiled = BTreeMap::new();
        for (name, schema) in operations {
            let schema = merge_definitions(schema, &definitions);
            let validator = JSONSchema::options()
                .with_draft(draft)
                .compile(&schema)
                .map_err(|e| SchemaError::InvalidSchema {
                    component: component.clone(),
                    operation: name.clone(),
                    reason: e.to_string(),
                })?;
            compiled.insert(name, Operation { schema, validator });
        }

        Ok(Self {
            version,
            key: ComponentKey::new(component),
            definitions,
            operations: compiled,
            checksum,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    pub fn definitions(&self) -> &Map<String, Value> {
        &self.definitions
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Operation names, sorted
    pub fn operation_names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }
}

/// Add the holder's shared definitions to a schema; keys already present in
/// the schema are kept.
fn merge_definitions(schema: Value, definitions: &Map<String, Value>) -> Value {
    if definitions.is_empty() {
        return schema;
    }
    match schema {
        Value::Object(mut map) => {
            map.entry("definitions")
                .or_insert_with(|| Value::Object(definitions.clone()));
            Value::Object(map)
        }
        other => other,
    }
}
