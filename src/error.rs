//! Error types for schema resolution and validation

use jsonschema::ValidationError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// One schema violation, detached from the validator and the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON Pointer to the offending value in the payload
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that failed
    pub schema_path: String,
    /// Failing keyword, e.g. `required`, `type`, `format`
    pub keyword: String,
    pub message: String,
}

impl Violation {
    pub fn from_error(error: &ValidationError<'_>) -> Self {
        let schema_path = error.schema_path.to_string();
        let keyword = schema_path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            instance_path: error.instance_path.to_string(),
            schema_path,
            keyword,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}'", self.message, self.instance_path)
    }
}

/// Schema registry errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("No version provided and multiple schema versions exist: {available:?}")]
    AmbiguousVersion { available: Vec<String> },

    #[error("No schema matching version '{version}' found. Choices include: {available:?}")]
    UnknownVersion { version: String, available: Vec<String> },

    #[error("No schema component matching '{component}' found in {version}. Choices include: {known:?}{}", suggestion_hint(.suggestion))]
    UnknownComponent {
        component: String,
        version: String,
        known: Vec<String>,
        suggestion: Option<String>,
    },

    #[error("No schema operation matching '{operation}' found for '{component}'. Choices include: {available:?}")]
    UnknownOperation {
        operation: String,
        component: String,
        available: Vec<String>,
    },

    #[error("{}", validation_summary(.component, .version, .operation, .failures))]
    ValidationFailed {
        component: String,
        version: String,
        operation: String,
        failures: Vec<Violation>,
    },

    #[error("Component '{component}' already registered for version {version}")]
    DuplicateComponent { version: String, component: String },

    #[error("Invalid schema definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("Schema for {component} ({operation}) does not compile: {reason}")]
    InvalidSchema {
        component: String,
        operation: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// Validator errors carried by a failed validation, empty for every other variant
    pub fn failures(&self) -> &[Violation] {
        match self {
            SchemaError::ValidationFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(key) => format!(" (did you mean '{}'?)", key),
        None => String::new(),
    }
}

fn validation_summary(
    component: &str,
    version: &str,
    operation: &str,
    failures: &[Violation],
) -> String {
    let first = failures
        .first()
        .map(Violation::to_string)
        .unwrap_or_else(|| "unknown failure".to_string());

    match failures.len() {
        0 | 1 => format!(
            "Failure validating component:{}, version:{}, name:{}: {}",
            component, version, operation, first
        ),
        n => format!(
            "Failure validating component:{}, version:{}, name:{}: {} (and {} more)",
            component,
            version,
            operation,
            first,
            n - 1
        ),
    }
}
