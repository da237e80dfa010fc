//! Schema Resolver
//!
//! Maps (version, request path, operation) to a registered schema and
//! validates response bodies against it.
//!
//! Lookup order for a component:
//! 1. the path as given (query string dropped)
//! 2. without a leading `/api` segment
//! 3. without a leading `/<version>` segment
//! 4. without one trailing `/`, then with the leading `/` dropped (or added)
//! 5. every registered key read as an anchored regex, in registration order,
//!    tried against each of the forms above
//!
//! ```no_run
//! use api_schemas::SchemaResolver;
//! use serde_json::json;
//!
//! let resolver = SchemaResolver::embedded().unwrap();
//! resolver
//!     .validate(&json!({"detail": "Authentication credentials were not provided."}),
//!               "/api/v1/hosts/?page=2", "unauthorized", None)
//!     .unwrap();
//! ```

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde_json::Value;
use std::sync::Arc;

use crate::component::{self, Stage};
use crate::config::SchemaConfig;
use crate::error::{Result, SchemaError};
use crate::registry::{SchemaRegistry, VersionSet};
use crate::schema::{Operation, SchemaHolder};

/// How a component string reached its registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The input, minus its query string, is a registered key
    Exact,
    /// A normalized form of the input is a registered key
    Normalized(Stage),
    /// A registered key matched as a regular expression
    Pattern,
}

/// Result of a successful lookup
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'r> {
    pub version: &'r str,
    pub holder: &'r SchemaHolder,
    pub operation: &'r Operation,
    pub matched_by: MatchKind,
}

impl<'r> Resolution<'r> {
    /// The schema, shared definitions merged in
    pub fn schema(&self) -> &'r Value {
        self.operation.schema()
    }

    pub fn component(&self) -> &'r str {
        self.holder.key().as_str()
    }
}

/// Resolves and validates against an injected [`SchemaRegistry`]
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    registry: Arc<SchemaRegistry>,
    default_version: Option<String>,
    max_reported_errors: usize,
}

impl SchemaResolver {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            default_version: None,
            max_reported_errors: 10,
        }
    }

    /// Resolver over the bundle compiled into the crate
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(Arc::new(SchemaRegistry::embedded()?)))
    }

    /// Registry and resolver settings from configuration
    pub fn from_config(config: &SchemaConfig) -> Result<Self> {
        let registry = SchemaRegistry::from_config(config)?;
        let mut resolver = Self::new(Arc::new(registry))
            .with_max_reported_errors(config.validation.max_reported_errors);
        if let Some(version) = &config.registry.default_version {
            resolver = resolver.with_default_version(version.clone());
        }
        Ok(resolver)
    }

    /// Version used when callers pass `None`
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = Some(version.into());
        self
    }

    pub fn with_max_reported_errors(mut self, limit: usize) -> Self {
        self.max_reported_errors = limit.max(1);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Pick the version to resolve against
    pub fn select_version<'a>(&'a self, version: Option<&'a str>) -> Result<&'a str> {
        let requested = version.or(self.default_version.as_deref());

        let version = match requested {
            Some(v) => v,
            None => {
                if self.registry.is_empty() {
                    return Err(SchemaError::UnknownVersion {
                        version: "(unspecified)".to_string(),
                        available: Vec::new(),
                    });
                }
                return self.registry.sole_version().ok_or_else(|| SchemaError::AmbiguousVersion {
                    available: self.registry.versions(),
                });
            }
        };

        if self.registry.version(version).is_none() {
            return Err(SchemaError::UnknownVersion {
                version: version.to_string(),
                available: self.registry.versions(),
            });
        }
        Ok(version)
    }

    /// Find the holder for `component`, without looking at operations
    pub fn locate<'a>(
        &'a self,
        version: Option<&'a str>,
        component: &str,
    ) -> Result<(&'a str, &'a SchemaHolder, MatchKind)> {
        let version = self.select_version(version)?;
        let set = self
            .registry
            .version(version)
            .ok_or_else(|| SchemaError::UnknownVersion {
                version: version.to_string(),
                available: self.registry.versions(),
            })?;

        let (holder, matched_by) = find_component(set, component, version)?;
        Ok((version, holder, matched_by))
    }

    /// Full lookup, reporting how the component matched
    pub fn resolve_entry<'a>(
        &'a self,
        version: Option<&'a str>,
        component: &str,
        operation: &str,
    ) -> Result<Resolution<'a>> {
        let (version, holder, matched_by) = self.locate(version, component)?;

        let op = holder
            .operation(operation)
            .ok_or_else(|| SchemaError::UnknownOperation {
                operation: operation.to_string(),
                component: holder.key().to_string(),
                available: holder.operation_names(),
            })?;

        tracing::debug!(
            version,
            component = holder.key().as_str(),
            requested = component,
            operation,
            matched_by = ?matched_by,
            "resolved schema"
        );

        Ok(Resolution {
            version,
            holder,
            operation: op,
            matched_by,
        })
    }

    /// Schema registered for (version, component, operation)
    pub fn resolve(&self, version: Option<&str>, component: &str, operation: &str) -> Result<Value> {
        self.resolve_entry(version, component, operation)
            .map(|r| r.schema().clone())
    }

    /// Validate `data` against the schema for (component, operation, version)
    pub fn validate(
        &self,
        data: &Value,
        component: &str,
        operation: &str,
        version: Option<&str>,
    ) -> Result<()> {
        tracing::debug!(?version, component, operation, "validate");
        let resolution = self.resolve_entry(version, component, operation)?;

        let failures = resolution.operation.validate(data, self.max_reported_errors);
        if failures.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            component,
            version = resolution.version,
            operation,
            failures = failures.len(),
            "Failure validating component"
        );

        Err(SchemaError::ValidationFailed {
            component: component.to_string(),
            version: resolution.version.to_string(),
            operation: operation.to_string(),
            failures,
        })
    }
}

fn find_component<'s>(
    set: &'s VersionSet,
    component: &str,
    version: &str,
) -> Result<(&'s SchemaHolder, MatchKind)> {
    let candidates = component::candidates(component, version);

    for (stage, path) in &candidates {
        if let Some(holder) = set.get(path) {
            let kind = match stage {
                Stage::Path => MatchKind::Exact,
                other => MatchKind::Normalized(*other),
            };
            return Ok((holder, kind));
        }
    }

    for holder in set.holders() {
        if candidates.iter().any(|(_, path)| holder.key().matches(path)) {
            return Ok((holder, MatchKind::Pattern));
        }
    }

    let normalized = component::normalize(component, version);
    let known = set.keys();
    let suggestion = closest_key(&normalized, &known);
    Err(SchemaError::UnknownComponent {
        component: normalized,
        version: version.to_string(),
        known,
        suggestion,
    })
}

/// Best fuzzy match for `query` among literal keys
fn closest_key(query: &str, known: &[String]) -> Option<String> {
    if query.is_empty() {
        return None;
    }
    let matcher = SkimMatcherV2::default();
    known
        .iter()
        .filter_map(|key| matcher.fuzzy_match(key, query).map(|score| (score, key)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, key)| key.clone())
}
