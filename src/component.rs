//! Component keys and request-path normalization
//!
//! A component is the endpoint a schema documents. Registered keys are either
//! literal paths (`/me`, `authtoken`) or regular expressions
//! (`^/api/v1/jobs/\d+/$`). Incoming paths are full URLs or API paths and are
//! peeled one layer at a time until a key matches.

use regex::Regex;
use std::fmt;

/// A registered component key
#[derive(Debug, Clone)]
pub struct ComponentKey {
    raw: String,
    /// Anchored form of `raw`, absent when `raw` is not a valid regex
    pattern: Option<Regex>,
}

impl ComponentKey {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let pattern = Regex::new(&format!("^(?:{})$", raw)).ok();
        Self { raw, pattern }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the key can take part in pattern matching
    pub fn is_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    /// Whether the key is written as a regex rather than a plain path
    pub fn has_metacharacters(&self) -> bool {
        self.raw.contains(|c: char| "\\^$*+?()[]{}|".contains(c))
    }

    /// True when the key, read as a regex, covers the whole of `path`
    pub fn matches(&self, path: &str) -> bool {
        self.pattern
            .as_ref()
            .map(|re| re.is_match(path))
            .unwrap_or(false)
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ComponentKey {}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Which stage of the normalization pipeline produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Path as given, query string removed
    Path,
    /// Leading `/api` segment removed
    ApiPrefix,
    /// Leading `/<version>` segment removed
    VersionPrefix,
    /// Single trailing `/` removed
    TrailingSlash,
    /// Leading `/` removed, or added when the path had none
    LeadingSlash,
}

/// Ordered list of lookup candidates for `component` under `version`.
///
/// Each stage is applied to the output of the previous one; a stage that does
/// not change the path contributes no new candidate.
pub fn candidates(component: &str, version: &str) -> Vec<(Stage, String)> {
    let path = path_only(component);
    let mut out = vec![(Stage::Path, path.to_string())];

    let mut current = path.to_string();
    let steps: [(Stage, fn(&str, &str) -> Option<String>); 4] = [
        (Stage::ApiPrefix, |p, _| strip_segment(p, "api")),
        (Stage::VersionPrefix, strip_segment),
        (Stage::TrailingSlash, |p, _| strip_trailing_slash(p)),
        (Stage::LeadingSlash, |p, _| toggle_leading_slash(p)),
    ];

    for (stage, step) in steps {
        if let Some(next) = step(&current, version) {
            if next != current {
                current = next;
                out.push((stage, current.clone()));
            }
        }
    }

    out
}

/// Fully normalized form of `component`: query removed, `/api` and
/// `/<version>` prefixes removed, one trailing `/` removed.
///
/// The leading `/` is kept so normalized paths still read as paths.
pub fn normalize(component: &str, version: &str) -> String {
    candidates(component, version)
        .into_iter()
        .rev()
        .find(|(stage, _)| *stage != Stage::LeadingSlash)
        .map(|(_, path)| path)
        .unwrap_or_default()
}

/// Drop query string and fragment, then scheme and authority.
fn path_only(component: &str) -> &str {
    let end = component
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(component.len());
    let target = &component[..end];

    match target.find("://") {
        Some(idx) => {
            let after = &target[idx + 3..];
            match after.find('/') {
                Some(slash) => &after[slash..],
                None => "",
            }
        }
        None => target,
    }
}

/// Strip `/<segment>` when it is a whole leading segment.
fn strip_segment(path: &str, segment: &str) -> Option<String> {
    let rest = path.strip_prefix('/')?.strip_prefix(segment)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

fn strip_trailing_slash(path: &str) -> Option<String> {
    path.strip_suffix('/').map(String::from)
}

/// `/me` -> `me`, `me` -> `/me`
fn toggle_leading_slash(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    match path.strip_prefix('/') {
        Some(rest) => Some(rest.to_string()),
        None => Some(format!("/{}", path)),
    }
}
