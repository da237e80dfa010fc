//! Schema Definition Loading
//!
//! Reads `SchemaDefinition` files from the bundle compiled into the crate or
//! from a directory on disk. Files are returned sorted by relative path so
//! registration order, and therefore pattern precedence, is deterministic.

use include_dir::{include_dir, Dir};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, SchemaError};
use crate::schema::SchemaDefinition;

/// Schema bundle shipped with the crate, one directory per API version
pub static EMBEDDED_SCHEMAS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

/// Definitions from the embedded bundle
pub fn load_embedded() -> Result<Vec<SchemaDefinition>> {
    load_from_embedded(&EMBEDDED_SCHEMAS)
}

/// Definitions from any `include_dir!` directory
pub fn load_from_embedded(embedded_dir: &'static Dir<'static>) -> Result<Vec<SchemaDefinition>> {
    let mut files: Vec<(&Path, &str)> = Vec::new();
    collect_embedded_files(embedded_dir, &mut files);
    files.sort_by(|a, b| a.0.cmp(b.0));

    files
        .into_iter()
        .map(|(path, content)| parse_definition(path, content))
        .collect()
}

/// Definitions from every `.json` file below `schema_dir`
pub fn load_from_directory(schema_dir: &Path) -> Result<Vec<SchemaDefinition>> {
    if !schema_dir.is_dir() {
        return Err(SchemaError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("schema directory {} does not exist", schema_dir.display()),
        )));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(schema_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| SchemaError::Io(e.into()))?;
        let path = entry.path();
        if path.is_file() && is_json(path) {
            paths.push(path.to_path_buf());
        }
    }

    let mut definitions = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path)?;
        let relative = path.strip_prefix(schema_dir).unwrap_or(path.as_path());
        definitions.push(parse_definition(relative, &content)?);
    }

    tracing::debug!(
        dir = %schema_dir.display(),
        count = definitions.len(),
        "loaded schema definitions"
    );
    Ok(definitions)
}

fn collect_embedded_files<'a>(dir: &'a Dir<'static>, files: &mut Vec<(&'a Path, &'a str)>) {
    for file in dir.files() {
        let path = file.path();
        if is_json(path) {
            if let Some(content) = file.contents_utf8() {
                files.push((path, content));
            }
        }
    }

    for subdir in dir.dirs() {
        collect_embedded_files(subdir, files);
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

fn parse_definition(path: &Path, content: &str) -> Result<SchemaDefinition> {
    serde_json::from_str(content).map_err(|e| SchemaError::InvalidDefinition {
        name: path.display().to_string(),
        reason: e.to_string(),
    })
}
