//! API Schemas
//!
//! JSON Schemas for the REST API of the job-orchestration server, grouped by
//! API version, and the resolver end-to-end tests use to check response
//! bodies against them.
//!
//! ## Features
//!
//! - **Explicit registration**: definitions are registered through
//!   [`RegistryBuilder`] and compiled up front, so a broken schema fails at
//!   startup instead of at first use
//! - **Path tolerant lookup**: full URLs, query strings, `/api/<version>`
//!   prefixes and trailing slashes all resolve to the documented component
//! - **Pattern components**: keys such as `/jobs/\d+` cover whole families of
//!   detail endpoints
//! - **Shared definitions**: one `definitions` block per component, merged into
//!   every operation schema
//!
//! ## Layout
//!
//! ```text
//! schemas/
//! ├── v1/
//! │   ├── authtoken.json
//! │   ├── me.json
//! │   ├── hosts.json
//! │   └── ...
//! └── v2/
//!     └── ...
//! ```

pub mod checksum;
pub mod component;
pub mod config;
pub mod error;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod schema;

pub use checksum::Checksum;
pub use component::{normalize, ComponentKey, Stage};
pub use config::{SchemaConfig, SchemaDraft};
pub use error::{Result, SchemaError, Violation};
pub use registry::{RegistryBuilder, SchemaRegistry, VersionSet};
pub use resolver::{MatchKind, Resolution, SchemaResolver};
pub use schema::{Operation, SchemaDefinition, SchemaHolder};
