//! File-backed YAML document registry
//!
//! `yamlcore` manages a directory of YAML documents, one per file, each
//! addressed by an identifier derived from its file name. A [`Registry`] scans
//! its root directory once, then serves lookups, creation, deletion and
//! dotted-path value access over the indexed documents.
//!
//! # Architecture
//!
//! - **One file per document**: `gold.yml` is the document `gold`
//! - **Working copies**: edits stay in memory until a document is saved
//! - **Case-insensitive ids**: `Gold` and `gold` name the same document
//! - **Shared handles**: a [`Document`] is a cheap handle; clones see the same tree
//!
//! ```rust,ignore
//! use yamlcore::Registry;
//!
//! let registry = Registry::open("plugins/Bank").subdirectory("accounts").build()?;
//! if !registry.exists("gold") {
//!     registry.create("gold")?;
//! }
//! registry.set_value("gold", "balance.amount", 150)?;
//! registry.save("gold")?;
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod registry;
pub mod report;
pub mod scan;
pub mod tree;

pub use config::{CollisionPolicy, IdScheme, RegistryConfig, ScanErrorPolicy};
pub use document::Document;
pub use error::{Result, YamlCoreError};
pub use registry::{Registry, RegistryBuilder};
pub use report::{SaveFailure, SaveReport};
pub use tree::YamlTree;

pub use serde_yaml::{Mapping, Value};
