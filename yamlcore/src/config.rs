//! Registry configuration.
//!
//! A `RegistryConfig` can be built in code, or loaded with [`RegistryConfig::load`]
//! from layered sources (later sources override earlier):
//!
//! 1. Default values
//! 2. An optional YAML configuration file
//! 3. Environment variables prefixed with `YAMLCORE_` (e.g. `YAMLCORE_RECURSIVE=true`)

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, YamlCoreError};
use crate::tree::DEFAULT_SEPARATOR;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "YAMLCORE_";

/// Default document file extension.
pub const DEFAULT_EXTENSION: &str = ".yml";

/// How identifiers are derived from discovered files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// The file name without the extension (`sub/gold.yml` → `gold`).
    #[default]
    FileStem,
    /// The path relative to the scan root, `/`-joined, without the extension
    /// (`sub/gold.yml` → `sub/gold`).
    RelativePath,
}

/// What a scan does when two files map to the same identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Fail construction with [`YamlCoreError::IdCollision`].
    #[default]
    Reject,
    /// Keep the first file discovered and skip later ones with a warning.
    KeepFirst,
}

/// What a scan does with directories and files it cannot read or parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorPolicy {
    /// Log a warning and leave the entry out of the index.
    #[default]
    Skip,
    /// Abort the scan with the underlying error.
    Fail,
}

/// Options for building a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directory documents live under.
    pub base_directory: PathBuf,
    /// Optional directory below `base_directory` to use as the scan root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdirectory: Option<String>,
    /// Descend into subdirectories of the scan root.
    pub recursive: bool,
    /// File name suffix of document files, matched case-sensitively.
    pub extension: String,
    /// Separator between key path segments.
    pub path_separator: char,
    pub id_scheme: IdScheme,
    pub on_collision: CollisionPolicy,
    pub on_scan_error: ScanErrorPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from("."),
            subdirectory: None,
            recursive: false,
            extension: DEFAULT_EXTENSION.to_string(),
            path_separator: DEFAULT_SEPARATOR,
            id_scheme: IdScheme::default(),
            on_collision: CollisionPolicy::default(),
            on_scan_error: ScanErrorPolicy::default(),
        }
    }
}

impl RegistryConfig {
    /// Default configuration rooted at `base_directory`.
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            ..Self::default()
        }
    }

    /// Layered figment: defaults, then `config_file` if given, then environment.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration from defaults, an optional YAML file and the environment.
    ///
    /// An explicitly named `config_file` must exist.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(YamlCoreError::file_read(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "configuration file not found"),
                ));
            }
        }

        let config: Self = Self::figment(config_file).extract()?;
        debug!(
            base_directory = %config.base_directory.display(),
            recursive = config.recursive,
            extension = %config.extension,
            "loaded registry configuration"
        );
        Ok(config.normalized())
    }

    /// The directory that gets scanned: `base_directory[/subdirectory]`.
    pub fn scan_root(&self) -> PathBuf {
        match &self.subdirectory {
            Some(sub) if !sub.is_empty() => self.base_directory.join(sub),
            _ => self.base_directory.clone(),
        }
    }

    /// Copy with the extension given a leading dot.
    pub fn normalized(mut self) -> Self {
        self.extension = normalize_extension(&self.extension);
        self
    }

    /// Check that the options can drive a scan.
    pub fn validate(&self) -> Result<()> {
        let bare = self.extension.trim_start_matches('.');
        if bare.is_empty() {
            return Err(YamlCoreError::invalid_path(
                &self.extension,
                "extension must contain more than dots",
            ));
        }
        if self.extension.contains(['/', '\\']) {
            return Err(YamlCoreError::invalid_path(
                &self.extension,
                "extension must not contain path separators",
            ));
        }
        Ok(())
    }
}

/// Add a leading dot to `ext` if it lacks one.
pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}
