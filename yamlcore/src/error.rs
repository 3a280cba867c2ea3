//! Error types for document registry operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::report::SaveFailure;

/// Result type alias using YamlCoreError.
pub type Result<T> = std::result::Result<T, YamlCoreError>;

/// Errors that can occur while scanning, reading, mutating or persisting documents.
#[derive(Error, Debug)]
pub enum YamlCoreError {
    /// No document is indexed under the identifier.
    #[error("document not found: {id}")]
    NotFound { id: String },

    /// A document with the identifier is already indexed, or its file already exists.
    #[error("document already exists: {id} ({})", .path.display())]
    AlreadyExists { id: String, path: PathBuf },

    /// Two files discovered during a scan map to the same identifier.
    #[error(
        "identifier collision for '{id}': '{}' and '{}'",
        .first.display(),
        .second.display()
    )]
    IdCollision {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The identifier cannot be turned into a file name.
    #[error("invalid document id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    /// A key path is malformed.
    #[error("invalid key path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Failed to create a directory.
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to list a directory during a scan.
    #[error("failed to read directory '{path}': {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a new document file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a document file.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a document file.
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to delete a document file.
    #[error("failed to delete file '{path}': {source}")]
    FileDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document file is not valid YAML.
    #[error("failed to parse '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A document file parsed, but its root is not a mapping.
    #[error("document root of '{}' is not a mapping", .path.display())]
    NotAMapping { path: PathBuf },

    /// One or more documents failed to save during a bulk save.
    #[error("failed to save {} document(s): {}", .failures.len(), failed_ids(.failures))]
    SaveFailed { failures: Vec<SaveFailure> },

    /// YAML conversion error for typed access.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

fn failed_ids(failures: &[SaveFailure]) -> String {
    failures
        .iter()
        .map(|f| f.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<figment::Error> for YamlCoreError {
    fn from(error: figment::Error) -> Self {
        Self::Config(Box::new(error))
    }
}

impl YamlCoreError {
    /// Create a NotFound error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an InvalidId error.
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a DirectoryCreation error.
    pub fn directory_creation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreation {
            path: path.into(),
            source,
        }
    }

    /// Create a DirectoryRead error.
    pub fn directory_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryRead {
            path: path.into(),
            source,
        }
    }

    /// Create a FileCreate error.
    pub fn file_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileCreate {
            path: path.into(),
            source,
        }
    }

    /// Create a FileRead error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a FileWrite error.
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a FileDelete error.
    pub fn file_delete(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileDelete {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised because an identifier is not indexed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for errors raised because an identifier is already taken.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = YamlCoreError::not_found("gold");
        assert_eq!(err.to_string(), "document not found: gold");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_io_error_carries_path() {
        let err = YamlCoreError::file_write(
            "/data/gold.yml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("/data/gold.yml"));
        assert!(message.contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_save_failed_lists_ids() {
        let err = YamlCoreError::SaveFailed {
            failures: vec![
                SaveFailure {
                    id: "alpha".into(),
                    error: YamlCoreError::not_found("alpha"),
                },
                SaveFailure {
                    id: "beta".into(),
                    error: YamlCoreError::not_found("beta"),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "failed to save 2 document(s): alpha, beta"
        );
    }
}
