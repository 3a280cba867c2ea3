//! A single YAML document bound to one file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::Value;
use tracing::debug;
use ulid::Ulid;

use crate::error::{Result, YamlCoreError};
use crate::tree::YamlTree;

/// Shared handle to a document.
///
/// Cloning a `Document` yields another handle to the same document: a
/// mutation made through one handle is visible through every other. The tree
/// is the working copy; nothing reaches the file until [`Document::save`].
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

struct DocumentInner {
    id: String,
    location: PathBuf,
    tree: RwLock<YamlTree>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id)
            .field("location", &self.inner.location)
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Create a document from an already parsed tree.
    pub fn new(id: impl Into<String>, location: impl Into<PathBuf>, tree: YamlTree) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                id: id.into(),
                location: location.into(),
                tree: RwLock::new(tree),
            }),
        }
    }

    /// Read and parse `location` into a new document.
    pub fn load(id: impl Into<String>, location: impl Into<PathBuf>, separator: char) -> Result<Self> {
        let location = location.into();
        let tree = YamlTree::load(&location)?.with_separator(separator);
        Ok(Self::new(id, location, tree))
    }

    /// Identifier of this document.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// File this document persists to.
    pub fn location(&self) -> &Path {
        &self.inner.location
    }

    /// True if both handles refer to the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Change the in-memory value at `key`. No I/O.
    pub fn set_value(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.write_tree().set(key, value)
    }

    /// Change the value at `key` and save immediately.
    pub fn set_value_and_save(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Serialize `value` into the tree at `key`. No I/O.
    pub fn set_serialized<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.write_tree().set_serialized(key, value)
    }

    /// Remove the entry at `key`, returning the value it held. No I/O.
    pub fn remove_value(&self, key: &str) -> Option<Value> {
        self.write_tree().remove(key)
    }

    /// True iff an entry exists at `key`, including one holding `null`.
    pub fn has_value(&self, key: &str) -> bool {
        self.read_tree().contains(key)
    }

    /// Current in-memory value at `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.read_tree().get(key).cloned()
    }

    /// Current in-memory value at `key`, or `default` if there is none.
    pub fn get_value_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get_value(key).unwrap_or_else(|| default.into())
    }

    /// Deserialize the value at `key`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.read_tree().get_as(key)
    }

    /// Child key names under `parent_key`; see [`YamlTree::child_keys`].
    pub fn keys(&self, parent_key: &str, recursive: bool) -> Option<Vec<String>> {
        self.read_tree().child_keys(parent_key, recursive)
    }

    /// Snapshot of the current tree.
    pub fn tree(&self) -> YamlTree {
        self.read_tree().clone()
    }

    /// Replace the whole tree. The document's separator is kept.
    pub fn replace_tree(&self, tree: YamlTree) {
        let mut guard = self.write_tree();
        let separator = guard.separator();
        *guard = tree.with_separator(separator);
    }

    /// Write the tree to [`Document::location`], replacing the file's contents.
    pub fn save(&self) -> Result<()> {
        let yaml = self.read_tree().to_yaml_string()?;
        atomic_write(self.location(), yaml.as_bytes())?;
        debug!(id = %self.id(), path = %self.location().display(), "saved document");
        Ok(())
    }

    // Poison is ignored: the tree has no invariants spanning more than one write.
    fn read_tree(&self) -> RwLockReadGuard<'_, YamlTree> {
        self.inner.tree.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_tree(&self) -> RwLockWriteGuard<'_, YamlTree> {
        self.inner.tree.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Write to a temp file then rename for atomic persistence.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        YamlCoreError::file_write(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"),
        )
    })?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).map_err(|e| YamlCoreError::file_write(path, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(YamlCoreError::file_write(path, e));
    }
    Ok(())
}
