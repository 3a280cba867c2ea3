//! Index of the documents under one directory, with access by id.
//!
//! The registry is populated once by scanning its root directory and is then
//! mutated in place by [`Registry::create`], [`Registry::replace`] and
//! [`Registry::remove`]. Identifiers are matched case-insensitively and are
//! unique within a registry.
//!
//! # Thread safety
//!
//! `Registry` is `Send + Sync`. The index sits behind a single `RwLock`, which
//! is held for writing across the whole of every index-mutating operation,
//! file I/O included, so "check then create" and "delete then unindex" cannot
//! interleave with another thread of the same process. `save` and `save_all`
//! hold it for reading while they write, so they cannot race a `remove`.
//! Lookups hand out [`Document`] handles that alias the indexed documents;
//! saving through such a handle directly bypasses the index lock.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::config::{
    normalize_extension, CollisionPolicy, IdScheme, RegistryConfig, ScanErrorPolicy,
};
use crate::document::Document;
use crate::error::{Result, YamlCoreError};
use crate::report::SaveReport;
use crate::scan::{scan, ScanEntry};
use crate::tree::YamlTree;

/// Builder for `Registry`. Created by [`Registry::open`].
pub struct RegistryBuilder {
    config: RegistryConfig,
}

impl RegistryBuilder {
    /// Scan `base_directory/name` instead of `base_directory`.
    pub fn subdirectory(mut self, name: impl Into<String>) -> Self {
        self.config.subdirectory = Some(name.into());
        self
    }

    /// Descend into subdirectories while scanning.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.config.recursive = recursive;
        self
    }

    /// File suffix of document files. A leading dot is added if missing.
    pub fn extension(mut self, extension: &str) -> Self {
        self.config.extension = normalize_extension(extension);
        self
    }

    /// Separator between key path segments.
    pub fn path_separator(mut self, separator: char) -> Self {
        self.config.path_separator = separator;
        self
    }

    pub fn id_scheme(mut self, scheme: IdScheme) -> Self {
        self.config.id_scheme = scheme;
        self
    }

    pub fn on_collision(mut self, policy: CollisionPolicy) -> Self {
        self.config.on_collision = policy;
        self
    }

    pub fn on_scan_error(mut self, policy: ScanErrorPolicy) -> Self {
        self.config.on_scan_error = policy;
        self
    }

    /// Create the scan root if needed and load every document under it.
    pub fn build(self) -> Result<Registry> {
        Registry::from_config(self.config)
    }
}

/// Indexed collection of the documents under one directory.
pub struct Registry {
    config: RegistryConfig,
    root: PathBuf,
    documents: RwLock<Vec<Document>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("root", &self.root)
            .field("count", &self.count())
            .finish()
    }
}

impl Registry {
    /// Start building a registry over `base_directory`.
    ///
    /// ```rust,ignore
    /// let registry = Registry::open(plugin_dir)
    ///     .subdirectory("players")
    ///     .recursive(true)
    ///     .build()?;
    /// ```
    pub fn open(base_directory: impl Into<PathBuf>) -> RegistryBuilder {
        RegistryBuilder {
            config: RegistryConfig::new(base_directory),
        }
    }

    /// Build a registry from a loaded configuration.
    ///
    /// A missing scan root is created, parents included, and leaves the
    /// registry empty. Failing to create it is an error.
    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;
        let root = config.scan_root();
        let documents = load_index(&config, &root)?;

        debug!(
            root = %root.display(),
            documents = documents.len(),
            recursive = config.recursive,
            "registry opened"
        );

        Ok(Self {
            config,
            root,
            documents: RwLock::new(documents),
        })
    }

    /// Directory scanned for documents and where new ones are created.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configuration the registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Discard the index and scan the root again.
    ///
    /// Unsaved changes are lost. Handles obtained before the reload keep
    /// pointing at the discarded documents.
    pub fn reload(&self) -> Result<()> {
        let mut documents = self.write_index();
        *documents = load_index(&self.config, &self.root)?;
        debug!(root = %self.root.display(), documents = documents.len(), "registry reloaded");
        Ok(())
    }

    // --- Queries ---

    /// Identifiers of all documents, in index order.
    pub fn list(&self) -> Vec<String> {
        self.read_index()
            .iter()
            .map(|d| d.id().to_string())
            .collect()
    }

    /// Number of indexed documents.
    pub fn count(&self) -> usize {
        self.read_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_index().is_empty()
    }

    /// Handle to the document with `id`, if indexed.
    pub fn find(&self, id: &str) -> Option<Document> {
        let documents = self.read_index();
        position(&documents, id).map(|i| documents[i].clone())
    }

    /// True iff a document with `id` is indexed.
    pub fn exists(&self, id: &str) -> bool {
        position(&self.read_index(), id).is_some()
    }

    /// Handles to every document, in index order.
    pub fn documents(&self) -> Vec<Document> {
        self.read_index().clone()
    }

    // --- Index mutation ---

    /// Put `document` in place of the indexed document with the same id.
    ///
    /// Returns false, and inserts nothing, if no such document is indexed.
    pub fn replace(&self, document: Document) -> bool {
        let mut documents = self.write_index();
        match position(&documents, document.id()) {
            Some(i) => {
                documents[i] = document;
                true
            }
            None => false,
        }
    }

    /// Delete the document's file, then drop it from the index.
    ///
    /// Returns `Ok(false)` if `id` is not indexed. If the file cannot be
    /// deleted the error is returned and the document stays indexed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut documents = self.write_index();
        let Some(i) = position(&documents, id) else {
            return Ok(false);
        };

        let path = documents[i].location().to_path_buf();
        fs::remove_file(&path).map_err(|e| YamlCoreError::file_delete(&path, e))?;
        let removed = documents.remove(i);

        debug!(id = %removed.id(), path = %path.display(), "removed document");
        Ok(true)
    }

    /// Create an empty document file for `id` and index it.
    ///
    /// The file is `<root>/<id><extension>`. Fails with `AlreadyExists` if the
    /// id is indexed or the file already exists. The existence check and the
    /// exclusive file creation happen under the index lock, but another
    /// process can still create the file in between; that case surfaces as
    /// `AlreadyExists` too.
    pub fn create(&self, id: &str) -> Result<Document> {
        validate_id(id, self.config.id_scheme)?;

        let mut documents = self.write_index();
        let path = self.document_path(id);
        if position(&documents, id).is_some() {
            return Err(YamlCoreError::AlreadyExists {
                id: id.to_string(),
                path,
            });
        }

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| YamlCoreError::directory_creation(parent, e))?;
            }
        }

        let separator = self.config.path_separator;
        let document = create_document_file(id, &path, |p| Document::load(id, p, separator))?;
        documents.push(document.clone());

        debug!(id = %id, path = %path.display(), "created document");
        Ok(document)
    }

    // --- Per-document delegation ---
    //
    // These resolve `id` first and return `NotFound` when it is not indexed.
    // Callers are expected to check `exists` beforehand.

    /// Child key names under `parent_key` of document `id`.
    ///
    /// `Ok(None)` if `parent_key` is not a mapping. An empty `parent_key`
    /// addresses the document root.
    pub fn get_keys(&self, id: &str, parent_key: &str, recursive: bool) -> Result<Option<Vec<String>>> {
        Ok(self.resolve(id)?.keys(parent_key, recursive))
    }

    /// Change a value in memory. No I/O.
    ///
    /// Lookup, mutation and write-back into the index happen under one write
    /// lock, so a concurrent `remove` or `create` of the same id cannot slip
    /// in between.
    pub fn set_value(&self, id: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut documents = self.write_index();
        let i = position(&documents, id).ok_or_else(|| YamlCoreError::not_found(id))?;
        let document = documents[i].clone();
        document.set_value(key, value)?;
        documents[i] = document;
        Ok(())
    }

    /// Change a value and save the document, atomically with respect to
    /// other index operations.
    pub fn set_value_and_save(&self, id: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut documents = self.write_index();
        let i = position(&documents, id).ok_or_else(|| YamlCoreError::not_found(id))?;
        let document = documents[i].clone();
        document.set_value(key, value)?;
        documents[i] = document.clone();
        document.save()
    }

    /// Remove a value in memory, returning what it held. No I/O.
    pub fn remove_value(&self, id: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.resolve(id)?.remove_value(key))
    }

    pub fn get_value(&self, id: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.resolve(id)?.get_value(key))
    }

    pub fn get_value_or(&self, id: &str, key: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.resolve(id)?.get_value_or(key, default))
    }

    pub fn get_as<T: DeserializeOwned>(&self, id: &str, key: &str) -> Result<Option<T>> {
        self.resolve(id)?.get_as(key)
    }

    pub fn has_value(&self, id: &str, key: &str) -> Result<bool> {
        Ok(self.resolve(id)?.has_value(key))
    }

    /// Snapshot of a document's tree.
    pub fn tree(&self, id: &str) -> Result<YamlTree> {
        Ok(self.resolve(id)?.tree())
    }

    /// Replace a document's whole tree in memory.
    pub fn set_tree(&self, id: &str, tree: YamlTree) -> Result<()> {
        self.resolve(id)?.replace_tree(tree);
        Ok(())
    }

    /// Write one document to its file.
    ///
    /// The index stays read-locked until the write completes, so a save
    /// never recreates the file of a document removed in the meantime.
    pub fn save(&self, id: &str) -> Result<()> {
        let documents = self.read_index();
        let i = position(&documents, id).ok_or_else(|| YamlCoreError::not_found(id))?;
        documents[i].save()
    }

    /// Save every document in index order, continuing past failures.
    ///
    /// Holds the index read lock for the whole pass.
    pub fn save_all(&self) -> SaveReport {
        let mut report = SaveReport::default();
        {
            let documents = self.read_index();
            for document in documents.iter() {
                report.record(document.id(), document.save());
            }
        }

        if report.is_success() {
            debug!(saved = report.saved.len(), "saved all documents");
        } else {
            warn!(
                saved = report.saved.len(),
                failed = report.failures.len(),
                "some documents failed to save"
            );
        }
        report
    }

    /// Run `action` on every document in index order.
    ///
    /// `action` sees a snapshot of the index taken before the first call;
    /// changing the registry from inside `action` is not supported.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&Document),
    {
        for document in self.documents() {
            action(&document);
        }
    }

    // --- Internal ---

    fn resolve(&self, id: &str) -> Result<Document> {
        self.find(id).ok_or_else(|| YamlCoreError::not_found(id))
    }

    fn document_path(&self, id: &str) -> PathBuf {
        let mut path = self.root.clone();
        let mut segments = id.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{segment}{}", self.config.extension));
            }
        }
        path
    }

    // Poison is ignored: every writer leaves the index a valid Vec.
    fn read_index(&self) -> RwLockReadGuard<'_, Vec<Document>> {
        self.documents.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, Vec<Document>> {
        self.documents.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Case-insensitive identifier comparison.
pub fn ids_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn fold_case(id: &str) -> String {
    id.chars().flat_map(char::to_lowercase).collect()
}

fn position(documents: &[Document], id: &str) -> Option<usize> {
    documents.iter().position(|d| ids_match(d.id(), id))
}

fn validate_id(id: &str, scheme: IdScheme) -> Result<()> {
    if id.is_empty() {
        return Err(YamlCoreError::invalid_id(id, "id is empty"));
    }
    if id.contains(['\\', '\0']) {
        return Err(YamlCoreError::invalid_id(id, "id contains a forbidden character"));
    }
    match scheme {
        IdScheme::FileStem if id.contains('/') => Err(YamlCoreError::invalid_id(
            id,
            "'/' is only allowed with the relative_path id scheme",
        )),
        _ => {
            let bad_segment = id
                .split('/')
                .any(|s| s.is_empty() || s == "." || s == "..");
            if bad_segment {
                Err(YamlCoreError::invalid_id(id, "id has an empty, '.' or '..' segment"))
            } else {
                Ok(())
            }
        }
    }
}

/// Exclusively create the empty file at `path`, then load it with `load`.
///
/// The file is deleted again if `load` fails, so a failed create leaves
/// nothing behind.
fn create_document_file<F>(id: &str, path: &Path, load: F) -> Result<Document>
where
    F: FnOnce(&Path) -> Result<Document>,
{
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => YamlCoreError::AlreadyExists {
                id: id.to_string(),
                path: path.to_path_buf(),
            },
            _ => YamlCoreError::file_create(path, e),
        })?;

    load(path).inspect_err(|_| {
        let _ = fs::remove_file(path);
    })
}

/// Create `root` if missing, otherwise scan it into a fresh index.
fn load_index(config: &RegistryConfig, root: &Path) -> Result<Vec<Document>> {
    if !root.exists() {
        fs::create_dir_all(root).map_err(|e| YamlCoreError::directory_creation(root, e))?;
        debug!(root = %root.display(), "created registry root");
        return Ok(Vec::new());
    }

    if !root.is_dir() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "not a directory");
        match config.on_scan_error {
            ScanErrorPolicy::Skip => {
                warn!(root = %root.display(), "registry root is not a directory, index left empty");
                return Ok(Vec::new());
            }
            ScanErrorPolicy::Fail => return Err(YamlCoreError::directory_read(root, error)),
        }
    }

    let mut documents: Vec<Document> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for entry in scan(root, &config.extension, config.recursive) {
        let file = match entry {
            ScanEntry::File(file) => file,
            ScanEntry::Unreadable { path, error } => match config.on_scan_error {
                ScanErrorPolicy::Skip => {
                    warn!(path = %path.display(), %error, "skipping unreadable scan entry");
                    continue;
                }
                ScanErrorPolicy::Fail => return Err(YamlCoreError::directory_read(path, error)),
            },
        };

        let id = match config.id_scheme {
            IdScheme::FileStem => file.stem.clone(),
            IdScheme::RelativePath => file.relative_id(),
        };

        if let Some(&existing) = seen.get(&fold_case(&id)) {
            let first: &Document = &documents[existing];
            match config.on_collision {
                CollisionPolicy::Reject => {
                    return Err(YamlCoreError::IdCollision {
                        id,
                        first: first.location().to_path_buf(),
                        second: file.path,
                    });
                }
                CollisionPolicy::KeepFirst => {
                    warn!(
                        id = %id,
                        kept = %first.location().display(),
                        skipped = %file.path.display(),
                        "skipping document with duplicate id"
                    );
                    continue;
                }
            }
        }

        match Document::load(id.clone(), &file.path, config.path_separator) {
            Ok(document) => {
                seen.insert(fold_case(&id), documents.len());
                documents.push(document);
            }
            Err(error) => match config.on_scan_error {
                ScanErrorPolicy::Skip => {
                    warn!(path = %file.path.display(), %error, "skipping unreadable document");
                }
                ScanErrorPolicy::Fail => return Err(error),
            },
        }
    }

    Ok(documents)
}
