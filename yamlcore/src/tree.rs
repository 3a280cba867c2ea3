//! In-memory YAML tree addressed by separator-delimited key paths.
//!
//! `YamlTree` wraps a `serde_yaml::Mapping` and resolves keys such as
//! `settings.spawn.x` by walking nested mappings. Mapping keys that are not
//! strings (`1: one`) are addressed by their string form.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Result, YamlCoreError};

/// Default separator between key path segments.
pub const DEFAULT_SEPARATOR: char = '.';

/// Hierarchical key/value tree parsed from, and serialized to, one YAML file.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlTree {
    root: Mapping,
    separator: char,
}

impl Default for YamlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlTree {
    /// Create an empty tree using the default separator.
    pub fn new() -> Self {
        Self {
            root: Mapping::new(),
            separator: DEFAULT_SEPARATOR,
        }
    }

    /// Wrap an existing mapping.
    pub fn from_mapping(root: Mapping) -> Self {
        Self {
            root,
            separator: DEFAULT_SEPARATOR,
        }
    }

    /// Use a different key path separator.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Parse YAML text. Empty text, or text holding only comments, yields an empty tree.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_from(text, Path::new("<memory>"))
    }

    /// Read and parse a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| YamlCoreError::file_read(path, e))?;
        Self::parse_from(&text, path)
    }

    fn parse_from(text: &str, origin: &Path) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        let value: Value = serde_yaml::from_str(text).map_err(|source| YamlCoreError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        match value {
            Value::Mapping(root) => Ok(Self::from_mapping(root)),
            Value::Null => Ok(Self::new()),
            _ => Err(YamlCoreError::NotAMapping {
                path: origin.to_path_buf(),
            }),
        }
    }

    /// Serialize the tree as YAML text.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// The key path separator.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// The top-level mapping.
    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    /// Consume the tree, returning the top-level mapping.
    pub fn into_mapping(self) -> Mapping {
        self.root
    }

    /// True when the tree has no top-level entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Value stored at `path`, if an entry exists.
    ///
    /// Resolving through a non-mapping value, or a malformed path, yields `None`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = self.split(path)?;
        let (last, parents) = segments.split_last()?;

        let mut current = &self.root;
        for segment in parents {
            match lookup(current, segment) {
                Some(Value::Mapping(child)) => current = child,
                _ => return None,
            }
        }
        lookup(current, last)
    }

    /// True iff an entry exists at `path`. An entry holding `null` counts.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Deserialize the value at `path` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        self.get(path)
            .map(|value| serde_yaml::from_value(value.clone()))
            .transpose()
            .map_err(YamlCoreError::from)
    }

    /// Store `value` at `path`, creating intermediate mappings.
    ///
    /// Intermediate entries that are not mappings are replaced by mappings.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = self.split_checked(path)?;
        set_in(&mut self.root, &segments, value.into());
        Ok(())
    }

    /// Serialize `value` and store it at `path`.
    pub fn set_serialized<T: Serialize>(&mut self, path: &str, value: &T) -> Result<()> {
        let value = serde_yaml::to_value(value)?;
        self.set(path, value)
    }

    /// Remove the entry at `path`, returning the value it held.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let segments = self.split(path)?;
        let (last, parents) = segments.split_last()?;

        let mut current = &mut self.root;
        for segment in parents {
            let key = resolve_key(current, segment)?;
            match current.get_mut(&key) {
                Some(Value::Mapping(child)) => current = child,
                _ => return None,
            }
        }
        let key = resolve_key(current, last)?;
        current.shift_remove(&key)
    }

    /// Key names under the mapping at `path`.
    ///
    /// An empty `path` addresses the root. With `recursive`, every descendant
    /// is listed as a full path relative to `path`, parents before children.
    /// Returns `None` if `path` does not resolve to a mapping.
    pub fn child_keys(&self, path: &str, recursive: bool) -> Option<Vec<String>> {
        let section = if path.is_empty() {
            &self.root
        } else {
            match self.get(path)? {
                Value::Mapping(map) => map,
                _ => return None,
            }
        };

        let mut keys = Vec::new();
        collect_keys(section, None, recursive, self.separator, &mut keys);
        Some(keys)
    }

    fn split<'a>(&self, path: &'a str) -> Option<Vec<&'a str>> {
        if path.is_empty() {
            return None;
        }
        let segments: Vec<&str> = path.split(self.separator).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(segments)
    }

    fn split_checked<'a>(&self, path: &'a str) -> Result<Vec<&'a str>> {
        if path.is_empty() {
            return Err(YamlCoreError::invalid_path(path, "key path is empty"));
        }
        self.split(path).ok_or_else(|| {
            YamlCoreError::invalid_path(
                path,
                format!("empty segment between '{}' separators", self.separator),
            )
        })
    }
}

/// String form of a mapping key, if it has one.
fn key_name(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Find the actual key in `map` whose string form is `segment`.
fn resolve_key(map: &Mapping, segment: &str) -> Option<Value> {
    if map.contains_key(segment) {
        return Some(Value::String(segment.to_string()));
    }
    map.keys()
        .find(|k| key_name(k).as_deref() == Some(segment))
        .cloned()
}

fn lookup<'m>(map: &'m Mapping, segment: &str) -> Option<&'m Value> {
    if let Some(value) = map.get(segment) {
        return Some(value);
    }
    map.iter()
        .find(|(k, _)| key_name(k).as_deref() == Some(segment))
        .map(|(_, v)| v)
}

fn set_in(map: &mut Mapping, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let key = resolve_key(map, head).unwrap_or_else(|| Value::String(head.to_string()));

    if rest.is_empty() {
        map.insert(key, value);
        return;
    }

    if !matches!(map.get(&key), Some(Value::Mapping(_))) {
        map.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(child)) = map.get_mut(&key) {
        set_in(child, rest, value);
    }
}

fn collect_keys(
    map: &Mapping,
    prefix: Option<&str>,
    recursive: bool,
    separator: char,
    out: &mut Vec<String>,
) {
    for (key, value) in map {
        let Some(name) = key_name(key) else {
            continue;
        };
        let full = match prefix {
            Some(prefix) => format!("{prefix}{separator}{name}"),
            None => name,
        };
        if recursive {
            if let Value::Mapping(child) = value {
                out.push(full.clone());
                collect_keys(child, Some(&full), true, separator, out);
                continue;
            }
        }
        out.push(full);
    }
}
