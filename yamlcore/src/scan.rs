//! Directory discovery for document files.
//!
//! A scan reports three kinds of outcome per location: matching files, nothing
//! at all (an empty directory simply contributes no entries), and locations that
//! could not be read. The last kind is reported as [`ScanEntry::Unreadable`]
//! so the caller decides whether to skip or abort; it is never folded into
//! "empty".

use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

/// A file whose name ends with the configured extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name with the extension suffix removed.
    pub stem: String,
    /// Directory names between the scan root and the file.
    pub relative_dirs: Vec<String>,
}

impl DiscoveredFile {
    /// `relative_dirs` and `stem` joined with `/`.
    pub fn relative_id(&self) -> String {
        let mut parts = self.relative_dirs.clone();
        parts.push(self.stem.clone());
        parts.join("/")
    }
}

/// One outcome of a scan.
#[derive(Debug)]
pub enum ScanEntry {
    /// A matching document file.
    File(DiscoveredFile),
    /// A directory or entry that could not be read.
    Unreadable {
        path: PathBuf,
        error: std::io::Error,
    },
}

/// Walk `root` and report document files ending in `extension`.
///
/// Without `recursive` only direct children of `root` are considered. Entries
/// come in filesystem enumeration order, which is platform-defined. Symbolic
/// links are followed; loops and dangling links are reported as unreadable.
pub fn scan(root: &Path, extension: &str, recursive: bool) -> Vec<ScanEntry> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    return None;
                }
                let Some(name) = entry.file_name().to_str() else {
                    trace!(path = %entry.path().display(), "ignoring non UTF-8 file name");
                    return None;
                };
                let stem = match_extension(name, extension)?;
                trace!(path = %entry.path().display(), "discovered document file");
                Some(ScanEntry::File(DiscoveredFile {
                    path: entry.path().to_path_buf(),
                    stem: stem.to_string(),
                    relative_dirs: relative_dirs(root, entry.path()),
                }))
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                Some(ScanEntry::Unreadable {
                    path,
                    error: err.into(),
                })
            }
        })
        .collect()
}

/// File name without `extension` if it ends with it and something precedes it.
pub fn match_extension<'a>(file_name: &'a str, extension: &str) -> Option<&'a str> {
    file_name
        .strip_suffix(extension)
        .filter(|stem| !stem.is_empty())
}

fn relative_dirs(root: &Path, path: &Path) -> Vec<String> {
    let Ok(relative) = path.strip_prefix(root) else {
        return Vec::new();
    };
    relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}
