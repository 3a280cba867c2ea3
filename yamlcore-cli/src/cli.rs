//! CLI definition for the `yamlcore` command-line interface.
//!
//! Only depends on `clap` and `std`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// yamlcore - inspect and edit a directory of YAML documents
///
/// Every `*.yml` file under the directory is a document named after the file.
#[derive(Parser, Debug)]
#[command(name = "yamlcore")]
#[command(version)]
#[command(about = "Inspect and edit a directory of YAML documents")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Directory the documents live under
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Subdirectory of --dir to use as the document root
    #[arg(long, global = true, value_name = "NAME")]
    pub subdir: Option<String>,

    /// Also scan subdirectories of the document root
    #[arg(short, long, global = true)]
    pub recursive: bool,

    /// Document file extension (default: .yml)
    #[arg(long, global = true, value_name = "EXT")]
    pub extension: Option<String>,

    /// YAML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the value at a key
    Get {
        /// Document id
        id: String,
        /// Dotted key path, e.g. `spawn.x`
        key: String,
    },
    /// Set the value at a key and save the document
    Set {
        /// Document id
        id: String,
        /// Dotted key path
        key: String,
        /// Value, parsed as YAML (`42`, `true`, `[a, b]`); anything else is a string
        value: String,
    },
    /// Remove the entry at a key and save the document
    Unset {
        /// Document id
        id: String,
        /// Dotted key path
        key: String,
    },
    /// List the keys under a parent key
    Keys {
        /// Document id
        id: String,
        /// Parent key path; the document root when omitted
        parent: Option<String>,
        /// List every descendant path instead of direct children
        #[arg(long)]
        deep: bool,
    },
    /// Print a whole document
    Show {
        /// Document id
        id: String,
    },
    /// Create an empty document
    Create {
        /// Document id
        id: String,
    },
    /// Delete a document and its file
    Remove {
        /// Document id
        id: String,
    },
    /// Rewrite every document from its in-memory tree
    SaveAll,
}
