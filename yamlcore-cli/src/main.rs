//! yamlcore CLI - inspect and edit a directory of YAML documents.
//!
//! Commands:
//! - `yamlcore list [--json]`: List documents
//! - `yamlcore get <id> <key>`: Print a value
//! - `yamlcore set <id> <key> <value>`: Set a value and save
//! - `yamlcore unset <id> <key>`: Remove a value and save
//! - `yamlcore keys <id> [parent] [--deep]`: List keys
//! - `yamlcore show <id>`: Print a document
//! - `yamlcore create <id>` / `yamlcore remove <id>`: Create or delete a document
//! - `yamlcore save-all`: Rewrite every document
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error

use std::io;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yamlcore::Registry;
use yamlcore_cli::{commands, Cli};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level
    let filter = if cli.debug {
        EnvFilter::new("yamlcore=debug,yamlcore_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    std::process::exit(result_to_exit(run(cli)));
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = commands::load_config(&cli)?;
    let root = config.scan_root();
    let registry = Registry::from_config(config)
        .with_context(|| format!("failed to open {}", root.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(&cli.command, &registry, &mut out)
}

/// Convert a `Result<(), E: Display>` to an exit code.
fn result_to_exit<E: std::fmt::Display>(result: Result<(), E>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamlcore_cli::Commands;

    #[test]
    fn test_cli_parsing_list() {
        let cli = Cli::parse_from(["yamlcore", "list"]);
        assert!(!cli.debug);
        assert!(matches!(cli.command, Commands::List { json: false }));
    }

    #[test]
    fn test_cli_parsing_list_json() {
        let cli = Cli::parse_from(["yamlcore", "list", "--json"]);
        assert!(matches!(cli.command, Commands::List { json: true }));
    }

    #[test]
    fn test_cli_parsing_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["yamlcore", "get", "gold", "amount", "--dir", "/tmp/x", "-r", "--debug"]);
        assert!(cli.debug);
        assert!(cli.recursive);
        assert_eq!(cli.dir, Some(std::path::PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::Get { id, key } => {
                assert_eq!(id, "gold");
                assert_eq!(key, "amount");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parsing_keys() {
        let cli = Cli::parse_from(["yamlcore", "keys", "world", "spawn", "--deep"]);
        assert!(matches!(
            cli.command,
            Commands::Keys { ref parent, deep: true, .. } if parent.as_deref() == Some("spawn")
        ));

        let cli = Cli::parse_from(["yamlcore", "keys", "world"]);
        assert!(matches!(cli.command, Commands::Keys { parent: None, deep: false, .. }));
    }

    #[test]
    fn test_cli_parsing_save_all() {
        let cli = Cli::parse_from(["yamlcore", "save-all"]);
        assert!(matches!(cli.command, Commands::SaveAll));
    }

    #[test]
    fn test_cli_parsing_set_requires_value() {
        assert!(Cli::try_parse_from(["yamlcore", "set", "gold", "amount"]).is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["yamlcore"]).is_err());
    }

    #[test]
    fn test_result_to_exit() {
        assert_eq!(result_to_exit::<String>(Ok(())), 0);
        assert_eq!(result_to_exit(Err("boom")), 1);
    }
}
