//! Subcommand handlers.
//!
//! Handlers write their normal output to `out` and report failures as errors;
//! the binary turns those into an exit code.

use std::io::Write;

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use serde_yaml::Value;
use tracing::debug;
use yamlcore::{Registry, RegistryConfig};

use crate::cli::{Cli, Commands};

/// Load configuration from `--config`, the environment and command-line flags.
pub fn load_config(cli: &Cli) -> Result<RegistryConfig> {
    let config = RegistryConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    Ok(apply_overrides(config, cli))
}

/// Command-line flags win over file and environment settings.
pub fn apply_overrides(mut config: RegistryConfig, cli: &Cli) -> RegistryConfig {
    if let Some(dir) = &cli.dir {
        config.base_directory = dir.clone();
    }
    if let Some(sub) = &cli.subdir {
        config.subdirectory = Some(sub.clone());
    }
    if cli.recursive {
        config.recursive = true;
    }
    if let Some(ext) = &cli.extension {
        config.extension = ext.clone();
    }
    config.normalized()
}

/// Run `command` against `registry`.
pub fn run(command: &Commands, registry: &Registry, out: &mut impl Write) -> Result<()> {
    debug!(?command, root = %registry.root().display(), "running command");
    match command {
        Commands::List { json } => list(registry, *json, out),
        Commands::Get { id, key } => {
            let Some(value) = registry.get_value(id, key)? else {
                bail!("'{id}' has no value at '{key}'");
            };
            writeln!(out, "{}", render_value(&value)?)?;
            Ok(())
        }
        Commands::Set { id, key, value } => {
            registry
                .set_value_and_save(id, key, parse_value(value))
                .with_context(|| format!("failed to set '{key}' in '{id}'"))?;
            Ok(())
        }
        Commands::Unset { id, key } => {
            if registry.remove_value(id, key)?.is_none() {
                bail!("'{id}' has no value at '{key}'");
            }
            registry.save(id)?;
            Ok(())
        }
        Commands::Keys { id, parent, deep } => {
            let parent = parent.as_deref().unwrap_or("");
            let Some(keys) = registry.get_keys(id, parent, *deep)? else {
                bail!("'{parent}' in '{id}' is not a mapping");
            };
            for key in keys {
                writeln!(out, "{key}")?;
            }
            Ok(())
        }
        Commands::Show { id } => {
            let yaml = registry.tree(id)?.to_yaml_string()?;
            write!(out, "{yaml}")?;
            Ok(())
        }
        Commands::Create { id } => {
            let document = registry.create(id)?;
            writeln!(out, "Created {}", document.location().display())?;
            Ok(())
        }
        Commands::Remove { id } => {
            if !registry.remove(id)? {
                bail!("document not found: {id}");
            }
            writeln!(out, "Removed {id}")?;
            Ok(())
        }
        Commands::SaveAll => {
            let saved = registry.save_all().into_result()?;
            writeln!(out, "Saved {} document(s)", saved.len())?;
            Ok(())
        }
    }
}

fn list(registry: &Registry, json: bool, out: &mut impl Write) -> Result<()> {
    let documents = registry.documents();

    if json {
        let entries: Vec<serde_json::Value> = documents
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id(),
                    "path": d.location().display().to_string(),
                })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    if documents.is_empty() {
        writeln!(out, "No documents found.")?;
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Id", "Path"]);
    for d in &documents {
        table.add_row(vec![d.id().to_string(), d.location().display().to_string()]);
    }

    writeln!(out, "{table}")?;
    writeln!(out)?;
    writeln!(out, "{} document(s) found", documents.len())?;
    Ok(())
}

/// Parse a command-line value as YAML, falling back to a plain string.
///
/// Empty input is an empty string, not null; `~` or `null` spell null.
pub fn parse_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Strings print bare; everything else prints as YAML.
fn render_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_yaml::to_string(other)?.trim_end().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn registry_with(files: &[(&str, &str)]) -> (TempDir, Registry) {
        let tmp = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(tmp.path().join(name), content).unwrap();
        }
        let registry = Registry::open(tmp.path()).build().unwrap();
        (tmp, registry)
    }

    fn output(command: Commands, registry: &Registry) -> Result<String> {
        let mut out = Vec::new();
        run(&command, registry, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_overrides_replace_configured_values() {
        let cli = Cli::parse_from([
            "yamlcore", "--dir", "/srv/data", "--subdir", "players", "-r", "--extension", "yaml",
            "list",
        ]);
        let config = apply_overrides(RegistryConfig::default(), &cli);
        assert_eq!(config.base_directory, std::path::PathBuf::from("/srv/data"));
        assert_eq!(config.subdirectory.as_deref(), Some("players"));
        assert!(config.recursive);
        assert_eq!(config.extension, ".yaml");
    }

    #[test]
    fn test_no_flags_keep_configured_values() {
        let cli = Cli::parse_from(["yamlcore", "list"]);
        let mut configured = RegistryConfig::new("/from/file");
        configured.recursive = true;
        let config = apply_overrides(configured.clone(), &cli);
        assert_eq!(config, configured);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Value::from(42));
        assert_eq!(parse_value("true"), Value::from(true));
        assert_eq!(parse_value("hello world"), Value::from("hello world"));
        assert!(parse_value("[a, b]").is_sequence());
        assert_eq!(parse_value("[broken"), Value::from("[broken"));
    }

    #[test]
    fn test_parse_value_empty_is_empty_string() {
        assert_eq!(parse_value(""), Value::from(""));
        assert_eq!(parse_value("~"), Value::Null);
    }

    #[test]
    fn test_set_empty_value_stores_empty_string() {
        let (_tmp, registry) = registry_with(&[("gold.yml", "owner: steve\n")]);
        output(
            Commands::Set { id: "gold".into(), key: "owner".into(), value: String::new() },
            &registry,
        )
        .unwrap();
        assert_eq!(registry.get_value("gold", "owner").unwrap(), Some(Value::from("")));
    }

    #[test]
    fn test_list_table_and_json() {
        let (_tmp, registry) = registry_with(&[("gold.yml", "amount: 1\n")]);

        let table = output(Commands::List { json: false }, &registry).unwrap();
        assert!(table.contains("gold"));
        assert!(table.contains("1 document(s) found"));

        let json = output(Commands::List { json: true }, &registry).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["id"], "gold");
    }

    #[test]
    fn test_list_empty() {
        let (_tmp, registry) = registry_with(&[]);
        let text = output(Commands::List { json: false }, &registry).unwrap();
        assert_eq!(text, "No documents found.\n");
    }

    #[test]
    fn test_get_and_set() {
        let (tmp, registry) = registry_with(&[("gold.yml", "amount: 100\n")]);

        let got = output(Commands::Get { id: "gold".into(), key: "amount".into() }, &registry).unwrap();
        assert_eq!(got, "100\n");

        output(
            Commands::Set { id: "GOLD".into(), key: "amount".into(), value: "150".into() },
            &registry,
        )
        .unwrap();
        let on_disk = fs::read_to_string(tmp.path().join("gold.yml")).unwrap();
        assert!(on_disk.contains("amount: 150"));
    }

    #[test]
    fn test_get_missing_key_and_missing_document() {
        let (_tmp, registry) = registry_with(&[("gold.yml", "amount: 100\n")]);
        assert!(output(Commands::Get { id: "gold".into(), key: "rate".into() }, &registry).is_err());

        let err = output(Commands::Get { id: "silver".into(), key: "x".into() }, &registry).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unset_saves() {
        let (tmp, registry) = registry_with(&[("gold.yml", "amount: 100\nowner: steve\n")]);
        output(Commands::Unset { id: "gold".into(), key: "owner".into() }, &registry).unwrap();
        let on_disk = fs::read_to_string(tmp.path().join("gold.yml")).unwrap();
        assert!(!on_disk.contains("owner"));
        assert!(output(Commands::Unset { id: "gold".into(), key: "owner".into() }, &registry).is_err());
    }

    #[test]
    fn test_keys() {
        let (_tmp, registry) = registry_with(&[("w.yml", "spawn:\n  x: 1\n  pos:\n    y: 2\n")]);
        let shallow = output(
            Commands::Keys { id: "w".into(), parent: Some("spawn".into()), deep: false },
            &registry,
        )
        .unwrap();
        assert_eq!(shallow, "x\npos\n");

        let deep = output(Commands::Keys { id: "w".into(), parent: None, deep: true }, &registry).unwrap();
        assert_eq!(deep, "spawn\nspawn.x\nspawn.pos\nspawn.pos.y\n");

        assert!(output(
            Commands::Keys { id: "w".into(), parent: Some("spawn.x".into()), deep: false },
            &registry,
        )
        .is_err());
    }

    #[test]
    fn test_create_show_remove() {
        let (tmp, registry) = registry_with(&[]);

        let created = output(Commands::Create { id: "warp".into() }, &registry).unwrap();
        assert!(created.starts_with("Created "));
        assert!(tmp.path().join("warp.yml").is_file());
        assert!(output(Commands::Create { id: "warp".into() }, &registry).is_err());

        let shown = output(Commands::Show { id: "warp".into() }, &registry).unwrap();
        assert_eq!(shown.trim(), "{}");

        output(Commands::Remove { id: "warp".into() }, &registry).unwrap();
        assert!(!tmp.path().join("warp.yml").exists());
        assert!(output(Commands::Remove { id: "warp".into() }, &registry).is_err());
    }

    #[test]
    fn test_save_all() {
        let (_tmp, registry) = registry_with(&[("a.yml", "x: 1\n"), ("b.yml", "y: 2\n")]);
        let text = output(Commands::SaveAll, &registry).unwrap();
        assert_eq!(text, "Saved 2 document(s)\n");
    }
}
