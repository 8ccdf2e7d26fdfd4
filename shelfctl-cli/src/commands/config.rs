//! Config command - write, print or locate the config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shelfctl_core::{ShelfConfig, StoreConfig};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write the effective store settings (file, env and flags) to the config file
    Init(InitArgs),
    /// Print the effective configuration as TOML
    Show,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

/// `explicit` is the global `--config` flag; `store` is the effective store config.
pub fn run_config(args: ConfigArgs, explicit: Option<&Path>, store: StoreConfig) -> Result<()> {
    let path = config_file(explicit);
    let config = ShelfConfig { store };
    match args.command {
        ConfigCommands::Init(args) => run_init(&config, &path, args.force),
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn config_file(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(ShelfConfig::config_path)
}

fn run_init(config: &ShelfConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow::anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            path
        ));
    }

    config
        .save(path)
        .context(format!("Failed to create config at {:?}", path))?;
    info!(path = %path.display(), backend = %config.store.backend, "config written");

    println!("Created config at: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfctl_core::Backend;
    use tempfile::TempDir;

    fn sqlite_config() -> ShelfConfig {
        let mut config = ShelfConfig::default();
        config.store.backend = Backend::Sqlite;
        config
    }

    #[test]
    fn test_init_writes_then_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shelf").join("config.toml");

        run_init(&sqlite_config(), &path, false).unwrap();
        assert_eq!(ShelfConfig::from_file(&path).unwrap(), sqlite_config());

        let err = run_init(&ShelfConfig::default(), &path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(ShelfConfig::from_file(&path).unwrap().store.backend, Backend::Sqlite);

        run_init(&ShelfConfig::default(), &path, true).unwrap();
        assert_eq!(ShelfConfig::from_file(&path).unwrap().store.backend, Backend::Csv);
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/tmp/elsewhere.toml");
        assert_eq!(config_file(Some(path)), path);
        assert_eq!(config_file(None), ShelfConfig::config_path());
    }
}
