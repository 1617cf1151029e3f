//! Configuration management CLI commands.
//!
//! `config get`, `config set`, `config list` and `config path` read and
//! write individual keys of the config file.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use clipsum::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., tiles.last)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., tiles.last)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against `path`, or the default file.
pub fn run(command: ConfigCommands, path: Option<PathBuf>) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Get { key } => {
            println!("{}", get_value(&path, &key)?);
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let name = set_value(&path, &key, &value)?;
            println!("Set {} = {}", name, value);
            Ok(())
        }
        ConfigCommands::List => run_list(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'clipsum config list' to see available keys.",
            key
        ))
    })
}

/// Current value of `key`, `(not set)` when empty.
fn get_value(path: &Path, key: &str) -> Result<String, CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load_from(path).unwrap_or_default();
    let value = config_key.get(&config);

    if value.is_empty() {
        Ok("(not set)".to_string())
    } else {
        Ok(value)
    }
}

/// Set `key` and save. The file is left untouched when the new value is
/// invalid or breaks the tile range.
fn set_value(path: &Path, key: &str, value: &str) -> Result<String, CliError> {
    let config_key = parse_key(key)?;
    let mut config = ConfigFile::load_from(path).unwrap_or_default();
    config_key.set(&mut config, value)?;
    config.validate()?;
    config.save_to(path)?;
    Ok(config_key.name())
}

fn run_list(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path).unwrap_or_default();

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }

    Ok(())
}
