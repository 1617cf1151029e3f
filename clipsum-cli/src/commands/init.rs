//! Init command - write a config file with every key spelled out.

use std::path::PathBuf;

use clipsum::config::{config_file_path, ConfigFile};

use crate::commands::run::load_config;
use crate::error::CliError;

/// Run the init command.
///
/// An existing file is loaded first so its values survive; missing keys are
/// filled in with defaults.
pub fn run(path: Option<PathBuf>) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);
    let config = load_config(Some(&path))?;
    config.save_to(&path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to point clipsum at your workspace and layers.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
