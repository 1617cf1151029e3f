//! Clipsum CLI - Command-line interface
//!
//! Runs the per-tile clip and summary batch over a GeoJSON workspace and
//! manages the config file.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::run::RunArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "clipsum", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process the tiles and build the master layers and summaries (default)
    Run(RunArgs),

    /// Create or complete the config file
    Init {
        /// Config file to write instead of the default location
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// View or change configuration settings
    Config {
        /// Config file to use instead of the default location
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: ConfigCommands,
    },
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Some(Commands::Run(args)) => commands::run::run(args),
        Some(Commands::Init { config }) => commands::init::run(config),
        Some(Commands::Config { config, action }) => commands::config::run(action, config),
        None => commands::run::run(cli.run),
    }
}

fn main() -> ExitCode {
    match dispatch(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_runs() {
        let cli = Cli::try_parse_from(["clipsum", "--first", "2", "--last", "8", "--parallel"])
            .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.first, Some(2));
        assert_eq!(cli.run.last, Some(8));
        assert!(cli.run.parallel);
    }

    #[test]
    fn test_run_subcommand() {
        let cli = Cli::try_parse_from(["clipsum", "run", "--discover", "-w", "/data"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert!(args.discover);
                assert_eq!(args.workspace, Some(PathBuf::from("/data")));
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_config_set() {
        let cli = Cli::try_parse_from(["clipsum", "config", "set", "tiles.last", "40"]).unwrap();
        match cli.command {
            Some(Commands::Config {
                action: ConfigCommands::Set { key, value },
                config: None,
            }) => {
                assert_eq!(key, "tiles.last");
                assert_eq!(value, "40");
            }
            other => panic!("expected config set, got {:?}", other),
        }
    }

    #[test]
    fn test_run_flags_conflict_with_subcommand() {
        assert!(Cli::try_parse_from(["clipsum", "--parallel", "init"]).is_err());
    }

    #[test]
    fn test_first_must_be_a_number() {
        assert!(Cli::try_parse_from(["clipsum", "--first", "one"]).is_err());
    }
}
