//! Run command - process the configured tiles and write the artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use clipsum::backend::MemoryBackend;
use clipsum::config::{ConfigFile, PipelineConfig};
use clipsum::logging::init_logging;
use clipsum::pipeline::{AggregateReport, Pipeline, RunSummary};
use clipsum::tile::TileOutcome;
use clipsum::workspace::{GeoJsonWorkspace, PersistedOutputs};

use crate::error::CliError;

/// Arguments for `clipsum run` (also accepted without the subcommand).
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Workspace directory holding the sources and outputs
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// First tile id of the range
    #[arg(long)]
    pub first: Option<u32>,

    /// Last tile id of the range (inclusive)
    #[arg(long)]
    pub last: Option<u32>,

    /// Process the tile ids found on the boundary layer instead of a range
    #[arg(long)]
    pub discover: bool,

    /// Process tiles in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the config file.
    pub fn apply(&self, config: &mut ConfigFile) {
        if let Some(dir) = &self.workspace {
            config.workspace.directory = dir.clone();
        }
        if let Some(first) = self.first {
            config.tiles.first = first;
        }
        if let Some(last) = self.last {
            config.tiles.last = last;
        }
        if self.discover {
            config.tiles.discover = true;
        }
        if self.parallel {
            config.batch.parallel = true;
        }
    }
}

/// Load the config file named on the command line, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Run the batch.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let _log_guard = init_logging(&config.logging, args.verbose)?;
    info!(
        version = clipsum::VERSION,
        workspace = %config.workspace.directory.display(),
        "Starting clipsum run"
    );

    let pipeline_config = PipelineConfig::from_config_file(&config);
    let workspace = GeoJsonWorkspace::new(&config.workspace.directory);
    let backend = Arc::new(MemoryBackend::new());
    workspace.load_sources(&backend, &config.layers, &pipeline_config.processing.layers)?;

    let pipeline = Pipeline::new(backend.clone(), pipeline_config.clone());
    let tiles = pipeline.resolve_tiles()?;

    let progress = progress_bar(tiles.len() as u64);
    let summary = pipeline.run_tiles(&tiles, |tile, outcome| {
        progress.inc(1);
        progress.set_message(match outcome {
            TileOutcome::Success(_) => format!("tile {} done", tile),
            TileOutcome::Empty => format!("tile {} empty", tile),
            TileOutcome::Failed(_) => format!("tile {} failed", tile),
        });
    });
    progress.finish_and_clear();

    let persisted = workspace.persist_outputs(&backend, &pipeline_config.outputs)?;
    print_summary(&summary, &persisted);

    if let Some(path) = &args.report {
        write_report(path, &summary)?;
        println!("Report: {}", path.display());
    }

    if !summary.any_succeeded() {
        return Err(CliError::NoTilesSucceeded {
            processed: summary.tiles.processed,
            failed: summary.tiles.failed,
        });
    }
    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} tiles {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Serialize the run summary as pretty JSON.
pub fn write_report(path: &Path, summary: &RunSummary) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| CliError::Report(format!("{}: {}", path.display(), e)))?;
    fs::write(path, json).map_err(|e| CliError::Report(format!("{}: {}", path.display(), e)))
}

fn print_summary(summary: &RunSummary, persisted: &PersistedOutputs) {
    let tiles = &summary.tiles;
    println!(
        "Tiles: {} processed, {} succeeded, {} empty, {} failed",
        tiles.processed, tiles.succeeded, tiles.empty, tiles.failed
    );
    for report in &tiles.tiles {
        if let (Some(stage), Some(error)) = (report.stage, &report.error) {
            println!("  tile {} failed while {}: {}", report.tile, stage, error);
        }
    }

    println!("Buffer:   {}", describe(&summary.buffer));
    println!("Polyline: {}", describe(&summary.polyline));

    for path in &persisted.written {
        println!("Wrote {}", path.display());
    }
    for path in &persisted.removed {
        println!("Removed {}", path.display());
    }
}

fn describe(report: &AggregateReport) -> String {
    match report {
        AggregateReport::Built {
            master,
            summary,
            master_rows,
            summary_rows,
        } => format!(
            "{} ({} features), {} ({} rows)",
            master, master_rows, summary, summary_rows
        ),
        AggregateReport::Skipped => "skipped, no successful tiles".to_string(),
        AggregateReport::Failed { error } => format!("failed: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let args = RunArgs {
            workspace: Some(PathBuf::from("/data")),
            first: Some(4),
            last: Some(9),
            parallel: true,
            ..RunArgs::default()
        };
        let mut config = ConfigFile::default();
        args.apply(&mut config);

        assert_eq!(config.workspace.directory, PathBuf::from("/data"));
        assert_eq!(config.tiles.first, 4);
        assert_eq!(config.tiles.last, 9);
        assert!(config.batch.parallel);
        assert!(!config.tiles.discover);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = ConfigFile::default();
        config.batch.parallel = true;
        RunArgs::default().apply(&mut config);

        let mut expected = ConfigFile::default();
        expected.batch.parallel = true;
        assert_eq!(config, expected);
    }

    #[test]
    fn test_load_config_from_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "[tiles]\nfirst = 2\nlast = 4\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!((config.tiles.first, config.tiles.last), (2, 4));
    }

    #[test]
    fn test_load_config_reports_bad_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "[batch]\nparallel = sometimes\n").unwrap();

        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_describe_aggregate() {
        assert_eq!(
            describe(&AggregateReport::Skipped),
            "skipped, no successful tiles"
        );
        let built = AggregateReport::Built {
            master: "Master_Joined_Buffer".to_string(),
            summary: "Buffer_Summary_Master".to_string(),
            master_rows: 12,
            summary_rows: 4,
        };
        assert_eq!(
            describe(&built),
            "Master_Joined_Buffer (12 features), Buffer_Summary_Master (4 rows)"
        );
    }
}
