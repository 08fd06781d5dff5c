//! Sedlabel - pseudo-labelling audio clips with a sound event detector.
//!
//! A log-mel frontend feeds a pretrained `ResNet` encoder, an attention head
//! pools its features over time, and clipwise probabilities are thresholded
//! into per-clip label lists.

#![warn(missing_docs)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod features;
pub mod inference;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod transforms;

use clap::Parser;
use cli::{Cli, Command, ConfigAction};
use config::{Config, load_config_file, save_config, validate_config};
use constants::APP_NAME;
use inference::{ClipErrorPolicy, PseudoLabeler, select_device};
use model::{BackboneKind, Checkpoint, SedConfig, SedModel, frozen_frontend_buffers};
use output::{progress, write_table};
use pipeline::{collect_clips, output_path_for};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Result of a labelling run.
#[derive(Debug)]
pub struct LabelSummary {
    /// Written table.
    pub output_path: PathBuf,
    /// Rows in the table.
    pub labelled: usize,
    /// Clips left out under the skip policy.
    pub failed: usize,
}

/// Main entry point for the sedlabel CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.label.verbose, cli.label.quiet);

    match &cli.command {
        Some(Command::Config { action }) => return handle_config_command(*action, &cli),
        Some(Command::Backbones) => {
            print_backbones();
            return Ok(());
        }
        Some(Command::Inspect { checkpoint }) => {
            return inspect_checkpoint(&cli, checkpoint.as_deref());
        }
        None => {}
    }

    let config = resolve_config(&cli)?;
    validate_config(&config)?;

    label_clips(&config, cli.label.progress_enabled())?;
    Ok(())
}

/// Load the config file and layer command-line overrides on top.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = load_config_file(&cli.config)?;
    cli.apply_to(&mut config);
    Ok(config)
}

/// Label every clip under `test_datadir` and write the result table.
pub fn label_clips(config: &Config, show_progress: bool) -> Result<LabelSummary> {
    let total_start = Instant::now();

    let datadir = config
        .test_datadir
        .as_deref()
        .ok_or_else(|| Error::ConfigValidation {
            message: "test_datadir is required (set it in the config or pass a directory)"
                .to_string(),
        })?;

    let clips = collect_clips(datadir, &config.audio_extension)?;
    info!("Found {} clip(s) in {}", clips.len(), datadir.display());

    let device = select_device(config.device);
    let labeler = PseudoLabeler::load(config, &device)?;

    std::fs::create_dir_all(&config.output_dir)?;
    let output_path = output_path_for(&config.output_dir, labeler.threshold());

    let pb = progress::create_clip_progress(clips.len(), show_progress);
    let policy = ClipErrorPolicy::from_skip_flag(config.skip_failed_clips);
    let report = match labeler.run(&clips, policy, pb.as_ref()) {
        Ok(report) => {
            progress::finish_progress(pb, "Complete");
            report
        }
        Err(e) => {
            progress::finish_progress(pb, "Failed");
            return Err(e);
        }
    };

    write_table(&output_path, &report.table)?;

    let total_duration = total_start.elapsed().as_secs_f64();
    let empty = report
        .table
        .rows()
        .iter()
        .filter(|row| row.birds.is_empty())
        .count();
    info!(
        "Complete: {} labelled, {} failed, {} label(s) assigned, {} without labels in {:.2}s",
        report.table.len(),
        report.failed.len(),
        report.table.label_count(),
        empty,
        total_duration
    );
    if total_duration > 0.0 {
        info!(
            "Performance: {:.2} clips/sec",
            clips.len() as f64 / total_duration
        );
    }
    info!("Wrote {}", output_path.display());

    if !report.failed.is_empty() {
        warn!("{} clip(s) were skipped:", report.failed.len());
        for failed in &report.failed {
            warn!("  {}: {}", failed.path.display(), failed.error);
        }
    }

    Ok(LabelSummary {
        output_path,
        labelled: report.table.len(),
        failed: report.failed.len(),
    })
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // Symphonia probes every format reader at debug level.
    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info,symphonia=warn",
            1 => "debug,symphonia=info",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: ConfigAction, cli: &Cli) -> Result<()> {
    let path = &cli.config;
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!("Use --force to overwrite it.");
            } else {
                save_config(&Config::default(), path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps:");
                println!("  set model_path, num_classes and target_columns, then run:");
                println!("  {APP_NAME} <clip directory> --config {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(cli)?;
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            print!("{rendered}");
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_backbones() {
    println!("Available backbones:");
    for kind in BackboneKind::ALL {
        println!("  {:<10} {} channels", kind.name(), kind.out_channels());
    }
}

#[allow(clippy::print_stdout)]
fn inspect_checkpoint(cli: &Cli, checkpoint: Option<&Path>) -> Result<()> {
    let mut config = resolve_config(cli)?;
    if let Some(path) = checkpoint {
        config.model_path = Some(path.to_path_buf());
    }
    validate_config(&config)?;

    let sed_config = SedConfig::try_from(&config)?;
    let path = config
        .model_path
        .as_deref()
        .ok_or_else(|| Error::ConfigValidation {
            message: "model_path is required".to_string(),
        })?;

    let checkpoint = Checkpoint::read(path)?;
    let expected = SedModel::expected_parameters(&sed_config)?;
    let report = checkpoint.compare(
        &expected,
        &frozen_frontend_buffers(config.n_fft, config.n_mels),
    );

    println!("Checkpoint: {}", path.display());
    println!(
        "  Model: {} -> {} classes",
        sed_config.backbone, sed_config.num_classes
    );
    println!(
        "  Tensors: {} in file, {} expected",
        checkpoint.len(),
        expected.len()
    );
    println!("  Ignored buffers: {}", report.ignored.len());

    if report.is_clean() {
        println!("  Status: OK");
        return Ok(());
    }

    println!("  Status: mismatch");
    for name in &report.missing {
        println!("    missing:    {name}");
    }
    for name in &report.unexpected {
        println!("    unexpected: {name}");
    }
    for mismatch in &report.mismatched {
        println!(
            "    shape:      {} expected {:?}, found {:?}",
            mismatch.name, mismatch.expected, mismatch.found
        );
    }

    Err(Error::CheckpointMismatch {
        path: path.to_path_buf(),
        summary: report.summary(),
    })
}
