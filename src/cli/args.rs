//! CLI argument definitions.

use crate::cli::validators::parse_threshold;
use crate::config::{Config, InferenceDevice};
use crate::constants::DEFAULT_CONFIG_FILE;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Pseudo-label audio clips with an attention-pooled sound event detector.
#[derive(Debug, Parser)]
#[command(name = "sedlabel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory of clips to label (overrides `test_datadir`).
    pub datadir: Option<PathBuf>,

    /// Configuration file.
    #[arg(long, global = true, env = "SEDLABEL_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Labelling options.
    #[command(flatten)]
    pub label: LabelArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the configuration file.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List registered encoder architectures.
    Backbones,
    /// Check a checkpoint against the configured model.
    Inspect {
        /// Checkpoint to inspect (default: `model_path` from the config).
        checkpoint: Option<PathBuf>,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Write a configuration template.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved configuration.
    Show,
}

/// Options for the default labelling run.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct LabelArgs {
    /// Probability threshold (0.0-1.0).
    #[arg(short, long, value_parser = parse_threshold, env = "SEDLABEL_THRESHOLD")]
    pub threshold: Option<f32>,

    /// Checkpoint path (overrides config).
    #[arg(short, long, env = "SEDLABEL_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Directory for the result table (overrides config).
    #[arg(short, long, env = "SEDLABEL_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Use CUDA, falling back to CPU with a warning.
    #[arg(long, conflicts_with = "cpu")]
    pub gpu: bool,

    /// Force CPU inference.
    #[arg(long, conflicts_with = "gpu")]
    pub cpu: bool,

    /// Log and skip clips that fail instead of aborting.
    #[arg(long)]
    pub skip_failed: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

impl LabelArgs {
    /// Apply command-line overrides on top of the file configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(path) = &self.model_path {
            config.model_path = Some(path.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if self.gpu {
            config.device = InferenceDevice::Gpu;
        } else if self.cpu {
            config.device = InferenceDevice::Cpu;
        }
        if self.skip_failed {
            config.skip_failed_clips = true;
        }
    }

    /// Whether to draw a progress bar.
    pub fn progress_enabled(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

impl Cli {
    /// Apply every command-line override, including the positional data dir.
    pub fn apply_to(&self, config: &mut Config) {
        self.label.apply_to(config);
        if let Some(dir) = &self.datadir {
            config.test_datadir = Some(dir.clone());
        }
    }
}
