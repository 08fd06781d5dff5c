//! Pseudo-labelling driver: checkpoint in, label table out.

use crate::config::{Config, Phase};
use crate::error::{Error, Result};
use crate::inference::LabelMap;
use crate::model::{Checkpoint, OutputBundle, SedConfig, SedModel, frozen_frontend_buffers};
use crate::output::{LabelRow, LabelTable, progress};
use crate::pipeline::{WaveformOptions, load_waveform, row_id_for};
use crate::transforms::{
    SpectrogramPipeline, WaveformPipeline, build_spectrogram_pipeline, build_waveform_pipeline,
};
use candle::Device;
use indicatif::ProgressBar;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What to do when a single clip fails to decode or run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipErrorPolicy {
    /// Stop the run and return the error.
    Abort,
    /// Log the failure, leave the clip out of the table and continue.
    Skip,
}

impl ClipErrorPolicy {
    /// Policy selected by the `skip_failed_clips` setting.
    pub const fn from_skip_flag(skip: bool) -> Self {
        if skip { Self::Skip } else { Self::Abort }
    }
}

/// A clip left out of the table.
#[derive(Debug)]
pub struct FailedClip {
    /// Clip path.
    pub path: PathBuf,
    /// Why it failed.
    pub error: Error,
}

/// Outcome of labelling a clip list.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One row per successfully labelled clip, in input order.
    pub table: LabelTable,
    /// Clips skipped under [`ClipErrorPolicy::Skip`].
    pub failed: Vec<FailedClip>,
}

/// A loaded model plus everything needed to turn clips into label rows.
///
/// Construction loads and verifies the checkpoint; [`PseudoLabeler::run`]
/// consumes the labeler, so a finished run cannot be resumed.
#[derive(Debug)]
pub struct PseudoLabeler {
    model: SedModel,
    labels: LabelMap,
    threshold: f32,
    waveform_options: WaveformOptions,
    waveform_pipeline: WaveformPipeline,
    spectrogram_pipeline: SpectrogramPipeline,
    seed: u64,
}

impl PseudoLabeler {
    /// Read, verify and bind the configured checkpoint on `device`.
    pub fn load(config: &Config, device: &Device) -> Result<Self> {
        let model_path = config
            .model_path
            .as_deref()
            .ok_or_else(|| Error::ConfigValidation {
                message: "model_path is required".to_string(),
            })?;

        let sed_config = SedConfig::try_from(config)?;
        let checkpoint = Checkpoint::read(model_path)?;
        let expected = SedModel::expected_parameters(&sed_config)?;
        checkpoint.verify(
            &expected,
            &frozen_frontend_buffers(config.n_fft, config.n_mels),
        )?;
        info!(
            "Checkpoint verified: {} parameters for {} with {} classes",
            expected.len(),
            sed_config.backbone,
            sed_config.num_classes
        );

        let model = SedModel::new(&sed_config, checkpoint.into_var_builder(device))?;
        Self::new(model, config)
    }

    /// Wrap an already built model.
    pub fn new(model: SedModel, config: &Config) -> Result<Self> {
        let waveform_pipeline = build_waveform_pipeline(config.transforms.phase(Phase::Test), Phase::Test)?;
        let spectrogram_pipeline = build_spectrogram_pipeline(
            config.spectrogram_transforms.phase(Phase::Test),
            Phase::Test,
        )?;
        if !waveform_pipeline.is_empty() {
            debug!("Waveform transforms: {}", waveform_pipeline.names().join(", "));
        }
        if !spectrogram_pipeline.is_empty() {
            debug!(
                "Spectrogram transforms: {}",
                spectrogram_pipeline.names().join(", ")
            );
        }

        Ok(Self {
            model,
            labels: LabelMap::new(config.target_columns.clone()),
            threshold: config.threshold,
            waveform_options: WaveformOptions {
                sample_rate: config.sample_rate,
                max_clip_secs: config.max_clip_secs,
            },
            waveform_pipeline,
            spectrogram_pipeline,
            seed: config.seed,
        })
    }

    /// Probability threshold in use.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Random source for one clip, derived from the run seed and the row id.
    ///
    /// Clips draw independent streams, so a clip's augmentation does not
    /// depend on which clips were labelled before it.
    pub fn clip_rng(&self, row_id: &str) -> StdRng {
        StdRng::seed_from_u64(clip_seed(self.seed, row_id))
    }

    /// Run the model on a mono waveform at the model sample rate.
    pub fn predict(&self, waveform: Vec<f32>, rng: &mut StdRng) -> Result<OutputBundle> {
        let waveform = self.waveform_pipeline.apply(waveform, rng)?;
        if waveform.is_empty() {
            return Err(Error::EmptyWaveform);
        }
        let spec = self.model.frontend().extractor().logmel(&waveform)?;
        let spec = self.spectrogram_pipeline.apply(spec, rng);
        self.model.forward_spectrogram(&spec, false, rng)
    }

    /// Label names for a forward pass.
    pub fn labels_for(&self, output: &OutputBundle) -> Vec<String> {
        self.labels.labels_for(output.clipwise_output(), self.threshold)
    }

    /// Decode and label one clip.
    pub fn label_clip(&self, path: &Path) -> Result<LabelRow> {
        let row_id = row_id_for(path);
        let waveform = load_waveform(path, &self.waveform_options)?;
        let mut rng = self.clip_rng(&row_id);
        let output = self.predict(waveform, &mut rng)?;
        let row = LabelRow::new(row_id, self.labels_for(&output));
        debug!(
            "{} → {} ({} label(s))",
            path.display(),
            row.row_id,
            row.birds.len()
        );
        Ok(row)
    }

    /// Label every clip in order.
    ///
    /// Fatal errors (configuration, checkpoint, I/O) always abort; clip-level
    /// errors follow `policy`.
    pub fn run(
        self,
        clips: &[PathBuf],
        policy: ClipErrorPolicy,
        progress_bar: Option<&ProgressBar>,
    ) -> Result<RunReport> {
        let mut report = RunReport::default();

        for clip in clips {
            let name = clip
                .file_name()
                .map_or_else(|| clip.to_string_lossy(), |n| n.to_string_lossy());
            progress::set_current(progress_bar, &name);

            match self.label_clip(clip) {
                Ok(row) => report.table.push(row),
                Err(e) if policy == ClipErrorPolicy::Skip && !e.is_fatal() => {
                    warn!("Skipping {}: {}", clip.display(), e);
                    report.failed.push(FailedClip {
                        path: clip.clone(),
                        error: e,
                    });
                }
                Err(e) => {
                    warn!("Failed on {}", clip.display());
                    return Err(e);
                }
            }
            progress::inc_progress(progress_bar);
        }

        Ok(report)
    }
}

/// FNV-1a over the row id, mixed into the run seed.
fn clip_seed(seed: u64, row_id: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    row_id
        .bytes()
        .fold(OFFSET ^ seed, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}
