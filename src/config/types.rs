//! Configuration type definitions.

use crate::constants::{
    DEFAULT_AUDIO_EXTENSION, DEFAULT_OUTPUT_DIR, DEFAULT_SEED, DEFAULT_THRESHOLD, features, model,
    spec_augment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
///
/// Key names follow the training configuration the checkpoints come from,
/// so the same file can be shared between training and labelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sample rate the model operates at, in Hz.
    pub sample_rate: u32,
    /// FFT size and window length.
    pub n_fft: usize,
    /// Hop between frames, in samples.
    pub hop_length: usize,
    /// Number of mel bins.
    pub n_mels: usize,
    /// Lowest mel frequency in Hz.
    pub fmin: u32,
    /// Highest mel frequency in Hz.
    pub fmax: u32,
    /// Encoder architecture name.
    pub base_model_name: String,
    /// Number of output classes.
    pub num_classes: usize,
    /// Input channels of the spectrogram image.
    pub in_channels: usize,
    /// Class names, indexed by model output position.
    pub target_columns: Vec<String>,
    /// Directory scanned recursively for clips.
    pub test_datadir: Option<PathBuf>,
    /// Path to the model checkpoint.
    pub model_path: Option<PathBuf>,
    /// Probability threshold for a class to be emitted as a label.
    pub threshold: f32,
    /// Device used for inference.
    pub device: InferenceDevice,
    /// Directory the result table is written to.
    pub output_dir: PathBuf,
    /// Extension of the clips to scan for (without the dot).
    pub audio_extension: String,
    /// Seed for augmentation randomness.
    pub seed: u64,
    /// Log and skip clips that fail to decode instead of aborting the run.
    pub skip_failed_clips: bool,
    /// Reject clips longer than this many seconds.
    pub max_clip_secs: Option<f32>,
    /// Training-time stripe masking settings.
    pub spec_augment: SpecAugmentConfig,
    /// Waveform transforms per phase.
    pub transforms: TransformsConfig,
    /// Spectrogram transforms per phase.
    pub spectrogram_transforms: TransformsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: features::SAMPLE_RATE,
            n_fft: features::N_FFT,
            hop_length: features::HOP_LENGTH,
            n_mels: features::N_MELS,
            fmin: features::FMIN,
            fmax: features::FMAX,
            base_model_name: model::DEFAULT_BACKBONE.to_string(),
            num_classes: 0,
            in_channels: model::IN_CHANNELS,
            target_columns: Vec::new(),
            test_datadir: None,
            model_path: None,
            threshold: DEFAULT_THRESHOLD,
            device: InferenceDevice::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            audio_extension: DEFAULT_AUDIO_EXTENSION.to_string(),
            seed: DEFAULT_SEED,
            skip_failed_clips: false,
            max_clip_secs: None,
            spec_augment: SpecAugmentConfig::default(),
            transforms: TransformsConfig::default(),
            spectrogram_transforms: TransformsConfig::default(),
        }
    }
}

/// Stripe masking applied to spectrograms in training mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpecAugmentConfig {
    /// Maximum width of a time stripe, in frames.
    pub time_drop_width: usize,
    /// Number of time stripes.
    pub time_stripes_num: usize,
    /// Maximum width of a frequency stripe, in mel bins.
    pub freq_drop_width: usize,
    /// Number of frequency stripes.
    pub freq_stripes_num: usize,
}

impl Default for SpecAugmentConfig {
    fn default() -> Self {
        Self {
            time_drop_width: spec_augment::TIME_DROP_WIDTH,
            time_stripes_num: spec_augment::TIME_STRIPES_NUM,
            freq_drop_width: spec_augment::FREQ_DROP_WIDTH,
            freq_stripes_num: spec_augment::FREQ_STRIPES_NUM,
        }
    }
}

/// Transform lists keyed by phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformsConfig {
    /// Transforms used while training.
    pub train: Vec<TransformSpec>,
    /// Transforms used while validating.
    pub valid: Vec<TransformSpec>,
    /// Transforms used while labelling.
    pub test: Vec<TransformSpec>,
}

impl TransformsConfig {
    /// Transform list for a phase.
    pub fn phase(&self, phase: Phase) -> &[TransformSpec] {
        match phase {
            Phase::Train => &self.train,
            Phase::Valid => &self.valid,
            Phase::Test => &self.test,
        }
    }
}

/// A single transform entry: registry name plus free-form parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformSpec {
    /// Registry name, e.g. `"Normalize"`.
    pub name: String,
    /// Constructor parameters.
    #[serde(default)]
    pub params: toml::Table,
}

/// Dataset phase a transform list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Training.
    Train,
    /// Validation.
    Valid,
    /// Inference / pseudo-labelling.
    Test,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Valid => write!(f, "valid"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Inference device configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Automatically select (GPU if available, else CPU).
    #[default]
    Auto,
    /// Prefer GPU (CUDA), warn and fall back to CPU if unavailable.
    Gpu,
    /// Force CPU inference.
    Cpu,
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_frontend_constants() {
        let config = Config::default();
        assert_eq!(config.sample_rate, 32_000);
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.in_channels, 1);
        assert_eq!(config.audio_extension, "ogg");
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_transform_spec_params_default_to_empty() {
        let spec: TransformSpec = toml::from_str(r#"name = "Normalize""#).unwrap();
        assert_eq!(spec.name, "Normalize");
        assert!(spec.params.is_empty());
    }

    #[test]
    fn test_transforms_phase_lookup() {
        let config: TransformsConfig = toml::from_str(
            r#"
[[test]]
name = "Normalize"
"#,
        )
        .unwrap();
        assert_eq!(config.phase(Phase::Test).len(), 1);
        assert!(config.phase(Phase::Train).is_empty());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(InferenceDevice::Auto.to_string(), "auto");
        assert_eq!(InferenceDevice::Cpu.to_string(), "cpu");
    }
}
