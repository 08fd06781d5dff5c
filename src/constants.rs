//! Application-wide constants.
//!
//! Defaults mirror the feature settings the bundled checkpoints were trained
//! with, so a config file only needs the model-specific keys.

/// Application name used in user-facing messages.
pub const APP_NAME: &str = "sedlabel";

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Default probability threshold for turning clipwise output into labels.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Default seed for augmentation randomness.
pub const DEFAULT_SEED: u64 = 1213;

/// Default audio file extension scanned for clips.
pub const DEFAULT_AUDIO_EXTENSION: &str = "ogg";

/// Default output directory for the result table.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Feature frontend defaults.
pub mod features {
    /// Sample rate the model operates at, in Hz.
    pub const SAMPLE_RATE: u32 = 32_000;
    /// FFT size; also the window length.
    pub const N_FFT: usize = 1024;
    /// Hop between successive frames, in samples.
    pub const HOP_LENGTH: usize = 320;
    /// Number of mel filters.
    pub const N_MELS: usize = 64;
    /// Lowest mel filter edge in Hz.
    pub const FMIN: u32 = 50;
    /// Highest mel filter edge in Hz.
    pub const FMAX: u32 = 14_000;
    /// Numerical floor applied before taking the logarithm.
    pub const AMIN: f32 = 1e-10;
    /// Reference power for decibel conversion.
    pub const REF: f32 = 1.0;
}

/// Training-time stripe masking defaults.
pub mod spec_augment {
    /// Maximum width of a time stripe, in frames.
    pub const TIME_DROP_WIDTH: usize = 64;
    /// Number of time stripes.
    pub const TIME_STRIPES_NUM: usize = 2;
    /// Maximum width of a frequency stripe, in mel bins.
    pub const FREQ_DROP_WIDTH: usize = 8;
    /// Number of frequency stripes.
    pub const FREQ_STRIPES_NUM: usize = 2;
}

/// Model layer constants.
pub mod model {
    /// Default encoder architecture.
    pub const DEFAULT_BACKBONE: &str = "resnet34";
    /// Input channels of the spectrogram image.
    pub const IN_CHANNELS: usize = 1;
    /// Dropout rate around the per-frame projection.
    pub const DROPOUT: f32 = 0.5;
    /// Epsilon used by every batch normalisation layer.
    pub const BN_EPS: f64 = 1e-5;
}

/// Checkpoint key handling.
pub mod checkpoint {
    /// Suffix of batch-norm step counters, which carry no weights.
    pub const NUM_BATCHES_TRACKED: &str = "num_batches_tracked";
    /// Frozen STFT real-part kernel stored by the training frontend.
    pub const STFT_REAL: &str = "spectrogram_extractor.stft.conv_real.weight";
    /// Frozen STFT imaginary-part kernel stored by the training frontend.
    pub const STFT_IMAG: &str = "spectrogram_extractor.stft.conv_imag.weight";
    /// Frozen mel filter bank stored by the training frontend.
    pub const MEL_W: &str = "logmel_extractor.melW";
    /// File extensions read through the PyTorch pickle loader.
    pub const PICKLE_EXTENSIONS: &[&str] = &["pth", "pt", "bin", "ckpt"];
    /// File extension read through the safetensors loader.
    pub const SAFETENSORS_EXTENSION: &str = "safetensors";
}

/// Output file naming.
pub mod output {
    /// Prefix of the result table file name; the threshold follows it.
    pub const FILE_PREFIX: &str = "pseudo_";
    /// Result table extension.
    pub const EXTENSION: &str = ".csv";
    /// Column holding the clip identifier.
    pub const ROW_ID_COLUMN: &str = "row_id";
    /// Column holding the predicted label list.
    pub const BIRDS_COLUMN: &str = "birds";
}
