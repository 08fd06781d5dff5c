//! Error types for sedlabel.

use std::path::PathBuf;

/// Result type alias for sedlabel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure categories used to decide whether a run can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed configuration. Fatal before any clip is processed.
    Config,
    /// Unreadable checkpoint or parameter name/shape mismatch. Fatal.
    Checkpoint,
    /// A single clip could not be decoded or prepared.
    Decode,
    /// Feature extraction or model forward pass failed.
    Inference,
    /// Filesystem or output failure.
    Io,
}

/// Top-level error type for sedlabel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Backbone name is not in the encoder registry.
    #[error("unknown backbone '{name}' (available: {available})")]
    UnknownBackbone {
        /// Requested backbone name.
        name: String,
        /// Comma-separated list of registered backbones.
        available: String,
    },

    /// Transform name is not in the transform registry.
    #[error("unknown {family} transform '{name}' in phase '{phase}'")]
    UnknownTransform {
        /// Transform family (waveform or spectrogram).
        family: &'static str,
        /// Requested transform name.
        name: String,
        /// Phase the transform was listed under.
        phase: String,
    },

    /// Transform parameters could not be parsed.
    #[error("invalid parameters for transform '{name}': {reason}")]
    TransformParams {
        /// Transform name.
        name: String,
        /// Description of the problem.
        reason: String,
    },

    /// Checkpoint file does not exist.
    #[error("checkpoint file does not exist: {path}")]
    CheckpointNotFound {
        /// Path to the missing checkpoint.
        path: PathBuf,
    },

    /// Checkpoint extension is not a known serialization format.
    #[error("unsupported checkpoint format for '{path}' (expected .safetensors, .pth, .pt, .bin or .ckpt)")]
    UnsupportedCheckpointFormat {
        /// Path to the checkpoint.
        path: PathBuf,
    },

    /// Checkpoint could not be read or deserialized.
    #[error("failed to read checkpoint '{path}'")]
    CheckpointRead {
        /// Path to the checkpoint.
        path: PathBuf,
        /// Underlying tensor library error.
        #[source]
        source: candle::Error,
    },

    /// Checkpoint tensors do not match the model parameters.
    #[error("checkpoint '{path}' does not match the model: {summary}")]
    CheckpointMismatch {
        /// Path to the checkpoint.
        path: PathBuf,
        /// Human readable list of missing, unexpected and mis-shaped tensors.
        summary: String,
    },

    /// No audio clips found.
    #[error("no audio clips with extension '.{extension}' found under '{path}'")]
    NoAudioClips {
        /// Directory that was scanned.
        path: PathBuf,
        /// Extension that was searched for.
        extension: String,
    },

    /// Failed to open audio file.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to decode audio.
    #[error("failed to decode audio from '{path}'")]
    AudioDecode {
        /// Path to the audio file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No audio tracks found.
    #[error("no audio tracks found in '{path}'")]
    NoAudioTracks {
        /// Path to the audio file.
        path: PathBuf,
    },

    /// Channel count has no downmix rule.
    #[error("unsupported channel layout in '{path}': {channels} channels (only mono and stereo are downmixed)")]
    UnsupportedChannelLayout {
        /// Path to the audio file.
        path: PathBuf,
        /// Number of decoded channels.
        channels: usize,
    },

    /// Clip exceeds the configured maximum duration.
    #[error("clip '{path}' is {duration_secs:.1}s long, limit is {max_secs:.1}s")]
    ClipTooLong {
        /// Path to the audio file.
        path: PathBuf,
        /// Clip duration in seconds.
        duration_secs: f32,
        /// Configured limit in seconds.
        max_secs: f32,
    },

    /// Failed to resample audio.
    #[error("failed to resample audio: {reason}")]
    Resample {
        /// Description of the resampling failure.
        reason: String,
    },

    /// Waveform has no samples.
    #[error("cannot extract features from an empty waveform")]
    EmptyWaveform,

    /// Short-time Fourier transform failed.
    #[error("STFT failed: {reason}")]
    Stft {
        /// Description of the failure.
        reason: String,
    },

    /// Tensor operation failed during inference.
    #[error("model error: {0}")]
    Model(#[from] candle::Error),

    /// Failed to write the result table.
    #[error("failed to write results to '{path}'")]
    OutputWrite {
        /// Path to the output file.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

impl Error {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigValidation { .. }
            | Self::ConfigWrite { .. }
            | Self::ConfigSerialize { .. }
            | Self::UnknownBackbone { .. }
            | Self::UnknownTransform { .. }
            | Self::TransformParams { .. } => ErrorKind::Config,
            Self::CheckpointNotFound { .. }
            | Self::UnsupportedCheckpointFormat { .. }
            | Self::CheckpointRead { .. }
            | Self::CheckpointMismatch { .. } => ErrorKind::Checkpoint,
            Self::AudioOpen { .. }
            | Self::AudioDecode { .. }
            | Self::NoAudioTracks { .. }
            | Self::UnsupportedChannelLayout { .. }
            | Self::ClipTooLong { .. }
            | Self::Resample { .. } => ErrorKind::Decode,
            Self::EmptyWaveform | Self::Stft { .. } | Self::Model(_) => ErrorKind::Inference,
            Self::Io(_) | Self::NoAudioClips { .. } | Self::OutputWrite { .. } => ErrorKind::Io,
        }
    }

    /// Whether this error must abort the whole run regardless of the clip error policy.
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config | ErrorKind::Checkpoint | ErrorKind::Io)
    }
}
