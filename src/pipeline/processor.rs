//! Per-clip waveform preparation.

use crate::audio::{decode_audio_file, downmix_to_mono, resample, sanitize_samples};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// How a clip's audio is brought to model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformOptions {
    /// Sample rate the model expects.
    pub sample_rate: u32,
    /// Reject clips longer than this many seconds.
    pub max_clip_secs: Option<f32>,
}

/// Decode, downmix, sanitise and resample one clip.
///
/// The duration limit is checked on the decoded stream, before resampling,
/// so an oversized clip costs one decode and nothing more.
pub fn load_waveform(path: &Path, options: &WaveformOptions) -> Result<Vec<f32>> {
    let decoded = decode_audio_file(path)?;
    let duration_secs = decoded.duration_secs();
    let source_rate = decoded.sample_rate;
    debug!(
        "Decoded {}: {} channel(s), {:.2}s at {} Hz",
        path.display(),
        decoded.channel_count(),
        duration_secs,
        source_rate
    );

    if let Some(max_secs) = options.max_clip_secs
        && duration_secs > max_secs
    {
        return Err(Error::ClipTooLong {
            path: path.to_path_buf(),
            duration_secs,
            max_secs,
        });
    }

    let mut samples = downmix_to_mono(decoded, path)?;

    let replaced = sanitize_samples(&mut samples);
    if replaced > 0 {
        debug!(
            "Replaced {} non-finite sample(s) in {}",
            replaced,
            path.display()
        );
    }

    if source_rate == options.sample_rate {
        return Ok(samples);
    }
    debug!(
        "Resampling from {} Hz to {} Hz...",
        source_rate, options.sample_rate
    );
    resample(samples, source_rate, options.sample_rate)
}
