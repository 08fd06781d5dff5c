//! Channel downmix and sample sanitisation.

use crate::audio::DecodedAudio;
use crate::error::{Error, Result};
use std::path::Path;

/// Collapse decoded audio to a single channel.
///
/// Mono passes through and stereo is averaged sample by sample. Layouts with
/// more than two channels are rejected rather than mixed with a guessed
/// weighting.
pub fn downmix_to_mono(audio: DecodedAudio, path: &Path) -> Result<Vec<f32>> {
    let mut channels = audio.channels;
    match channels.len() {
        1 => Ok(channels.swap_remove(0)),
        2 => {
            let right = channels.swap_remove(1);
            let left = channels.swap_remove(0);
            Ok(left
                .iter()
                .zip(right.iter())
                .map(|(l, r)| (l + r) / 2.0)
                .collect())
        }
        n => Err(Error::UnsupportedChannelLayout {
            path: path.to_path_buf(),
            channels: n,
        }),
    }
}

/// Replace NaN and infinite samples with zero, returning how many were replaced.
pub fn sanitize_samples(samples: &mut [f32]) -> usize {
    let mut replaced = 0;
    for s in samples.iter_mut().filter(|s| !s.is_finite()) {
        *s = 0.0;
        replaced += 1;
    }
    replaced
}
