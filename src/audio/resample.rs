//! Audio resampling using rubato.

use crate::error::{Error, Result};
use audioadapter_buffers::direct::SequentialSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Input frames handed to the resampler per call.
const CHUNK_SIZE: usize = 1024;

/// Resample mono audio to the model's sample rate.
///
/// Returns the input unchanged if already at the target rate. The tail is
/// zero-padded to a full chunk and the output trimmed to the expected length.
pub fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }

    let mut resampler = Fft::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        1,
        1,
        FixedSync::Both,
    )
    .map_err(|e| Error::Resample {
        reason: e.to_string(),
    })?;

    let frames_in = resampler.input_frames_next();
    let expected = expected_output_len(samples.len(), from_rate, to_rate);
    let mut output = Vec::with_capacity(expected + frames_in);
    let mut chunk = vec![0.0f32; frames_in];

    for block in samples.chunks(frames_in) {
        chunk[..block.len()].copy_from_slice(block);
        chunk[block.len()..].fill(0.0);

        let input = SequentialSlice::new(&chunk, 1, frames_in).map_err(|e| Error::Resample {
            reason: format!("failed to create input adapter: {e}"),
        })?;
        let resampled = resampler
            .process(&input, 0, None)
            .map_err(|e| Error::Resample {
                reason: e.to_string(),
            })?;
        output.extend_from_slice(&resampled.take_data());
    }

    output.truncate(expected);
    Ok(output)
}

/// Number of output samples that correspond to `input_len` input samples.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn expected_output_len(input_len: usize, from_rate: u32, to_rate: u32) -> usize {
    ((input_len as f64) * f64::from(to_rate) / f64::from(from_rate)).ceil() as usize
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate_returns_input() {
        let samples = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let result = resample(samples.clone(), 32_000, 32_000).unwrap();
        assert_eq!(result, samples);
    }

    #[test]
    fn test_resample_48k_to_32k_length() {
        let samples: Vec<f32> = (0..48_000).map(|i| (i as f32 * 0.001).sin()).collect();
        let output = resample(samples, 48_000, 32_000).unwrap();
        assert!(output.len() <= 32_000);
        assert!(output.len() > 30_000);
    }

    #[test]
    fn test_resample_upsample_length() {
        let samples: Vec<f32> = (0..16_000).map(|i| (i as f32 * 0.001).sin()).collect();
        let output = resample(samples, 16_000, 32_000).unwrap();
        assert!(output.len() <= 32_000);
        assert!(output.len() > 30_000);
    }

    #[test]
    fn test_expected_output_len_rounds_up() {
        assert_eq!(expected_output_len(3, 48_000, 32_000), 2);
        assert_eq!(expected_output_len(44_100, 44_100, 32_000), 32_000);
    }
}
