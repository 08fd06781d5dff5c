//! Centered short-time Fourier transform producing a power spectrogram.

use crate::error::{Error, Result};
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Power spectrogram extractor with a periodic Hann window and reflect padding.
pub struct PowerSpectrogram {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
}

impl std::fmt::Debug for PowerSpectrogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerSpectrogram")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .finish_non_exhaustive()
    }
}

impl PowerSpectrogram {
    /// Create an extractor. The window length equals `n_fft`.
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            n_fft,
            hop_length,
            window: hann_window(n_fft),
            fft,
        }
    }

    /// Number of frequency bins per frame.
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a waveform of `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        let pad = self.n_fft / 2;
        (len + 2 * pad - self.n_fft) / self.hop_length + 1
    }

    /// Compute `|STFT|^2`, row-major `[frames, n_bins]`.
    pub fn compute(&self, waveform: &[f32]) -> Result<Vec<f32>> {
        if waveform.is_empty() {
            return Err(Error::EmptyWaveform);
        }

        let len = waveform.len();
        let pad = self.n_fft / 2;
        let frames = self.frame_count(len);
        let n_bins = self.n_bins();

        let padded: Vec<f32> = (0..len + 2 * pad)
            .map(|j| waveform[reflect_index(j as isize - pad as isize, len)])
            .collect();

        let mut frame = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();
        let mut power = Vec::with_capacity(frames * n_bins);

        for t in 0..frames {
            let start = t * self.hop_length;
            for ((out, &x), &w) in frame
                .iter_mut()
                .zip(&padded[start..start + self.n_fft])
                .zip(&self.window)
            {
                *out = x * w;
            }

            self.fft
                .process_with_scratch(&mut frame, &mut spectrum, &mut scratch)
                .map_err(|e| Error::Stft {
                    reason: e.to_string(),
                })?;

            power.extend(spectrum.iter().map(|c| c.re * c.re + c.im * c.im));
        }

        Ok(power)
    }
}

/// Periodic Hann window of length `n`.
fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            #[allow(clippy::cast_possible_truncation)]
            let w = (0.5 * (1.0 - phase.cos())) as f32;
            w
        })
        .collect()
}

/// Map an index in the padded signal onto the source, mirroring at both edges
/// without repeating the edge sample. Folds repeatedly for signals shorter
/// than the padding.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn reflect_index(mut i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    loop {
        if i < 0 {
            i = -i;
        } else if i > last {
            i = 2 * last - i;
        } else {
            return i as usize;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_center_convention() {
        let stft = PowerSpectrogram::new(1024, 320);
        // 10 s at 32 kHz.
        assert_eq!(stft.frame_count(320_000), 1001);
        assert_eq!(stft.frame_count(319), 1);
        assert_eq!(stft.frame_count(320), 2);
    }

    #[test]
    fn test_compute_shape() {
        let stft = PowerSpectrogram::new(64, 16);
        let waveform: Vec<f32> = (0..200).map(|i| (i as f32 * 0.3).sin()).collect();
        let power = stft.compute(&waveform).unwrap();
        assert_eq!(power.len(), stft.frame_count(200) * stft.n_bins());
        assert!(power.iter().all(|p| *p >= 0.0 && p.is_finite()));
    }

    #[test]
    fn test_empty_waveform_fails() {
        let stft = PowerSpectrogram::new(64, 16);
        assert!(matches!(stft.compute(&[]), Err(Error::EmptyWaveform)));
    }

    #[test]
    fn test_short_waveform_is_padded() {
        let stft = PowerSpectrogram::new(64, 16);
        let power = stft.compute(&[0.5, -0.5, 0.25]).unwrap();
        assert_eq!(power.len(), stft.n_bins());
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 5), 1);
        assert_eq!(reflect_index(-2, 5), 2);
        assert_eq!(reflect_index(5, 5), 3);
        assert_eq!(reflect_index(2, 5), 2);
        // Folds more than once for short inputs.
        assert_eq!(reflect_index(-4, 3), 0);
        assert_eq!(reflect_index(7, 1), 0);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let n_fft = 256;
        let stft = PowerSpectrogram::new(n_fft, 64);
        let bin = 16;
        let waveform: Vec<f32> = (0..2048)
            .map(|i| (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / n_fft as f32).sin())
            .collect();
        let power = stft.compute(&waveform).unwrap();
        let mid = stft.frame_count(2048) / 2;
        let row = &power[mid * stft.n_bins()..(mid + 1) * stft.n_bins()];
        let peak = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, bin);
    }
}
