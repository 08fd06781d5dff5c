//! Slaney-style mel filter bank and power-to-decibel conversion.

use crate::constants::features::{AMIN, REF};

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn logstep() -> f64 {
    6.4f64.ln() / 27.0
}

fn hz_to_mel(freq: f64) -> f64 {
    if freq >= MIN_LOG_HZ {
        MIN_LOG_MEL + (freq / MIN_LOG_HZ).ln() / logstep()
    } else {
        freq / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (logstep() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters with Slaney area normalisation.
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    n_mels: usize,
    n_bins: usize,
    /// Row-major `[n_mels, n_bins]`.
    weights: Vec<f32>,
}

impl MelFilterBank {
    /// Build filters for an `n_fft`-point transform at `sample_rate`, spanning `[fmin, fmax]` Hz.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Self {
        let n_bins = n_fft / 2 + 1;
        let nyquist = f64::from(sample_rate) / 2.0;

        let fft_freqs: Vec<f64> = (0..n_bins)
            .map(|k| nyquist * k as f64 / (n_bins - 1).max(1) as f64)
            .collect();

        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let mel_freqs: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut weights = vec![0.0f32; n_mels * n_bins];
        for m in 0..n_mels {
            let lower_width = mel_freqs[m + 1] - mel_freqs[m];
            let upper_width = mel_freqs[m + 2] - mel_freqs[m + 1];
            let enorm = 2.0 / (mel_freqs[m + 2] - mel_freqs[m]);
            for (k, &f) in fft_freqs.iter().enumerate() {
                let lower = (f - mel_freqs[m]) / lower_width;
                let upper = (mel_freqs[m + 2] - f) / upper_width;
                let w = lower.min(upper).max(0.0);
                weights[m * n_bins + k] = (w * enorm) as f32;
            }
        }

        Self {
            n_mels,
            n_bins,
            weights,
        }
    }

    /// Number of mel bands.
    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    /// Number of FFT bins each filter spans.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Project a `[frames, n_bins]` power spectrogram to `[frames, n_mels]` decibels.
    ///
    /// Values are floored at `AMIN` before the logarithm; there is no upper clip.
    pub fn log_mel(&self, power: &[f32]) -> Vec<f32> {
        let frames = power.len() / self.n_bins;
        let ref_db = 10.0 * AMIN.max(REF).log10();
        let mut out = Vec::with_capacity(frames * self.n_mels);

        for row in power.chunks_exact(self.n_bins) {
            for filter in self.weights.chunks_exact(self.n_bins) {
                let energy: f32 = filter.iter().zip(row).map(|(w, p)| w * p).sum();
                out.push(10.0 * energy.max(AMIN).log10() - ref_db);
            }
        }

        out
    }
}
