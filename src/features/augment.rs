//! Stripe masking on log-mel spectrograms.
//!
//! All functions return a new spectrogram; the input is never modified, so
//! masked copies can be composed freely.

use crate::config::SpecAugmentConfig;
use crate::features::Spectrogram;
use rand::Rng;
use rand::rngs::StdRng;

/// Axis a stripe runs across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeAxis {
    /// Mask a run of consecutive frames.
    Time,
    /// Mask a run of consecutive mel bins.
    Frequency,
}

/// Mask `stripes_num` random stripes of width `< drop_width` along `axis`.
///
/// Masked cells take the minimum value of the input spectrogram.
pub fn drop_stripes(
    spec: &Spectrogram,
    axis: StripeAxis,
    drop_width: usize,
    stripes_num: usize,
    rng: &mut StdRng,
) -> Spectrogram {
    let mut out = spec.clone();
    if drop_width == 0 || spec.data.is_empty() {
        return out;
    }

    let lowest = spec.data.iter().copied().fold(f32::INFINITY, f32::min);
    let total = match axis {
        StripeAxis::Time => spec.frames,
        StripeAxis::Frequency => spec.mel_bins,
    };

    for _ in 0..stripes_num {
        let distance = rng.gen_range(0..drop_width).min(total);
        let begin = if total > distance {
            rng.gen_range(0..total - distance)
        } else {
            0
        };

        match axis {
            StripeAxis::Time => {
                let start = begin * spec.mel_bins;
                let end = (begin + distance) * spec.mel_bins;
                out.data[start..end].fill(lowest);
            }
            StripeAxis::Frequency => {
                for row in out.data.chunks_exact_mut(spec.mel_bins) {
                    row[begin..begin + distance].fill(lowest);
                }
            }
        }
    }

    out
}

/// Time and frequency stripe masking applied in training mode.
#[derive(Debug, Clone, Copy)]
pub struct SpecAugmentation {
    settings: SpecAugmentConfig,
}

impl SpecAugmentation {
    /// Create an augmenter from stripe settings.
    pub fn new(settings: SpecAugmentConfig) -> Self {
        Self { settings }
    }

    /// Apply time stripes, then frequency stripes.
    pub fn apply(&self, spec: &Spectrogram, rng: &mut StdRng) -> Spectrogram {
        let s = &self.settings;
        let masked = drop_stripes(spec, StripeAxis::Time, s.time_drop_width, s.time_stripes_num, rng);
        drop_stripes(
            &masked,
            StripeAxis::Frequency,
            s.freq_drop_width,
            s.freq_stripes_num,
            rng,
        )
    }
}
