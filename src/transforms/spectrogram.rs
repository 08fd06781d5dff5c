//! Spectrogram-level transforms, applied to the log-mel image before `bn0`.

use crate::features::{Spectrogram, StripeAxis, drop_stripes};
use rand::rngs::StdRng;
use serde::Deserialize;

/// A transform applied to a log-mel spectrogram.
pub trait SpectrogramTransform: std::fmt::Debug + Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Return a transformed copy of `spec`.
    fn apply(&self, spec: &Spectrogram, rng: &mut StdRng) -> Spectrogram;
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct StripeParams {
    max_width: usize,
    #[serde(default = "default_stripes")]
    stripes: usize,
}

const fn default_stripes() -> usize {
    1
}

/// Mask runs of whole frames.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct TimeMasking(StripeParams);

/// Mask runs of whole mel bins.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct FrequencyMasking(StripeParams);

impl SpectrogramTransform for TimeMasking {
    fn name(&self) -> &'static str {
        "TimeMasking"
    }

    fn apply(&self, spec: &Spectrogram, rng: &mut StdRng) -> Spectrogram {
        drop_stripes(spec, StripeAxis::Time, self.0.max_width, self.0.stripes, rng)
    }
}

impl SpectrogramTransform for FrequencyMasking {
    fn name(&self) -> &'static str {
        "FrequencyMasking"
    }

    fn apply(&self, spec: &Spectrogram, rng: &mut StdRng) -> Spectrogram {
        drop_stripes(spec, StripeAxis::Frequency, self.0.max_width, self.0.stripes, rng)
    }
}
