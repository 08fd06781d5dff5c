//! Waveform-level transforms.

use crate::error::Result;
use rand::Rng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::f32::consts::PI;

/// A transform applied to a mono waveform before feature extraction.
pub trait WaveformTransform: std::fmt::Debug + Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Transform `samples`, drawing any randomness from `rng`.
    fn apply(&self, samples: Vec<f32>, rng: &mut StdRng) -> Result<Vec<f32>>;
}

const fn default_p() -> f32 {
    0.5
}

/// `always_apply` wins; otherwise apply with probability `p`.
fn fires(always_apply: bool, p: f32, rng: &mut StdRng) -> bool {
    always_apply || rng.r#gen::<f32>() < p
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Unit-variance Gaussian noise via Box–Muller.
fn standard_normal(rng: &mut StdRng, len: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(len + 1);
    while out.len() < len {
        let u1 = rng.r#gen::<f32>().max(f32::MIN_POSITIVE);
        let u2 = rng.r#gen::<f32>();
        let r = (-2.0 * u1.ln()).sqrt();
        out.push(r * (2.0 * PI * u2).cos());
        out.push(r * (2.0 * PI * u2).sin());
    }
    out.truncate(len);
    out
}

fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Scale to unit peak amplitude. Silent input is returned unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Normalize {}

impl WaveformTransform for Normalize {
    fn name(&self) -> &'static str {
        "Normalize"
    }

    fn apply(&self, mut samples: Vec<f32>, _rng: &mut StdRng) -> Result<Vec<f32>> {
        let max = peak(&samples);
        if max > 0.0 {
            samples.iter_mut().for_each(|s| *s /= max);
        }
        Ok(samples)
    }
}

/// Remove the mean, then scale to unit peak amplitude.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewNormalize {}

impl WaveformTransform for NewNormalize {
    fn name(&self) -> &'static str {
        "NewNormalize"
    }

    fn apply(&self, mut samples: Vec<f32>, _rng: &mut StdRng) -> Result<Vec<f32>> {
        if samples.is_empty() {
            return Ok(samples);
        }
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        samples.iter_mut().for_each(|s| *s -= mean);
        let max = peak(&samples);
        if max > 0.0 {
            samples.iter_mut().for_each(|s| *s /= max);
        }
        Ok(samples)
    }
}

/// Add white noise with a level drawn from `[0, max_noise_level)`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoiseInjection {
    #[serde(default)]
    always_apply: bool,
    #[serde(default = "default_p")]
    p: f32,
    #[serde(default = "NoiseInjection::default_max_noise_level")]
    max_noise_level: f32,
    /// Accepted for config compatibility; unused.
    #[serde(default)]
    #[allow(dead_code)]
    sr: Option<u32>,
}

impl NoiseInjection {
    const fn default_max_noise_level() -> f32 {
        0.5
    }
}

impl WaveformTransform for NoiseInjection {
    fn name(&self) -> &'static str {
        "NoiseInjection"
    }

    fn apply(&self, mut samples: Vec<f32>, rng: &mut StdRng) -> Result<Vec<f32>> {
        if !fires(self.always_apply, self.p, rng) || self.max_noise_level <= 0.0 {
            return Ok(samples);
        }
        let level = rng.gen_range(0.0..self.max_noise_level);
        let noise = standard_normal(rng, samples.len());
        for (s, n) in samples.iter_mut().zip(noise) {
            *s += n * level;
        }
        Ok(samples)
    }
}

/// Add white noise at a signal-to-noise ratio drawn from `[min_snr, max_snr)` dB.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaussianNoise {
    #[serde(default)]
    always_apply: bool,
    #[serde(default = "default_p")]
    p: f32,
    #[serde(default = "GaussianNoise::default_min_snr")]
    min_snr: f32,
    #[serde(default = "GaussianNoise::default_max_snr")]
    max_snr: f32,
    #[serde(default)]
    #[allow(dead_code)]
    sr: Option<u32>,
}

impl GaussianNoise {
    const fn default_min_snr() -> f32 {
        5.0
    }

    const fn default_max_snr() -> f32 {
        20.0
    }
}

impl WaveformTransform for GaussianNoise {
    fn name(&self) -> &'static str {
        "GaussianNoise"
    }

    fn apply(&self, mut samples: Vec<f32>, rng: &mut StdRng) -> Result<Vec<f32>> {
        if !fires(self.always_apply, self.p, rng) {
            return Ok(samples);
        }
        let snr = if self.max_snr > self.min_snr {
            rng.gen_range(self.min_snr..self.max_snr)
        } else {
            self.min_snr
        };
        let noise_amplitude = peak(&samples) / db_to_amplitude(snr);
        let noise = standard_normal(rng, samples.len());
        let noise_peak = peak(&noise);
        if noise_peak == 0.0 {
            return Ok(samples);
        }
        for (s, n) in samples.iter_mut().zip(noise) {
            *s += n / noise_peak * noise_amplitude;
        }
        Ok(samples)
    }
}

/// Uniform gain change drawn from `[-limit, limit)` dB.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomVolume {
    #[serde(default)]
    always_apply: bool,
    #[serde(default = "default_p")]
    p: f32,
    #[serde(default = "default_limit")]
    limit: f32,
}

const fn default_limit() -> f32 {
    10.0
}

fn draw_db(rng: &mut StdRng, limit: f32) -> f32 {
    if limit > 0.0 {
        rng.gen_range(-limit..limit)
    } else {
        0.0
    }
}

impl WaveformTransform for RandomVolume {
    fn name(&self) -> &'static str {
        "RandomVolume"
    }

    fn apply(&self, mut samples: Vec<f32>, rng: &mut StdRng) -> Result<Vec<f32>> {
        if !fires(self.always_apply, self.p, rng) {
            return Ok(samples);
        }
        let gain = db_to_amplitude(draw_db(rng, self.limit));
        samples.iter_mut().for_each(|s| *s *= gain);
        Ok(samples)
    }
}

/// Gain that follows one cosine period over the clip, peaking at ±`limit` dB.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CosineVolume {
    #[serde(default)]
    always_apply: bool,
    #[serde(default = "default_p")]
    p: f32,
    #[serde(default = "default_limit")]
    limit: f32,
}

impl WaveformTransform for CosineVolume {
    fn name(&self) -> &'static str {
        "CosineVolume"
    }

    fn apply(&self, mut samples: Vec<f32>, rng: &mut StdRng) -> Result<Vec<f32>> {
        if !fires(self.always_apply, self.p, rng) {
            return Ok(samples);
        }
        let db = draw_db(rng, self.limit);
        let len = samples.len() as f32;
        for (i, s) in samples.iter_mut().enumerate() {
            let cosine = (i as f32 / len * 2.0 * PI).cos();
            *s *= db_to_amplitude(cosine * db);
        }
        Ok(samples)
    }
}

/// Apply one transform chosen uniformly at random.
///
/// Built by the registry from a nested `transforms` list; an empty list
/// passes the waveform through.
#[derive(Debug, Default)]
pub struct OneOf {
    choices: Vec<Box<dyn WaveformTransform>>,
}

impl OneOf {
    /// Wrap already resolved choices.
    pub fn new(choices: Vec<Box<dyn WaveformTransform>>) -> Self {
        Self { choices }
    }

    /// Number of choices.
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    /// Whether there is nothing to choose from.
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

impl WaveformTransform for OneOf {
    fn name(&self) -> &'static str {
        "OneOf"
    }

    fn apply(&self, samples: Vec<f32>, rng: &mut StdRng) -> Result<Vec<f32>> {
        if self.choices.is_empty() {
            return Ok(samples);
        }
        let idx = rng.gen_range(0..self.choices.len());
        self.choices[idx].apply(samples, rng)
    }
}
