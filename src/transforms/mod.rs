//! Named, configurable data transforms.
//!
//! Config files list transforms per phase as `{ name, params }` entries. Names
//! resolve against a fixed registry when the config is validated, so a typo
//! fails before any clip is read.

mod spectrogram;
mod waveform;

pub use spectrogram::{FrequencyMasking, SpectrogramTransform, TimeMasking};
pub use waveform::{
    CosineVolume, GaussianNoise, NewNormalize, NoiseInjection, Normalize, OneOf, RandomVolume,
    WaveformTransform,
};

use crate::config::{Phase, TransformSpec};
use crate::error::{Error, Result};
use crate::features::Spectrogram;
use rand::rngs::StdRng;
use serde::Deserialize;
use serde::de::DeserializeOwned;

type WaveformCtor = fn(&TransformSpec, Phase) -> Result<Box<dyn WaveformTransform>>;
type SpectrogramCtor = fn(&TransformSpec) -> Result<Box<dyn SpectrogramTransform>>;

const WAVEFORM_REGISTRY: &[(&str, WaveformCtor)] = &[
    ("Normalize", boxed_waveform::<Normalize>),
    ("NewNormalize", boxed_waveform::<NewNormalize>),
    ("NoiseInjection", boxed_waveform::<NoiseInjection>),
    ("GaussianNoise", boxed_waveform::<GaussianNoise>),
    ("RandomVolume", boxed_waveform::<RandomVolume>),
    ("CosineVolume", boxed_waveform::<CosineVolume>),
    ("OneOf", one_of),
];

const SPECTROGRAM_REGISTRY: &[(&str, SpectrogramCtor)] = &[
    ("TimeMasking", boxed_spectrogram::<TimeMasking>),
    ("FrequencyMasking", boxed_spectrogram::<FrequencyMasking>),
];

fn parse_params<T: DeserializeOwned>(spec: &TransformSpec) -> Result<T> {
    toml::Value::Table(spec.params.clone())
        .try_into()
        .map_err(|e: toml::de::Error| Error::TransformParams {
            name: spec.name.clone(),
            reason: e.message().to_string(),
        })
}

fn boxed_waveform<T>(spec: &TransformSpec, _phase: Phase) -> Result<Box<dyn WaveformTransform>>
where
    T: WaveformTransform + DeserializeOwned + 'static,
{
    Ok(Box::new(parse_params::<T>(spec)?))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OneOfParams {
    #[serde(default)]
    transforms: Vec<TransformSpec>,
}

fn one_of(spec: &TransformSpec, phase: Phase) -> Result<Box<dyn WaveformTransform>> {
    let params: OneOfParams = parse_params(spec)?;
    let choices = build_waveform_pipeline(&params.transforms, phase)?;
    Ok(Box::new(OneOf::new(choices.transforms)))
}

fn boxed_spectrogram<T>(spec: &TransformSpec) -> Result<Box<dyn SpectrogramTransform>>
where
    T: SpectrogramTransform + DeserializeOwned + 'static,
{
    Ok(Box::new(parse_params::<T>(spec)?))
}

/// Registered waveform transform names.
pub fn waveform_transform_names() -> impl Iterator<Item = &'static str> {
    WAVEFORM_REGISTRY.iter().map(|(name, _)| *name)
}

/// Registered spectrogram transform names.
pub fn spectrogram_transform_names() -> impl Iterator<Item = &'static str> {
    SPECTROGRAM_REGISTRY.iter().map(|(name, _)| *name)
}

/// Waveform transforms run in listed order.
#[derive(Debug, Default)]
pub struct WaveformPipeline {
    transforms: Vec<Box<dyn WaveformTransform>>,
}

impl WaveformPipeline {
    /// Run every transform.
    pub fn apply(&self, samples: Vec<f32>, rng: &mut StdRng) -> Result<Vec<f32>> {
        self.transforms
            .iter()
            .try_fold(samples, |samples, t| t.apply(samples, rng))
    }

    /// Names in application order.
    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Whether the pipeline does nothing.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Spectrogram transforms run in listed order.
#[derive(Debug, Default)]
pub struct SpectrogramPipeline {
    transforms: Vec<Box<dyn SpectrogramTransform>>,
}

impl SpectrogramPipeline {
    /// Run every transform, returning a new spectrogram.
    pub fn apply(&self, spec: Spectrogram, rng: &mut StdRng) -> Spectrogram {
        self.transforms
            .iter()
            .fold(spec, |spec, t| t.apply(&spec, rng))
    }

    /// Names in application order.
    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Whether the pipeline does nothing.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Resolve a phase's waveform transform list.
pub fn build_waveform_pipeline(specs: &[TransformSpec], phase: Phase) -> Result<WaveformPipeline> {
    let transforms = specs
        .iter()
        .map(|spec| {
            let ctor = WAVEFORM_REGISTRY
                .iter()
                .find(|(name, _)| *name == spec.name)
                .map(|(_, ctor)| ctor)
                .ok_or_else(|| Error::UnknownTransform {
                    family: "waveform",
                    name: spec.name.clone(),
                    phase: phase.to_string(),
                })?;
            ctor(spec, phase)
        })
        .collect::<Result<_>>()?;
    Ok(WaveformPipeline { transforms })
}

/// Resolve a phase's spectrogram transform list.
pub fn build_spectrogram_pipeline(
    specs: &[TransformSpec],
    phase: Phase,
) -> Result<SpectrogramPipeline> {
    let transforms = specs
        .iter()
        .map(|spec| {
            let ctor = SPECTROGRAM_REGISTRY
                .iter()
                .find(|(name, _)| *name == spec.name)
                .map(|(_, ctor)| ctor)
                .ok_or_else(|| Error::UnknownTransform {
                    family: "spectrogram",
                    name: spec.name.clone(),
                    phase: phase.to_string(),
                })?;
            ctor(spec)
        })
        .collect::<Result<_>>()?;
    Ok(SpectrogramPipeline { transforms })
}
