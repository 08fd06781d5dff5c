//! Sound event detection model.
//!
//! `SedModel` chains the feature frontend, a convolutional encoder and the
//! attention pooling head, and reconstructs frame-rate outputs from the
//! encoder's coarser segment rate.

mod backbone;
mod checkpoint;
mod head;
mod reconstruct;

pub use backbone::{Backbone, BackboneKind, ResNet};
pub use checkpoint::{
    Checkpoint, CheckpointReport, ParameterShapes, ShapeMismatch, frozen_frontend_buffers,
};
pub use head::{Activation, AttBlock, AttentionOutput, PooledOutput, TemporalAttentionHead};
pub use reconstruct::{interpolate, pad_framewise_output, upsample};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::features::{FeatureConfig, FeatureFrontend, Spectrogram};
use candle::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use rand::rngs::StdRng;
use std::sync::PoisonError;

/// Architecture settings needed to build a [`SedModel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SedConfig {
    /// Spectrogram settings.
    pub features: FeatureConfig,
    /// Encoder architecture.
    pub backbone: BackboneKind,
    /// Number of output classes.
    pub num_classes: usize,
    /// Input channels of the spectrogram image.
    pub in_channels: usize,
}

impl TryFrom<&Config> for SedConfig {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self> {
        Ok(Self {
            features: FeatureConfig::from(config),
            backbone: config.base_model_name.parse()?,
            num_classes: config.num_classes,
            in_channels: config.in_channels,
        })
    }
}

/// Outputs of one forward pass for a single clip.
///
/// Frame-indexed outputs have exactly one row per spectrogram frame;
/// segment-indexed outputs have one row per encoder time step.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBundle {
    clipwise_output: Vec<f32>,
    logit: Vec<f32>,
    framewise_output: Vec<Vec<f32>>,
    framewise_logit: Vec<Vec<f32>>,
    segmentwise_output: Vec<Vec<f32>>,
    segmentwise_logit: Vec<Vec<f32>>,
}

impl OutputBundle {
    /// Per-class clip probability.
    pub fn clipwise_output(&self) -> &[f32] {
        &self.clipwise_output
    }

    /// Per-class clip logit.
    pub fn logit(&self) -> &[f32] {
        &self.logit
    }

    /// `[frames][classes]` probabilities.
    pub fn framewise_output(&self) -> &[Vec<f32>] {
        &self.framewise_output
    }

    /// `[frames][classes]` logits.
    pub fn framewise_logit(&self) -> &[Vec<f32>] {
        &self.framewise_logit
    }

    /// `[segments][classes]` probabilities.
    pub fn segmentwise_output(&self) -> &[Vec<f32>] {
        &self.segmentwise_output
    }

    /// `[segments][classes]` logits.
    pub fn segmentwise_logit(&self) -> &[Vec<f32>] {
        &self.segmentwise_logit
    }

    fn from_pooled(pooled: &PooledOutput, framewise: &Tensor, framewise_logit: &Tensor) -> Result<Self> {
        let first = |t: &Tensor| t.get(0);
        Ok(Self {
            clipwise_output: first(&pooled.clipwise_output)?.to_vec1()?,
            logit: first(&pooled.logit)?.to_vec1()?,
            framewise_output: first(framewise)?.to_vec2()?,
            framewise_logit: first(framewise_logit)?.to_vec2()?,
            segmentwise_output: first(&pooled.segmentwise_output)?.to_vec2()?,
            segmentwise_logit: first(&pooled.segmentwise_logit)?.to_vec2()?,
        })
    }
}

/// Frontend, encoder and attention head.
#[derive(Debug)]
pub struct SedModel {
    frontend: FeatureFrontend,
    encoder: Box<dyn Backbone>,
    head: TemporalAttentionHead,
    config: SedConfig,
}

impl SedModel {
    /// Build the model, taking every parameter from `vb`.
    ///
    /// Parameter names: `bn0.*`, `encoder.*`, `fc1.*`, `att_block.*`.
    pub fn new(config: &SedConfig, vb: VarBuilder) -> Result<Self> {
        let frontend = FeatureFrontend::new(&config.features, vb.clone())?;
        let encoder = config.backbone.build(config.in_channels, vb.pp("encoder"))?;
        let head = TemporalAttentionHead::new(encoder.out_channels(), config.num_classes, vb)?;
        Ok(Self {
            frontend,
            encoder,
            head,
            config: *config,
        })
    }

    /// Names and shapes of every parameter [`SedModel::new`] requests.
    pub fn expected_parameters(config: &SedConfig) -> Result<ParameterShapes> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        Self::new(config, vb)?;
        let vars = varmap.data().lock().unwrap_or_else(PoisonError::into_inner);
        Ok(vars
            .iter()
            .map(|(name, var)| (name.clone(), var.dims().to_vec()))
            .collect())
    }

    /// Architecture this model was built with.
    pub fn config(&self) -> &SedConfig {
        &self.config
    }

    /// The feature frontend.
    pub fn frontend(&self) -> &FeatureFrontend {
        &self.frontend
    }

    /// Inference on a mono waveform at the configured sample rate.
    pub fn forward(&self, waveform: &[f32], rng: &mut StdRng) -> Result<OutputBundle> {
        self.forward_t(waveform, false, rng)
    }

    /// Forward pass; `training` enables stripe masking, dropout and batch statistics.
    pub fn forward_t(
        &self,
        waveform: &[f32],
        training: bool,
        rng: &mut StdRng,
    ) -> Result<OutputBundle> {
        let xs = self.frontend.extract_features(waveform, training, rng)?;
        self.forward_features(&xs, training)
    }

    /// Forward pass starting from an already computed log-mel spectrogram.
    pub fn forward_spectrogram(
        &self,
        spec: &Spectrogram,
        training: bool,
        rng: &mut StdRng,
    ) -> Result<OutputBundle> {
        let xs = self.frontend.normalize(spec, training, rng)?;
        self.forward_features(&xs, training)
    }

    /// `xs` is `[1, 1, frames, n_mels]`.
    fn forward_features(&self, xs: &Tensor, training: bool) -> Result<OutputBundle> {
        let frames_num = xs.dim(2)?;
        let xs = xs.transpose(2, 3)?.contiguous()?;
        let xs = self.encoder.forward_t(&xs, training)?;

        let pooled = self.head.pool(&xs, training)?;
        let framewise = upsample(&pooled.segmentwise_output, frames_num)?;
        let framewise_logit = upsample(&pooled.segmentwise_logit, frames_num)?;

        OutputBundle::from_pooled(&pooled, &framewise, &framewise_logit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SpecAugmentConfig;
    use rand::SeedableRng;

    fn small_config(num_classes: usize) -> SedConfig {
        SedConfig {
            features: FeatureConfig {
                sample_rate: 32_000,
                n_fft: 512,
                hop_length: 160,
                n_mels: 32,
                fmin: 50,
                fmax: 14_000,
                spec_augment: SpecAugmentConfig::default(),
            },
            backbone: BackboneKind::ResNet18,
            num_classes,
            in_channels: 1,
        }
    }

    #[test]
    fn test_expected_parameter_names() {
        let params = SedModel::expected_parameters(&small_config(3)).unwrap();
        assert_eq!(params["bn0.running_mean"], vec![32]);
        assert_eq!(params["encoder.0.weight"], vec![64, 1, 7, 7]);
        assert_eq!(params["fc1.weight"], vec![512, 512]);
        assert_eq!(params["att_block.att.weight"], vec![3, 512, 1]);
        assert_eq!(params["att_block.cla.bias"], vec![3]);
    }

    #[test]
    fn test_forward_shapes_and_ranges() {
        let config = small_config(4);
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = SedModel::new(&config, vb).unwrap();

        // 1.05 s: 211 frames, not a multiple of the encoder stride.
        let waveform: Vec<f32> = (0..33_600).map(|i| (i as f32 * 0.01).sin() * 0.1).collect();
        let mut rng = StdRng::seed_from_u64(1213);
        let out = model.forward(&waveform, &mut rng).unwrap();

        let frames = model.frontend().extractor().frame_count(waveform.len());
        assert_eq!(frames, 211);
        assert_eq!(out.clipwise_output().len(), 4);
        assert_eq!(out.logit().len(), 4);
        assert_eq!(out.framewise_output().len(), frames);
        assert_eq!(out.framewise_logit().len(), frames);
        assert!(out.framewise_output().iter().all(|row| row.len() == 4));
        assert_eq!(out.segmentwise_output().len(), 7);
        assert!(out.clipwise_output().iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_eval_forward_is_deterministic() {
        let config = small_config(2);
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = SedModel::new(&config, vb).unwrap();

        let waveform = vec![0.05f32; 16_000];
        let a = model.forward(&waveform, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = model.forward(&waveform, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_forward_is_stochastic() {
        let config = small_config(3);
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = SedModel::new(&config, vb).unwrap();

        let waveform: Vec<f32> = (0..33_600).map(|i| (i as f32 * 0.01).sin() * 0.1).collect();
        let frames = model.frontend().extractor().frame_count(waveform.len());
        let a = model
            .forward_t(&waveform, true, &mut StdRng::seed_from_u64(1))
            .unwrap();
        let b = model
            .forward_t(&waveform, true, &mut StdRng::seed_from_u64(2))
            .unwrap();

        for out in [&a, &b] {
            assert_eq!(out.clipwise_output().len(), 3);
            assert_eq!(out.framewise_output().len(), frames);
            assert!(out.clipwise_output().iter().all(|p| (0.0..=1.0).contains(p)));
        }
        assert_ne!(a.logit(), b.logit());
    }
}
