//! Attention pooling over time.
//!
//! The encoder feature map is averaged over frequency, lightly smoothed along
//! time, projected, and then pooled by a learned softmax attention so that each
//! class gets its own weighting of segments.

use candle::{D, Module, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, Linear, VarBuilder};

const DROPOUT: f32 = crate::constants::model::DROPOUT;

/// Per-segment activation applied to the classifier branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Raw scores.
    Linear,
    /// Probabilities in `[0, 1]`.
    Sigmoid,
}

impl Activation {
    fn apply(self, xs: &Tensor) -> candle::Result<Tensor> {
        match self {
            Self::Linear => Ok(xs.clone()),
            Self::Sigmoid => candle_nn::ops::sigmoid(xs),
        }
    }
}

/// Output of [`AttBlock::forward`], all channel-major.
#[derive(Debug)]
pub struct AttentionOutput {
    /// `[B, C]`, Σₜ attention · activated scores.
    pub clipwise: Tensor,
    /// `[B, C]`, Σₜ attention · raw scores.
    pub logit: Tensor,
    /// `[B, C, T]`, softmax over T; sums to 1 per class.
    pub attention: Tensor,
    /// `[B, C, T]`, activated per-segment scores.
    pub segmentwise: Tensor,
    /// `[B, C, T]`, raw per-segment scores.
    pub segmentwise_logit: Tensor,
}

/// Two pointwise convolutions: one scoring attention, one classifying.
#[derive(Debug)]
pub struct AttBlock {
    att: Conv1d,
    cla: Conv1d,
    activation: Activation,
}

impl AttBlock {
    /// Load `att.*` and `cla.*` from `vb`.
    pub fn new(
        in_features: usize,
        out_features: usize,
        activation: Activation,
        vb: VarBuilder,
    ) -> candle::Result<Self> {
        let cfg = Conv1dConfig::default();
        Ok(Self {
            att: candle_nn::conv1d(in_features, out_features, 1, cfg, vb.pp("att"))?,
            cla: candle_nn::conv1d(in_features, out_features, 1, cfg, vb.pp("cla"))?,
            activation,
        })
    }

    /// Pool `[B, in_features, T]` into per-class outputs.
    pub fn forward(&self, xs: &Tensor) -> candle::Result<AttentionOutput> {
        let attention = candle_nn::ops::softmax(&self.att.forward(xs)?.tanh()?, D::Minus1)?;
        let segmentwise_logit = self.cla.forward(xs)?;
        let segmentwise = self.activation.apply(&segmentwise_logit)?;

        let clipwise = (&attention * &segmentwise)?.sum(2)?;
        let logit = (&attention * &segmentwise_logit)?.sum(2)?;

        Ok(AttentionOutput {
            clipwise,
            logit,
            attention,
            segmentwise,
            segmentwise_logit,
        })
    }
}

/// Head output before framewise reconstruction.
#[derive(Debug)]
pub struct PooledOutput {
    /// `[B, C]` clip probabilities.
    pub clipwise_output: Tensor,
    /// `[B, C]` clip logits.
    pub logit: Tensor,
    /// `[B, C, T']` attention weights.
    pub attention: Tensor,
    /// `[B, T', C]` segment probabilities.
    pub segmentwise_output: Tensor,
    /// `[B, T', C]` segment logits.
    pub segmentwise_logit: Tensor,
}

/// `fc1` projection followed by the attention block.
#[derive(Debug)]
pub struct TemporalAttentionHead {
    fc1: Linear,
    att_block: AttBlock,
}

impl TemporalAttentionHead {
    /// Load `fc1.*` and `att_block.*` from `vb`.
    pub fn new(in_features: usize, num_classes: usize, vb: VarBuilder) -> candle::Result<Self> {
        Ok(Self {
            fc1: candle_nn::linear(in_features, in_features, vb.pp("fc1"))?,
            att_block: AttBlock::new(
                in_features,
                num_classes,
                Activation::Sigmoid,
                vb.pp("att_block"),
            )?,
        })
    }

    /// Pool an encoder map `[B, C, F', T']`.
    pub fn pool(&self, features: &Tensor, train: bool) -> candle::Result<PooledOutput> {
        let xs = features.mean(2)?;
        let xs = (max_pool_3(&xs)? + avg_pool_3(&xs)?)?;
        let xs = dropout(&xs, train)?;

        let xs = xs.transpose(1, 2)?.contiguous()?;
        let xs = self.fc1.forward(&xs)?.relu()?;
        let xs = xs.transpose(1, 2)?.contiguous()?;
        let xs = dropout(&xs, train)?;

        let pooled = self.att_block.forward(&xs)?;
        Ok(PooledOutput {
            clipwise_output: pooled.clipwise,
            logit: pooled.logit,
            attention: pooled.attention,
            segmentwise_output: pooled.segmentwise.transpose(1, 2)?.contiguous()?,
            segmentwise_logit: pooled.segmentwise_logit.transpose(1, 2)?.contiguous()?,
        })
    }
}

fn dropout(xs: &Tensor, train: bool) -> candle::Result<Tensor> {
    if train {
        candle_nn::ops::dropout(xs, DROPOUT)
    } else {
        Ok(xs.clone())
    }
}

/// Width-3, stride-1 max pool along the last axis, same-length output.
///
/// Edges are padded by replication, which matches implicit `-inf` padding for
/// a max.
fn max_pool_3(xs: &Tensor) -> candle::Result<Tensor> {
    let len = xs.dim(D::Minus1)?;
    let padded = xs.pad_with_same(D::Minus1, 1, 1)?;
    let left = padded.narrow(D::Minus1, 0, len)?;
    let mid = padded.narrow(D::Minus1, 1, len)?;
    let right = padded.narrow(D::Minus1, 2, len)?;
    left.maximum(&mid)?.maximum(&right)
}

/// Width-3, stride-1 average pool along the last axis with zero padding
/// counted in the divisor.
fn avg_pool_3(xs: &Tensor) -> candle::Result<Tensor> {
    let len = xs.dim(D::Minus1)?;
    let padded = xs.pad_with_zeros(D::Minus1, 1, 1)?;
    let sum = ((padded.narrow(D::Minus1, 0, len)? + padded.narrow(D::Minus1, 1, len)?)?
        + padded.narrow(D::Minus1, 2, len)?)?;
    sum / 3.0
}
