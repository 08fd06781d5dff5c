//! Interchangeable convolutional encoders.
//!
//! An encoder takes a single-channel `[batch, 1, freq, time]` image and
//! returns a `[batch, channels, freq', time']` feature map. Only the channel
//! count leaks into the rest of the model (it sizes the attention head).

mod resnet;

pub use resnet::ResNet;

use crate::error::{Error, Result};
use candle::Tensor;
use candle_nn::VarBuilder;

/// A pretrained convolutional trunk with its pooling and classifier removed.
pub trait Backbone: std::fmt::Debug + Send + Sync {
    /// Run the trunk. `train` selects batch statistics in normalisation layers.
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle::Result<Tensor>;

    /// Channel count of the output feature map.
    fn out_channels(&self) -> usize;
}

/// Registered encoder architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackboneKind {
    /// ResNet-18: basic blocks, depths [2, 2, 2, 2].
    ResNet18,
    /// ResNet-34: basic blocks, depths [3, 4, 6, 3].
    ResNet34,
    /// ResNet-50: bottleneck blocks, depths [3, 4, 6, 3].
    ResNet50,
}

impl BackboneKind {
    /// Every registered architecture.
    pub const ALL: [Self; 3] = [Self::ResNet18, Self::ResNet34, Self::ResNet50];

    /// Registry name as used in configuration.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ResNet18 => "resnet18",
            Self::ResNet34 => "resnet34",
            Self::ResNet50 => "resnet50",
        }
    }

    /// Output channel count, known without building the network.
    pub const fn out_channels(self) -> usize {
        match self {
            Self::ResNet18 | Self::ResNet34 => 512,
            Self::ResNet50 => 2048,
        }
    }

    /// Build the encoder, loading its weights from `vb`.
    pub fn build(self, in_channels: usize, vb: VarBuilder) -> Result<Box<dyn Backbone>> {
        let net = match self {
            Self::ResNet18 => ResNet::resnet18(in_channels, vb)?,
            Self::ResNet34 => ResNet::resnet34(in_channels, vb)?,
            Self::ResNet50 => ResNet::resnet50(in_channels, vb)?,
        };
        Ok(Box::new(net))
    }

    fn available() -> String {
        Self::ALL.map(Self::name).join(", ")
    }
}

impl std::fmt::Display for BackboneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for BackboneKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownBackbone {
                name: s.to_string(),
                available: Self::available(),
            })
    }
}
