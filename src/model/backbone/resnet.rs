//! ResNet trunks laid out as a classifier-stripped sequential encoder.
//!
//! Parameter names follow the sequential layout of the stripped network:
//! `0` is the stem convolution, `1` its batch norm, `2`/`3` the activation
//! and max pool (no weights), and `4`..`7` the four residual stages.

use crate::constants::model::BN_EPS;
use crate::model::backbone::Backbone;
use candle::{Module, ModuleT, Tensor};
use candle_nn::{BatchNorm, Conv2d, Conv2dConfig, VarBuilder};

const STAGE_PLANES: [usize; 4] = [64, 128, 256, 512];
const STEM_CHANNELS: usize = 64;
const FIRST_STAGE_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Basic,
    Bottleneck,
}

impl BlockKind {
    const fn expansion(self) -> usize {
        match self {
            Self::Basic => 1,
            Self::Bottleneck => 4,
        }
    }
}

fn conv(
    in_c: usize,
    out_c: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    vb: VarBuilder,
) -> candle::Result<Conv2d> {
    let cfg = Conv2dConfig {
        padding,
        stride,
        ..Default::default()
    };
    candle_nn::conv2d_no_bias(in_c, out_c, kernel, cfg, vb)
}

#[derive(Debug)]
struct ConvBn {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvBn {
    fn new(
        in_c: usize,
        out_c: usize,
        kernel: usize,
        stride: usize,
        conv_vb: VarBuilder,
        bn_vb: VarBuilder,
    ) -> candle::Result<Self> {
        Ok(Self {
            conv: conv(in_c, out_c, kernel, stride, kernel / 2, conv_vb)?,
            bn: candle_nn::batch_norm(out_c, BN_EPS, bn_vb)?,
        })
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> candle::Result<Tensor> {
        self.bn.forward_t(&self.conv.forward(xs)?, train)
    }
}

#[derive(Debug)]
struct Block {
    convs: Vec<ConvBn>,
    downsample: Option<ConvBn>,
}

impl Block {
    fn new(
        kind: BlockKind,
        in_planes: usize,
        planes: usize,
        stride: usize,
        vb: VarBuilder,
    ) -> candle::Result<Self> {
        let out_planes = planes * kind.expansion();
        let convs = match kind {
            BlockKind::Basic => vec![
                ConvBn::new(in_planes, planes, 3, stride, vb.pp("conv1"), vb.pp("bn1"))?,
                ConvBn::new(planes, planes, 3, 1, vb.pp("conv2"), vb.pp("bn2"))?,
            ],
            BlockKind::Bottleneck => vec![
                ConvBn::new(in_planes, planes, 1, 1, vb.pp("conv1"), vb.pp("bn1"))?,
                ConvBn::new(planes, planes, 3, stride, vb.pp("conv2"), vb.pp("bn2"))?,
                ConvBn::new(planes, out_planes, 1, 1, vb.pp("conv3"), vb.pp("bn3"))?,
            ],
        };

        let downsample = if stride != 1 || in_planes != out_planes {
            let ds = vb.pp("downsample");
            Some(ConvBn::new(in_planes, out_planes, 1, stride, ds.pp("0"), ds.pp("1"))?)
        } else {
            None
        };

        Ok(Self { convs, downsample })
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> candle::Result<Tensor> {
        let last = self.convs.len() - 1;
        let mut ys = xs.clone();
        for (i, conv) in self.convs.iter().enumerate() {
            ys = conv.forward_t(&ys, train)?;
            if i != last {
                ys = ys.relu()?;
            }
        }
        let shortcut = match &self.downsample {
            Some(ds) => ds.forward_t(xs, train)?,
            None => xs.clone(),
        };
        (ys + shortcut)?.relu()
    }
}

/// Residual convolutional encoder.
#[derive(Debug)]
pub struct ResNet {
    stem: ConvBn,
    blocks: Vec<Block>,
    out_channels: usize,
}

impl ResNet {
    fn new(
        kind: BlockKind,
        depths: [usize; 4],
        in_channels: usize,
        vb: VarBuilder,
    ) -> candle::Result<Self> {
        let stem = ConvBn {
            conv: conv(in_channels, STEM_CHANNELS, 7, 2, 3, vb.pp("0"))?,
            bn: candle_nn::batch_norm(STEM_CHANNELS, BN_EPS, vb.pp("1"))?,
        };

        let mut blocks = Vec::with_capacity(depths.iter().sum());
        let mut in_planes = STEM_CHANNELS;
        for (stage, (&depth, &planes)) in depths.iter().zip(&STAGE_PLANES).enumerate() {
            let stage_vb = vb.pp(FIRST_STAGE_INDEX + stage);
            let stage_stride = if stage == 0 { 1 } else { 2 };
            for i in 0..depth {
                let stride = if i == 0 { stage_stride } else { 1 };
                blocks.push(Block::new(kind, in_planes, planes, stride, stage_vb.pp(i))?);
                in_planes = planes * kind.expansion();
            }
        }

        Ok(Self {
            stem,
            blocks,
            out_channels: in_planes,
        })
    }

    /// ResNet-18 trunk.
    pub fn resnet18(in_channels: usize, vb: VarBuilder) -> candle::Result<Self> {
        Self::new(BlockKind::Basic, [2, 2, 2, 2], in_channels, vb)
    }

    /// ResNet-34 trunk.
    pub fn resnet34(in_channels: usize, vb: VarBuilder) -> candle::Result<Self> {
        Self::new(BlockKind::Basic, [3, 4, 6, 3], in_channels, vb)
    }

    /// ResNet-50 trunk.
    pub fn resnet50(in_channels: usize, vb: VarBuilder) -> candle::Result<Self> {
        Self::new(BlockKind::Bottleneck, [3, 4, 6, 3], in_channels, vb)
    }
}

impl Backbone for ResNet {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle::Result<Tensor> {
        let xs = self.stem.forward_t(xs, train)?.relu()?;
        // 3x3/2 max pool with one cell of padding. Inputs are post-ReLU, so zero
        // padding never wins over a real value.
        let xs = xs
            .pad_with_zeros(2, 1, 1)?
            .pad_with_zeros(3, 1, 1)?
            .max_pool2d_with_stride(3, 2)?;
        self.blocks
            .iter()
            .try_fold(xs, |xs, block| block.forward_t(&xs, train))
    }

    fn out_channels(&self) -> usize {
        self.out_channels
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_resnet18_parameter_layout() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        ResNet::resnet18(1, vb).unwrap();

        let vars = varmap.data().lock().unwrap();
        assert_eq!(vars["0.weight"].dims(), &[64, 1, 7, 7]);
        assert!(vars.contains_key("1.running_var"));
        assert_eq!(vars["4.0.conv1.weight"].dims(), &[64, 64, 3, 3]);
        assert_eq!(vars["5.0.downsample.0.weight"].dims(), &[128, 64, 1, 1]);
        assert!(vars.contains_key("7.1.bn2.bias"));
        assert!(!vars.contains_key("4.0.downsample.0.weight"));
    }

    #[test]
    fn test_resnet50_first_block_projects() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = ResNet::resnet50(1, vb).unwrap();
        assert_eq!(net.out_channels(), 2048);

        let vars = varmap.data().lock().unwrap();
        // Stage 1 keeps the stride but still widens 64 → 256.
        assert_eq!(vars["4.0.downsample.0.weight"].dims(), &[256, 64, 1, 1]);
        assert_eq!(vars["7.2.conv3.weight"].dims(), &[2048, 512, 1, 1]);
    }

    #[test]
    fn test_resnet18_downsamples_by_32() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = ResNet::resnet18(1, vb).unwrap();

        let xs = Tensor::zeros((1, 1, 64, 320), DType::F32, &Device::Cpu).unwrap();
        let ys = net.forward_t(&xs, false).unwrap();
        assert_eq!(ys.dims(), &[1, 512, 2, 10]);
    }
}
