//! Feature frontend: waveform to normalised log-mel spectrogram.
//!
//! ```text
//! waveform [samples]
//!   → |STFT|² (reflect-padded, Hann)      [frames, n_fft/2+1]
//!   → mel projection + 10·log10           [frames, n_mels]
//!   → per-mel batch norm (bn0)            [1, 1, frames, n_mels]
//!   → stripe masking (training only)
//! ```

mod augment;
mod mel;
mod stft;

pub use augment::{SpecAugmentation, StripeAxis, drop_stripes};
pub use mel::MelFilterBank;
pub use stft::PowerSpectrogram;

use crate::config::{Config, SpecAugmentConfig};
use crate::constants::model::BN_EPS;
use crate::error::{Error, Result};
use candle::{Device, ModuleT, Tensor};
use candle_nn::{BatchNorm, VarBuilder};
use rand::rngs::StdRng;

/// Spectrogram settings shared by the extractor and the normalisation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// FFT size and window length.
    pub n_fft: usize,
    /// Hop between frames.
    pub hop_length: usize,
    /// Number of mel bins.
    pub n_mels: usize,
    /// Lowest mel frequency in Hz.
    pub fmin: u32,
    /// Highest mel frequency in Hz.
    pub fmax: u32,
    /// Training-time stripe masking.
    pub spec_augment: SpecAugmentConfig,
}

impl From<&Config> for FeatureConfig {
    fn from(config: &Config) -> Self {
        Self {
            sample_rate: config.sample_rate,
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            n_mels: config.n_mels,
            fmin: config.fmin,
            fmax: config.fmax,
            spec_augment: config.spec_augment,
        }
    }
}

/// A single log-mel spectrogram, row-major `[frames, mel_bins]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// Number of time frames.
    pub frames: usize,
    /// Number of mel bins per frame.
    pub mel_bins: usize,
    /// Values, frame by frame.
    pub data: Vec<f32>,
}

impl Spectrogram {
    /// Convert to a `[1, 1, frames, mel_bins]` tensor.
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        Ok(Tensor::from_slice(
            &self.data,
            (1, 1, self.frames, self.mel_bins),
            device,
        )?)
    }

    /// Read back a `[1, 1, frames, mel_bins]` tensor.
    pub fn from_tensor(tensor: &Tensor) -> Result<Self> {
        let (_, _, frames, mel_bins) = tensor.dims4()?;
        let data = tensor.flatten_all()?.to_vec1::<f32>()?;
        Ok(Self {
            frames,
            mel_bins,
            data,
        })
    }

    /// Smallest value in the spectrogram.
    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }
}

/// Deterministic waveform to log-mel conversion (no learned parameters).
#[derive(Debug)]
pub struct LogmelExtractor {
    stft: PowerSpectrogram,
    mel: MelFilterBank,
}

impl LogmelExtractor {
    /// Build the STFT plan and mel filters.
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            stft: PowerSpectrogram::new(config.n_fft, config.hop_length),
            mel: MelFilterBank::new(
                config.sample_rate,
                config.n_fft,
                config.n_mels,
                f64::from(config.fmin),
                f64::from(config.fmax),
            ),
        }
    }

    /// Number of frames produced for `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        self.stft.frame_count(len)
    }

    /// Compute the log-mel spectrogram of a mono waveform.
    pub fn logmel(&self, waveform: &[f32]) -> Result<Spectrogram> {
        let power = self.stft.compute(waveform)?;
        let data = self.mel.log_mel(&power);
        Ok(Spectrogram {
            frames: data.len() / self.mel.n_mels(),
            mel_bins: self.mel.n_mels(),
            data,
        })
    }
}

/// Full feature frontend including the learned per-mel normalisation.
#[derive(Debug)]
pub struct FeatureFrontend {
    extractor: LogmelExtractor,
    bn0: BatchNorm,
    augmenter: SpecAugmentation,
    device: Device,
}

impl FeatureFrontend {
    /// Build the frontend; loads `bn0.*` from `vb`.
    pub fn new(config: &FeatureConfig, vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        let bn0 = candle_nn::batch_norm(config.n_mels, BN_EPS, vb.pp("bn0"))?;
        Ok(Self {
            extractor: LogmelExtractor::new(config),
            bn0,
            augmenter: SpecAugmentation::new(config.spec_augment),
            device,
        })
    }

    /// The deterministic log-mel stage.
    pub fn extractor(&self) -> &LogmelExtractor {
        &self.extractor
    }

    /// Waveform to `[1, 1, frames, n_mels]` features.
    pub fn extract_features(
        &self,
        waveform: &[f32],
        training: bool,
        rng: &mut StdRng,
    ) -> Result<Tensor> {
        if waveform.is_empty() {
            return Err(Error::EmptyWaveform);
        }
        let spec = self.extractor.logmel(waveform)?;
        self.normalize(&spec, training, rng)
    }

    /// Apply per-mel normalisation and, in training mode, stripe masking.
    pub fn normalize(
        &self,
        spec: &Spectrogram,
        training: bool,
        rng: &mut StdRng,
    ) -> Result<Tensor> {
        let xs = spec.to_tensor(&self.device)?;
        // Put mel bins on the channel axis for bn0, then restore the layout.
        let xs = xs.transpose(1, 3)?;
        let xs = self.bn0.forward_t(&xs, training)?;
        let xs = xs.transpose(1, 3)?.contiguous()?;

        if training {
            let masked = self.augmenter.apply(&Spectrogram::from_tensor(&xs)?, rng);
            return masked.to_tensor(&self.device);
        }
        Ok(xs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle::DType;
    use rand::{Rng, SeedableRng};

    fn small_config() -> FeatureConfig {
        FeatureConfig {
            sample_rate: 32_000,
            n_fft: 256,
            hop_length: 64,
            n_mels: 16,
            fmin: 50,
            fmax: 14_000,
            spec_augment: SpecAugmentConfig::default(),
        }
    }

    #[test]
    fn test_logmel_frame_count() {
        let extractor = LogmelExtractor::new(&small_config());
        let spec = extractor.logmel(&vec![0.1; 1000]).unwrap();
        assert_eq!(spec.frames, 1000 / 64 + 1);
        assert_eq!(spec.mel_bins, 16);
        assert_eq!(spec.data.len(), spec.frames * spec.mel_bins);
    }

    #[test]
    fn test_spectrogram_tensor_round_trip_layout() {
        let spec = Spectrogram {
            frames: 2,
            mel_bins: 3,
            data: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        };
        let t = spec.to_tensor(&Device::Cpu).unwrap();
        assert_eq!(t.dims(), &[1, 1, 2, 3]);
        assert_eq!(Spectrogram::from_tensor(&t).unwrap(), spec);
    }

    #[test]
    fn test_identity_bn0_preserves_values_in_eval() {
        // Default BatchNorm statistics (mean 0, var 1, weight 1, bias 0) are an identity
        // up to the epsilon term.
        let varmap = candle_nn::VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let frontend = FeatureFrontend::new(&small_config(), vb).unwrap();

        let waveform: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let features = frontend.extract_features(&waveform, false, &mut rng).unwrap();
        let raw = frontend.extractor().logmel(&waveform).unwrap();

        let normalised = Spectrogram::from_tensor(&features).unwrap();
        assert_eq!(normalised.frames, raw.frames);
        for (a, b) in raw.data.iter().zip(&normalised.data) {
            assert!((a - b).abs() < 1e-3 * a.abs().max(1.0));
        }
    }

    #[test]
    fn test_empty_waveform_fails_fast() {
        let varmap = candle_nn::VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let frontend = FeatureFrontend::new(&small_config(), vb).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let result = frontend.extract_features(&[], false, &mut rng);
        assert!(matches!(result, Err(Error::EmptyWaveform)));
    }

    fn heavy_masking_config() -> FeatureConfig {
        FeatureConfig {
            spec_augment: SpecAugmentConfig {
                time_drop_width: 8,
                time_stripes_num: 6,
                freq_drop_width: 4,
                freq_stripes_num: 2,
            },
            ..small_config()
        }
    }

    #[allow(clippy::float_cmp)]
    fn masked_frames(spec: &Spectrogram) -> usize {
        let lowest = spec.min_value();
        spec.data
            .chunks_exact(spec.mel_bins)
            .filter(|frame| frame.iter().all(|v| *v == lowest))
            .count()
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_training_masks_whole_frames() {
        let varmap = candle_nn::VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let frontend = FeatureFrontend::new(&heavy_masking_config(), vb).unwrap();

        let waveform: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut rng = StdRng::seed_from_u64(1213);
        let features = frontend.extract_features(&waveform, true, &mut rng).unwrap();

        let frames = frontend.extractor().frame_count(waveform.len());
        assert_eq!(features.dims(), &[1, 1, frames, 16]);
        let spec = Spectrogram::from_tensor(&features).unwrap();
        assert!(masked_frames(&spec) >= 1);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_eval_never_masks_or_draws() {
        let varmap = candle_nn::VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let frontend = FeatureFrontend::new(&heavy_masking_config(), vb).unwrap();

        let waveform: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut rng = StdRng::seed_from_u64(1213);
        let features = frontend.extract_features(&waveform, false, &mut rng).unwrap();

        let spec = Spectrogram::from_tensor(&features).unwrap();
        assert_eq!(masked_frames(&spec), 0);
        // The random stream is left untouched.
        let mut fresh = StdRng::seed_from_u64(1213);
        assert_eq!(rng.r#gen::<u64>(), fresh.r#gen::<u64>());
    }
}
