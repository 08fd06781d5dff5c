//! Configuration validation.
//!
//! Everything a run depends on is checked here, before the checkpoint is
//! touched or any clip is decoded.

use crate::config::{Config, Phase};
use crate::error::{Error, Result};
use crate::model::BackboneKind;
use crate::transforms::{build_spectrogram_pipeline, build_waveform_pipeline};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_features(config)?;
    validate_model(config)?;
    validate_inference(config)?;
    validate_transforms(config)?;
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

/// Validate spectrogram settings.
fn validate_features(config: &Config) -> Result<()> {
    if config.sample_rate == 0 {
        return Err(invalid("sample_rate must be positive".to_string()));
    }
    if config.n_fft < 2 {
        return Err(invalid(format!("n_fft must be at least 2, got {}", config.n_fft)));
    }
    if config.hop_length == 0 {
        return Err(invalid("hop_length must be positive".to_string()));
    }
    if config.n_mels == 0 {
        return Err(invalid("n_mels must be positive".to_string()));
    }
    if config.fmin >= config.fmax {
        return Err(invalid(format!(
            "fmin ({}) must be below fmax ({})",
            config.fmin, config.fmax
        )));
    }
    let nyquist = config.sample_rate / 2;
    if config.fmax > nyquist {
        return Err(invalid(format!(
            "fmax ({}) must not exceed the Nyquist frequency ({nyquist})",
            config.fmax
        )));
    }
    Ok(())
}

/// Validate model shape settings.
fn validate_model(config: &Config) -> Result<()> {
    config.base_model_name.parse::<BackboneKind>()?;

    if config.num_classes == 0 {
        return Err(invalid("num_classes must be positive".to_string()));
    }
    if config.target_columns.len() != config.num_classes {
        return Err(invalid(format!(
            "target_columns has {} entries but num_classes is {}",
            config.target_columns.len(),
            config.num_classes
        )));
    }
    if config.in_channels != 1 {
        return Err(invalid(format!(
            "in_channels must be 1 for single-channel spectrogram input, got {}",
            config.in_channels
        )));
    }
    if config.model_path.is_none() {
        return Err(invalid("model_path is required".to_string()));
    }
    Ok(())
}

/// Validate thresholding and clip handling settings.
fn validate_inference(config: &Config) -> Result<()> {
    if !(0.0..=1.0).contains(&config.threshold) {
        return Err(invalid(format!(
            "threshold must be between 0.0 and 1.0, got {}",
            config.threshold
        )));
    }
    if let Some(max_secs) = config.max_clip_secs
        && max_secs <= 0.0
    {
        return Err(invalid(format!(
            "max_clip_secs must be positive, got {max_secs}"
        )));
    }
    if config.audio_extension.is_empty() || config.audio_extension.starts_with('.') {
        return Err(invalid(format!(
            "audio_extension must be a bare extension like \"ogg\", got {:?}",
            config.audio_extension
        )));
    }
    Ok(())
}

/// Resolve every configured transform so unknown names fail now, not mid-run.
fn validate_transforms(config: &Config) -> Result<()> {
    for phase in [Phase::Train, Phase::Valid, Phase::Test] {
        build_waveform_pipeline(config.transforms.phase(phase), phase)?;
        build_spectrogram_pipeline(config.spectrogram_transforms.phase(phase), phase)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformSpec;
    use crate::error::ErrorKind;
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            num_classes: 3,
            target_columns: vec!["class_0".into(), "class_1".into(), "class_2".into()],
            model_path: Some(PathBuf::from("model.safetensors")),
            ..Config::default()
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut config = valid_config();
        config.threshold = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_threshold_bounds_inclusive() {
        let mut config = valid_config();
        config.threshold = 1.0;
        assert!(validate_config(&config).is_ok());
        config.threshold = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_target_columns_length() {
        let mut config = valid_config();
        config.target_columns.pop();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_unknown_backbone() {
        let mut config = valid_config();
        config.base_model_name = "vit_giant".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, Error::UnknownBackbone { .. }));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_validate_unknown_transform_fails_fast() {
        let mut config = valid_config();
        config.transforms.train.push(TransformSpec {
            name: "Reverb".to_string(),
            params: toml::Table::new(),
        });
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, Error::UnknownTransform { .. }));
    }

    #[test]
    fn test_validate_fmax_above_nyquist() {
        let mut config = valid_config();
        config.fmax = 20_000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_missing_model_path() {
        let mut config = valid_config();
        config.model_path = None;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_multichannel_input_rejected() {
        let mut config = valid_config();
        config.in_channels = 3;
        assert!(validate_config(&config).is_err());
    }
}
