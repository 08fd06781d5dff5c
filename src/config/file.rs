//! Configuration file loading.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::info;

/// Keys that shape the spectrogram. A checkpoint cannot reveal a wrong hop or
/// band edge, so falling back to a default for any of them is logged.
const FEATURE_KEYS: [&str; 6] = ["sample_rate", "n_fft", "hop_length", "n_mels", "fmin", "fmax"];

/// Load configuration from a TOML file.
///
/// Unlike a user preferences file, the run configuration is mandatory:
/// a missing file is reported as a read error.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let parse_err = |e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    };
    let table: toml::Table = toml::from_str(&contents).map_err(parse_err)?;
    let defaulted = defaulted_feature_keys(&table);
    let config: Config = toml::Value::Table(table).try_into().map_err(parse_err)?;

    if !defaulted.is_empty() {
        let values: Vec<String> = defaulted
            .iter()
            .map(|key| format!("{key}={}", feature_value(&config, key)))
            .collect();
        info!(
            "{} does not set {}; using defaults",
            path.display(),
            values.join(", ")
        );
    }

    Ok(config)
}

/// Feature keys absent from a parsed config file.
pub fn defaulted_feature_keys(table: &toml::Table) -> Vec<&'static str> {
    FEATURE_KEYS
        .into_iter()
        .filter(|key| !table.contains_key(*key))
        .collect()
}

fn feature_value(config: &Config, key: &str) -> String {
    match key {
        "sample_rate" => config.sample_rate.to_string(),
        "n_fft" => config.n_fft.to_string(),
        "hop_length" => config.hop_length.to_string(),
        "n_mels" => config.n_mels.to_string(),
        "fmin" => config.fmin.to_string(),
        "fmax" => config.fmax.to_string(),
        _ => String::new(),
    }
}

/// Save configuration to a TOML file.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::ConfigWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;

    std::fs::write(path, contents).map_err(|e| Error::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_nonexistent_file_is_config_error() {
        let path = Path::new("/nonexistent/path/config.toml");
        let err = load_config_file(path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_model_name = "resnet18"
num_classes = 2
target_columns = ["acafly", "amecro"]
model_path = "/models/fold0.pth"
threshold = 0.3

[[transforms.test]]
name = "Normalize"
"#
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.base_model_name, "resnet18");
        assert_eq!(config.num_classes, 2);
        assert_eq!(config.threshold, 0.3);
        assert_eq!(config.transforms.test.len(), 1);
        // Unset keys keep their defaults.
        assert_eq!(config.hop_length, 320);
    }

    #[test]
    fn test_defaulted_feature_keys() {
        let table: toml::Table = toml::from_str("n_fft = 2048\nhop_length = 512").unwrap();
        assert_eq!(
            defaulted_feature_keys(&table),
            vec!["sample_rate", "n_mels", "fmin", "fmax"]
        );

        let saved: toml::Table =
            toml::from_str(&toml::to_string(&Config::default()).unwrap()).unwrap();
        assert!(defaulted_feature_keys(&saved).is_empty());
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = load_config_file(file.path());
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            num_classes: 3,
            target_columns: vec!["a".into(), "b".into(), "c".into()],
            ..Config::default()
        };
        save_config(&config, &path).unwrap();

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.num_classes, 3);
        assert_eq!(loaded.target_columns, config.target_columns);
    }
}
