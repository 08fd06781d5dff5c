//! Configuration loading and management.

mod file;
mod types;
mod validate;

pub use file::{defaulted_feature_keys, load_config_file, save_config};
pub use types::{
    Config, InferenceDevice, Phase, SpecAugmentConfig, TransformSpec, TransformsConfig,
};
pub use validate::validate_config;
