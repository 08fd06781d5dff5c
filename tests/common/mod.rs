//! Fixtures shared by the integration tests.

#![allow(clippy::unwrap_used, dead_code)]

use candle::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use sedlabel::config::{Config, InferenceDevice};
use sedlabel::model::{SedConfig, SedModel};
use std::path::Path;

/// Class names used by every fixture model.
pub const CLASSES: [&str; 3] = ["class_0", "class_1", "class_2"];

/// Clipwise probabilities the fixture model produces for any input.
pub const CLASS_PROBABILITIES: [f32; 3] = [0.1, 0.6, 0.9];

/// A small valid configuration rooted in `root`.
pub fn fixture_config(root: &Path) -> Config {
    Config {
        base_model_name: "resnet18".to_string(),
        num_classes: CLASSES.len(),
        target_columns: CLASSES.iter().map(ToString::to_string).collect(),
        test_datadir: Some(root.join("clips")),
        model_path: Some(root.join("model.safetensors")),
        output_dir: root.join("out"),
        audio_extension: "wav".to_string(),
        device: InferenceDevice::Cpu,
        ..Config::default()
    }
}

/// Write a checkpoint whose clipwise output is [`CLASS_PROBABILITIES`]
/// regardless of input.
///
/// Zero attention weights give uniform pooling over segments, and a zero
/// classifier weight leaves only the bias, so every segment carries the
/// same probability.
pub fn write_constant_checkpoint(config: &Config, path: &Path) {
    let sed_config = SedConfig::try_from(config).unwrap();
    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    SedModel::new(&sed_config, vb).unwrap();

    let hidden = sed_config.backbone.out_channels();
    let classes = sed_config.num_classes;
    let zeros = |dims: &[usize]| Tensor::zeros(dims, DType::F32, &Device::Cpu).unwrap();
    let logits: Vec<f32> = CLASS_PROBABILITIES
        .iter()
        .map(|p| (p / (1.0 - p)).ln())
        .collect();

    varmap
        .set_one("att_block.att.weight", zeros(&[classes, hidden, 1]))
        .unwrap();
    varmap
        .set_one("att_block.att.bias", zeros(&[classes]))
        .unwrap();
    varmap
        .set_one("att_block.cla.weight", zeros(&[classes, hidden, 1]))
        .unwrap();
    varmap
        .set_one(
            "att_block.cla.bias",
            Tensor::new(logits.as_slice(), &Device::Cpu).unwrap(),
        )
        .unwrap();

    varmap.save(path).unwrap();
}

/// Write a 16-bit mono WAV of a quiet sine tone.
pub fn write_tone(path: &Path, sample_rate: u32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (sample_rate as f32 * seconds) as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        #[allow(clippy::cast_possible_truncation)]
        let sample = ((t * 440.0 * std::f32::consts::TAU).sin() * 3000.0) as i16;
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Lay out a clip directory, a checkpoint and a config under `root`.
pub fn setup_run(root: &Path) -> Config {
    let config = fixture_config(root);
    let clips = root.join("clips");
    std::fs::create_dir_all(clips.join("nested")).unwrap();
    write_tone(&clips.join("1001_SSW_20170429.wav"), 32_000, 2.0);
    write_tone(&clips.join("nested").join("1002_COR.wav"), 16_000, 1.5);
    write_constant_checkpoint(&config, config.model_path.as_deref().unwrap());
    config
}

/// Read a result table as `(row_id, birds)` pairs.
pub fn read_table(path: &Path) -> Vec<(String, String)> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), ["row_id", "birds"]);
    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            (record[0].to_string(), record[1].to_string())
        })
        .collect()
}
