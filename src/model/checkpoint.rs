//! Checkpoint reading and parameter verification.
//!
//! Checkpoints are read in one of two formats, chosen by extension:
//! safetensors or a PyTorch pickle (`torch.save` of a state dict). Before any
//! weight is bound to a layer the full set of names and shapes is compared
//! against what the model will request, and every discrepancy is reported in
//! one error.

use crate::constants::checkpoint::{
    MEL_W, NUM_BATCHES_TRACKED, PICKLE_EXTENSIONS, SAFETENSORS_EXTENSION, STFT_IMAG, STFT_REAL,
};
use crate::error::{Error, Result};
use candle::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parameter name to shape.
pub type ParameterShapes = BTreeMap<String, Vec<usize>>;

/// A tensor whose stored shape differs from the model's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// Parameter name.
    pub name: String,
    /// Shape the model expects.
    pub expected: Vec<usize>,
    /// Shape found in the checkpoint.
    pub found: Vec<usize>,
}

/// Result of comparing a checkpoint against the model's parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointReport {
    /// Parameters the model needs but the checkpoint lacks.
    pub missing: Vec<String>,
    /// Tensors in the checkpoint the model does not use.
    pub unexpected: Vec<String>,
    /// Tensors present under the right name with the wrong shape.
    pub mismatched: Vec<ShapeMismatch>,
    /// Tensors skipped as bookkeeping or frozen frontend buffers.
    pub ignored: Vec<String>,
}

impl CheckpointReport {
    /// No missing, unexpected or mis-shaped tensors.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.mismatched.is_empty()
    }

    /// One-line description of every problem.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing: {}", self.missing.join(", ")));
        }
        if !self.unexpected.is_empty() {
            parts.push(format!("unexpected: {}", self.unexpected.join(", ")));
        }
        if !self.mismatched.is_empty() {
            let mut line = String::from("shape mismatch: ");
            for (i, m) in self.mismatched.iter().enumerate() {
                if i > 0 {
                    line.push_str(", ");
                }
                let _ = write!(line, "{} expected {:?} found {:?}", m.name, m.expected, m.found);
            }
            parts.push(line);
        }
        parts.join("; ")
    }
}

/// Tensors the training frontend stores but inference recomputes.
///
/// They are accepted only with the shape the configured frontend would have
/// produced, so a checkpoint trained with a different `n_fft` or `n_mels` is
/// still rejected.
pub fn frozen_frontend_buffers(n_fft: usize, n_mels: usize) -> ParameterShapes {
    let n_bins = n_fft / 2 + 1;
    BTreeMap::from([
        (STFT_REAL.to_string(), vec![n_bins, 1, n_fft]),
        (STFT_IMAG.to_string(), vec![n_bins, 1, n_fft]),
        (MEL_W.to_string(), vec![n_bins, n_mels]),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    SafeTensors,
    Pickle,
}

impl Format {
    fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if ext == SAFETENSORS_EXTENSION {
            Ok(Self::SafeTensors)
        } else if PICKLE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Pickle)
        } else {
            Err(Error::UnsupportedCheckpointFormat {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Named tensors read from disk, held on the CPU until bound to a device.
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    tensors: HashMap<String, Tensor>,
}

impl Checkpoint {
    /// Read every tensor from `path`.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::CheckpointNotFound {
                path: path.to_path_buf(),
            });
        }

        let format = Format::detect(path)?;
        let read_err = |source| Error::CheckpointRead {
            path: path.to_path_buf(),
            source,
        };
        let tensors: HashMap<String, Tensor> = match format {
            Format::SafeTensors => candle::safetensors::load(path, &Device::Cpu).map_err(read_err)?,
            Format::Pickle => candle::pickle::read_all(path)
                .map_err(read_err)?
                .into_iter()
                .collect(),
        };

        info!(
            "Read {} tensors from checkpoint {} ({:?})",
            tensors.len(),
            path.display(),
            format
        );

        Ok(Self {
            path: path.to_path_buf(),
            tensors,
        })
    }

    /// Build directly from named tensors.
    pub fn from_tensors(path: impl Into<PathBuf>, tensors: HashMap<String, Tensor>) -> Self {
        Self {
            path: path.into(),
            tensors,
        }
    }

    /// Where the checkpoint was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored tensors.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the checkpoint holds no tensors.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Stored tensor names and shapes, sorted by name.
    pub fn shapes(&self) -> ParameterShapes {
        self.tensors
            .iter()
            .map(|(name, t)| (name.clone(), t.dims().to_vec()))
            .collect()
    }

    /// Compare stored tensors with `expected`; `frozen` lists tensors that may
    /// be present without being used.
    pub fn compare(&self, expected: &ParameterShapes, frozen: &ParameterShapes) -> CheckpointReport {
        let mut report = CheckpointReport::default();
        let stored = self.shapes();

        for (name, want) in expected {
            match stored.get(name) {
                None => report.missing.push(name.clone()),
                Some(found) if found != want => report.mismatched.push(ShapeMismatch {
                    name: name.clone(),
                    expected: want.clone(),
                    found: found.clone(),
                }),
                Some(_) => {}
            }
        }

        for (name, found) in &stored {
            if expected.contains_key(name) {
                continue;
            }
            if name.ends_with(NUM_BATCHES_TRACKED) {
                report.ignored.push(name.clone());
                continue;
            }
            match frozen.get(name) {
                Some(want) if want == found => report.ignored.push(name.clone()),
                Some(want) => report.mismatched.push(ShapeMismatch {
                    name: name.clone(),
                    expected: want.clone(),
                    found: found.clone(),
                }),
                None => report.unexpected.push(name.clone()),
            }
        }

        report
    }

    /// Fail with a single mismatch error unless the checkpoint matches exactly.
    pub fn verify(&self, expected: &ParameterShapes, frozen: &ParameterShapes) -> Result<()> {
        let report = self.compare(expected, frozen);
        if !report.ignored.is_empty() {
            debug!("Ignoring {} checkpoint tensors: {}", report.ignored.len(), report.ignored.join(", "));
        }
        if report.is_clean() {
            Ok(())
        } else {
            Err(Error::CheckpointMismatch {
                path: self.path.clone(),
                summary: report.summary(),
            })
        }
    }

    /// Hand the tensors to a builder that moves them to `device` as `f32` on demand.
    pub fn into_var_builder(self, device: &Device) -> VarBuilder<'static> {
        VarBuilder::from_tensors(self.tensors, DType::F32, device)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn zeros(shape: &[usize]) -> Tensor {
        Tensor::zeros(shape, DType::F32, &Device::Cpu).unwrap()
    }

    fn expected() -> ParameterShapes {
        BTreeMap::from([
            ("fc1.weight".to_string(), vec![4, 4]),
            ("fc1.bias".to_string(), vec![4]),
        ])
    }

    #[test]
    fn test_exact_match_is_clean() {
        let ckpt = Checkpoint::from_tensors(
            "m.safetensors",
            HashMap::from([
                ("fc1.weight".to_string(), zeros(&[4, 4])),
                ("fc1.bias".to_string(), zeros(&[4])),
                ("bn0.num_batches_tracked".to_string(), zeros(&[])),
            ]),
        );
        let report = ckpt.compare(&expected(), &BTreeMap::new());
        assert!(report.is_clean());
        assert_eq!(report.ignored, vec!["bn0.num_batches_tracked".to_string()]);
        assert!(ckpt.verify(&expected(), &BTreeMap::new()).is_ok());
    }

    #[test]
    fn test_all_discrepancies_reported_together() {
        let ckpt = Checkpoint::from_tensors(
            "m.pth",
            HashMap::from([
                ("fc1.weight".to_string(), zeros(&[4, 3])),
                ("head.weight".to_string(), zeros(&[2])),
            ]),
        );
        let report = ckpt.compare(&expected(), &BTreeMap::new());
        assert_eq!(report.missing, vec!["fc1.bias".to_string()]);
        assert_eq!(report.unexpected, vec!["head.weight".to_string()]);
        assert_eq!(report.mismatched.len(), 1);

        let err = ckpt.verify(&expected(), &BTreeMap::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("fc1.bias"));
        assert!(msg.contains("head.weight"));
        assert!(msg.contains("[4, 3]"));
    }

    #[test]
    fn test_frozen_buffers_need_matching_shape() {
        let frozen = frozen_frontend_buffers(16, 4);
        let ok = Checkpoint::from_tensors(
            "m.pth",
            HashMap::from([
                ("fc1.weight".to_string(), zeros(&[4, 4])),
                ("fc1.bias".to_string(), zeros(&[4])),
                (MEL_W.to_string(), zeros(&[9, 4])),
            ]),
        );
        assert!(ok.compare(&expected(), &frozen).is_clean());

        let wrong = Checkpoint::from_tensors(
            "m.pth",
            HashMap::from([
                ("fc1.weight".to_string(), zeros(&[4, 4])),
                ("fc1.bias".to_string(), zeros(&[4])),
                (MEL_W.to_string(), zeros(&[9, 8])),
            ]),
        );
        assert_eq!(wrong.compare(&expected(), &frozen).mismatched.len(), 1);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::detect(Path::new("a.safetensors")).unwrap(), Format::SafeTensors);
        assert_eq!(Format::detect(Path::new("fold0.PTH")).unwrap(), Format::Pickle);
        assert!(matches!(
            Format::detect(Path::new("model.onnx")),
            Err(Error::UnsupportedCheckpointFormat { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Checkpoint::read(Path::new("/nonexistent/model.pth")),
            Err(Error::CheckpointNotFound { .. })
        ));
    }
}
