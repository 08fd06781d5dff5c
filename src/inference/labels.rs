//! Thresholding clip probabilities into label sets.

/// Indices of classes with probability `>= threshold`, ascending.
///
/// NaN probabilities never pass.
pub fn threshold_labels(proba: &[f32], threshold: f32) -> Vec<usize> {
    proba
        .iter()
        .enumerate()
        .filter(|(_, p)| **p >= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Class names in model output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    /// Wrap the configured class names.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there are no classes.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names for the given class indices. Out-of-range indices are dropped.
    pub fn names_for(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .filter_map(|&i| self.names.get(i).cloned())
            .collect()
    }

    /// Names of every class at or above `threshold`.
    pub fn labels_for(&self, proba: &[f32], threshold: f32) -> Vec<String> {
        self.names_for(&threshold_labels(proba, threshold))
    }
}
