//! Inference: device selection, thresholding and the labelling driver.

mod device;
mod labeler;
mod labels;

pub use device::select_device;
pub use labeler::{ClipErrorPolicy, FailedClip, PseudoLabeler, RunReport};
pub use labels::{LabelMap, threshold_labels};
