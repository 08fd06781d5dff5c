//! Clip discovery and per-clip audio preparation.

mod coordinator;
mod processor;

pub use coordinator::{collect_clips, output_path_for, row_id_for};
pub use processor::{WaveformOptions, load_waveform};
