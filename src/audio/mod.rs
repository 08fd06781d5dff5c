//! Audio loading: decode, downmix, sanitise and resample.

mod decode;
mod mixdown;
mod resample;

pub use decode::{DecodedAudio, decode_audio_file};
pub use mixdown::{downmix_to_mono, sanitize_samples};
pub use resample::resample;
