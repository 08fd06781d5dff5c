//! Compute device selection.

use crate::config::InferenceDevice;
use candle::Device;
use tracing::{info, warn};

/// Resolve the configured device to a concrete one.
///
/// `Auto` silently falls back to CPU; `Gpu` falls back with a warning.
pub fn select_device(requested: InferenceDevice) -> Device {
    match requested {
        InferenceDevice::Cpu => {
            info!("Requested device: CPU");
            Device::Cpu
        }
        InferenceDevice::Auto => match Device::cuda_if_available(0) {
            Ok(device) if device.is_cuda() => {
                info!("Auto mode: CUDA available, using GPU");
                device
            }
            Ok(_) | Err(_) => {
                info!("Auto mode: no GPU available, using CPU");
                Device::Cpu
            }
        },
        InferenceDevice::Gpu => match Device::new_cuda(0) {
            Ok(device) => {
                info!("--gpu: using CUDA device 0");
                device
            }
            Err(e) => {
                warn!("--gpu requested but CUDA is unavailable ({e}), using CPU");
                Device::Cpu
            }
        },
    }
}
