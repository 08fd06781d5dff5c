//! Segment-rate to frame-rate reconstruction.
//!
//! The encoder shrinks the time axis by an integer factor (plus truncation).
//! Segment outputs are first repeated by `frames / segments`, then linearly
//! resampled to the exact frame count with the first and last samples pinned
//! to the first and last frames.

use candle::Tensor;

/// Repeat every step of `[B, T, C]` `ratio` times along T.
pub fn interpolate(xs: &Tensor, ratio: usize) -> candle::Result<Tensor> {
    let (b, t, c) = xs.dims3()?;
    xs.unsqueeze(2)?
        .broadcast_as((b, t, ratio, c))?
        .contiguous()?
        .reshape((b, t * ratio, c))
}

/// Linearly resize `[B, T, C]` to `[B, frames_num, C]` along T with aligned corners.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn pad_framewise_output(xs: &Tensor, frames_num: usize) -> candle::Result<Tensor> {
    let (_, len, _) = xs.dims3()?;
    if len == frames_num {
        return Ok(xs.clone());
    }
    if len == 0 {
        candle::bail!("cannot resize an empty time axis to {frames_num} frames");
    }

    let scale = if frames_num > 1 {
        (len - 1) as f64 / (frames_num - 1) as f64
    } else {
        0.0
    };

    let mut lo = Vec::with_capacity(frames_num);
    let mut hi = Vec::with_capacity(frames_num);
    let mut weight = Vec::with_capacity(frames_num);
    for i in 0..frames_num {
        let src = i as f64 * scale;
        let l = (src.floor() as usize).min(len - 1);
        lo.push(l as u32);
        hi.push((l + 1).min(len - 1) as u32);
        weight.push((src - l as f64) as f32);
    }

    let device = xs.device();
    let lo = Tensor::from_vec(lo, frames_num, device)?;
    let hi = Tensor::from_vec(hi, frames_num, device)?;
    let weight = Tensor::from_vec(weight, (1, frames_num, 1), device)?.to_dtype(xs.dtype())?;

    let below = xs.index_select(&lo, 1)?;
    let above = xs.index_select(&hi, 1)?;
    &below + (above - &below)?.broadcast_mul(&weight)?
}

/// Bring a `[B, segments, C]` output up to `[B, frames_num, C]`.
pub fn upsample(segmentwise: &Tensor, frames_num: usize) -> candle::Result<Tensor> {
    let (_, segments, _) = segmentwise.dims3()?;
    if segments == 0 {
        candle::bail!("encoder produced no time segments");
    }
    // More segments than frames can only come from a degenerate input; repeat
    // once and let the resize shrink it.
    let ratio = (frames_num / segments).max(1);
    let repeated = interpolate(segmentwise, ratio)?;
    pad_framewise_output(&repeated, frames_num)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use candle::{DType, Device};

    fn series(values: &[f32]) -> Tensor {
        Tensor::from_slice(values, (1, values.len(), 1), &Device::Cpu).unwrap()
    }

    fn flat(xs: &Tensor) -> Vec<f32> {
        xs.flatten_all().unwrap().to_vec1::<f32>().unwrap()
    }

    #[test]
    fn test_interpolate_repeats_each_step() {
        let xs = series(&[1.0, 2.0, 3.0]);
        assert_eq!(
            flat(&interpolate(&xs, 2).unwrap()),
            vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]
        );
    }

    #[test]
    fn test_interpolate_keeps_classes_separate() {
        let xs = Tensor::new(&[[[1f32, 10.0], [2.0, 20.0]]], &Device::Cpu).unwrap();
        let ys = interpolate(&xs, 3).unwrap();
        assert_eq!(ys.dims(), &[1, 6, 2]);
        let rows = ys.squeeze(0).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(rows[2], vec![1.0, 10.0]);
        assert_eq!(rows[3], vec![2.0, 20.0]);
    }

    #[test]
    fn test_upsample_length_is_exact_for_non_divisible_counts() {
        let xs = series(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        for frames in [7, 10, 31, 1001] {
            let ys = upsample(&xs, frames).unwrap();
            assert_eq!(ys.dims(), &[1, frames, 1]);
        }
    }

    #[test]
    fn test_upsample_pins_edges() {
        let xs = series(&[0.25, 0.5, 0.9]);
        let ys = flat(&upsample(&xs, 10).unwrap());
        assert!((ys[0] - 0.25).abs() < 1e-6);
        assert!((ys[9] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_equal_length_is_identity() {
        let xs = series(&[3.0, 1.0, 4.0, 1.0, 5.0]);
        assert_eq!(flat(&pad_framewise_output(&xs, 5).unwrap()), flat(&xs));
    }

    #[test]
    fn test_linear_resize_midpoint() {
        let xs = series(&[0.0, 1.0]);
        let ys = flat(&pad_framewise_output(&xs, 3).unwrap());
        assert_eq!(ys, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_more_segments_than_frames_shrinks() {
        let xs = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let ys = flat(&upsample(&xs, 2).unwrap());
        assert_eq!(ys, vec![1.0, 5.0]);
    }

    #[test]
    fn test_zero_segments_is_an_error() {
        let xs = Tensor::zeros((1, 0, 3), DType::F32, &Device::Cpu).unwrap();
        assert!(upsample(&xs, 10).is_err());
    }
}
