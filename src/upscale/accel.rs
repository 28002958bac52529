//! SIMD upscale kernels on `wide::i32x4`.
//!
//! Coverage is sparse: planar non-converting horizontal passes and non-converting vertical
//! passes. Anything else returns `None` and the caller falls back to [`super::generic`].

use wide::i32x4;

use crate::foundation::accel::CpuAccelerationFeatures;
use crate::foundation::core::{FixedPoint, Interleaving};
use crate::upscale::generic::{Taps, horizontal_for, horizontal_supported, vertical_for};
use crate::upscale::{HorizontalKernel, VerticalKernel};

pub(crate) struct SimdTaps;

impl Taps for SimdTaps {
    fn weighted_sum(lines: &[&[i32]], taps: &[i16], out: &mut [i32]) {
        let n = out.len();
        let body = n - n % 4;
        for x in (0..body).step_by(4) {
            let mut acc = i32x4::splat(0);
            for (line, &tap) in lines.iter().zip(taps) {
                let v = i32x4::new([line[x], line[x + 1], line[x + 2], line[x + 3]]);
                acc += v * i32x4::splat(i32::from(tap));
            }
            out[x..x + 4].copy_from_slice(&acc.to_array());
        }
        for (x, o) in out.iter_mut().enumerate().skip(body) {
            *o = lines
                .iter()
                .zip(taps)
                .map(|(line, &tap)| i32::from(tap) * line[x])
                .sum();
        }
    }
}

/// Accelerated horizontal kernel, if one exists for this configuration.
pub fn horizontal_function(
    features: CpuAccelerationFeatures,
    interleaving: Interleaving,
    src: FixedPoint,
    dst: FixedPoint,
    base: Option<FixedPoint>,
) -> Option<HorizontalKernel> {
    let non_converting = src == dst && base.is_none_or(|b| b == dst);
    if !features.is_accelerated()
        || interleaving != Interleaving::None
        || !non_converting
        || !horizontal_supported(src, dst, base)
    {
        return None;
    }
    Some(HorizontalKernel {
        run: horizontal_for::<SimdTaps>(src, dst, base.unwrap_or(src))?,
        accelerated: true,
    })
}

/// Accelerated vertical kernel, if one exists for this configuration.
pub fn vertical_function(
    features: CpuAccelerationFeatures,
    src: FixedPoint,
    dst: FixedPoint,
) -> Option<VerticalKernel> {
    if !features.is_accelerated() || src != dst {
        return None;
    }
    Some(VerticalKernel {
        run: vertical_for::<SimdTaps>(src, dst)?,
        accelerated: true,
    })
}
