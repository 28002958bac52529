use serde::{Deserialize, Serialize};

use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::foundation::math::KERNEL_ONE;

/// Longest supported filter.
pub const MAX_KERNEL_LEN: usize = 8;

/// Built-in upscale filter families.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpscaleType {
    /// Sample repeat.
    Nearest,
    /// Bilinear, quarter-phase.
    Linear,
    /// Bicubic.
    Cubic,
    /// Bicubic with sharper side lobes.
    #[default]
    ModifiedCubic,
    /// Six-tap Lanczos.
    Lanczos,
    /// Cubic with predicted average folded into the coefficients.
    CubicPrediction,
    /// Four-tap kernel with predicted average folded into the coefficients.
    Mishus,
}

impl UpscaleType {
    /// Every built-in family.
    pub const ALL: [UpscaleType; 7] = [
        UpscaleType::Nearest,
        UpscaleType::Linear,
        UpscaleType::Cubic,
        UpscaleType::ModifiedCubic,
        UpscaleType::Lanczos,
        UpscaleType::CubicPrediction,
        UpscaleType::Mishus,
    ];
}

/// 2x upscale filter pair in 14-bit fixed point.
///
/// `forward` produces odd output samples and `reverse` even ones. Both sum to 16384.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Kernel {
    forward: [i16; MAX_KERNEL_LEN],
    reverse: [i16; MAX_KERNEL_LEN],
    len: usize,
    prebaked: bool,
}

impl Kernel {
    /// Built-in kernel for `ty`.
    pub fn new(ty: UpscaleType) -> Self {
        match ty {
            UpscaleType::Nearest => Self::mirrored(&[16384, 0]),
            UpscaleType::Linear => Self::mirrored(&[12288, 4096]),
            UpscaleType::Cubic => Self::mirrored(&[-1382, 14285, 3942, -461]),
            UpscaleType::ModifiedCubic => Self::mirrored(&[-2360, 15855, 4165, -1276]),
            UpscaleType::Lanczos => Self::mirrored(&[493, -2183, 14627, 4440, -1114, 121]),
            UpscaleType::CubicPrediction => Self::pair(
                &[231, -2662, 16384, 2662, -231, 0],
                &[0, -231, 2662, 16384, -2662, 231],
                true,
            ),
            UpscaleType::Mishus => {
                Self::pair(&[-2048, 16384, 2048, 0], &[0, 2048, 16384, -2048], true)
            }
        }
    }

    /// Kernel from explicit coefficients; `reverse` defaults to the mirror of `forward`.
    ///
    /// Fails unless the length is even, at most [`MAX_KERNEL_LEN`], and both filters sum to
    /// 16384.
    pub fn custom(forward: &[i16], reverse: Option<&[i16]>) -> EnhanceResult<Self> {
        let len = forward.len();
        if len == 0 || len % 2 != 0 || len > MAX_KERNEL_LEN {
            return Err(EnhanceError::validation(format!(
                "kernel length {len} must be even and at most {MAX_KERNEL_LEN}"
            )));
        }
        let kernel = match reverse {
            Some(r) if r.len() != len => {
                return Err(EnhanceError::validation(format!(
                    "reverse filter has {} taps, forward has {len}",
                    r.len()
                )));
            }
            Some(r) => Self::pair(forward, r, false),
            None => Self::mirrored(forward),
        };
        for (name, taps) in [("forward", kernel.forward()), ("reverse", kernel.reverse())] {
            let sum: i32 = taps.iter().map(|&t| i32::from(t)).sum();
            if sum != KERNEL_ONE {
                return Err(EnhanceError::validation(format!(
                    "{name} filter sums to {sum}, expected {KERNEL_ONE}"
                )));
            }
        }
        Ok(kernel)
    }

    fn mirrored(forward: &[i16]) -> Self {
        let reverse: Vec<i16> = forward.iter().rev().copied().collect();
        Self::pair(forward, &reverse, false)
    }

    fn pair(forward: &[i16], reverse: &[i16], prebaked: bool) -> Self {
        let mut k = Self {
            forward: [0; MAX_KERNEL_LEN],
            reverse: [0; MAX_KERNEL_LEN],
            len: forward.len(),
            prebaked,
        };
        k.forward[..forward.len()].copy_from_slice(forward);
        k.reverse[..reverse.len()].copy_from_slice(reverse);
        k
    }

    /// Taps per filter.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when the kernel has no taps.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Odd-phase filter.
    pub fn forward(&self) -> &[i16] {
        &self.forward[..self.len]
    }

    /// Even-phase filter.
    pub fn reverse(&self) -> &[i16] {
        &self.reverse[..self.len]
    }

    /// `true` when predicted average is already part of the coefficients.
    pub fn is_prebaked(&self) -> bool {
        self.prebaked
    }
}

impl From<UpscaleType> for Kernel {
    fn from(ty: UpscaleType) -> Self {
        Self::new(ty)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/upscale/kernel.rs"]
mod tests;
