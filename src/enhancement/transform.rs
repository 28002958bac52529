//! Dequantisation and inverse directional-decomposition transforms.

use serde::{Deserialize, Serialize};

use crate::foundation::core::{ScalingMode, TransformType};
use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::foundation::math::saturate_s16;

/// Maximum coefficient layers of any transform.
pub const MAX_LAYERS: usize = 16;

/// Temporal signal selecting the dequantisation row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemporalSignal {
    /// Residual adds to the temporal prediction.
    Inter = 0,
    /// Residual replaces the temporal prediction.
    Intra = 1,
}

/// Per-plane dequantisation parameters, indexed by `[signal][layer]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dequant {
    /// Quantisation step per temporal signal and layer.
    pub step_width: [[i16; MAX_LAYERS]; 2],
    /// Dead-zone offset per temporal signal and layer, applied in the coefficient's sign.
    pub offset: [[i16; MAX_LAYERS]; 2],
}

impl Default for Dequant {
    fn default() -> Self {
        Self::uniform(1, 0)
    }
}

impl Dequant {
    /// Same step and offset for every signal and layer.
    pub fn uniform(step_width: i16, offset: i16) -> Self {
        Self {
            step_width: [[step_width; MAX_LAYERS]; 2],
            offset: [[offset; MAX_LAYERS]; 2],
        }
    }

    /// `coeff * step + sign(coeff) * offset`, wrapping in 16 bits.
    #[inline]
    pub fn apply(&self, signal: TemporalSignal, layer: usize, coeff: i16) -> i16 {
        let s = signal as usize;
        let scaled = coeff.wrapping_mul(self.step_width[s][layer]);
        scaled.wrapping_add(coeff.signum().wrapping_mul(self.offset[s][layer]))
    }
}

/// Residuals of one transform unit, row-major within the unit.
pub type Residuals = [i16; MAX_LAYERS];

/// Row-major positions of the 4x4 corners.
const DEBLOCK_CORNERS: [usize; 4] = [0, 3, 12, 15];

/// Row-major positions of the 4x4 edges, corners excluded.
const DEBLOCK_SIDES: [usize; 8] = [1, 2, 4, 7, 8, 11, 13, 14];

/// Deblocking weights for base-resolution 4x4 residuals, in sixteenths.
///
/// Border residuals are scaled by `weight / 16`, rounding toward negative infinity; the inner
/// 2x2 is left alone. The default of 16 for both is the identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Deblock {
    /// Weight of the four corner residuals.
    pub corner: u8,
    /// Weight of the eight remaining border residuals.
    pub side: u8,
}

impl Default for Deblock {
    fn default() -> Self {
        Self {
            corner: Self::MAX_WEIGHT,
            side: Self::MAX_WEIGHT,
        }
    }
}

impl Deblock {
    /// Largest weight; scales by one.
    pub const MAX_WEIGHT: u8 = 16;

    /// Weights from the signalled 4-bit reductions, `16 - corner` and `16 - side`.
    pub fn from_signalled(corner: u8, side: u8) -> EnhanceResult<Self> {
        let d = Self {
            corner: Self::MAX_WEIGHT.saturating_sub(corner & 0x0f),
            side: Self::MAX_WEIGHT.saturating_sub(side & 0x0f),
        };
        d.validate()?;
        Ok(d)
    }

    /// Both weights must be at most [`Deblock::MAX_WEIGHT`].
    pub fn validate(&self) -> EnhanceResult<()> {
        if self.corner > Self::MAX_WEIGHT || self.side > Self::MAX_WEIGHT {
            return Err(EnhanceError::validation(format!(
                "deblock weights {}/{} exceed {}",
                self.corner,
                self.side,
                Self::MAX_WEIGHT
            )));
        }
        Ok(())
    }

    /// Scale the border of a row-major 4x4 unit in place.
    pub fn apply(&self, residuals: &mut Residuals) {
        let scale = |v: i16, w: u8| ((i32::from(v) * i32::from(w)) >> 4) as i16;
        for i in DEBLOCK_CORNERS {
            residuals[i] = scale(residuals[i], self.corner);
        }
        for i in DEBLOCK_SIDES {
            residuals[i] = scale(residuals[i], self.side);
        }
    }
}

/// Inverse transform variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InverseTransform {
    /// 2x2, horizontal-only upscale.
    Dd1D,
    /// 2x2, two-dimensional upscale.
    Dd2D,
    /// 4x4, horizontal-only upscale.
    Dds1D,
    /// 4x4, two-dimensional upscale.
    Dds2D,
}

impl InverseTransform {
    /// Variant for `transform` under `scaling`; no upscale uses the 2D form.
    pub fn select(transform: TransformType, scaling: ScalingMode) -> Self {
        match (transform, scaling) {
            (TransformType::Dd, ScalingMode::Scale1D) => InverseTransform::Dd1D,
            (TransformType::Dd, _) => InverseTransform::Dd2D,
            (TransformType::Dds, ScalingMode::Scale1D) => InverseTransform::Dds1D,
            (TransformType::Dds, _) => InverseTransform::Dds2D,
        }
    }

    /// Dequantise `coeffs` and produce row-major residuals.
    pub fn dequant_inverse(
        self,
        dequant: &Dequant,
        signal: TemporalSignal,
        coeffs: &[i16],
        out: &mut Residuals,
    ) {
        let mut dq = [0i32; MAX_LAYERS];
        for (i, (d, &c)) in dq.iter_mut().zip(coeffs).enumerate() {
            *d = i32::from(dequant.apply(signal, i, c));
        }
        match self {
            InverseTransform::Dd1D => inverse_dd_1d(&dq, out),
            InverseTransform::Dd2D => inverse_dd_2d(&dq, out),
            InverseTransform::Dds1D => inverse_dds(&dq, out, dd_1d),
            InverseTransform::Dds2D => inverse_dds(&dq, out, dd_2d),
        }
    }
}

#[inline]
fn dd_1d(c: [i32; 4]) -> [i32; 4] {
    [
        c[0] + c[1] + c[3],
        c[0] - c[1] - c[3],
        c[1] + c[2] - c[3],
        c[2] - c[1] + c[3],
    ]
}

#[inline]
fn dd_2d(c: [i32; 4]) -> [i32; 4] {
    [
        c[0] + c[1] + c[2] + c[3],
        c[0] - c[1] + c[2] - c[3],
        c[0] + c[1] - c[2] - c[3],
        c[0] - c[1] - c[2] + c[3],
    ]
}

fn inverse_dd_1d(c: &[i32; MAX_LAYERS], out: &mut Residuals) {
    let r = [
        c[0] + c[1] + c[2],
        c[0] - c[1] - c[2],
        c[3] + c[1] - c[2],
        c[3] - c[1] + c[2],
    ];
    for (o, v) in out.iter_mut().zip(r) {
        *o = saturate_s16(v) as i16;
    }
}

fn inverse_dd_2d(c: &[i32; MAX_LAYERS], out: &mut Residuals) {
    let r = dd_2d([c[0], c[1], c[2], c[3]]);
    for (o, v) in out.iter_mut().zip(r) {
        *o = saturate_s16(v) as i16;
    }
}

/// Output order of the 4x4 transform mapped onto row-major positions.
const DDS_RASTER: [usize; MAX_LAYERS] = [0, 1, 4, 5, 2, 3, 6, 7, 8, 9, 12, 13, 10, 11, 14, 15];

fn inverse_dds(c: &[i32; MAX_LAYERS], out: &mut Residuals, stage: fn([i32; 4]) -> [i32; 4]) {
    // First stage is a 2x2 Hadamard across each group of four; groups are A, H, V, D.
    let mut first = [[0i32; 4]; 4];
    for g in 0..4 {
        let h = dd_2d([c[g * 4], c[g * 4 + 1], c[g * 4 + 2], c[g * 4 + 3]]);
        for (k, v) in h.into_iter().enumerate() {
            first[k][g] = v;
        }
    }
    let mut block = [0i16; MAX_LAYERS];
    for (k, group) in first.into_iter().enumerate() {
        for (j, v) in stage(group).into_iter().enumerate() {
            block[k * 4 + j] = saturate_s16(v) as i16;
        }
    }
    for (o, &src) in out.iter_mut().zip(DDS_RASTER.iter()) {
        *o = block[src];
    }
}

#[cfg(test)]
#[path = "../../tests/unit/enhancement/transform.rs"]
mod tests;
