//! 2x separable upscaling with predicted-average correction.
//!
//! Kernels are resolved once per configuration through [`horizontal_function`] and
//! [`vertical_function`], which try the accelerated table and fall back to the generic one.

pub mod accel;
pub mod generic;
/// Upscale filter families and their coefficients.
pub mod kernel;

use crate::foundation::accel::CpuAccelerationFeatures;
use crate::foundation::core::{FixedPoint, Interleaving, ScalingMode, Storage};
use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::surface::convert::convert_value;
use crate::surface::dither::Dither;
use crate::surface::surface::{Sample, Surface, SurfaceRegionMut};
use crate::upscale::kernel::{Kernel, MAX_KERNEL_LEN};

/// Extra source columns, per channel sample, kept either side of a 2D tile's intermediate.
pub const HALO: u32 = (MAX_KERNEL_LEN / 2) as u32;

/// Predicted-average input of a horizontal pass.
#[derive(Clone, Copy, Debug)]
pub struct PredictedAverage<'a> {
    /// Pre-upscale plane, at source resolution.
    pub base: &'a Surface,
    /// Average over 2x2 output blocks (after a vertical pass) instead of 1x2 pairs.
    pub two_d: bool,
}

/// Inputs of one horizontal pass; the destination region is in output-plane coordinates.
#[derive(Clone, Copy, Debug)]
pub struct HorizontalJob<'a> {
    /// Source samples, output-resolution rows.
    pub src: &'a Surface,
    /// Plane column of `src`'s first column.
    pub src_x: u32,
    /// Plane row of `src`'s first row.
    pub src_y: u32,
    /// Source plane width; loads clamp to it.
    pub plane_width: u32,
    /// Predicted-average correction, if enabled.
    pub predicted_average: Option<PredictedAverage<'a>>,
    /// Filter pair.
    pub kernel: &'a Kernel,
    /// Noise added to every output sample after predicted average.
    pub dither: Option<&'a Dither>,
}

/// Inputs of one vertical pass.
#[derive(Clone, Copy, Debug)]
pub struct VerticalJob<'a> {
    /// Full source plane; loads clamp to its rows.
    pub src: &'a Surface,
    /// Source column of the destination region's first column.
    pub src_x: u32,
    /// Output-plane row of the destination region's first row.
    pub dst_y: u32,
    /// Filter pair.
    pub kernel: &'a Kernel,
}

/// Horizontal kernel entry point.
pub type HorizontalFn = fn(&HorizontalJob<'_>, &mut SurfaceRegionMut<'_>) -> EnhanceResult<()>;

/// Vertical kernel entry point.
pub type VerticalFn = fn(&VerticalJob<'_>, &mut SurfaceRegionMut<'_>) -> EnhanceResult<()>;

/// Resolved horizontal kernel.
#[derive(Clone, Copy, Debug)]
pub struct HorizontalKernel {
    pub(crate) run: HorizontalFn,
    pub(crate) accelerated: bool,
}

impl HorizontalKernel {
    /// Upscale `job.src` into `dst`.
    pub fn run(&self, job: &HorizontalJob<'_>, dst: &mut SurfaceRegionMut<'_>) -> EnhanceResult<()> {
        (self.run)(job, dst)
    }

    /// `true` for the SIMD family.
    pub fn is_accelerated(&self) -> bool {
        self.accelerated
    }
}

/// Resolved vertical kernel.
#[derive(Clone, Copy, Debug)]
pub struct VerticalKernel {
    pub(crate) run: VerticalFn,
    pub(crate) accelerated: bool,
}

impl VerticalKernel {
    /// Upscale `job.src` into `dst`.
    pub fn run(&self, job: &VerticalJob<'_>, dst: &mut SurfaceRegionMut<'_>) -> EnhanceResult<()> {
        (self.run)(job, dst)
    }

    /// `true` for the SIMD family.
    pub fn is_accelerated(&self) -> bool {
        self.accelerated
    }
}

/// Horizontal kernel for `(interleaving, src, dst, base)`, accelerated when possible.
///
/// `base` is the predicted-average base format, `None` when predicted average is off.
pub fn horizontal_function(
    features: CpuAccelerationFeatures,
    interleaving: Interleaving,
    src: FixedPoint,
    dst: FixedPoint,
    base: Option<FixedPoint>,
) -> Option<HorizontalKernel> {
    accel::horizontal_function(features, interleaving, src, dst, base)
        .or_else(|| generic::horizontal_function(interleaving, src, dst, base))
}

/// Vertical kernel for `(src, dst)`, accelerated when possible.
pub fn vertical_function(
    features: CpuAccelerationFeatures,
    src: FixedPoint,
    dst: FixedPoint,
) -> Option<VerticalKernel> {
    accel::vertical_function(features, src, dst).or_else(|| generic::vertical_function(src, dst))
}

/// Parameters of [`upscale`].
#[derive(Clone, Copy, Debug)]
pub struct UpscaleArgs<'a> {
    /// Source plane.
    pub src: &'a Surface,
    /// Filter pair.
    pub kernel: &'a Kernel,
    /// 0D copies, 1D doubles width, 2D doubles both dimensions.
    pub mode: ScalingMode,
    /// Apply predicted average; ignored for kernels that already include it.
    pub predicted_average: bool,
    /// Kernel family preference.
    pub features: CpuAccelerationFeatures,
    /// Noise for the horizontal pass; 0D copies are never dithered.
    pub dither: Option<&'a Dither>,
}

fn scale_factors(mode: ScalingMode) -> (u32, u32) {
    match mode {
        ScalingMode::Scale0D => (1, 1),
        ScalingMode::Scale1D => (2, 1),
        ScalingMode::Scale2D => (2, 2),
    }
}

fn validate(args: &UpscaleArgs<'_>, dst: &SurfaceRegionMut<'_>) -> EnhanceResult<()> {
    let (src, rect) = (args.src, dst.rect());
    let (sfp, dfp) = (src.fixed_point(), dst.fixed_point());
    if src.interleaving() != dst.interleaving() {
        return Err(EnhanceError::validation(format!(
            "upscale cannot change interleaving ({:?} to {:?})",
            src.interleaving(),
            dst.interleaving()
        )));
    }
    if sfp.is_signed() != dfp.is_signed() {
        return Err(EnhanceError::validation(format!(
            "upscale cannot change signedness ({sfp:?} to {dfp:?})"
        )));
    }
    if !sfp.is_signed() && sfp.bit_depth() > dfp.bit_depth() {
        return Err(EnhanceError::validation(format!(
            "upscale cannot demote {sfp:?} to {dfp:?}"
        )));
    }
    let len = args.kernel.len();
    if len == 0 || len % 2 != 0 || len > MAX_KERNEL_LEN {
        return Err(EnhanceError::validation(format!(
            "kernel length {len} must be even and at most {MAX_KERNEL_LEN}"
        )));
    }
    let (sx, sy) = scale_factors(args.mode);
    if rect.right() > src.width() * sx || rect.bottom() > src.height() * sy {
        return Err(EnhanceError::validation(format!(
            "region {rect:?} exceeds the {}x{} output",
            src.width() * sx,
            src.height() * sy
        )));
    }
    let pair = 2 * src.interleaving().pixel_alignment();
    if sx == 2 && (rect.x % pair != 0 || rect.width % pair != 0) {
        return Err(EnhanceError::validation(format!(
            "region {rect:?} is not aligned to {pair}-pixel output pairs"
        )));
    }
    if sy == 2 && (rect.y % 2 != 0 || rect.height % 2 != 0) {
        return Err(EnhanceError::validation(format!(
            "region {rect:?} is not aligned to output row pairs"
        )));
    }
    Ok(())
}

fn unsupported(what: &str, src: FixedPoint, dst: FixedPoint) -> EnhanceError {
    tracing::warn!(?src, ?dst, "no {what} upscale kernel, generic table included");
    EnhanceError::unsupported(format!("no {what} upscale kernel for {src:?} to {dst:?}"))
}

/// Upscale `args.src` into `dst`, a region of the output plane.
///
/// 2D runs the vertical pass into a tile-local intermediate (with [`HALO`] extra columns either
/// side, so horizontal loads see real neighbours) and then the horizontal pass with 2x2
/// predicted average. 1D runs the horizontal pass alone with 1x2 predicted average. 0D copies,
/// converting the format when needed.
#[tracing::instrument(skip_all, fields(mode = ?args.mode, region = ?dst.rect()))]
pub fn upscale(args: &UpscaleArgs<'_>, dst: &mut SurfaceRegionMut<'_>) -> EnhanceResult<()> {
    validate(args, dst)?;
    let src = args.src;
    let (sfp, dfp) = (src.fixed_point(), dst.fixed_point());
    let il = src.interleaving();
    let pa = args.predicted_average && !args.kernel.is_prebaked();
    let base_fp = pa.then_some(sfp);

    match args.mode {
        ScalingMode::Scale0D => copy_convert(src, dst),
        ScalingMode::Scale1D => {
            let horizontal = horizontal_function(args.features, il, sfp, dfp, base_fp)
                .ok_or_else(|| unsupported("horizontal", sfp, dfp))?;
            let job = HorizontalJob {
                src,
                src_x: 0,
                src_y: 0,
                plane_width: src.width(),
                predicted_average: pa.then_some(PredictedAverage {
                    base: src,
                    two_d: false,
                }),
                kernel: args.kernel,
                dither: args.dither,
            };
            horizontal.run(&job, dst)
        }
        ScalingMode::Scale2D => {
            let vertical = vertical_function(args.features, sfp, dfp)
                .ok_or_else(|| unsupported("vertical", sfp, dfp))?;
            let horizontal = horizontal_function(args.features, il, dfp, dfp, base_fp)
                .ok_or_else(|| unsupported("horizontal", dfp, dfp))?;

            let rect = dst.rect();
            let halo = HALO * il.pixel_alignment();
            let x0 = (rect.x / 2).saturating_sub(halo);
            let x1 = (rect.right() / 2 + halo).min(src.width());
            let mut intermediate = Surface::new(x1 - x0, rect.height, dfp, il)?;
            vertical.run(
                &VerticalJob {
                    src,
                    src_x: x0,
                    dst_y: rect.y,
                    kernel: args.kernel,
                },
                &mut intermediate.region_mut(),
            )?;

            let job = HorizontalJob {
                src: &intermediate,
                src_x: x0,
                src_y: rect.y,
                plane_width: src.width(),
                predicted_average: pa.then_some(PredictedAverage {
                    base: src,
                    two_d: true,
                }),
                kernel: args.kernel,
                dither: args.dither,
            };
            horizontal.run(&job, dst)
        }
    }
}

fn copy_convert(src: &Surface, dst: &mut SurfaceRegionMut<'_>) -> EnhanceResult<()> {
    match dst.fixed_point().storage() {
        Storage::U8 => copy_typed::<u8>(src, dst),
        Storage::U16 => copy_typed::<u16>(src, dst),
        Storage::S16 => copy_typed::<i16>(src, dst),
    }
}

fn copy_typed<D: Sample>(src: &Surface, dst: &mut SurfaceRegionMut<'_>) -> EnhanceResult<()> {
    let rect = dst.rect();
    let (sfp, dfp) = (src.fixed_point(), dst.fixed_point());
    let x0 = src.interleaving().row_samples(rect.x);
    let n = dst.row_samples();
    let rows = dst
        .rows_mut::<D>()
        .ok_or_else(|| EnhanceError::surface("destination storage mismatch"))?;
    for (dy, row) in rows.iter_mut().enumerate() {
        let y = rect.y + dy as u32;
        for (xs, out) in row[..n].iter_mut().enumerate() {
            let v = src
                .get(x0 + xs, y)
                .ok_or_else(|| EnhanceError::surface("copy source out of range"))?;
            *out = D::from_i32(convert_value(v, sfp, dfp));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/upscale/upscale.rs"]
mod tests;
