//! Dithered unsharp filter over row bands.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{FixedPoint, Interleaving, Storage};
use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::foundation::math::clamp_unsigned;
use crate::surface::dither::Dither;
use crate::surface::surface::{Sample, Surface, SurfaceRegionMut};

/// Rows per band handed to one worker by [`sharpen_surface`].
pub const DEFAULT_BAND_HEIGHT: u32 = 32;

/// Where the sharpen stage runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharpenMode {
    /// No sharpening.
    #[default]
    Disabled,
    /// Sharpen the reconstructed plane before it is handed out.
    ///
    /// Currently runs at the same point as [`SharpenMode::OutOfLoop`], after every tile is
    /// reconstructed and before output conversion.
    InLoop,
    /// Sharpen the final output.
    OutOfLoop,
}

impl SharpenMode {
    /// `true` unless disabled.
    pub fn is_enabled(self) -> bool {
        self != SharpenMode::Disabled
    }
}

/// One band of a sharpen pass.
///
/// `dst` is the band of a temporary surface with the same layout as `src`; its rows must be
/// exactly `offset..offset + count`.
#[derive(Debug)]
pub struct SharpenArgs<'a, 'r> {
    /// Whole source plane.
    pub src: &'a Surface,
    /// Destination band.
    pub dst: &'a mut SurfaceRegionMut<'r>,
    /// Noise added to filtered pixels.
    pub dither: Option<&'a Dither>,
    /// Filter strength in `[0, 1]`.
    pub strength: f32,
    /// First row of the band.
    pub offset: u32,
    /// Rows in the band.
    pub count: u32,
}

/// Sharpen kernel entry point.
pub type SharpenFn = fn(SharpenArgs<'_, '_>) -> EnhanceResult<()>;

/// Kernel for `fp`. Only unsigned formats are sharpened.
pub fn sharpen_function(fp: FixedPoint) -> Option<SharpenFn> {
    if fp.is_signed() {
        return None;
    }
    Some(match fp.storage() {
        Storage::U8 => sharpen::<u8>,
        Storage::U16 => sharpen::<u16>,
        Storage::S16 => return None,
    })
}

fn strength_fixed(strength: f32) -> EnhanceResult<i64> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(EnhanceError::validation(format!(
            "sharpen strength {strength} must be within [0, 1]"
        )));
    }
    Ok(i64::from((strength * 65535.0) as u16))
}

fn check_args(args: &SharpenArgs<'_, '_>) -> EnhanceResult<()> {
    let (src, dst) = (args.src, &*args.dst);
    if src.interleaving() != Interleaving::None || dst.interleaving() != Interleaving::None {
        return Err(EnhanceError::validation("sharpening requires planar surfaces"));
    }
    if src.fixed_point() != dst.fixed_point() {
        return Err(EnhanceError::surface(format!(
            "sharpen source is {:?}, destination is {:?}",
            src.fixed_point(),
            dst.fixed_point()
        )));
    }
    let rect = dst.rect();
    if rect.x != 0
        || rect.width != src.width()
        || rect.y != args.offset
        || rect.height != args.count
        || rect.bottom() > src.height()
    {
        return Err(EnhanceError::validation(format!(
            "sharpen band {rect:?} does not cover rows {}..{} of a {}x{} plane",
            args.offset,
            args.offset + args.count,
            src.width(),
            src.height()
        )));
    }
    Ok(())
}

fn sharpen<T: Sample>(args: SharpenArgs<'_, '_>) -> EnhanceResult<()> {
    check_args(&args)?;
    let s = strength_fixed(args.strength)?;
    let src = args.src;
    let (width, height) = (src.row_samples(), src.height());
    let max = src.fixed_point().max_value();
    let rows = args
        .dst
        .rows_mut::<T>()
        .ok_or_else(|| EnhanceError::surface("sharpen destination storage mismatch"))?;
    let source_row = |y: u32| {
        src.row::<T>(y)
            .ok_or_else(|| EnhanceError::surface("sharpen source storage mismatch"))
    };

    for (i, out) in rows.iter_mut().enumerate() {
        let y = args.offset + i as u32;
        let center = source_row(y)?;
        out[..width].copy_from_slice(center);
        if s == 0 || y == 0 || y + 1 >= height || width < 3 {
            continue;
        }
        let (above, below) = (source_row(y - 1)?, source_row(y + 1)?);
        let mut noise = args.dither.map(|d| d.row_values(y, width).skip(1));

        for x in 1..width - 1 {
            let c = center[x].to_i32();
            let laplacian = 4 * c
                - center[x - 1].to_i32()
                - center[x + 1].to_i32()
                - above[x].to_i32()
                - below[x].to_i32();
            let delta = ((s * i64::from(laplacian) + 32768) >> 16) as i32;
            let d = noise.as_mut().and_then(|n| n.next()).unwrap_or(0);
            out[x] = T::from_i32(clamp_unsigned(c + delta + d, max));
        }
    }
    Ok(())
}

/// Sharpen `surface` in place, `band_height` rows per work unit.
///
/// Bands are filtered into a temporary surface from the untouched source, so any split of rows
/// across workers gives the same result as one sequential pass. Without a pool the bands run on
/// the calling thread.
#[tracing::instrument(skip(surface, dither, pool), fields(fp = ?surface.fixed_point()))]
pub fn sharpen_surface(
    surface: &mut Surface,
    strength: f32,
    dither: Option<&Dither>,
    band_height: u32,
    pool: Option<&rayon::ThreadPool>,
) -> EnhanceResult<()> {
    strength_fixed(strength)?;
    let fp = surface.fixed_point();
    let f = sharpen_function(fp)
        .ok_or_else(|| EnhanceError::unsupported(format!("no sharpen kernel for {fp:?}")))?;
    if surface.interleaving() != Interleaving::None {
        return Err(EnhanceError::validation("sharpening requires planar surfaces"));
    }
    if strength == 0.0 {
        return Ok(());
    }

    let mut scratch = Surface::with_stride(
        surface.width(),
        surface.height(),
        surface.stride(),
        fp,
        surface.interleaving(),
    )?;
    let src = &*surface;
    let run = |mut band: SurfaceRegionMut<'_>| {
        let rect = band.rect();
        f(SharpenArgs {
            src,
            dst: &mut band,
            dither,
            strength,
            offset: rect.y,
            count: rect.height,
        })
    };

    let bands = scratch.split_rows_mut(band_height)?;
    let results: Vec<EnhanceResult<()>> = match pool {
        Some(pool) => pool.install(|| bands.into_par_iter().map(run).collect()),
        None => bands.into_iter().map(run).collect(),
    };
    let failed = results.iter().filter(|r| r.is_err()).count();
    if let Some(err) = results.into_iter().find_map(Result::err) {
        tracing::warn!(failed, "sharpen bands failed");
        return Err(err);
    }

    *surface = scratch;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/sharpen.rs"]
mod tests;
