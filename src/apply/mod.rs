//! Residual application: command buffers onto surface regions.
//!
//! Kernels are chosen per `(transform, destination storage, acceleration)` through
//! [`ResidualApplicator`]. Accelerated coverage is sparse: only `Add` (and the residual-surface add)
//! has SIMD kernels; every other command always runs the generic kernel.
//!
//! A split buffer can also be applied entry point by entry point on the current rayon pool with
//! [`apply_entry_points`]; each entry point owns a stripe of rows, so the result is the same.

pub mod accel;
pub mod generic;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enhancement::cmdbuffer::{CmdBuffer, CmdKind, Command, EntryPoint};
use crate::enhancement::transform_unit::TuState;
use crate::foundation::accel::CpuAccelerationFeatures;
use crate::foundation::core::{FixedPoint, Interleaving, Storage, TileRect, TransformType};
use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::surface::surface::{Sample, SurfaceRegionMut};

/// Region-local placement of one transform unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TuSite {
    /// Column of the unit's top-left sample.
    pub x: usize,
    /// Row of the unit's top-left sample.
    pub y: usize,
    /// Unit edge in samples.
    pub size: usize,
    /// Destination format.
    pub fp: FixedPoint,
}

/// Kernel writing one transform unit from its row-major residuals.
pub type TuFn<T> = fn(&mut [&mut [T]], TuSite, &[i16]);

/// Kernel adding a signed surface onto a destination, row by row.
pub type ResidualSurfaceFn<T> = fn(&[&mut [i16]], &mut [&mut [T]], FixedPoint);

/// Debug overlay: `Add`/`Set` commands inside `region` write a marker instead of residuals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Highlight {
    /// Marker for unsigned destinations, clamped to the format range.
    pub marker_unsigned: u16,
    /// Marker for signed destinations.
    pub marker_signed: i16,
    /// Plane-space region; `None` highlights everything.
    pub region: Option<TileRect>,
}

impl Highlight {
    fn covers(&self, x: u32, y: u32) -> bool {
        match self.region {
            None => true,
            Some(r) => x >= r.x && x < r.right() && y >= r.y && y < r.bottom(),
        }
    }

    fn marker<T: Sample>(&self, fp: FixedPoint) -> T {
        if fp.is_signed() {
            T::from_i32(i32::from(self.marker_signed))
        } else {
            T::from_i32(i32::from(self.marker_unsigned).min(fp.max_value()))
        }
    }
}

/// Kernel set for one destination storage, resolved once per configuration.
#[derive(Clone, Copy, Debug)]
pub struct ResidualApplicator<T: Sample> {
    add: TuFn<T>,
    set: TuFn<T>,
    accelerated: bool,
}

impl<T: Sample> ResidualApplicator<T> {
    /// Accelerated `Add` when `features` provide one, generic otherwise.
    pub fn select(features: CpuAccelerationFeatures, transform: TransformType) -> Self {
        let accelerated = accel::add_function::<T>(features, transform);
        Self {
            add: accelerated.unwrap_or_else(|| generic::add_function::<T>(transform)),
            set: generic::set::<T>,
            accelerated: accelerated.is_some(),
        }
    }

    /// `true` when the `Add` kernel is the SIMD one.
    pub fn is_accelerated(&self) -> bool {
        self.accelerated
    }
}

fn validate_target(
    buffer: &CmdBuffer,
    tu: &TuState,
    tile: TileRect,
    fp: FixedPoint,
    interleaving: Interleaving,
) -> EnhanceResult<()> {
    if tile != tu.tile() {
        return Err(EnhanceError::validation(format!(
            "destination region {tile:?} does not match tile {:?}",
            tu.tile()
        )));
    }
    if interleaving != Interleaving::None {
        return Err(EnhanceError::surface(format!(
            "residuals apply to planar surfaces, got {interleaving:?}"
        )));
    }
    if buffer.transform().tu_size() != tu.tu_size() {
        return Err(EnhanceError::validation(format!(
            "{:?} command buffer on {}px transform units",
            buffer.transform(),
            tu.tu_size()
        )));
    }
    for cmd in buffer.iter() {
        if cmd.tu_index >= tu.tu_total() {
            return Err(EnhanceError::validation(format!(
                "command for unit {} is past the tile's {} units",
                cmd.tu_index,
                tu.tu_total()
            )));
        }
        if cmd.kind == CmdKind::Set && !fp.is_signed() {
            return Err(EnhanceError::unsupported(format!(
                "set commands need a signed destination, got {fp:?}"
            )));
        }
    }
    Ok(())
}

/// Every entry point's commands, block clears included, must stay inside its stripe of rows.
fn validate_entry_points(buffer: &CmdBuffer, tu: &TuState) -> EnhanceResult<()> {
    let entries = buffer.entry_points();
    let mut covered = 0u32;
    for (i, entry) in entries.iter().enumerate() {
        let end = entries
            .get(i + 1)
            .map_or(tu.tile().height, |next| next.first_row);
        if end < entry.first_row || (i > 0 && entry.first_row != covered) {
            return Err(EnhanceError::validation(format!(
                "entry point {i} rows {}..{end} do not follow row {covered}",
                entry.first_row
            )));
        }
        for cmd in buffer.iter_entry(entry) {
            let (x, y) = tu.position(cmd.tu_index)?;
            let top = y - tu.tile().y;
            let height = match cmd.kind {
                CmdKind::Clear => tu.block_rect(x, y).height,
                _ => tu.tu_size(),
            };
            if top < entry.first_row || top + height > end {
                return Err(EnhanceError::validation(format!(
                    "command for unit {} lies outside entry point {i} rows {}..{end}",
                    cmd.tu_index, entry.first_row
                )));
            }
        }
        covered = end;
    }
    Ok(())
}

/// Apply every command of `buffer` to `dst`, the region holding `tu`'s tile.
///
/// Everything that can fail is checked before the first write: the region must be the tile, the
/// destination planar, unit sizes must agree, every command must land inside the tile and `Set`
/// needs a signed destination. An empty buffer succeeds without touching `dst`.
pub fn apply_cmd_buffer(
    buffer: &CmdBuffer,
    tu: &TuState,
    dst: &mut SurfaceRegionMut<'_>,
    features: CpuAccelerationFeatures,
    highlight: Option<&Highlight>,
) -> EnhanceResult<()> {
    apply_checked(buffer, tu, dst, features, highlight, false)
}

/// [`apply_cmd_buffer`] with the entry points of a split buffer applied concurrently.
///
/// Runs on the current rayon pool. Entry points come from [`CmdBuffer::split`] against the same
/// `tu`, so each writes only its own stripe of rows and the result matches [`apply_cmd_buffer`].
/// Buffers with fewer than two entry points are applied in order on the calling thread.
pub fn apply_entry_points(
    buffer: &CmdBuffer,
    tu: &TuState,
    dst: &mut SurfaceRegionMut<'_>,
    features: CpuAccelerationFeatures,
    highlight: Option<&Highlight>,
) -> EnhanceResult<()> {
    apply_checked(buffer, tu, dst, features, highlight, true)
}

fn apply_checked(
    buffer: &CmdBuffer,
    tu: &TuState,
    dst: &mut SurfaceRegionMut<'_>,
    features: CpuAccelerationFeatures,
    highlight: Option<&Highlight>,
    concurrent: bool,
) -> EnhanceResult<()> {
    let fp = dst.fixed_point();
    validate_target(buffer, tu, dst.rect(), fp, dst.interleaving())?;
    if buffer.is_empty() {
        return Ok(());
    }
    let concurrent = concurrent && buffer.entry_points().len() > 1;
    if concurrent {
        validate_entry_points(buffer, tu)?;
    }
    match fp.storage() {
        Storage::U8 => apply_typed::<u8>(buffer, tu, dst, features, highlight, concurrent),
        Storage::U16 => apply_typed::<u16>(buffer, tu, dst, features, highlight, concurrent),
        Storage::S16 => apply_typed::<i16>(buffer, tu, dst, features, highlight, concurrent),
    }
}

/// Shared inputs of one buffer application.
struct ApplyJob<'a, T: Sample> {
    tu: &'a TuState,
    fp: FixedPoint,
    kernels: ResidualApplicator<T>,
    highlight: Option<&'a Highlight>,
}

fn apply_typed<T: Sample>(
    buffer: &CmdBuffer,
    tu: &TuState,
    dst: &mut SurfaceRegionMut<'_>,
    features: CpuAccelerationFeatures,
    highlight: Option<&Highlight>,
    concurrent: bool,
) -> EnhanceResult<()> {
    let job = ApplyJob {
        tu,
        fp: dst.fixed_point(),
        kernels: ResidualApplicator::<T>::select(features, buffer.transform()),
        highlight,
    };
    let rows = dst
        .rows_mut::<T>()
        .ok_or_else(|| EnhanceError::surface("destination storage mismatch"))?;
    if !concurrent {
        return apply_commands(buffer.iter(), &job, rows, 0);
    }

    // Entry points were validated to tile the rows in order.
    let entries = buffer.entry_points();
    let mut stripes: Vec<(&EntryPoint, &mut [&mut [T]])> = Vec::with_capacity(entries.len());
    let mut rest = rows;
    for (i, entry) in entries.iter().enumerate() {
        let end = entries
            .get(i + 1)
            .map_or(tu.tile().height, |next| next.first_row);
        let (stripe, tail) =
            std::mem::take(&mut rest).split_at_mut((end - entry.first_row) as usize);
        stripes.push((entry, stripe));
        rest = tail;
    }
    stripes.into_par_iter().try_for_each(|(entry, stripe)| {
        apply_commands(buffer.iter_entry(entry), &job, stripe, entry.first_row)
    })
}

/// Write `commands` into `rows`, whose first row is tile row `first_row`.
fn apply_commands<'b, T: Sample>(
    commands: impl Iterator<Item = Command<'b>>,
    job: &ApplyJob<'_, T>,
    rows: &mut [&mut [T]],
    first_row: u32,
) -> EnhanceResult<()> {
    let (tu, fp) = (job.tu, job.fp);
    let tile = tu.tile();
    let size = tu.tu_size() as usize;
    for cmd in commands {
        let (x, y) = tu.position(cmd.tu_index)?;
        let site = TuSite {
            x: (x - tile.x) as usize,
            y: (y - tile.y - first_row) as usize,
            size,
            fp,
        };
        match cmd.kind {
            CmdKind::Add | CmdKind::Set => match job.highlight {
                Some(h) if h.covers(x, y) => {
                    generic::fill(rows, site.x, site.y, size, size, h.marker::<T>(fp));
                }
                _ if cmd.kind == CmdKind::Add => (job.kernels.add)(rows, site, cmd.residuals),
                _ => (job.kernels.set)(rows, site, cmd.residuals),
            },
            CmdKind::SetZero => generic::fill(rows, site.x, site.y, size, size, T::default()),
            CmdKind::Clear => {
                let block = tu.block_rect(x, y);
                generic::fill(
                    rows,
                    site.x,
                    site.y,
                    block.width as usize,
                    block.height as usize,
                    T::default(),
                );
            }
        }
    }
    Ok(())
}

/// Add a signed residual surface onto `dst`: `demote(promote(dst) + src)` for unsigned
/// destinations, `sat_s16(dst + src)` for signed ones.
///
/// Both regions must be planar and the same size; `src` must be signed.
pub fn apply_residual_surface(
    src: &SurfaceRegionMut<'_>,
    dst: &mut SurfaceRegionMut<'_>,
    features: CpuAccelerationFeatures,
) -> EnhanceResult<()> {
    if !src.fixed_point().is_signed() {
        return Err(EnhanceError::surface(format!(
            "residual surface must be signed, got {:?}",
            src.fixed_point()
        )));
    }
    if src.interleaving() != Interleaving::None || dst.interleaving() != Interleaving::None {
        return Err(EnhanceError::surface("residual surfaces must be planar"));
    }
    let (s, d) = (src.rect(), dst.rect());
    if (s.width, s.height) != (d.width, d.height) {
        return Err(EnhanceError::surface(format!(
            "residual surface {}x{} does not match destination {}x{}",
            s.width, s.height, d.width, d.height
        )));
    }
    let residuals = src
        .rows::<i16>()
        .ok_or_else(|| EnhanceError::surface("residual storage mismatch"))?;
    match dst.fixed_point().storage() {
        Storage::U8 => residual_typed::<u8>(residuals, dst, features),
        Storage::U16 => residual_typed::<u16>(residuals, dst, features),
        Storage::S16 => residual_typed::<i16>(residuals, dst, features),
    }
}

fn residual_typed<T: Sample>(
    src: &[&mut [i16]],
    dst: &mut SurfaceRegionMut<'_>,
    features: CpuAccelerationFeatures,
) -> EnhanceResult<()> {
    let fp = dst.fixed_point();
    let kernel = accel::residual_surface_function::<T>(features)
        .unwrap_or_else(generic::residual_surface_function::<T>);
    let rows = dst
        .rows_mut::<T>()
        .ok_or_else(|| EnhanceError::surface("destination storage mismatch"))?;
    kernel(src, rows, fp);
    Ok(())
}

/// Demote the signed `src` into unsigned `dst` at every unit `buffer` touches.
///
/// `Clear` commands convert their whole (clipped) block. Both regions must be `tu`'s tile.
pub fn apply_convert(
    buffer: &CmdBuffer,
    tu: &TuState,
    src: &SurfaceRegionMut<'_>,
    dst: &mut SurfaceRegionMut<'_>,
) -> EnhanceResult<()> {
    let fp = dst.fixed_point();
    if fp.is_signed() || !src.fixed_point().is_signed() {
        return Err(EnhanceError::unsupported(format!(
            "convert runs signed to unsigned, got {:?} to {fp:?}",
            src.fixed_point()
        )));
    }
    if src.rect() != tu.tile() {
        return Err(EnhanceError::validation(format!(
            "source region {:?} does not match tile {:?}",
            src.rect(),
            tu.tile()
        )));
    }
    validate_target(buffer, tu, dst.rect(), fp, dst.interleaving())?;
    let values = src
        .rows::<i16>()
        .ok_or_else(|| EnhanceError::surface("source storage mismatch"))?;
    match fp.storage() {
        Storage::U8 => convert_typed::<u8>(buffer, tu, values, dst),
        _ => convert_typed::<u16>(buffer, tu, values, dst),
    }
}

fn convert_typed<T: Sample>(
    buffer: &CmdBuffer,
    tu: &TuState,
    src: &[&mut [i16]],
    dst: &mut SurfaceRegionMut<'_>,
) -> EnhanceResult<()> {
    let fp = dst.fixed_point();
    let tile = tu.tile();
    let size = tu.tu_size();
    let rows = dst
        .rows_mut::<T>()
        .ok_or_else(|| EnhanceError::surface("destination storage mismatch"))?;
    buffer.iter().try_for_each(|cmd| {
        let (x, y) = tu.position(cmd.tu_index)?;
        let area = match cmd.kind {
            CmdKind::Clear => tu.block_rect(x, y),
            _ => TileRect::new(x, y, size, size),
        };
        generic::convert_unit(
            src,
            rows,
            (x - tile.x) as usize,
            (y - tile.y) as usize,
            area.width as usize,
            area.height as usize,
            fp,
        );
        Ok(())
    })
}

#[cfg(test)]
#[path = "../../tests/unit/apply/apply.rs"]
mod tests;
