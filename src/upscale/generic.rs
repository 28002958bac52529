//! Portable upscale kernels and the generic lookup tables.
//!
//! Row handling (gather, rounding, predicted average, stores) lives here and is shared with the
//! accelerated family, which only swaps the tap accumulation.

use crate::foundation::core::{FixedPoint, Interleaving, Storage};
use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::foundation::math::{
    KERNEL_ROUND, KERNEL_SHIFT, clamp_unsigned, saturate_s15, saturate_s16,
};
use crate::surface::surface::{Sample, SurfaceRegionMut};
use crate::upscale::{
    HorizontalFn, HorizontalJob, HorizontalKernel, VerticalFn, VerticalJob, VerticalKernel,
};

/// Multiply-accumulate over filter taps.
pub(crate) trait Taps {
    /// `out[i] = sum over t of taps[t] * lines[t][i]`.
    fn weighted_sum(lines: &[&[i32]], taps: &[i16], out: &mut [i32]);
}

pub(crate) struct ScalarTaps;

impl Taps for ScalarTaps {
    fn weighted_sum(lines: &[&[i32]], taps: &[i16], out: &mut [i32]) {
        out.fill(0);
        for (line, &tap) in lines.iter().zip(taps) {
            let tap = i32::from(tap);
            for (o, &v) in out.iter_mut().zip(line.iter()) {
                *o += tap * v;
            }
        }
    }
}

/// Generic horizontal kernel for `(interleaving, src, dst, base)`.
///
/// Signed sources need a signed destination and base. Unsigned sources either pass through
/// unchanged in format or promote, with `bits(base) <= bits(src) <= bits(dst)` and the base
/// matching either side. A missing base means predicted average is off.
pub fn horizontal_function(
    _interleaving: Interleaving,
    src: FixedPoint,
    dst: FixedPoint,
    base: Option<FixedPoint>,
) -> Option<HorizontalKernel> {
    if !horizontal_supported(src, dst, base) {
        return None;
    }
    Some(HorizontalKernel {
        run: horizontal_for::<ScalarTaps>(src, dst, base.unwrap_or(src))?,
        accelerated: false,
    })
}

pub(crate) fn horizontal_supported(
    src: FixedPoint,
    dst: FixedPoint,
    base: Option<FixedPoint>,
) -> bool {
    if src.is_signed() {
        return dst.is_signed() && base.is_none_or(FixedPoint::is_signed);
    }
    if dst.is_signed() || base.is_some_and(FixedPoint::is_signed) {
        return false;
    }
    if src == dst && base.is_none_or(|b| b == dst) {
        return true;
    }
    let base = base.unwrap_or(src);
    let (b, s, d) = (base.bit_depth(), src.bit_depth(), dst.bit_depth());
    b <= s && s <= d && (base == src || src == dst)
}

/// Generic vertical kernel for `(src, dst)`: unsigned widening or signed to signed.
pub fn vertical_function(src: FixedPoint, dst: FixedPoint) -> Option<VerticalKernel> {
    if !vertical_supported(src, dst) {
        return None;
    }
    Some(VerticalKernel {
        run: vertical_for::<ScalarTaps>(src, dst)?,
        accelerated: false,
    })
}

pub(crate) fn vertical_supported(src: FixedPoint, dst: FixedPoint) -> bool {
    match (src.is_signed(), dst.is_signed()) {
        (false, false) => src.bit_depth() <= dst.bit_depth(),
        (true, true) => true,
        _ => false,
    }
}

pub(crate) fn horizontal_for<F: Taps>(
    src: FixedPoint,
    dst: FixedPoint,
    base: FixedPoint,
) -> Option<HorizontalFn> {
    use Storage::{S16, U8, U16};
    Some(match (src.storage(), dst.storage(), base.storage()) {
        (U8, U8, U8) => horizontal::<u8, u8, u8, F>,
        (U8, U16, U8) => horizontal::<u8, u16, u8, F>,
        (U16, U16, U8) => horizontal::<u16, u16, u8, F>,
        (U16, U16, U16) => horizontal::<u16, u16, u16, F>,
        (S16, S16, S16) => horizontal::<i16, i16, i16, F>,
        _ => return None,
    })
}

pub(crate) fn vertical_for<F: Taps>(src: FixedPoint, dst: FixedPoint) -> Option<VerticalFn> {
    use Storage::{S16, U8, U16};
    Some(match (src.storage(), dst.storage()) {
        (U8, U8) => vertical::<u8, u8, F>,
        (U8, U16) => vertical::<u8, u16, F>,
        (U16, U16) => vertical::<u16, u16, F>,
        (S16, S16) => vertical::<i16, i16, F>,
        _ => return None,
    })
}

/// Left shift taking `src` samples into `dst` precision. Signed formats share one range.
#[inline]
pub(crate) fn input_shift(src: FixedPoint, dst: FixedPoint) -> u32 {
    if src.is_signed() {
        0
    } else {
        dst.bit_depth().saturating_sub(src.bit_depth())
    }
}

#[inline]
fn shift_saturated(v: i32) -> i32 {
    saturate_s15((v + KERNEL_ROUND) >> KERNEL_SHIFT)
}

#[inline]
fn clamp_to(v: i32, fp: FixedPoint) -> i32 {
    if fp.is_signed() {
        saturate_s16(v)
    } else {
        clamp_unsigned(v, fp.max_value())
    }
}

fn storage_mismatch(what: &str) -> EnhanceError {
    EnhanceError::surface(format!("{what} storage does not match the upscale kernel"))
}

/// Per-channel geometry of one horizontal pass.
struct ChannelSpan {
    channel: usize,
    skip: usize,
    /// First source channel index the output pairs start on.
    first_pair: usize,
    pairs: usize,
    /// Source channel samples in the full plane.
    plane_count: usize,
    /// Plane channel index of the source surface's first sample.
    origin: usize,
}

fn channel_spans(
    job: &HorizontalJob<'_>,
    dst: &SurfaceRegionMut<'_>,
) -> EnhanceResult<Vec<ChannelSpan>> {
    let il = dst.interleaving();
    let layout = il.layout();
    let rect = dst.rect();
    let half = job.kernel.len() / 2;
    let mut spans = Vec::new();
    for channel in il.channels() {
        let skip = layout.skip[channel];
        let d0 = il.row_samples(rect.x) / skip;
        let n = dst.row_samples() / skip;
        let span = ChannelSpan {
            channel,
            skip,
            first_pair: d0 / 2,
            pairs: n / 2,
            plane_count: il.row_samples(job.plane_width) / skip,
            origin: il.row_samples(job.src_x) / skip,
        };
        let available = job.src.row_samples() / skip;
        let lo = span.first_pair.saturating_sub(half);
        let hi = (span.first_pair + span.pairs + half - 1).min(span.plane_count.max(1) - 1);
        if lo < span.origin || hi >= span.origin + available {
            return Err(EnhanceError::surface(format!(
                "horizontal source covers channel {channel} samples {}..{}, needs {lo}..={hi}",
                span.origin,
                span.origin + available
            )));
        }
        spans.push(span);
    }
    Ok(spans)
}

fn horizontal<S: Sample, D: Sample, B: Sample, F: Taps>(
    job: &HorizontalJob<'_>,
    dst: &mut SurfaceRegionMut<'_>,
) -> EnhanceResult<()> {
    let rect = dst.rect();
    let dst_fp = dst.fixed_point();
    let shift = input_shift(job.src.fixed_point(), dst_fp);
    let fwd = job.kernel.forward();
    let rev = job.kernel.reverse();
    let len = fwd.len();
    let half = len / 2;
    let spans = channel_spans(job, dst)?;

    let pa = job.predicted_average.as_ref();
    let two_d = pa.is_some_and(|p| p.two_d);
    let base_shift = pa.map_or(0, |p| input_shift(p.base.fixed_point(), dst_fp));
    let step = if two_d { 2 } else { 1 };
    let dither_shift = if dst_fp.is_signed() { 15 - dst_fp.bit_depth() } else { 0 };
    let first_sample = dst.interleaving().row_samples(rect.x);
    let samples = dst.row_samples();
    let rows = dst.rows_mut::<D>().ok_or_else(|| storage_mismatch("destination"))?;

    let mut line = Vec::new();
    let mut even = Vec::new();
    let mut odd = Vec::new();
    let mut values: [Vec<i32>; 2] = [Vec::new(), Vec::new()];
    let mut noise: [Vec<i32>; 2] = [Vec::new(), Vec::new()];

    for r0 in (0..rect.height as usize).step_by(step) {
        if let Some(d) = job.dither {
            // Keyed by output row and plane column, so tiles read the noise of a whole-plane run.
            for (dy, n) in noise.iter_mut().enumerate().take(step) {
                let y = rect.y + (r0 + dy) as u32;
                n.clear();
                n.extend(d.span_values(y, first_sample, samples).map(|v| v << dither_shift));
            }
        }
        for span in &spans {
            let pairs = span.pairs;
            for (dy, vals) in values.iter_mut().enumerate().take(step) {
                let y = rect.y + (r0 + dy) as u32;
                let src_row = job
                    .src
                    .row::<S>(y - job.src_y)
                    .ok_or_else(|| storage_mismatch("source"))?;

                line.clear();
                let last = span.plane_count.max(1) - 1;
                // line[i] holds source index first_pair + i - half, clamped to the plane.
                line.extend((0..pairs + len).map(|i| {
                    let idx = (span.first_pair + i).saturating_sub(half).min(last);
                    src_row[(idx - span.origin) * span.skip + span.channel].to_i32() << shift
                }));

                even.resize(pairs, 0);
                odd.resize(pairs, 0);
                let rev_lines: Vec<&[i32]> = (0..len).map(|t| &line[t..t + pairs]).collect();
                let fwd_lines: Vec<&[i32]> = (0..len).map(|t| &line[t + 1..t + 1 + pairs]).collect();
                F::weighted_sum(&rev_lines, rev, &mut even);
                F::weighted_sum(&fwd_lines, fwd, &mut odd);

                vals.clear();
                for (&e, &o) in even.iter().zip(&odd) {
                    vals.push(shift_saturated(e));
                    vals.push(shift_saturated(o));
                }
            }

            if let Some(pa) = pa {
                let base_y = if two_d {
                    (rect.y as usize + r0) / 2
                } else {
                    rect.y as usize + r0
                };
                let base_row = pa
                    .base
                    .row::<B>(base_y as u32)
                    .ok_or_else(|| storage_mismatch("base"))?;
                for p in 0..pairs {
                    let b = base_row[(span.first_pair + p) * span.skip + span.channel].to_i32()
                        << base_shift;
                    let (a, c) = (2 * p, 2 * p + 1);
                    if two_d {
                        let [top, bottom] = &mut values;
                        let avg = b - ((top[a] + top[c] + bottom[a] + bottom[c] + 2) >> 2);
                        top[a] += avg;
                        top[c] += avg;
                        bottom[a] += avg;
                        bottom[c] += avg;
                    } else {
                        let v = &mut values[0];
                        let avg = b - ((v[a] + v[c] + 1) >> 1);
                        v[a] += avg;
                        v[c] += avg;
                    }
                }
            }

            for (dy, vals) in values.iter().enumerate().take(step) {
                let row = &mut rows[r0 + dy];
                for (j, &v) in vals.iter().enumerate() {
                    let idx = j * span.skip + span.channel;
                    let d = noise[dy].get(idx).copied().unwrap_or(0);
                    row[idx] = D::from_i32(clamp_to(v + d, dst_fp));
                }
            }
        }
    }
    Ok(())
}

fn vertical<S: Sample, D: Sample, F: Taps>(
    job: &VerticalJob<'_>,
    dst: &mut SurfaceRegionMut<'_>,
) -> EnhanceResult<()> {
    let dst_fp = dst.fixed_point();
    let shift = input_shift(job.src.fixed_point(), dst_fp);
    let len = job.kernel.len();
    let half = len as i64 / 2;
    let il = dst.interleaving();
    let offset = il.row_samples(job.src_x);
    let n = dst.row_samples();
    let height = i64::from(job.src.height());
    if offset + n > job.src.row_samples() {
        return Err(EnhanceError::surface(format!(
            "vertical source row of {} samples cannot cover {offset}..{}",
            job.src.row_samples(),
            offset + n
        )));
    }
    let rows = dst.rows_mut::<D>().ok_or_else(|| storage_mismatch("destination"))?;

    let mut lines: Vec<Vec<i32>> = vec![Vec::with_capacity(n); len];
    let mut sums = vec![0i32; n];
    for (r, out) in rows.iter_mut().enumerate() {
        let y = i64::from(job.dst_y) + r as i64;
        let k = y / 2;
        let (taps, first) = if y % 2 == 0 {
            (job.kernel.reverse(), k - half)
        } else {
            (job.kernel.forward(), k - half + 1)
        };
        for (t, line) in lines.iter_mut().enumerate() {
            let sy = (first + t as i64).clamp(0, height - 1) as u32;
            let src_row = job.src.row::<S>(sy).ok_or_else(|| storage_mismatch("source"))?;
            line.clear();
            line.extend(src_row[offset..offset + n].iter().map(|v| v.to_i32() << shift));
        }
        let refs: Vec<&[i32]> = lines.iter().map(Vec::as_slice).collect();
        F::weighted_sum(&refs, taps, &mut sums);
        for (o, &v) in out[..n].iter_mut().zip(&sums) {
            let shifted = (v + KERNEL_ROUND) >> KERNEL_SHIFT;
            let value = if dst_fp.is_signed() {
                saturate_s15(shifted)
            } else {
                clamp_unsigned(shifted, dst_fp.max_value())
            };
            *o = D::from_i32(value);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/upscale/generic.rs"]
mod tests;
