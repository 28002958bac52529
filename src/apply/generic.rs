//! Portable residual kernels. Every accelerated kernel must match these bit for bit.

use crate::apply::{ResidualSurfaceFn, TuFn, TuSite};
use crate::foundation::core::{FixedPoint, TransformType};
use crate::foundation::math::{demote, promote, saturate_s16};
use crate::surface::surface::Sample;

/// Add a residual onto one sample.
#[inline]
pub(crate) fn add_sample(p: i32, r: i32, fp: FixedPoint) -> i32 {
    if fp.is_signed() {
        saturate_s16(p + r)
    } else {
        demote(promote(p, fp) + r, fp)
    }
}

/// `Add` kernel for `transform`. The generic table covers every transform and storage.
pub fn add_function<T: Sample>(_transform: TransformType) -> TuFn<T> {
    add::<T>
}

pub(crate) fn add<T: Sample>(rows: &mut [&mut [T]], site: TuSite, residuals: &[i16]) {
    let n = site.size;
    for (row, res) in rows[site.y..site.y + n]
        .iter_mut()
        .zip(residuals.chunks_exact(n))
    {
        for (p, &r) in row[site.x..site.x + n].iter_mut().zip(res) {
            *p = T::from_i32(add_sample(p.to_i32(), i32::from(r), site.fp));
        }
    }
}

/// Overwrite a unit with its residuals. Signed destinations only.
pub(crate) fn set<T: Sample>(rows: &mut [&mut [T]], site: TuSite, residuals: &[i16]) {
    let n = site.size;
    for (row, res) in rows[site.y..site.y + n]
        .iter_mut()
        .zip(residuals.chunks_exact(n))
    {
        for (p, &r) in row[site.x..site.x + n].iter_mut().zip(res) {
            *p = T::from_i32(i32::from(r));
        }
    }
}

/// Fill a `width` x `height` rectangle at `(x, y)` with `value`.
pub(crate) fn fill<T: Sample>(
    rows: &mut [&mut [T]],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    value: T,
) {
    for row in &mut rows[y..y + height] {
        row[x..x + width].fill(value);
    }
}

/// Residual-surface kernel: every sample of `src` added onto `dst`.
pub fn residual_surface_function<T: Sample>() -> ResidualSurfaceFn<T> {
    residual_surface::<T>
}

fn residual_surface<T: Sample>(src: &[&mut [i16]], dst: &mut [&mut [T]], fp: FixedPoint) {
    for (d, s) in dst.iter_mut().zip(src) {
        for (p, &r) in d.iter_mut().zip(s.iter()) {
            *p = T::from_i32(add_sample(p.to_i32(), i32::from(r), fp));
        }
    }
}

/// Demote a signed unit into an unsigned destination.
pub(crate) fn convert_unit<T: Sample>(
    src: &[&mut [i16]],
    dst: &mut [&mut [T]],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    fp: FixedPoint,
) {
    for (d, s) in dst[y..y + height].iter_mut().zip(&src[y..y + height]) {
        for (p, &v) in d[x..x + width].iter_mut().zip(&s[x..x + width]) {
            *p = T::from_i32(demote(i32::from(v), fp));
        }
    }
}
