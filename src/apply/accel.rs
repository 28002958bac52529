//! SIMD residual kernels on `wide::i32x4`.
//!
//! Only `Add` and the residual-surface add are accelerated; everything else resolves to the
//! generic table.

use wide::i32x4;

use crate::apply::generic::add_sample;
use crate::apply::{ResidualSurfaceFn, TuFn, TuSite};
use crate::foundation::accel::CpuAccelerationFeatures;
use crate::foundation::core::{FixedPoint, TransformType};
use crate::foundation::math::PROMOTE_OFFSET;
use crate::surface::surface::Sample;

/// Accelerated `Add` kernel, if `features` allow one.
pub fn add_function<T: Sample>(
    features: CpuAccelerationFeatures,
    transform: TransformType,
) -> Option<TuFn<T>> {
    if !features.is_accelerated() {
        return None;
    }
    Some(match transform {
        TransformType::Dd => add_dd::<T>,
        TransformType::Dds => add_dds::<T>,
    })
}

/// Accelerated residual-surface kernel, if `features` allow one.
pub fn residual_surface_function<T: Sample>(
    features: CpuAccelerationFeatures,
) -> Option<ResidualSurfaceFn<T>> {
    features
        .is_accelerated()
        .then_some(residual_surface::<T> as ResidualSurfaceFn<T>)
}

#[inline]
fn add_lanes(p: i32x4, r: i32x4, fp: FixedPoint) -> i32x4 {
    if fp.is_signed() {
        return (p + r)
            .max(i32x4::splat(i32::from(i16::MIN)))
            .min(i32x4::splat(i32::from(i16::MAX)));
    }
    let shift = fp.promotion_shift() as i32;
    let promoted = (p << shift) - i32x4::splat(PROMOTE_OFFSET);
    let v = promoted + r + i32x4::splat(1 << (shift - 1));
    ((v >> shift) + i32x4::splat(1 << (fp.bit_depth() - 1)))
        .max(i32x4::splat(0))
        .min(i32x4::splat(fp.max_value()))
}

// A 2x2 unit fills one vector: two samples from each row.
fn add_dd<T: Sample>(rows: &mut [&mut [T]], site: TuSite, residuals: &[i16]) {
    let (x, y) = (site.x, site.y);
    let p = i32x4::new([
        rows[y][x].to_i32(),
        rows[y][x + 1].to_i32(),
        rows[y + 1][x].to_i32(),
        rows[y + 1][x + 1].to_i32(),
    ]);
    let r = i32x4::new([
        i32::from(residuals[0]),
        i32::from(residuals[1]),
        i32::from(residuals[2]),
        i32::from(residuals[3]),
    ]);
    let out = add_lanes(p, r, site.fp).to_array();
    rows[y][x] = T::from_i32(out[0]);
    rows[y][x + 1] = T::from_i32(out[1]);
    rows[y + 1][x] = T::from_i32(out[2]);
    rows[y + 1][x + 1] = T::from_i32(out[3]);
}

fn add_dds<T: Sample>(rows: &mut [&mut [T]], site: TuSite, residuals: &[i16]) {
    for (row, res) in rows[site.y..site.y + 4]
        .iter_mut()
        .zip(residuals.chunks_exact(4))
    {
        let out = add_lanes(load4(&row[..], site.x), load_res(res), site.fp);
        store4(&mut row[site.x..site.x + 4], out);
    }
}

#[inline]
fn load4<T: Sample>(row: &[T], x: usize) -> i32x4 {
    i32x4::new([
        row[x].to_i32(),
        row[x + 1].to_i32(),
        row[x + 2].to_i32(),
        row[x + 3].to_i32(),
    ])
}

#[inline]
fn load_res(r: &[i16]) -> i32x4 {
    i32x4::new([
        i32::from(r[0]),
        i32::from(r[1]),
        i32::from(r[2]),
        i32::from(r[3]),
    ])
}

#[inline]
fn store4<T: Sample>(dst: &mut [T], v: i32x4) {
    for (d, s) in dst.iter_mut().zip(v.to_array()) {
        *d = T::from_i32(s);
    }
}

fn residual_surface<T: Sample>(src: &[&mut [i16]], dst: &mut [&mut [T]], fp: FixedPoint) {
    for (d, s) in dst.iter_mut().zip(src) {
        let n = d.len().min(s.len());
        let body = n - n % 4;
        for x in (0..body).step_by(4) {
            let out = add_lanes(load4(&d[..], x), load_res(&s[x..x + 4]), fp);
            store4(&mut d[x..x + 4], out);
        }
        for x in body..n {
            d[x] = T::from_i32(add_sample(d[x].to_i32(), i32::from(s[x]), fp));
        }
    }
}
