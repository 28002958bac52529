use super::*;
use crate::surface::surface::Surface;
use crate::upscale::PredictedAverage;
use crate::upscale::kernel::{Kernel, UpscaleType};

fn plane(width: u32, height: u32, fp: FixedPoint, il: Interleaving, values: &[i32]) -> Surface {
    let mut s = Surface::new(width, height, fp, il).unwrap();
    let n = s.row_samples();
    for (i, &v) in values.iter().enumerate() {
        s.set(i % n, (i / n) as u32, v).unwrap();
    }
    s
}

fn widen(src: &Surface, dst: &mut Surface, kernel: &Kernel, pa: bool) -> EnhanceResult<()> {
    let base = pa.then_some(src.fixed_point());
    let f = horizontal_function(src.interleaving(), src.fixed_point(), dst.fixed_point(), base)
        .expect("kernel");
    let job = HorizontalJob {
        src,
        src_x: 0,
        src_y: 0,
        plane_width: src.width(),
        predicted_average: pa.then_some(PredictedAverage {
            base: src,
            two_d: false,
        }),
        kernel,
        dither: None,
    };
    f.run(&job, &mut dst.region_mut())
}

fn row_i32(s: &Surface, y: u32) -> Vec<i32> {
    (0..s.row_samples()).map(|x| s.get(x, y).unwrap()).collect()
}

#[test]
fn horizontal_lookup_rules() {
    use FixedPoint::*;
    let il = Interleaving::None;
    let some = |s, d, b| horizontal_function(il, s, d, b).is_some();
    assert!(some(U8, U8, None));
    assert!(some(U8, U8, Some(U8)));
    assert!(some(U8, U10, Some(U8)));
    assert!(some(U10, U10, Some(U8)));
    assert!(some(S10, S8, Some(S12)));
    assert!(!some(U10, U8, None));
    assert!(!some(S8, U8, None));
    assert!(!some(U8, S8, None));
    assert!(!some(U8, U10, Some(U10)));
    assert!(!some(U10, U12, Some(U8)));
    assert!(!horizontal_function(il, U8, U8, None).unwrap().is_accelerated());
}

#[test]
fn vertical_lookup_rules() {
    use FixedPoint::*;
    assert!(vertical_function(U8, U10).is_some());
    assert!(vertical_function(U12, U12).is_some());
    assert!(vertical_function(S8, S14).is_some());
    assert!(vertical_function(U10, U8).is_none());
    assert!(vertical_function(U8, S8).is_none());
    assert!(vertical_function(S8, U8).is_none());
}

#[test]
fn nearest_repeats_samples() {
    let src = plane(4, 1, FixedPoint::U8, Interleaving::None, &[10, 20, 30, 40]);
    let mut dst = Surface::new(8, 1, FixedPoint::U8, Interleaving::None).unwrap();
    widen(&src, &mut dst, &Kernel::new(UpscaleType::Nearest), true).unwrap();
    assert_eq!(dst.row::<u8>(0).unwrap(), &[10, 10, 20, 20, 30, 30, 40, 40]);
}

#[test]
fn linear_uses_quarter_phase_weights() {
    let src = plane(2, 1, FixedPoint::U8, Interleaving::None, &[100, 140]);
    let linear = Kernel::new(UpscaleType::Linear);

    let mut dst = Surface::new(4, 1, FixedPoint::U8, Interleaving::None).unwrap();
    widen(&src, &mut dst, &linear, false).unwrap();
    assert_eq!(dst.row::<u8>(0).unwrap(), &[100, 110, 130, 140]);

    widen(&src, &mut dst, &linear, true).unwrap();
    assert_eq!(dst.row::<u8>(0).unwrap(), &[95, 105, 135, 145]);
}

#[test]
fn signed_sources_keep_their_range() {
    let src = plane(2, 1, FixedPoint::S10, Interleaving::None, &[-100, 100]);
    let mut dst = Surface::new(4, 1, FixedPoint::S10, Interleaving::None).unwrap();
    widen(&src, &mut dst, &Kernel::new(UpscaleType::Linear), false).unwrap();
    assert_eq!(row_i32(&dst, 0), vec![-100, -50, 50, 100]);
}

#[test]
fn widening_shifts_into_the_destination_depth() {
    let src = plane(2, 1, FixedPoint::U8, Interleaving::None, &[10, 20]);
    let mut dst = Surface::new(4, 1, FixedPoint::U10, Interleaving::None).unwrap();
    widen(&src, &mut dst, &Kernel::new(UpscaleType::Nearest), true).unwrap();
    assert_eq!(dst.row::<u16>(0).unwrap(), &[40, 40, 80, 80]);
}

#[test]
fn interleaved_channels_are_filtered_independently() {
    let src = plane(2, 1, FixedPoint::U8, Interleaving::Nv12, &[10, 200, 20, 210]);
    let mut dst = Surface::new(4, 1, FixedPoint::U8, Interleaving::Nv12).unwrap();
    widen(&src, &mut dst, &Kernel::new(UpscaleType::Nearest), false).unwrap();
    assert_eq!(
        dst.row::<u8>(0).unwrap(),
        &[10, 200, 10, 200, 20, 210, 20, 210]
    );
}

#[test]
fn vertical_clamps_rows_at_the_plane_edge() {
    let src = plane(1, 2, FixedPoint::U8, Interleaving::None, &[0, 100]);
    let kernel = Kernel::new(UpscaleType::Linear);
    let f = vertical_function(FixedPoint::U8, FixedPoint::U8).unwrap();
    let mut dst = Surface::new(1, 4, FixedPoint::U8, Interleaving::None).unwrap();
    let job = VerticalJob {
        src: &src,
        src_x: 0,
        dst_y: 0,
        kernel: &kernel,
    };
    f.run(&job, &mut dst.region_mut()).unwrap();
    let column: Vec<i32> = (0..4).map(|y| dst.get(0, y).unwrap()).collect();
    assert_eq!(column, vec![0, 25, 75, 100]);
}

#[test]
fn horizontal_rejects_a_source_that_misses_the_filter_support() {
    let src = plane(2, 1, FixedPoint::U8, Interleaving::None, &[1, 2]);
    let kernel = Kernel::new(UpscaleType::Cubic);
    let f = horizontal_function(Interleaving::None, FixedPoint::U8, FixedPoint::U8, None).unwrap();
    let mut dst = Surface::new(4, 1, FixedPoint::U8, Interleaving::None).unwrap();
    let job = HorizontalJob {
        src: &src,
        src_x: 2,
        src_y: 0,
        plane_width: 8,
        predicted_average: None,
        kernel: &kernel,
        dither: None,
    };
    assert!(f.run(&job, &mut dst.region_mut()).is_err());
}

#[test]
fn mismatched_storage_is_reported() {
    let src = plane(2, 1, FixedPoint::U10, Interleaving::None, &[1, 2]);
    let kernel = Kernel::new(UpscaleType::Nearest);
    let f = horizontal_function(Interleaving::None, FixedPoint::U8, FixedPoint::U8, None).unwrap();
    let mut dst = Surface::new(4, 1, FixedPoint::U8, Interleaving::None).unwrap();
    let job = HorizontalJob {
        src: &src,
        src_x: 0,
        src_y: 0,
        plane_width: 2,
        predicted_average: None,
        kernel: &kernel,
        dither: None,
    };
    assert!(f.run(&job, &mut dst.region_mut()).is_err());
}
