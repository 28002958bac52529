use super::*;
use crate::enhancement::transform_unit::TuOrder;
use crate::surface::surface::Surface;

const ACCEL: CpuAccelerationFeatures = CpuAccelerationFeatures::SSE;

fn filled(w: u32, h: u32, fp: FixedPoint, value: i32) -> Surface {
    let mut s = Surface::new(w, h, fp, Interleaving::None).unwrap();
    for y in 0..h {
        for x in 0..w as usize {
            s.set(x, y, value).unwrap();
        }
    }
    s
}

fn tile_state(w: u32, h: u32, transform: TransformType, order: TuOrder) -> TuState {
    TuState::new(TileRect::new(0, 0, w, h), transform.tu_size(), order).unwrap()
}

fn apply(
    buf: &CmdBuffer,
    tu: &TuState,
    surface: &mut Surface,
    features: CpuAccelerationFeatures,
    highlight: Option<&Highlight>,
) -> EnhanceResult<()> {
    let mut region = surface.region_mut();
    apply_cmd_buffer(buf, tu, &mut region, features, highlight)
}

#[test]
fn add_on_unsigned_goes_through_the_signed_domain() {
    let tu = tile_state(4, 4, TransformType::Dd, TuOrder::SurfaceRaster);
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::Add, 0, &[256, 128, -128, 0]).unwrap();
    for features in [CpuAccelerationFeatures::NONE, ACCEL] {
        let mut s = filled(4, 4, FixedPoint::U8, 100);
        apply(&buf, &tu, &mut s, features, None).unwrap();
        assert_eq!(s.row::<u8>(0).unwrap(), &[102, 101, 100, 100]);
        assert_eq!(s.row::<u8>(1).unwrap(), &[99, 100, 100, 100]);
        assert_eq!(s.row::<u8>(2).unwrap(), &[100, 100, 100, 100]);
    }
}

#[test]
fn add_on_signed_saturates() {
    let tu = tile_state(2, 2, TransformType::Dd, TuOrder::SurfaceRaster);
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::Add, 0, &[i16::MAX, -5, i16::MIN, 7]).unwrap();
    for features in [CpuAccelerationFeatures::NONE, ACCEL] {
        let mut s = filled(2, 2, FixedPoint::S10, 10);
        apply(&buf, &tu, &mut s, features, None).unwrap();
        assert_eq!(s.row::<i16>(0).unwrap(), &[i16::MAX, 5]);
        assert_eq!(s.row::<i16>(1).unwrap(), &[i16::MIN + 10, 17]);
    }
}

#[test]
fn unsigned_add_clamps_at_the_format_range() {
    let tu = tile_state(2, 2, TransformType::Dd, TuOrder::SurfaceRaster);
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::Add, 0, &[i16::MAX, i16::MIN, 0, 32]).unwrap();
    let mut s = filled(2, 2, FixedPoint::U10, 1000);
    apply(&buf, &tu, &mut s, CpuAccelerationFeatures::NONE, None).unwrap();
    assert_eq!(s.row::<u16>(0).unwrap(), &[1023, 0]);
    assert_eq!(s.row::<u16>(1).unwrap(), &[1000, 1001]);
}

#[test]
fn set_set_zero_and_clear_on_the_temporal_buffer() {
    let tu = tile_state(40, 36, TransformType::Dd, TuOrder::BlockRaster);
    let mut s = filled(40, 36, FixedPoint::S8, 9);
    let mut buf = CmdBuffer::new(TransformType::Dd);
    // Unit 256 is the first unit of the clipped 8x32 block at x = 32.
    buf.append(CmdKind::SetZero, 0, &[]).unwrap();
    buf.append(CmdKind::Set, 1, &[1, 2, 3, 4]).unwrap();
    buf.append(CmdKind::Clear, 256, &[]).unwrap();
    buf.append(CmdKind::Set, 256, &[-1, -1, -1, -1]).unwrap();
    apply(&buf, &tu, &mut s, CpuAccelerationFeatures::NONE, None).unwrap();

    assert_eq!(&s.row::<i16>(0).unwrap()[..6], &[0, 0, 1, 2, 9, 9]);
    assert_eq!(&s.row::<i16>(1).unwrap()[..6], &[0, 0, 3, 4, 9, 9]);
    assert_eq!(&s.row::<i16>(0).unwrap()[30..], &[9, 9, -1, -1, 0, 0, 0, 0, 0, 0]);
    assert_eq!(&s.row::<i16>(31).unwrap()[30..], &[9, 9, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert!(s.row::<i16>(32).unwrap().iter().all(|&v| v == 9));
}

#[test]
fn set_on_unsigned_is_rejected_before_any_write() {
    let tu = tile_state(4, 4, TransformType::Dd, TuOrder::SurfaceRaster);
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::Add, 0, &[128, 128, 128, 128]).unwrap();
    buf.append(CmdKind::Set, 1, &[1, 1, 1, 1]).unwrap();
    let mut s = filled(4, 4, FixedPoint::U8, 50);
    let before = s.clone();
    let err = apply(&buf, &tu, &mut s, CpuAccelerationFeatures::NONE, None).unwrap_err();
    assert!(matches!(err, EnhanceError::Unsupported(_)));
    assert_eq!(s, before);
}

#[test]
fn rejects_mismatched_regions_and_units() {
    let mut s = filled(8, 8, FixedPoint::S8, 0);
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::SetZero, 20, &[]).unwrap();

    let small = tile_state(4, 4, TransformType::Dd, TuOrder::SurfaceRaster);
    assert!(apply(&buf, &small, &mut s, CpuAccelerationFeatures::NONE, None).is_err());

    let full = tile_state(8, 8, TransformType::Dd, TuOrder::SurfaceRaster);
    assert!(apply(&buf, &full, &mut s, CpuAccelerationFeatures::NONE, None).is_err());

    let dds = TuState::new(TileRect::new(0, 0, 8, 8), 4, TuOrder::SurfaceRaster).unwrap();
    let empty = CmdBuffer::new(TransformType::Dd);
    assert!(apply(&empty, &dds, &mut s, CpuAccelerationFeatures::NONE, None).is_err());

    let mut packed = Surface::new(8, 8, FixedPoint::U8, Interleaving::Rgb).unwrap();
    assert!(apply(&empty, &full, &mut packed, CpuAccelerationFeatures::NONE, None).is_err());
}

#[test]
fn empty_buffer_leaves_the_destination_alone() {
    let tu = tile_state(4, 4, TransformType::Dds, TuOrder::SurfaceRaster);
    let buf = CmdBuffer::new(TransformType::Dds);
    let mut s = filled(4, 4, FixedPoint::U12, 77);
    let before = s.clone();
    apply(&buf, &tu, &mut s, ACCEL, None).unwrap();
    assert_eq!(s, before);
}

#[test]
fn highlight_marks_commands_inside_its_region() {
    let tu = tile_state(8, 4, TransformType::Dd, TuOrder::SurfaceRaster);
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::Add, 0, &[128; 4]).unwrap();
    buf.append(CmdKind::Add, 3, &[128; 4]).unwrap();
    let h = Highlight {
        marker_unsigned: 1000,
        marker_signed: -1,
        region: Some(TileRect::new(4, 0, 4, 4)),
    };
    let mut s = filled(8, 4, FixedPoint::U8, 10);
    apply(&buf, &tu, &mut s, CpuAccelerationFeatures::NONE, Some(&h)).unwrap();
    assert_eq!(s.row::<u8>(0).unwrap(), &[11, 11, 10, 10, 10, 10, 255, 255]);
}

#[test]
fn application_is_deterministic_across_destinations() {
    let tu = tile_state(16, 16, TransformType::Dds, TuOrder::SurfaceRaster);
    let mut buf = CmdBuffer::new(TransformType::Dds);
    let residuals: Vec<i16> = (0..16).map(|i| i * 37 - 300).collect();
    for t in [0, 5, 6, 15] {
        buf.append(CmdKind::Add, t, &residuals).unwrap();
    }
    buf.split(2, &tu);
    let mut a = filled(16, 16, FixedPoint::U14, 4000);
    let mut b = a.clone();
    let mut c = a.clone();
    apply(&buf, &tu, &mut a, CpuAccelerationFeatures::NONE, None).unwrap();
    apply(&buf, &tu, &mut b, CpuAccelerationFeatures::NONE, None).unwrap();
    apply(&buf, &tu, &mut c, ACCEL, None).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

fn mixed_block_buffer(tu: &TuState) -> CmdBuffer {
    let mut buf = CmdBuffer::new(TransformType::Dds);
    for t in 0..tu.tu_total() {
        let residuals: Vec<i16> = (0..16).map(|i| (t as i16 % 11) * 40 - i * 9).collect();
        if t == 128 {
            buf.append(CmdKind::Clear, t, &[]).unwrap();
            buf.append(CmdKind::Add, t, &residuals).unwrap();
        } else if t % 7 == 0 {
            buf.append(CmdKind::SetZero, t, &[]).unwrap();
        } else if t % 3 == 0 {
            buf.append(CmdKind::Set, t, &residuals).unwrap();
        } else {
            buf.append(CmdKind::Add, t, &residuals).unwrap();
        }
    }
    buf
}

#[test]
fn entry_points_applied_concurrently_match_sequential_application() {
    let tu = tile_state(64, 64, TransformType::Dds, TuOrder::BlockRaster);
    let mut buf = mixed_block_buffer(&tu);
    buf.split(4, &tu);
    let rows: Vec<u32> = buf.entry_points().iter().map(|e| e.first_row).collect();
    assert_eq!(rows, vec![0, 32]);

    let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
    for features in [CpuAccelerationFeatures::NONE, ACCEL] {
        let mut sequential = filled(64, 64, FixedPoint::S14, 700);
        let mut concurrent = sequential.clone();
        apply(&buf, &tu, &mut sequential, features, None).unwrap();
        pool.install(|| {
            apply_entry_points(&buf, &tu, &mut concurrent.region_mut(), features, None)
        })
        .unwrap();
        assert_eq!(sequential, concurrent, "{features:?}");
    }
}

#[test]
fn entry_points_split_for_another_unit_order_are_rejected() {
    let tu = tile_state(64, 64, TransformType::Dds, TuOrder::BlockRaster);
    let rows = tile_state(64, 64, TransformType::Dds, TuOrder::SurfaceRaster);
    let mut buf = mixed_block_buffer(&tu);
    buf.split(4, &rows);
    let mut s = filled(64, 64, FixedPoint::S14, 5);
    let before = s.clone();
    assert!(apply_entry_points(&buf, &tu, &mut s.region_mut(), ACCEL, None).is_err());
    assert_eq!(s, before);

    buf.split(4, &tu);
    assert!(apply_entry_points(&buf, &tu, &mut s.region_mut(), ACCEL, None).is_ok());
}

#[test]
fn block_clears_may_not_reach_past_their_entry_point() {
    let tu = tile_state(64, 64, TransformType::Dds, TuOrder::SurfaceRaster);
    let mut buf = CmdBuffer::new(TransformType::Dds);
    buf.append(CmdKind::Clear, 0, &[]).unwrap();
    for t in 0..tu.tu_total() {
        buf.append(CmdKind::Add, t, &[64; 16]).unwrap();
    }
    buf.split(4, &tu);
    assert_eq!(buf.entry_points()[1].first_row, 16);

    let mut s = filled(64, 64, FixedPoint::U8, 9);
    assert!(apply_entry_points(&buf, &tu, &mut s.region_mut(), ACCEL, None).is_err());
    assert!(apply(&buf, &tu, &mut s, ACCEL, None).is_ok());
}

#[test]
fn residual_surface_adds_through_the_signed_domain() {
    let mut residual = filled(6, 2, FixedPoint::S8, 0);
    residual.set(0, 0, 128).unwrap();
    residual.set(5, 1, -256).unwrap();
    for features in [CpuAccelerationFeatures::NONE, ACCEL] {
        let mut out = filled(6, 2, FixedPoint::U8, 40);
        let mut src = residual.clone();
        let src = src.region_mut();
        apply_residual_surface(&src, &mut out.region_mut(), features).unwrap();
        assert_eq!(out.row::<u8>(0).unwrap(), &[41, 40, 40, 40, 40, 40]);
        assert_eq!(out.row::<u8>(1).unwrap(), &[40, 40, 40, 40, 40, 38]);
    }

    let mut unsigned = filled(6, 2, FixedPoint::U8, 0);
    let mut out = filled(6, 2, FixedPoint::U8, 0);
    assert!(apply_residual_surface(&unsigned.region_mut(), &mut out.region_mut(), ACCEL).is_err());
}

#[test]
fn convert_demotes_only_touched_units() {
    let tu = tile_state(4, 2, TransformType::Dd, TuOrder::SurfaceRaster);
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::SetZero, 1, &[]).unwrap();
    let mut hp = filled(4, 2, FixedPoint::S8, 0);
    let mut out = filled(4, 2, FixedPoint::U8, 3);
    apply_convert(&buf, &tu, &hp.region_mut(), &mut out.region_mut()).unwrap();
    assert_eq!(out.row::<u8>(0).unwrap(), &[3, 3, 128, 128]);
    assert_eq!(out.row::<u8>(1).unwrap(), &[3, 3, 128, 128]);

    let mut signed_out = filled(4, 2, FixedPoint::S8, 0);
    assert!(apply_convert(&buf, &tu, &hp.region_mut(), &mut signed_out.region_mut()).is_err());
}
