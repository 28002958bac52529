use super::*;

#[test]
fn signed_unsigned_counterparts_round_trip() {
    for fp in FixedPoint::ALL {
        assert_eq!(fp.to_signed().to_unsigned(), fp.to_unsigned());
        assert_eq!(fp.to_signed().bit_depth(), fp.bit_depth());
        assert!(fp.to_signed().is_signed());
        assert!(!fp.to_unsigned().is_signed());
    }
}

#[test]
fn storage_and_range_follow_bit_depth() {
    assert_eq!(FixedPoint::U8.storage(), Storage::U8);
    assert_eq!(FixedPoint::U12.storage(), Storage::U16);
    assert_eq!(FixedPoint::S14.storage(), Storage::S16);
    assert_eq!(FixedPoint::U10.max_value(), 1023);
    assert_eq!(FixedPoint::S10.max_value(), 32767);
    assert_eq!(FixedPoint::U8.promotion_shift(), 7);
    assert_eq!(FixedPoint::U14.promotion_shift(), 1);
}

#[test]
fn interleaved_rows_count_samples_per_group() {
    assert_eq!(Interleaving::None.row_samples(10), 10);
    assert_eq!(Interleaving::Yuyv.row_samples(10), 20);
    assert_eq!(Interleaving::Nv12.row_samples(10), 20);
    assert_eq!(Interleaving::Rgb.row_samples(10), 30);
    assert_eq!(Interleaving::Rgba.row_samples(10), 40);
    assert_eq!(Interleaving::Uyvy.pixel_alignment(), 2);
}

#[test]
fn distinct_channels_skip_aliased_luma() {
    let yuyv: Vec<usize> = Interleaving::Yuyv.channels().collect();
    assert_eq!(yuyv, vec![0, 1, 3]);
    let rgb: Vec<usize> = Interleaving::Rgb.channels().collect();
    assert_eq!(rgb, vec![0, 1, 2]);
    let planar: Vec<usize> = Interleaving::None.channels().collect();
    assert_eq!(planar, vec![0]);
}

#[test]
fn transform_geometry() {
    assert_eq!(TransformType::Dd.layer_count(), 4);
    assert_eq!(TransformType::Dds.layer_count(), 16);
    assert_eq!(TransformType::Dd.tu_size(), 2);
    assert_eq!(TransformType::Dds.tu_size(), 4);
}

#[test]
fn rect_intersection() {
    let a = TileRect::new(0, 0, 10, 10);
    let b = TileRect::new(8, 4, 10, 2);
    assert_eq!(a.intersect(b), Some(TileRect::new(8, 4, 2, 2)));
    assert_eq!(a.intersect(TileRect::new(10, 0, 4, 4)), None);
}
