use super::*;

fn plane(width: u32, height: u32, fp: FixedPoint, values: &[i32]) -> Surface {
    let mut s = Surface::new(width, height, fp, Interleaving::None).unwrap();
    for (i, &v) in values.iter().enumerate() {
        s.set(i % width as usize, (i / width as usize) as u32, v)
            .unwrap();
    }
    s
}

#[test]
fn value_conversion_rules() {
    assert_eq!(convert_value(200, FixedPoint::U8, FixedPoint::U10), 800);
    assert_eq!(convert_value(801, FixedPoint::U10, FixedPoint::U8), 200);
    assert_eq!(convert_value(128, FixedPoint::U8, FixedPoint::S8), 0);
    assert_eq!(convert_value(0, FixedPoint::S10, FixedPoint::U10), 512);
    assert_eq!(convert_value(-77, FixedPoint::S8, FixedPoint::S12), -77);
}

#[test]
fn planar_conversion_changes_depth() {
    let src = plane(2, 2, FixedPoint::U8, &[0, 64, 128, 255]);
    let mut dst = Surface::new(2, 2, FixedPoint::U12, Interleaving::None).unwrap();
    convert_surface(&src, &mut dst, 0).unwrap();
    assert_eq!(dst.row::<u16>(0).unwrap(), &[0, 1024]);
    assert_eq!(dst.row::<u16>(1).unwrap(), &[2048, 4080]);
}

#[test]
fn luma_fills_both_yuyv_slots_and_chroma_its_own() {
    let mut dst = Surface::new(4, 1, FixedPoint::U8, Interleaving::Yuyv).unwrap();
    let y = plane(4, 1, FixedPoint::U8, &[1, 2, 3, 4]);
    let u = plane(2, 1, FixedPoint::U8, &[10, 11]);
    let v = plane(2, 1, FixedPoint::U8, &[20, 21]);
    convert_surface(&y, &mut dst, 0).unwrap();
    convert_surface(&u, &mut dst, 1).unwrap();
    convert_surface(&v, &mut dst, 3).unwrap();
    assert_eq!(dst.row::<u8>(0).unwrap(), &[1, 10, 2, 20, 3, 11, 4, 21]);
}

#[test]
fn mismatched_geometry_is_rejected_before_writing() {
    let src = plane(3, 1, FixedPoint::U8, &[9, 9, 9]);
    let mut dst = Surface::new(4, 1, FixedPoint::U8, Interleaving::Rgb).unwrap();
    assert!(convert_surface(&src, &mut dst, 0).is_err());
    assert!(convert_surface(&src, &mut dst, 3).is_err());
    assert!(dst.row::<u8>(0).unwrap().iter().all(|&v| v == 0));

    let packed = Surface::new(2, 1, FixedPoint::U8, Interleaving::Nv12).unwrap();
    assert!(convert_surface(&packed, &mut dst, 0).is_err());
}
