use super::*;

#[test]
fn values_stay_within_strength() {
    let d = Dither::new(3, 11).unwrap();
    let values: Vec<i32> = d.row_values(0, DITHER_BUFFER_LEN).collect();
    assert!(values.iter().all(|v| (-3..=3).contains(v)));
    assert!(values.iter().any(|&v| v != 0));
}

#[test]
fn full_strength_fits_in_table() {
    let d = Dither::new(MAX_DITHER_STRENGTH, 1).unwrap();
    let max = d.row_values(0, DITHER_BUFFER_LEN).max().unwrap();
    let min = d.row_values(0, DITHER_BUFFER_LEN).min().unwrap();
    assert!(max <= 128 && min >= -128);
    assert!(Dither::new(129, 1).is_err());
}

#[test]
fn zero_strength_is_silent() {
    let d = Dither::new(0, 5).unwrap();
    assert!(d.row_values(7, 64).all(|v| v == 0));
}

#[test]
fn row_windows_depend_only_on_seed_and_row() {
    let a = Dither::new(8, 42).unwrap();
    let b = Dither::new(8, 42).unwrap();
    let ra: Vec<i32> = a.row_values(17, 100).collect();
    let rb: Vec<i32> = b.row_values(17, 100).collect();
    assert_eq!(ra, rb);
    assert_eq!(a.row_values(3, 40_000).count(), 40_000);

    let other: Vec<i32> = a.row_values(18, 100).collect();
    assert_ne!(ra, other);
}

#[test]
fn spans_continue_the_row_window() {
    let d = Dither::new(16, 9).unwrap();
    let row: Vec<i32> = d.row_values(5, 300).collect();
    let mut joined: Vec<i32> = d.span_values(5, 0, 120).collect();
    joined.extend(d.span_values(5, 120, 180));
    assert_eq!(row, joined);
    assert_eq!(
        d.span_values(5, DITHER_BUFFER_LEN, 10).collect::<Vec<_>>(),
        row[..10]
    );
}
