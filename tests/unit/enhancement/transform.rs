use super::*;

fn residuals(t: InverseTransform, coeffs: &[i16]) -> Residuals {
    let mut out = [0; MAX_LAYERS];
    t.dequant_inverse(&Dequant::default(), TemporalSignal::Inter, coeffs, &mut out);
    out
}

#[test]
fn dequant_adds_offset_in_coefficient_sign() {
    let dq = Dequant::uniform(10, 3);
    assert_eq!(dq.apply(TemporalSignal::Inter, 0, 2), 23);
    assert_eq!(dq.apply(TemporalSignal::Inter, 0, -2), -23);
    assert_eq!(dq.apply(TemporalSignal::Intra, 5, 0), 0);
}

#[test]
fn dequant_rows_are_selected_by_signal() {
    let mut dq = Dequant::uniform(1, 0);
    dq.step_width[TemporalSignal::Intra as usize][1] = 4;
    assert_eq!(dq.apply(TemporalSignal::Inter, 1, 3), 3);
    assert_eq!(dq.apply(TemporalSignal::Intra, 1, 3), 12);
}

#[test]
fn dd_2d_average_only_is_flat() {
    let r = residuals(InverseTransform::Dd2D, &[5, 0, 0, 0]);
    assert_eq!(&r[..4], &[5, 5, 5, 5]);
}

#[test]
fn dd_2d_matches_hadamard() {
    let r = residuals(InverseTransform::Dd2D, &[1, 2, 3, 4]);
    assert_eq!(&r[..4], &[10, -2, -4, 0]);
}

#[test]
fn dd_1d_formula() {
    let r = residuals(InverseTransform::Dd1D, &[1, 2, 3, 4]);
    assert_eq!(&r[..4], &[6, -4, 3, 5]);
}

#[test]
fn transform_output_saturates() {
    let r = residuals(InverseTransform::Dd2D, &[i16::MAX, i16::MAX, i16::MAX, i16::MAX]);
    assert_eq!(r[0], i16::MAX);
    let r = residuals(InverseTransform::Dd2D, &[i16::MIN, i16::MIN, i16::MIN, i16::MIN]);
    assert_eq!(r[0], i16::MIN);
}

#[test]
fn dds_2d_average_only_is_flat() {
    let mut c = [0i16; 16];
    c[0] = 3;
    let r = residuals(InverseTransform::Dds2D, &c);
    assert!(r.iter().all(|&v| v == 3));
}

#[test]
fn dds_2d_horizontal_average_splits_left_and_right() {
    let mut c = [0i16; 16];
    c[1] = 1;
    let r = residuals(InverseTransform::Dds2D, &c);
    let expected = [1, 1, -1, -1, 1, 1, -1, -1, 1, 1, -1, -1, 1, 1, -1, -1];
    assert_eq!(r, expected);
}

#[test]
fn dds_1d_average_lands_on_even_rows() {
    let mut c = [0i16; 16];
    c[0] = 1;
    let r = residuals(InverseTransform::Dds1D, &c);
    let expected = [1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0];
    assert_eq!(r, expected);
}

#[test]
fn selection_by_scaling_mode() {
    assert_eq!(
        InverseTransform::select(TransformType::Dd, ScalingMode::Scale1D),
        InverseTransform::Dd1D
    );
    assert_eq!(
        InverseTransform::select(TransformType::Dds, ScalingMode::Scale0D),
        InverseTransform::Dds2D
    );
}

#[test]
fn deblock_weights_round_toward_negative_infinity() {
    let d = Deblock { corner: 5, side: 16 };
    let mut r: Residuals = [-3; MAX_LAYERS];
    d.apply(&mut r);
    assert_eq!(r[0], -1);
    assert_eq!(r[15], -1);
    assert_eq!(r[1], -3);
    assert_eq!(r[5], -3);

    let mut r: Residuals = [100; MAX_LAYERS];
    Deblock::default().apply(&mut r);
    assert!(r.iter().all(|&v| v == 100));
}

#[test]
fn signalled_deblock_reductions() {
    assert_eq!(
        Deblock::from_signalled(4, 0).unwrap(),
        Deblock { corner: 12, side: 16 }
    );
    assert!(Deblock { corner: 17, side: 0 }.validate().is_err());
}
