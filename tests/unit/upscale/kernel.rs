use super::*;

#[test]
fn built_in_filters_sum_to_unity() {
    for ty in UpscaleType::ALL {
        let k = Kernel::new(ty);
        assert!(k.len() % 2 == 0 && k.len() <= MAX_KERNEL_LEN, "{ty:?}");
        for taps in [k.forward(), k.reverse()] {
            let sum: i32 = taps.iter().map(|&t| i32::from(t)).sum();
            assert_eq!(sum, KERNEL_ONE, "{ty:?}");
        }
    }
}

#[test]
fn symmetric_families_mirror_the_forward_filter() {
    let k = Kernel::new(UpscaleType::Cubic);
    assert_eq!(k.forward(), &[-1382, 14285, 3942, -461]);
    assert_eq!(k.reverse(), &[-461, 3942, 14285, -1382]);
    assert!(!k.is_prebaked());
    assert_eq!(Kernel::from(UpscaleType::Linear).reverse(), &[4096, 12288]);
}

#[test]
fn prediction_kernels_are_prebaked() {
    assert!(Kernel::new(UpscaleType::CubicPrediction).is_prebaked());
    assert!(Kernel::new(UpscaleType::Mishus).is_prebaked());
    assert!(!Kernel::new(UpscaleType::default()).is_prebaked());
    assert_eq!(UpscaleType::default(), UpscaleType::ModifiedCubic);
}

#[test]
fn custom_kernels_are_validated() {
    let k = Kernel::custom(&[4096, 12288], None).unwrap();
    assert_eq!(k.reverse(), &[12288, 4096]);
    assert!(!k.is_empty());

    let pair = Kernel::custom(&[0, 16384, 0, 0], Some(&[0, 0, 16384, 0][..])).unwrap();
    assert_eq!(pair.reverse(), &[0, 0, 16384, 0]);

    assert!(Kernel::custom(&[], None).is_err());
    assert!(Kernel::custom(&[16384, 0, 0], None).is_err());
    assert!(Kernel::custom(&[2048; 10], None).is_err());
    assert!(Kernel::custom(&[8192, 8191], None).is_err());
    assert!(Kernel::custom(&[8192, 8192], Some(&[16384, 0, 0, 0][..])).is_err());
    assert!(Kernel::custom(&[8192, 8192], Some(&[16384, 1][..])).is_err());
}

#[test]
fn upscale_type_names_are_snake_case() {
    let json = serde_json::to_string(&UpscaleType::CubicPrediction).unwrap();
    assert_eq!(json, "\"cubic_prediction\"");
    let back: UpscaleType = serde_json::from_str("\"modified_cubic\"").unwrap();
    assert_eq!(back, UpscaleType::ModifiedCubic);
}
