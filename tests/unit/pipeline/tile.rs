use super::*;
use crate::enhancement::coeffs::LayerCoeffs;

#[test]
fn partition_clips_edge_tiles() {
    let rects = partition(100, 40, 64, 32);
    assert_eq!(
        rects,
        vec![
            TileRect::new(0, 0, 64, 32),
            TileRect::new(64, 0, 36, 32),
            TileRect::new(0, 32, 64, 8),
            TileRect::new(64, 32, 36, 8),
        ]
    );
    assert!(partition(8, 8, 0, 4).is_empty());
}

#[test]
fn loq1_tiles_shrink_with_the_scaling_mode() {
    assert_eq!(loq1_tile_size(64, 32, ScalingMode::Scale2D), (32, 16));
    assert_eq!(loq1_tile_size(64, 32, ScalingMode::Scale1D), (32, 32));
    assert_eq!(loq1_tile_size(64, 32, ScalingMode::Scale0D), (64, 32));
}

#[test]
fn states_pair_tiles_with_coefficients() {
    let rects = partition(16, 8, 8, 8);
    let layers = vec![LayerCoeffs::empty(); 4];
    let coeffs = vec![None, Some(TileCoefficients::new(layers))];
    let states = tile_states(1, &rects, &coeffs).unwrap();
    assert_eq!(states.len(), 2);
    assert!(states[0].coeffs.is_none());
    assert!(states[1].coeffs.is_some());
    assert_eq!((states[1].plane, states[1].index), (1, 1));
    assert_eq!(states[1].rect, TileRect::new(8, 0, 8, 8));

    let none = tile_states(0, &rects, &[]).unwrap();
    assert!(none.iter().all(|t| t.coeffs.is_none()));

    assert!(tile_states(0, &rects, &coeffs[..1]).is_err());
}
