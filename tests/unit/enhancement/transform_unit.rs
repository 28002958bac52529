use std::collections::HashSet;

use super::*;

fn all_coords(state: &TuState) -> Vec<(u32, u32)> {
    (0..state.tu_total())
        .map(|i| state.position(i).unwrap())
        .collect()
}

#[test]
fn rejects_tiles_that_are_not_whole_units() {
    assert!(TuState::new(TileRect::new(0, 0, 6, 8), 4, TuOrder::SurfaceRaster).is_err());
    assert!(TuState::new(TileRect::new(0, 0, 8, 3), 2, TuOrder::BlockRaster).is_err());
    assert!(TuState::new(TileRect::new(0, 0, 8, 8), 3, TuOrder::BlockRaster).is_err());
}

#[test]
fn surface_raster_walks_rows_with_tile_offset() {
    let s = TuState::new(TileRect::new(16, 8, 8, 4), 2, TuOrder::SurfaceRaster).unwrap();
    assert_eq!(s.tu_total(), 8);
    assert_eq!(s.position(0).unwrap(), (16, 8));
    assert_eq!(s.position(3).unwrap(), (22, 8));
    assert_eq!(s.position(4).unwrap(), (16, 10));
}

#[test]
fn end_marker_and_out_of_range_are_distinct() {
    let s = TuState::new(TileRect::new(0, 0, 4, 4), 2, TuOrder::SurfaceRaster).unwrap();
    assert_eq!(s.coords(4).unwrap(), TuCoord::End);
    assert!(s.coords(5).is_err());
    assert!(s.position(4).is_err());
}

#[test]
fn block_raster_visits_each_block_before_the_next() {
    let s = TuState::new(TileRect::new(0, 0, 64, 32), 4, TuOrder::BlockRaster).unwrap();
    let coords = all_coords(&s);
    // 8x8 units per block: the first 64 stay in the left block.
    assert!(coords[..64].iter().all(|&(x, _)| x < 32));
    assert!(coords[64..].iter().all(|&(x, _)| x >= 32));
    assert_eq!(coords[8], (0, 4));
    assert_eq!(coords[64], (32, 0));
}

#[test]
fn block_raster_covers_partial_edge_blocks_exactly_once() {
    for (w, h, tu) in [(40, 36, 2), (72, 44, 4), (8, 8, 2), (100, 68, 4)] {
        let s = TuState::new(TileRect::new(4, 8, w, h), tu, TuOrder::BlockRaster).unwrap();
        let coords = all_coords(&s);
        let unique: HashSet<_> = coords.iter().copied().collect();
        assert_eq!(unique.len(), coords.len(), "{w}x{h}");
        assert_eq!(coords.len() as u32, (w / tu) * (h / tu));
        assert!(
            coords
                .iter()
                .all(|&(x, y)| x >= 4 && x < 4 + w && y >= 8 && y < 8 + h)
        );
    }
}

#[test]
fn block_starts_and_clipped_block_rects() {
    let s = TuState::new(TileRect::new(0, 0, 40, 36), 2, TuOrder::BlockRaster).unwrap();
    let starts: Vec<(u32, u32)> = (0..s.tu_total())
        .filter(|&i| s.is_block_start(i))
        .map(|i| s.position(i).unwrap())
        .collect();
    assert_eq!(starts, vec![(0, 0), (32, 0), (0, 32), (32, 32)]);
    assert_eq!(s.block_rect(0, 0), TileRect::new(0, 0, 32, 32));
    assert_eq!(s.block_rect(32, 0), TileRect::new(32, 0, 8, 32));
    assert_eq!(s.block_rect(0, 32), TileRect::new(0, 32, 32, 4));
    assert_eq!(s.block_rect(32, 32), TileRect::new(32, 32, 8, 4));
}

#[test]
fn surface_raster_has_no_block_starts() {
    let s = TuState::new(TileRect::new(0, 0, 32, 32), 2, TuOrder::SurfaceRaster).unwrap();
    assert!(!s.is_block_start(0));
}

#[test]
fn block_end_stops_at_clipped_block_edges() {
    let s = TuState::new(TileRect::new(0, 0, 40, 36), 2, TuOrder::BlockRaster).unwrap();
    assert_eq!(s.block_end(0), 256);
    assert_eq!(s.block_end(255), 256);
    assert_eq!(s.block_end(256), 320);
    assert_eq!(s.block_end(320), 352);
    assert_eq!(s.block_end(355), 360);

    let raster = TuState::new(TileRect::new(0, 0, 40, 36), 2, TuOrder::SurfaceRaster).unwrap();
    assert_eq!(raster.block_end(0), raster.tu_total());
}

#[test]
fn bands_follow_block_rows_and_unit_rows() {
    let s = TuState::new(TileRect::new(0, 0, 40, 36), 2, TuOrder::BlockRaster).unwrap();
    assert_eq!(s.band_row(0), 0);
    assert_eq!(s.band_row(319), 0);
    assert_eq!(s.band_row(320), 32);
    assert_eq!(s.band_row(s.tu_total() - 1), 32);
    for i in 0..s.tu_total() {
        let (_, y) = s.position(i).unwrap();
        let band = s.band_row(i);
        assert!(y >= band && y < band + 32, "unit {i} at row {y} outside band {band}");
    }

    let raster = TuState::new(TileRect::new(8, 4, 16, 8), 4, TuOrder::SurfaceRaster).unwrap();
    assert_eq!(raster.band_row(3), 0);
    assert_eq!(raster.band_row(4), 4);
    assert_eq!(raster.band_row(7), 4);
}
