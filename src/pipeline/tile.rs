use crate::enhancement::coeffs::TileCoefficients;
use crate::foundation::core::{ScalingMode, TileRect};
use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::surface::surface::grid_rects;

/// One tile of one plane for the duration of a frame.
///
/// `rect` is clipped to the plane. `coeffs` is `None` when the tile carries no residuals, in which
/// case generation and application are skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileState<'c> {
    /// Plane index.
    pub plane: usize,
    /// Position in the plane's raster tile order.
    pub index: usize,
    /// Tile rectangle in plane pixels.
    pub rect: TileRect,
    /// Residual input, if any.
    pub coeffs: Option<&'c TileCoefficients>,
}

/// Raster-order tiles of at most `tile_width` x `tile_height` covering a plane.
pub fn partition(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Vec<TileRect> {
    if tile_width == 0 || tile_height == 0 {
        return Vec::new();
    }
    grid_rects(width, height, tile_width, tile_height)
}

/// Base-resolution tile size matching an output tile of `width` x `height`.
pub fn loq1_tile_size(width: u32, height: u32, scaling: ScalingMode) -> (u32, u32) {
    match scaling {
        ScalingMode::Scale0D => (width, height),
        ScalingMode::Scale1D => (width / 2, height),
        ScalingMode::Scale2D => (width / 2, height / 2),
    }
}

/// Pair a plane's tiles with their coefficient inputs.
///
/// `coeffs` holds one optional entry per tile in raster order, or nothing at all for a plane
/// without residuals.
pub fn tile_states<'c>(
    plane: usize,
    rects: &[TileRect],
    coeffs: &'c [Option<TileCoefficients>],
) -> EnhanceResult<Vec<TileState<'c>>> {
    if !coeffs.is_empty() && coeffs.len() != rects.len() {
        return Err(EnhanceError::validation(format!(
            "plane {plane} has {} tiles but {} coefficient entries",
            rects.len(),
            coeffs.len()
        )));
    }
    Ok(rects
        .iter()
        .enumerate()
        .map(|(index, &rect)| TileState {
            plane,
            index,
            rect,
            coeffs: coeffs.get(index).and_then(Option::as_ref),
        })
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/tile.rs"]
mod tests;
