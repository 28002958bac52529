use crate::foundation::core::TileRect;
use crate::foundation::error::{EnhanceError, EnhanceResult};

/// Edge of a temporal block in pixels.
pub const BLOCK_SIZE: u32 = 32;

/// Order transform units are enumerated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TuOrder {
    /// Row by row across the whole tile.
    SurfaceRaster,
    /// 32x32 blocks in raster order, row by row inside each block.
    BlockRaster,
}

/// Result of a transform-unit coordinate lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TuCoord {
    /// Top-left pixel of the unit, in plane coordinates.
    At {
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },
    /// The index equals the unit count: iteration is complete.
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BlockGeometry {
    tu_per_block_dims: u32,
    tu_per_block: u32,
    tu_per_row_right_edge: u32,
    tu_per_col_bottom_edge: u32,
    tu_per_block_bottom_edge: u32,
    tu_per_row: u32,
    whole_blocks_per_row: u32,
    whole_blocks_per_col: u32,
}

/// Transform-unit geometry of one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TuState {
    tile: TileRect,
    tu_size: u32,
    num_across: u32,
    tu_total: u32,
    order: TuOrder,
    block: BlockGeometry,
}

impl TuState {
    /// Geometry for `tile`; fails when the tile is not a whole number of units.
    pub fn new(tile: TileRect, tu_size: u32, order: TuOrder) -> EnhanceResult<Self> {
        if tu_size == 0 || BLOCK_SIZE % tu_size != 0 {
            return Err(EnhanceError::validation(format!(
                "transform unit size {tu_size} does not divide the {BLOCK_SIZE}px block"
            )));
        }
        if tile.width % tu_size != 0 || tile.height % tu_size != 0 {
            return Err(EnhanceError::validation(format!(
                "tile {}x{} is not a multiple of the {tu_size}px transform unit",
                tile.width, tile.height
            )));
        }
        let num_across = tile.width / tu_size;
        let tu_per_block_dims = BLOCK_SIZE / tu_size;
        let tu_per_col_bottom_edge = (tile.height % BLOCK_SIZE) / tu_size;
        Ok(Self {
            tile,
            tu_size,
            num_across,
            tu_total: num_across * (tile.height / tu_size),
            order,
            block: BlockGeometry {
                tu_per_block_dims,
                tu_per_block: tu_per_block_dims * tu_per_block_dims,
                tu_per_row_right_edge: (tile.width % BLOCK_SIZE) / tu_size,
                tu_per_col_bottom_edge,
                tu_per_block_bottom_edge: tu_per_col_bottom_edge * tu_per_block_dims,
                tu_per_row: num_across * tu_per_block_dims,
                whole_blocks_per_row: tile.width / BLOCK_SIZE,
                whole_blocks_per_col: tile.height / BLOCK_SIZE,
            },
        })
    }

    /// Tile rectangle in plane coordinates.
    pub fn tile(&self) -> TileRect {
        self.tile
    }

    /// Unit edge in pixels.
    pub fn tu_size(&self) -> u32 {
        self.tu_size
    }

    /// Units in the tile.
    pub fn tu_total(&self) -> u32 {
        self.tu_total
    }

    /// Enumeration order.
    pub fn order(&self) -> TuOrder {
        self.order
    }

    /// Plane position of unit `index`.
    pub fn coords(&self, index: u32) -> EnhanceResult<TuCoord> {
        if index > self.tu_total {
            return Err(EnhanceError::validation(format!(
                "transform unit {index} is past the tile's {} units",
                self.tu_total
            )));
        }
        if index == self.tu_total {
            return Ok(TuCoord::End);
        }
        let (tx, ty) = match self.order {
            TuOrder::SurfaceRaster => (index % self.num_across, index / self.num_across),
            TuOrder::BlockRaster => self.block_raster(index),
        };
        Ok(TuCoord::At {
            x: tx * self.tu_size + self.tile.x,
            y: ty * self.tu_size + self.tile.y,
        })
    }

    /// Plane position of unit `index`, treating the end marker as an error.
    pub fn position(&self, index: u32) -> EnhanceResult<(u32, u32)> {
        match self.coords(index)? {
            TuCoord::At { x, y } => Ok((x, y)),
            TuCoord::End => Err(EnhanceError::validation(format!(
                "transform unit {index} is the end of the tile"
            ))),
        }
    }

    fn block_raster(&self, index: u32) -> (u32, u32) {
        let b = &self.block;
        let block_row = index / b.tu_per_row;
        let row_index = index % b.tu_per_row;

        let (block_col, block_tu) = if block_row >= b.whole_blocks_per_col {
            (
                row_index / b.tu_per_block_bottom_edge,
                row_index % b.tu_per_block_bottom_edge,
            )
        } else {
            (row_index / b.tu_per_block, row_index % b.tu_per_block)
        };

        let (tx, ty) = if block_col >= b.whole_blocks_per_row {
            (
                block_tu % b.tu_per_row_right_edge,
                block_tu / b.tu_per_row_right_edge,
            )
        } else {
            (block_tu % b.tu_per_block_dims, block_tu / b.tu_per_block_dims)
        };

        (
            tx + b.tu_per_block_dims * block_col,
            ty + b.tu_per_block_dims * block_row,
        )
    }

    /// `true` when unit `index` is the first unit of its 32x32 block in block-raster order.
    pub fn is_block_start(&self, index: u32) -> bool {
        if self.order != TuOrder::BlockRaster || index >= self.tu_total {
            return false;
        }
        let b = &self.block;
        let block_row = index / b.tu_per_row;
        let row_index = index % b.tu_per_row;
        let per_block = if block_row >= b.whole_blocks_per_col {
            b.tu_per_block_bottom_edge
        } else {
            b.tu_per_block
        };
        row_index % per_block == 0
    }

    /// First block-raster index past the block holding unit `index`.
    pub(crate) fn block_end(&self, index: u32) -> u32 {
        if self.order != TuOrder::BlockRaster {
            return self.tu_total;
        }
        let b = &self.block;
        let block_row = index / b.tu_per_row;
        let row_start = block_row * b.tu_per_row;
        let per_block = if block_row >= b.whole_blocks_per_col {
            b.tu_per_block_bottom_edge
        } else {
            b.tu_per_block
        };
        let block_start = row_start + ((index - row_start) / per_block) * per_block;
        (block_start + per_block)
            .min(row_start + b.tu_per_row)
            .min(self.tu_total)
    }

    /// Tile-local first pixel row of the band holding unit `index`.
    ///
    /// A band is one row of 32x32 blocks in block-raster order and one row of units in surface
    /// raster. Every unit, and every block a `Clear` touches, lies inside its band, and bands are
    /// enumerated top to bottom.
    pub fn band_row(&self, index: u32) -> u32 {
        match self.order {
            TuOrder::SurfaceRaster => (index / self.num_across.max(1)) * self.tu_size,
            TuOrder::BlockRaster => (index / self.block.tu_per_row.max(1)) * BLOCK_SIZE,
        }
    }

    /// Rectangle of the block starting at plane position `(x, y)`, clipped to the tile.
    pub fn block_rect(&self, x: u32, y: u32) -> TileRect {
        let b = &self.block;
        let right_limit = b.whole_blocks_per_row * BLOCK_SIZE;
        let bottom_limit = b.whole_blocks_per_col * BLOCK_SIZE;
        let tu_wide = if x - self.tile.x >= right_limit {
            b.tu_per_row_right_edge
        } else {
            b.tu_per_block_dims
        };
        let tu_high = if y - self.tile.y >= bottom_limit {
            b.tu_per_col_bottom_edge
        } else {
            b.tu_per_block_dims
        };
        TileRect::new(x, y, tu_wide * self.tu_size, tu_high * self.tu_size)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/enhancement/transform_unit.rs"]
mod tests;
