use serde::{Deserialize, Serialize};

/// Fixed-point sample format.
///
/// Unsigned formats hold pixel values at the named bit depth. Signed formats are the 16-bit
/// high-precision counterparts used for residuals and the temporal buffer; all signed formats
/// share the same numeric range and differ only in how many fractional bits they carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedPoint {
    /// 8-bit unsigned.
    U8,
    /// 10-bit unsigned.
    U10,
    /// 12-bit unsigned.
    U12,
    /// 14-bit unsigned.
    U14,
    /// Signed high-precision counterpart of `U8` (7 fractional bits).
    S8,
    /// Signed high-precision counterpart of `U10` (5 fractional bits).
    S10,
    /// Signed high-precision counterpart of `U12` (3 fractional bits).
    S12,
    /// Signed high-precision counterpart of `U14` (1 fractional bit).
    S14,
}

impl FixedPoint {
    /// Every format, unsigned first.
    pub const ALL: [FixedPoint; 8] = [
        FixedPoint::U8,
        FixedPoint::U10,
        FixedPoint::U12,
        FixedPoint::U14,
        FixedPoint::S8,
        FixedPoint::S10,
        FixedPoint::S12,
        FixedPoint::S14,
    ];

    /// `true` for the signed high-precision formats.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            FixedPoint::S8 | FixedPoint::S10 | FixedPoint::S12 | FixedPoint::S14
        )
    }

    /// Nominal bit depth (8, 10, 12 or 14).
    pub fn bit_depth(self) -> u32 {
        match self {
            FixedPoint::U8 | FixedPoint::S8 => 8,
            FixedPoint::U10 | FixedPoint::S10 => 10,
            FixedPoint::U12 | FixedPoint::S12 => 12,
            FixedPoint::U14 | FixedPoint::S14 => 14,
        }
    }

    /// Unsigned format with the same bit depth.
    pub fn to_unsigned(self) -> FixedPoint {
        match self {
            FixedPoint::S8 => FixedPoint::U8,
            FixedPoint::S10 => FixedPoint::U10,
            FixedPoint::S12 => FixedPoint::U12,
            FixedPoint::S14 => FixedPoint::U14,
            fp => fp,
        }
    }

    /// Signed format with the same bit depth.
    pub fn to_signed(self) -> FixedPoint {
        match self {
            FixedPoint::U8 => FixedPoint::S8,
            FixedPoint::U10 => FixedPoint::S10,
            FixedPoint::U12 => FixedPoint::S12,
            FixedPoint::U14 => FixedPoint::S14,
            fp => fp,
        }
    }

    /// Largest representable sample value.
    pub fn max_value(self) -> i32 {
        if self.is_signed() {
            i32::from(i16::MAX)
        } else {
            (1 << self.bit_depth()) - 1
        }
    }

    /// In-memory sample representation.
    pub fn storage(self) -> Storage {
        match self {
            FixedPoint::U8 => Storage::U8,
            FixedPoint::U10 | FixedPoint::U12 | FixedPoint::U14 => Storage::U16,
            _ => Storage::S16,
        }
    }

    /// Shift between the unsigned format and its signed high-precision counterpart.
    pub(crate) fn promotion_shift(self) -> u32 {
        15 - self.bit_depth()
    }
}

/// Sample storage type backing a [`FixedPoint`] format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Storage {
    /// `u8` samples.
    U8,
    /// `u16` samples.
    U16,
    /// `i16` samples.
    S16,
}

/// Arrangement of channel samples within a surface row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interleaving {
    /// Planar: one channel per surface.
    #[default]
    None,
    /// Packed 4:2:2 luma/chroma, `Y0 U Y1 V`.
    Yuyv,
    /// Interleaved chroma pair, `U V`.
    Nv12,
    /// Packed 4:2:2 chroma/luma, `U Y0 V Y1`.
    Uyvy,
    /// Packed `R G B`.
    Rgb,
    /// Packed `R G B A`.
    Rgba,
}

/// Per-interleaving channel description.
///
/// Channel `c` samples sit at `c + k * skip[c]` within a row. Channels whose `map` entry points
/// elsewhere alias an earlier channel (the second luma sample of a 4:2:2 group).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelLayout {
    /// Number of sample slots in a group.
    pub count: usize,
    /// Distance between consecutive samples of each channel.
    pub skip: [usize; 4],
    /// Distinct channel each slot belongs to.
    pub map: [usize; 4],
    /// Log2 of the pixels covered by one group.
    pub group_shift: u32,
}

impl Interleaving {
    /// Channel layout for this interleaving.
    pub fn layout(self) -> ChannelLayout {
        let (count, skip, map, group_shift) = match self {
            Interleaving::None => (1, [1, 0, 0, 0], [0, 0, 0, 0], 0),
            Interleaving::Yuyv => (4, [2, 4, 2, 4], [0, 1, 0, 3], 1),
            Interleaving::Nv12 => (2, [2, 2, 0, 0], [0, 1, 0, 0], 0),
            Interleaving::Uyvy => (4, [4, 2, 4, 2], [0, 1, 2, 1], 1),
            Interleaving::Rgb => (3, [3, 3, 3, 0], [0, 1, 2, 0], 0),
            Interleaving::Rgba => (4, [4, 4, 4, 4], [0, 1, 2, 3], 0),
        };
        ChannelLayout {
            count,
            skip,
            map,
            group_shift,
        }
    }

    /// Samples in one row of `width` pixels.
    pub fn row_samples(self, width: u32) -> usize {
        let l = self.layout();
        ((width as usize) >> l.group_shift) * l.count
    }

    /// Pixel alignment required of region origins and widths.
    pub fn pixel_alignment(self) -> u32 {
        1 << self.layout().group_shift
    }

    /// Indices of the distinct channels.
    pub fn channels(self) -> impl Iterator<Item = usize> {
        let l = self.layout();
        (0..l.count).filter(move |&c| l.map[c] == c)
    }
}

/// Residual transform family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    /// 2x2 directional decomposition, four layers.
    #[default]
    Dd,
    /// 4x4 directional decomposition, sixteen layers.
    Dds,
}

impl TransformType {
    /// Coefficient layers carried per transform unit.
    pub fn layer_count(self) -> usize {
        match self {
            TransformType::Dd => 4,
            TransformType::Dds => 16,
        }
    }

    /// Transform unit edge in pixels.
    pub fn tu_size(self) -> u32 {
        match self {
            TransformType::Dd => 2,
            TransformType::Dds => 4,
        }
    }
}

/// Upscaling dimensionality between the two levels of quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalingMode {
    /// No upscaling.
    #[serde(rename = "0d")]
    Scale0D,
    /// Horizontal only.
    #[serde(rename = "1d")]
    Scale1D,
    /// Horizontal and vertical.
    #[default]
    #[serde(rename = "2d")]
    Scale2D,
}

/// Level of quality a residual pass applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Loq {
    /// Full output resolution.
    Loq0,
    /// Base resolution.
    Loq1,
}

/// Axis-aligned rectangle in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl TileRect {
    /// Build a rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> u32 {
        self.y + self.height
    }

    /// Intersection with `other`, if non-empty.
    pub fn intersect(self, other: TileRect) -> Option<TileRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| TileRect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
