use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::{FixedPoint, Interleaving, Storage, TileRect};
use crate::foundation::error::{EnhanceError, EnhanceResult};

/// Sample element type of a surface buffer.
pub trait Sample: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Storage this type implements.
    const STORAGE: Storage;

    /// Widen to `i32`.
    fn to_i32(self) -> i32;

    /// Narrow from `i32`; callers clamp to the format range first.
    fn from_i32(v: i32) -> Self;

    #[doc(hidden)]
    fn buffer(data: &SurfaceData) -> Option<&[Self]>;

    #[doc(hidden)]
    fn buffer_mut(data: &mut SurfaceData) -> Option<&mut [Self]>;

    #[doc(hidden)]
    fn rows<'r, 'a>(rows: &'r mut RegionRows<'a>) -> Option<&'r mut [&'a mut [Self]]>;

    #[doc(hidden)]
    fn rows_ref<'r, 'a>(rows: &'r RegionRows<'a>) -> Option<&'r [&'a mut [Self]]>;

    #[doc(hidden)]
    fn wrap_rows(rows: Vec<&mut [Self]>) -> RegionRows<'_>;

    #[doc(hidden)]
    fn wrap_buffer(data: Vec<Self>) -> SurfaceData;
}

macro_rules! impl_sample {
    ($ty:ty, $storage:ident) => {
        impl Sample for $ty {
            const STORAGE: Storage = Storage::$storage;

            #[inline]
            fn to_i32(self) -> i32 {
                i32::from(self)
            }

            #[inline]
            fn from_i32(v: i32) -> Self {
                v as $ty
            }

            fn buffer(data: &SurfaceData) -> Option<&[Self]> {
                match data {
                    SurfaceData::$storage(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn buffer_mut(data: &mut SurfaceData) -> Option<&mut [Self]> {
                match data {
                    SurfaceData::$storage(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }

            fn rows<'r, 'a>(rows: &'r mut RegionRows<'a>) -> Option<&'r mut [&'a mut [Self]]> {
                match rows {
                    RegionRows::$storage(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }

            fn rows_ref<'r, 'a>(rows: &'r RegionRows<'a>) -> Option<&'r [&'a mut [Self]]> {
                match rows {
                    RegionRows::$storage(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn wrap_rows(rows: Vec<&mut [Self]>) -> RegionRows<'_> {
                RegionRows::$storage(rows)
            }

            fn wrap_buffer(data: Vec<Self>) -> SurfaceData {
                SurfaceData::$storage(data)
            }
        }
    };
}

impl_sample!(u8, U8);
impl_sample!(u16, U16);
impl_sample!(i16, S16);

/// Owned sample buffer of a [`Surface`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceData {
    /// 8-bit unsigned samples.
    U8(Vec<u8>),
    /// 10 to 14-bit unsigned samples.
    U16(Vec<u16>),
    /// Signed high-precision samples.
    S16(Vec<i16>),
}

impl SurfaceData {
    fn zeroed(storage: Storage, len: usize) -> Self {
        match storage {
            Storage::U8 => SurfaceData::U8(vec![0; len]),
            Storage::U16 => SurfaceData::U16(vec![0; len]),
            Storage::S16 => SurfaceData::S16(vec![0; len]),
        }
    }
}

/// Rectangular plane of fixed-point samples.
///
/// `width` is in pixels; a row holds [`Interleaving::row_samples`] samples and rows are `stride`
/// samples apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    stride: usize,
    fp: FixedPoint,
    interleaving: Interleaving,
    data: SurfaceData,
}

impl Surface {
    /// Zero-filled surface with a tight stride.
    pub fn new(
        width: u32,
        height: u32,
        fp: FixedPoint,
        interleaving: Interleaving,
    ) -> EnhanceResult<Self> {
        Self::with_stride(width, height, interleaving.row_samples(width), fp, interleaving)
    }

    /// Zero-filled surface with an explicit stride in samples.
    pub fn with_stride(
        width: u32,
        height: u32,
        stride: usize,
        fp: FixedPoint,
        interleaving: Interleaving,
    ) -> EnhanceResult<Self> {
        let len = Self::required_len(width, height, stride, interleaving)?;
        Ok(Self {
            width,
            height,
            stride,
            fp,
            interleaving,
            data: SurfaceData::zeroed(fp.storage(), len),
        })
    }

    /// Wrap an existing sample buffer, validating stride and length against the format.
    pub fn from_samples<T: Sample>(
        width: u32,
        height: u32,
        stride: usize,
        fp: FixedPoint,
        interleaving: Interleaving,
        samples: Vec<T>,
    ) -> EnhanceResult<Self> {
        if fp.storage() != T::STORAGE {
            return Err(EnhanceError::surface(format!(
                "{fp:?} surfaces store {:?} samples, got {:?}",
                fp.storage(),
                T::STORAGE
            )));
        }
        let len = Self::required_len(width, height, stride, interleaving)?;
        if samples.len() < len {
            return Err(EnhanceError::surface(format!(
                "buffer holds {} samples, {width}x{height} stride {stride} needs {len}",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            fp,
            interleaving,
            data: T::wrap_buffer(samples),
        })
    }

    fn required_len(
        width: u32,
        height: u32,
        stride: usize,
        interleaving: Interleaving,
    ) -> EnhanceResult<usize> {
        if width == 0 || height == 0 {
            return Err(EnhanceError::surface("surface dimensions must be non-zero"));
        }
        if width % interleaving.pixel_alignment() != 0 {
            return Err(EnhanceError::surface(format!(
                "width {width} is not a whole number of {interleaving:?} groups"
            )));
        }
        let row = interleaving.row_samples(width);
        if stride < row {
            return Err(EnhanceError::surface(format!(
                "stride {stride} is smaller than row of {row} samples"
            )));
        }
        Ok(stride * (height as usize - 1) + row)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row pitch in samples.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Sample format.
    pub fn fixed_point(&self) -> FixedPoint {
        self.fp
    }

    /// Channel arrangement.
    pub fn interleaving(&self) -> Interleaving {
        self.interleaving
    }

    /// Samples per row, excluding stride padding.
    pub fn row_samples(&self) -> usize {
        self.interleaving.row_samples(self.width)
    }

    /// Full-surface rectangle.
    pub fn rect(&self) -> TileRect {
        TileRect::new(0, 0, self.width, self.height)
    }

    /// Backing buffer.
    pub fn data(&self) -> &SurfaceData {
        &self.data
    }

    /// Typed backing buffer, if `T` matches the storage.
    pub fn samples<T: Sample>(&self) -> Option<&[T]> {
        T::buffer(&self.data)
    }

    /// Mutable typed backing buffer, if `T` matches the storage.
    pub fn samples_mut<T: Sample>(&mut self) -> Option<&mut [T]> {
        T::buffer_mut(&mut self.data)
    }

    /// Row `y` without stride padding.
    pub fn row<T: Sample>(&self, y: u32) -> Option<&[T]> {
        if y >= self.height {
            return None;
        }
        let start = self.stride * y as usize;
        self.samples::<T>()?.get(start..start + self.row_samples())
    }

    /// Sample at row `y`, sample index `xs` within the row, widened to `i32`.
    pub fn get(&self, xs: usize, y: u32) -> Option<i32> {
        if y >= self.height || xs >= self.row_samples() {
            return None;
        }
        let i = self.stride * y as usize + xs;
        Some(match &self.data {
            SurfaceData::U8(v) => i32::from(v[i]),
            SurfaceData::U16(v) => i32::from(v[i]),
            SurfaceData::S16(v) => i32::from(v[i]),
        })
    }

    /// Store `value` (clamped to the format range) at row `y`, sample index `xs`.
    pub fn set(&mut self, xs: usize, y: u32, value: i32) -> EnhanceResult<()> {
        if y >= self.height || xs >= self.row_samples() {
            return Err(EnhanceError::surface(format!(
                "sample ({xs}, {y}) is outside {}x{}",
                self.row_samples(),
                self.height
            )));
        }
        let i = self.stride * y as usize + xs;
        let min = if self.fp.is_signed() {
            i32::from(i16::MIN)
        } else {
            0
        };
        let v = value.clamp(min, self.fp.max_value());
        match &mut self.data {
            SurfaceData::U8(d) => d[i] = v as u8,
            SurfaceData::U16(d) => d[i] = v as u16,
            SurfaceData::S16(d) => d[i] = v as i16,
        }
        Ok(())
    }

    /// Set every sample to zero.
    pub fn clear(&mut self) {
        match &mut self.data {
            SurfaceData::U8(v) => v.fill(0),
            SurfaceData::U16(v) => v.fill(0),
            SurfaceData::S16(v) => v.fill(0),
        }
    }

    /// Hash of the visible samples and format, ignoring stride padding.
    pub fn checksum(&self) -> u64 {
        let mut h = Xxh3::new();
        h.update(&self.width.to_le_bytes());
        h.update(&self.height.to_le_bytes());
        h.update(&[self.fp as u8, self.interleaving as u8]);
        for y in 0..self.height {
            let start = self.stride * y as usize;
            let end = start + self.row_samples();
            match &self.data {
                SurfaceData::U8(v) => h.update(&v[start..end]),
                SurfaceData::U16(v) => {
                    for s in &v[start..end] {
                        h.update(&s.to_le_bytes());
                    }
                }
                SurfaceData::S16(v) => {
                    for s in &v[start..end] {
                        h.update(&s.to_le_bytes());
                    }
                }
            }
        }
        h.digest()
    }

    /// Exclusive region covering the whole surface.
    pub fn region_mut(&mut self) -> SurfaceRegionMut<'_> {
        let (rect, fp, interleaving) = (self.rect(), self.fp, self.interleaving);
        self.split_grid_mut(rect.width, rect.height)
            .into_iter()
            .next()
            .unwrap_or_else(|| SurfaceRegionMut::empty(fp, interleaving))
    }

    /// Disjoint tile regions of at most `tile_width` x `tile_height`, in raster order.
    ///
    /// Edge tiles are clipped to the surface.
    pub fn split_tiles_mut(
        &mut self,
        tile_width: u32,
        tile_height: u32,
    ) -> EnhanceResult<Vec<SurfaceRegionMut<'_>>> {
        if tile_width == 0 || tile_height == 0 {
            return Err(EnhanceError::validation("tile dimensions must be non-zero"));
        }
        if tile_width % self.interleaving.pixel_alignment() != 0 {
            return Err(EnhanceError::validation(format!(
                "tile width {tile_width} splits {:?} sample groups",
                self.interleaving
            )));
        }
        Ok(self.split_grid_mut(tile_width, tile_height))
    }

    /// Disjoint full-width row bands of at most `band_height` rows, top to bottom.
    pub fn split_rows_mut(&mut self, band_height: u32) -> EnhanceResult<Vec<SurfaceRegionMut<'_>>> {
        if band_height == 0 {
            return Err(EnhanceError::validation("band height must be non-zero"));
        }
        let width = self.width;
        Ok(self.split_grid_mut(width, band_height))
    }

    fn split_grid_mut(&mut self, tile_width: u32, tile_height: u32) -> Vec<SurfaceRegionMut<'_>> {
        let (width, height, stride, fp, interleaving) = (
            self.width,
            self.height,
            self.stride,
            self.fp,
            self.interleaving,
        );
        let rects = grid_rects(width, height, tile_width, tile_height);
        let cols = width.div_ceil(tile_width) as usize;
        let col_samples: Vec<usize> = rects[..cols]
            .iter()
            .map(|r| interleaving.row_samples(r.width))
            .collect();

        let rows = match &mut self.data {
            SurfaceData::U8(v) => split_grid(v, stride, height, tile_height, &col_samples)
                .into_iter()
                .map(u8::wrap_rows)
                .collect::<Vec<_>>(),
            SurfaceData::U16(v) => split_grid(v, stride, height, tile_height, &col_samples)
                .into_iter()
                .map(u16::wrap_rows)
                .collect(),
            SurfaceData::S16(v) => split_grid(v, stride, height, tile_height, &col_samples)
                .into_iter()
                .map(i16::wrap_rows)
                .collect(),
        };

        rects
            .into_iter()
            .zip(rows)
            .map(|(rect, rows)| SurfaceRegionMut {
                rect,
                fp,
                interleaving,
                rows,
            })
            .collect()
    }
}

/// Tile rectangles covering `width` x `height`, raster order, clipped at the edges.
pub(crate) fn grid_rects(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Vec<TileRect> {
    let mut out = Vec::new();
    let mut y = 0;
    while y < height {
        let h = tile_height.min(height - y);
        let mut x = 0;
        while x < width {
            let w = tile_width.min(width - x);
            out.push(TileRect::new(x, y, w, h));
            x += w;
        }
        y += h;
    }
    out
}

/// Split a strided buffer into per-tile row slices without overlap.
fn split_grid<'a, T>(
    data: &'a mut [T],
    stride: usize,
    height: u32,
    tile_height: u32,
    col_samples: &[usize],
) -> Vec<Vec<&'a mut [T]>> {
    let cols = col_samples.len();
    let tile_rows = height.div_ceil(tile_height) as usize;
    let mut tiles: Vec<Vec<&'a mut [T]>> = (0..cols * tile_rows)
        .map(|_| Vec::with_capacity(tile_height as usize))
        .collect();

    for (y, mut row) in data.chunks_mut(stride).take(height as usize).enumerate() {
        let base = (y / tile_height as usize) * cols;
        for (tx, &n) in col_samples.iter().enumerate() {
            let (seg, rest) = std::mem::take(&mut row).split_at_mut(n);
            tiles[base + tx].push(seg);
            row = rest;
        }
    }
    tiles
}

/// Per-storage row slices of a region.
#[derive(Debug)]
pub enum RegionRows<'a> {
    /// 8-bit unsigned rows.
    U8(Vec<&'a mut [u8]>),
    /// 10 to 14-bit unsigned rows.
    U16(Vec<&'a mut [u16]>),
    /// Signed rows.
    S16(Vec<&'a mut [i16]>),
}

/// Exclusive, borrowed rectangle of a [`Surface`].
///
/// Regions produced by one split never overlap, so they can be handed to different workers.
#[derive(Debug)]
pub struct SurfaceRegionMut<'a> {
    rect: TileRect,
    fp: FixedPoint,
    interleaving: Interleaving,
    rows: RegionRows<'a>,
}

impl<'a> SurfaceRegionMut<'a> {
    fn empty(fp: FixedPoint, interleaving: Interleaving) -> Self {
        let rows = match fp.storage() {
            Storage::U8 => RegionRows::U8(Vec::new()),
            Storage::U16 => RegionRows::U16(Vec::new()),
            Storage::S16 => RegionRows::S16(Vec::new()),
        };
        Self {
            rect: TileRect::default(),
            fp,
            interleaving,
            rows,
        }
    }

    /// Rectangle within the parent surface, in pixels.
    pub fn rect(&self) -> TileRect {
        self.rect
    }

    /// Sample format.
    pub fn fixed_point(&self) -> FixedPoint {
        self.fp
    }

    /// Channel arrangement.
    pub fn interleaving(&self) -> Interleaving {
        self.interleaving
    }

    /// Samples per region row.
    pub fn row_samples(&self) -> usize {
        self.interleaving.row_samples(self.rect.width)
    }

    /// Typed read-only row slices, if `T` matches the storage.
    pub fn rows<T: Sample>(&self) -> Option<&[&'a mut [T]]> {
        T::rows_ref(&self.rows)
    }

    /// Typed row slices, if `T` matches the storage.
    pub fn rows_mut<T: Sample>(&mut self) -> Option<&mut [&'a mut [T]]> {
        T::rows(&mut self.rows)
    }

    /// Region-local sample read, widened to `i32`.
    pub fn get(&self, xs: usize, y: u32) -> Option<i32> {
        let y = y as usize;
        match &self.rows {
            RegionRows::U8(r) => r.get(y)?.get(xs).map(|v| i32::from(*v)),
            RegionRows::U16(r) => r.get(y)?.get(xs).map(|v| i32::from(*v)),
            RegionRows::S16(r) => r.get(y)?.get(xs).map(|v| i32::from(*v)),
        }
    }

    /// Set every sample of the region to zero.
    pub fn clear(&mut self) {
        match &mut self.rows {
            RegionRows::U8(r) => r.iter_mut().for_each(|row| row.fill(0)),
            RegionRows::U16(r) => r.iter_mut().for_each(|row| row.fill(0)),
            RegionRows::S16(r) => r.iter_mut().for_each(|row| row.fill(0)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/surface.rs"]
mod tests;
