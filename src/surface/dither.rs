use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::foundation::math::XorShift64;

/// Entries in the noise table.
pub const DITHER_BUFFER_LEN: usize = 16384;

/// Largest supported dither amplitude.
pub const MAX_DITHER_STRENGTH: u32 = 128;

/// Pre-generated uniform noise consumed by the upscale and sharpen stages.
///
/// The window a row reads is a pure function of the seed and the row index, so rows processed in
/// any order, on any thread, receive the same noise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dither {
    strength: u32,
    seed: u64,
    buffer: Vec<i16>,
}

impl Dither {
    /// Noise table with values in `[-strength, strength]`.
    pub fn new(strength: u32, seed: u64) -> EnhanceResult<Self> {
        if strength > MAX_DITHER_STRENGTH {
            return Err(EnhanceError::validation(format!(
                "dither strength {strength} exceeds {MAX_DITHER_STRENGTH}"
            )));
        }
        let mut rng = XorShift64::new(seed);
        let buffer = (0..DITHER_BUFFER_LEN)
            .map(|_| rng.next_symmetric(strength) as i16)
            .collect();
        Ok(Self {
            strength,
            seed,
            buffer,
        })
    }

    /// Peak amplitude.
    pub fn strength(&self) -> u32 {
        self.strength
    }

    /// Seed used for both the table and row windows.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// `width` noise values for row `y`, wrapping around the table when needed.
    pub fn row_values(&self, y: u32, width: usize) -> impl Iterator<Item = i32> + '_ {
        self.span_values(y, 0, width)
    }

    /// The `width` values of row `y` starting at column `start`.
    ///
    /// Equal to skipping `start` values of [`Dither::row_values`], so a row split into spans
    /// reads the same noise as the whole row.
    pub fn span_values(
        &self,
        y: u32,
        start: usize,
        width: usize,
    ) -> impl Iterator<Item = i32> + '_ {
        let offset = (xxh3_64_with_seed(&y.to_le_bytes(), self.seed) % DITHER_BUFFER_LEN as u64)
            as usize;
        let offset = (offset + start) % DITHER_BUFFER_LEN;
        self.buffer
            .iter()
            .cycle()
            .skip(offset)
            .take(width)
            .map(|&v| i32::from(v))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/dither.rs"]
mod tests;
