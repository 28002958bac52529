use crate::foundation::core::FixedPoint;

/// Fixed-point unity for upscale kernel coefficients.
pub(crate) const KERNEL_ONE: i32 = 1 << 14;
pub(crate) const KERNEL_ROUND: i32 = 1 << 13;
pub(crate) const KERNEL_SHIFT: i32 = 14;

/// Offset applied when promoting unsigned samples into the signed domain.
pub(crate) const PROMOTE_OFFSET: i32 = 0x4000;

#[inline]
pub(crate) fn saturate_s16(v: i32) -> i32 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX))
}

#[inline]
pub(crate) fn saturate_s15(v: i32) -> i32 {
    v.clamp(-16384, 16383)
}

#[inline]
pub(crate) fn clamp_unsigned(v: i32, max: i32) -> i32 {
    v.clamp(0, max)
}

/// Unsigned sample of `fp` into the shared signed domain.
#[inline]
pub(crate) fn promote(v: i32, fp: FixedPoint) -> i32 {
    (v << fp.promotion_shift()) - PROMOTE_OFFSET
}

/// Signed-domain value back into an unsigned `fp` sample, rounding half up.
#[inline]
pub(crate) fn demote(v: i32, fp: FixedPoint) -> i32 {
    let shift = fp.promotion_shift();
    let round = 1 << (shift - 1);
    let offset = 1 << (fp.bit_depth() - 1);
    clamp_unsigned(((v + round) >> shift) + offset, fp.max_value())
}

/// Rescale an unsigned sample between bit depths.
#[inline]
pub(crate) fn rescale_unsigned(v: i32, from: FixedPoint, to: FixedPoint) -> i32 {
    let from_bits = from.bit_depth() as i32;
    let to_bits = to.bit_depth() as i32;
    if to_bits >= from_bits {
        v << (to_bits - from_bits)
    } else {
        let shift = from_bits - to_bits;
        clamp_unsigned((v + (1 << (shift - 1))) >> shift, to.max_value())
    }
}

/// Small deterministic PRNG for dither tables.
#[derive(Clone, Copy, Debug)]
pub(crate) struct XorShift64(u64);

impl XorShift64 {
    const FALLBACK_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

    pub(crate) fn new(seed: u64) -> Self {
        Self(if seed == 0 { Self::FALLBACK_SEED } else { seed })
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform value in `[-bound, bound]`.
    pub(crate) fn next_symmetric(&mut self, bound: u32) -> i32 {
        if bound == 0 {
            return 0;
        }
        let span = u64::from(bound) * 2 + 1;
        (self.next_u64() % span) as i32 - bound as i32
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
