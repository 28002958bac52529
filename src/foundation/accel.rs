use std::sync::OnceLock;

/// SIMD capability set of the running CPU.
///
/// Detected once per process by [`CpuAccelerationFeatures::detect`] and never mutated after. Any
/// non-empty set selects the accelerated kernel tables; the empty set selects the generic ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CpuAccelerationFeatures(u32);

impl CpuAccelerationFeatures {
    /// No acceleration: generic kernels only.
    pub const NONE: Self = Self(0);
    /// x86 SSE4.1.
    pub const SSE: Self = Self(1 << 0);
    /// x86 AVX2.
    pub const AVX2: Self = Self(1 << 1);
    /// Arm NEON.
    pub const NEON: Self = Self(1 << 2);

    const ALL_BITS: u32 = 0b111;

    /// Build from raw bits, dropping unknown ones.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    /// Raw bitmask.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// `true` when every bit of `other` is present.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when no feature is present.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when the accelerated kernel tables may be used.
    pub fn is_accelerated(self) -> bool {
        !self.is_empty()
    }

    /// Features of the running CPU, detected on first call.
    pub fn detect() -> Self {
        static DETECTED: OnceLock<CpuAccelerationFeatures> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            let features = detect_uncached();
            tracing::debug!(features = ?features.names(), "detected cpu acceleration");
            features
        })
    }

    /// Detected features, or none when `force_generic` is set.
    pub fn resolve(force_generic: bool) -> Self {
        if force_generic {
            Self::NONE
        } else {
            Self::detect()
        }
    }

    /// Human-readable feature names.
    pub fn names(self) -> Vec<&'static str> {
        [(Self::SSE, "sse4.1"), (Self::AVX2, "avx2"), (Self::NEON, "neon")]
            .into_iter()
            .filter(|(f, _)| self.contains(*f))
            .map(|(_, name)| name)
            .collect()
    }
}

impl std::ops::BitOr for CpuAccelerationFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CpuAccelerationFeatures {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[allow(unused_mut)]
fn detect_uncached() -> CpuAccelerationFeatures {
    let mut features = CpuAccelerationFeatures::NONE;
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if std::arch::is_x86_feature_detected!("sse4.1") {
            features |= CpuAccelerationFeatures::SSE;
        }
        if std::arch::is_x86_feature_detected!("avx2") {
            features |= CpuAccelerationFeatures::AVX2;
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            features |= CpuAccelerationFeatures::NEON;
        }
    }
    features
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/accel.rs"]
mod tests;
