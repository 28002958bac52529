use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    apply::Highlight,
    effects::sharpen::SharpenMode,
    enhancement::transform::Deblock,
    foundation::core::{ScalingMode, TransformType},
    foundation::error::{EnhanceError, EnhanceResult},
    surface::dither::MAX_DITHER_STRENGTH,
    upscale::kernel::UpscaleType,
};

/// Worker pool controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThreadingConfig {
    /// Run work units on the worker pool when `true`; sequentially otherwise.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// Upscale kernel selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpscaleConfig {
    /// Kernel family.
    pub kernel: UpscaleType,
    /// Apply predicted-average correction after the horizontal pass.
    pub predicted_average: bool,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            kernel: UpscaleType::ModifiedCubic,
            predicted_average: true,
        }
    }
}

/// Sharpen stage controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharpenConfig {
    /// Where (and whether) sharpening runs.
    pub mode: SharpenMode,
    /// Filter strength in `[0, 1]`.
    pub strength: f32,
}

/// Dither source controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DitherConfig {
    /// Peak noise amplitude, at most 128.
    pub strength: u32,
    /// PRNG seed; also keys the per-row window selection.
    pub seed: u64,
}

/// Decoder configuration.
///
/// Every field has a default, so a JSON document only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Worker pool controls.
    pub threading: ThreadingConfig,
    /// Ignore detected CPU features and use generic kernels only.
    pub force_generic_kernels: bool,
    /// Output-resolution tile width in pixels.
    pub tile_width: u32,
    /// Output-resolution tile height in pixels.
    pub tile_height: u32,
    /// Residual transform.
    pub transform: TransformType,
    /// Upscaling between base and output resolution.
    pub scaling: ScalingMode,
    /// Upscale kernel selection.
    pub upscale: UpscaleConfig,
    /// Keep a temporal residual buffer across frames.
    pub temporal_enabled: bool,
    /// Sharpen stage.
    pub sharpen: SharpenConfig,
    /// Optional dither added by the upscale and sharpen stages.
    pub dither: Option<DitherConfig>,
    /// Deblocking of base-resolution 4x4 residuals; `None` disables it.
    pub deblock: Option<Deblock>,
    /// Optional debug overlay on applied residuals.
    pub highlight: Option<Highlight>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            threading: ThreadingConfig::default(),
            force_generic_kernels: false,
            tile_width: 64,
            tile_height: 64,
            transform: TransformType::Dd,
            scaling: ScalingMode::Scale2D,
            upscale: UpscaleConfig::default(),
            temporal_enabled: false,
            sharpen: SharpenConfig::default(),
            dither: None,
            deblock: None,
            highlight: None,
        }
    }
}

impl DecoderConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(s: &str) -> EnhanceResult<Self> {
        let cfg: Self =
            serde_json::from_str(s).map_err(|e| EnhanceError::serde(format!("config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> EnhanceResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EnhanceError::Other(anyhow::Error::new(e).context(format!(
                "read decoder config '{}'",
                path.display()
            )))
        })?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_string(&self) -> EnhanceResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EnhanceError::serde(format!("config: {e}")))
    }

    /// Check value ranges and tile alignment.
    pub fn validate(&self) -> EnhanceResult<()> {
        if let Some(n) = self.threading.threads
            && n == 0
        {
            return Err(EnhanceError::validation(
                "threading 'threads' must be >= 1 when set",
            ));
        }

        // Tiles must cover whole transform units at both levels of quality.
        let align = self.transform.tu_size() * 2;
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(EnhanceError::validation("tile dimensions must be non-zero"));
        }
        if self.tile_width % align != 0 || self.tile_height % align != 0 {
            return Err(EnhanceError::validation(format!(
                "tile {}x{} must be a multiple of {align} for {:?}",
                self.tile_width, self.tile_height, self.transform
            )));
        }

        if !(0.0..=1.0).contains(&self.sharpen.strength) {
            return Err(EnhanceError::validation(format!(
                "sharpen strength {} must be within [0, 1]",
                self.sharpen.strength
            )));
        }
        if let Some(d) = &self.dither
            && d.strength > MAX_DITHER_STRENGTH
        {
            return Err(EnhanceError::validation(format!(
                "dither strength {} exceeds {MAX_DITHER_STRENGTH}",
                d.strength
            )));
        }
        if let Some(d) = &self.deblock {
            d.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
