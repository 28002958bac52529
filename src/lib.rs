//! Enhancement-layer decoder core.
//!
//! A frame is rebuilt from a base picture and two levels of residual coefficients:
//!
//! - Base-resolution residuals are turned into command buffers and applied to the base
//! - The corrected base is upscaled 2x (or 1x) with predicted-average correction
//! - Full-resolution residuals, optionally accumulated in a temporal buffer, are added on top
//! - An optional dithered sharpen runs last, then planes are converted to the output format
//!
//! Work is split into independent tiles and row bands that run on a rayon pool; every kernel
//! has a portable version and, where available, a SIMD one that produces identical samples.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod enhancement;
pub(crate) mod surface;

/// Residual application kernels.
pub mod apply;
/// Effects applied to decoded planes.
pub mod effects;
/// Frame decoding.
pub mod pipeline;
/// Upscaling kernels.
pub mod upscale;

pub use crate::foundation::accel::CpuAccelerationFeatures;
pub use crate::foundation::config::{
    DecoderConfig, DitherConfig, SharpenConfig, ThreadingConfig, UpscaleConfig,
};
pub use crate::foundation::core::{
    ChannelLayout, FixedPoint, Interleaving, Loq, ScalingMode, Storage, TileRect, TransformType,
};
pub use crate::foundation::error::{EnhanceError, EnhanceResult};

pub use crate::enhancement::cmdbuffer::{CmdBuffer, CmdIter, CmdKind, Command, EntryPoint};
pub use crate::enhancement::coeffs::{LayerCoeffs, TemporalCoeff, TemporalCoeffs, TileCoefficients};
pub use crate::enhancement::generate::{DecodeParallelArgs, generate_cmd_buffer};
pub use crate::enhancement::transform::{Deblock, Dequant, TemporalSignal};
pub use crate::enhancement::transform_unit::{BLOCK_SIZE, TuCoord, TuOrder, TuState};
pub use crate::surface::convert::{convert_surface, convert_value};
pub use crate::surface::dither::{DITHER_BUFFER_LEN, Dither, MAX_DITHER_STRENGTH};
pub use crate::surface::surface::{RegionRows, Sample, Surface, SurfaceData, SurfaceRegionMut};

pub use crate::apply::{
    Highlight, apply_cmd_buffer, apply_convert, apply_entry_points, apply_residual_surface,
};
pub use crate::effects::sharpen::{SharpenArgs, SharpenMode, sharpen_function, sharpen_surface};
pub use crate::pipeline::decoder::{Decoder, FrameInput, FrameOutput, OutputFormat, PlaneInput};
pub use crate::pipeline::scheduler::{FrameStats, Scheduler, build_thread_pool};
pub use crate::upscale::kernel::{Kernel, UpscaleType};
pub use crate::upscale::{UpscaleArgs, upscale};
