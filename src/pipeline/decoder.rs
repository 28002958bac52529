//! Frame decode: base residuals, upscale, full-resolution residuals, sharpen, convert.
//!
//! Each phase fans out over (plane, tile) units through the [`Scheduler`] and joins before the
//! next phase reads neighbouring units' output. Units of a phase only ever hold disjoint surface
//! regions.

use std::time::Instant;

use crate::apply::{Highlight, apply_cmd_buffer, apply_entry_points, apply_residual_surface};
use crate::effects::sharpen::{DEFAULT_BAND_HEIGHT, sharpen_surface};
use crate::enhancement::cmdbuffer::CmdBuffer;
use crate::enhancement::coeffs::TileCoefficients;
use crate::enhancement::generate::{DecodeParallelArgs, generate_cmd_buffer};
use crate::enhancement::transform::Dequant;
use crate::enhancement::transform_unit::TuState;
use crate::foundation::accel::CpuAccelerationFeatures;
use crate::foundation::config::DecoderConfig;
use crate::foundation::core::{FixedPoint, Interleaving, Loq, ScalingMode};
use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::pipeline::scheduler::{FrameStats, Scheduler};
use crate::pipeline::tile::{TileState, loq1_tile_size, partition, tile_states};
use crate::surface::convert::convert_surface;
use crate::surface::dither::Dither;
use crate::surface::surface::{Surface, SurfaceRegionMut};
use crate::upscale::kernel::Kernel;
use crate::upscale::{UpscaleArgs, upscale};

/// Entry points each tile's command buffer is split into.
pub const ENTRY_POINTS_PER_TILE: usize = 4;

/// One plane of a frame: the base picture plus per-tile coefficients at both levels of quality.
#[derive(Clone, Debug)]
pub struct PlaneInput {
    /// Base-resolution plane; planar and unsigned.
    pub base: Surface,
    /// Base-resolution tiles, raster order; empty for no residuals.
    pub loq1: Vec<Option<TileCoefficients>>,
    /// Output-resolution tiles, raster order; empty for no residuals.
    pub loq0: Vec<Option<TileCoefficients>>,
    /// Dequantisation of `loq1`.
    pub loq1_dequant: Dequant,
    /// Dequantisation of `loq0`.
    pub loq0_dequant: Dequant,
}

impl PlaneInput {
    /// Plane with no residuals.
    pub fn new(base: Surface) -> Self {
        Self {
            base,
            loq1: Vec::new(),
            loq0: Vec::new(),
            loq1_dequant: Dequant::default(),
            loq0_dequant: Dequant::default(),
        }
    }

    /// Set base-resolution coefficients.
    pub fn with_loq1(mut self, tiles: Vec<Option<TileCoefficients>>, dequant: Dequant) -> Self {
        self.loq1 = tiles;
        self.loq1_dequant = dequant;
        self
    }

    /// Set output-resolution coefficients.
    pub fn with_loq0(mut self, tiles: Vec<Option<TileCoefficients>>, dequant: Dequant) -> Self {
        self.loq0 = tiles;
        self.loq0_dequant = dequant;
        self
    }
}

/// Requested layout of [`FrameOutput::surfaces`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutputFormat {
    /// Output sample format; `None` keeps each plane's base format.
    pub fixed_point: Option<FixedPoint>,
    /// `None` returns one surface per plane; anything else packs the planes, in channel order,
    /// into one interleaved surface.
    pub interleaving: Interleaving,
}

/// Everything needed to decode one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    /// Planes, luma first.
    pub planes: Vec<PlaneInput>,
    /// Output layout.
    pub output: OutputFormat,
}

/// Decoded frame.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    /// Output surfaces in the requested format.
    pub surfaces: Vec<Surface>,
    /// Counters for this frame.
    pub stats: FrameStats,
}

/// Read-only state shared by every unit of a phase.
struct StageContext<'a> {
    features: CpuAccelerationFeatures,
    highlight: Option<&'a Highlight>,
    kernel: &'a Kernel,
    predicted_average: bool,
    dither: Option<&'a Dither>,
    /// Apply a tile's entry points concurrently; only set when a pool is running the phase.
    concurrent_entries: bool,
}

impl StageContext<'_> {
    fn apply(
        &self,
        buffer: &CmdBuffer,
        tu: &TuState,
        dst: &mut SurfaceRegionMut<'_>,
    ) -> EnhanceResult<()> {
        if self.concurrent_entries {
            apply_entry_points(buffer, tu, dst, self.features, self.highlight)
        } else {
            apply_cmd_buffer(buffer, tu, dst, self.features, self.highlight)
        }
    }
}

struct ResidualUnit<'s, 'c> {
    tile: TileState<'c>,
    region: SurfaceRegionMut<'s>,
    args: DecodeParallelArgs,
}

struct OutputUnit<'s, 'c> {
    tile: TileState<'c>,
    output: SurfaceRegionMut<'s>,
    temporal: Option<SurfaceRegionMut<'s>>,
    base: &'s Surface,
    args: DecodeParallelArgs,
}

fn run_residual_unit(
    ctx: &StageContext<'_>,
    buffer: &mut CmdBuffer,
    mut unit: ResidualUnit<'_, '_>,
) -> EnhanceResult<u64> {
    let Some(coeffs) = unit.tile.coeffs else {
        return Ok(0);
    };
    let tu = TuState::new(unit.tile.rect, unit.args.transform.tu_size(), unit.args.tu_order())?;
    generate_cmd_buffer(&unit.args, &tu, coeffs, buffer)?;
    ctx.apply(buffer, &tu, &mut unit.region)?;
    Ok(buffer.len() as u64)
}

fn run_output_unit(
    ctx: &StageContext<'_>,
    buffer: &mut CmdBuffer,
    unit: OutputUnit<'_, '_>,
) -> EnhanceResult<u64> {
    let OutputUnit {
        tile,
        mut output,
        mut temporal,
        base,
        args,
    } = unit;

    let upscale_args = UpscaleArgs {
        src: base,
        kernel: ctx.kernel,
        mode: args.scaling,
        predicted_average: ctx.predicted_average,
        features: ctx.features,
        dither: ctx.dither,
    };
    upscale(&upscale_args, &mut output)?;

    let mut commands = 0;
    if let Some(coeffs) = tile.coeffs {
        let tu = TuState::new(tile.rect, args.transform.tu_size(), args.tu_order())?;
        generate_cmd_buffer(&args, &tu, coeffs, buffer)?;
        let target = match temporal.as_mut() {
            Some(t) => t,
            None => &mut output,
        };
        ctx.apply(buffer, &tu, target)?;
        commands = buffer.len() as u64;
    }
    if let Some(t) = &temporal {
        apply_residual_surface(t, &mut output, ctx.features)?;
    }
    Ok(commands)
}

fn scale_dims(width: u32, height: u32, scaling: ScalingMode) -> (u32, u32) {
    match scaling {
        ScalingMode::Scale0D => (width, height),
        ScalingMode::Scale1D => (width * 2, height),
        ScalingMode::Scale2D => (width * 2, height * 2),
    }
}

/// Enhancement decoder.
///
/// Holds the worker pool, the resolved kernels and, when temporal prediction is enabled, one
/// signed temporal buffer per plane that carries residuals from frame to frame.
#[derive(Debug)]
pub struct Decoder {
    config: DecoderConfig,
    features: CpuAccelerationFeatures,
    scheduler: Scheduler,
    kernel: Kernel,
    dither: Option<Dither>,
    temporal: Vec<Surface>,
    frames: u64,
}

impl Decoder {
    /// Validate `config`, detect CPU features and build the worker pool.
    pub fn new(config: DecoderConfig) -> EnhanceResult<Self> {
        config.validate()?;
        let features = CpuAccelerationFeatures::resolve(config.force_generic_kernels);
        let scheduler = Scheduler::new(&config.threading)?;
        let dither = config
            .dither
            .map(|d| Dither::new(d.strength, d.seed))
            .transpose()?;
        let kernel = Kernel::new(config.upscale.kernel);
        tracing::debug!(
            features = ?features.names(),
            threads = scheduler.threads(),
            kernel = ?config.upscale.kernel,
            "decoder ready"
        );
        Ok(Self {
            config,
            features,
            scheduler,
            kernel,
            dither,
            temporal: Vec::new(),
            frames: 0,
        })
    }

    /// Replace the configured upscale kernel, e.g. with a [`Kernel::custom`] one.
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Override the detected CPU features.
    pub fn with_features(mut self, features: CpuAccelerationFeatures) -> Self {
        self.features = features;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Kernel family preference in use.
    pub fn features(&self) -> CpuAccelerationFeatures {
        self.features
    }

    /// Temporal buffer of `plane` as of the last successful frame.
    pub fn temporal(&self, plane: usize) -> Option<&Surface> {
        self.temporal.get(plane)
    }

    /// Frames decoded successfully so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames
    }

    /// Drop temporal state, as at a refresh point.
    pub fn reset(&mut self) {
        self.temporal.clear();
    }

    /// Decode one frame.
    ///
    /// All-or-nothing: if any unit fails the frame returns the error and the temporal buffers keep
    /// their state from before the frame.
    #[tracing::instrument(skip_all, fields(frame = self.frames, planes = input.planes.len()))]
    pub fn decode_frame(&mut self, input: &FrameInput) -> EnhanceResult<FrameOutput> {
        match self.decode_inner(input) {
            Ok((surfaces, temporal, stats)) => {
                if self.config.temporal_enabled {
                    self.temporal = temporal;
                }
                self.frames += 1;
                tracing::debug!(
                    units = stats.units,
                    commands = stats.commands,
                    "frame decoded"
                );
                Ok(FrameOutput { surfaces, stats })
            }
            Err(err) => {
                tracing::warn!(error = %err, "frame failed, temporal state kept");
                Err(err)
            }
        }
    }

    fn validate_input(&self, input: &FrameInput) -> EnhanceResult<()> {
        if input.planes.is_empty() {
            return Err(EnhanceError::validation("frame has no planes"));
        }
        for (i, p) in input.planes.iter().enumerate() {
            if p.base.interleaving() != Interleaving::None || p.base.fixed_point().is_signed() {
                return Err(EnhanceError::surface(format!(
                    "plane {i} base must be planar and unsigned, got {:?} {:?}",
                    p.base.interleaving(),
                    p.base.fixed_point()
                )));
            }
        }
        let il = input.output.interleaving;
        if il != Interleaving::None && il.channels().count() != input.planes.len() {
            return Err(EnhanceError::validation(format!(
                "{il:?} output needs {} planes, frame has {}",
                il.channels().count(),
                input.planes.len()
            )));
        }
        Ok(())
    }

    fn working_temporal(&self, outputs: &[Surface]) -> EnhanceResult<Vec<Surface>> {
        if !self.config.temporal_enabled {
            return Ok(Vec::new());
        }
        outputs
            .iter()
            .enumerate()
            .map(|(i, out)| {
                let fp = out.fixed_point().to_signed();
                match self.temporal.get(i) {
                    Some(t)
                        if t.width() == out.width()
                            && t.height() == out.height()
                            && t.fixed_point() == fp =>
                    {
                        Ok(t.clone())
                    }
                    _ => Surface::new(out.width(), out.height(), fp, Interleaving::None),
                }
            })
            .collect()
    }

    fn decode_inner(
        &self,
        input: &FrameInput,
    ) -> EnhanceResult<(Vec<Surface>, Vec<Surface>, FrameStats)> {
        self.validate_input(input)?;
        let cfg = &self.config;
        let scaling = cfg.scaling;
        let transform = cfg.transform;
        let (tw, th) = (cfg.tile_width, cfg.tile_height);
        let (lw, lh) = loq1_tile_size(tw, th, scaling);
        let ctx = StageContext {
            features: self.features,
            highlight: cfg.highlight.as_ref(),
            kernel: &self.kernel,
            predicted_average: cfg.upscale.predicted_average,
            dither: self.dither.as_ref(),
            concurrent_entries: self.scheduler.pool().is_some(),
        };
        let pass_args = |plane_index, loq, dequant| DecodeParallelArgs {
            plane_index,
            loq,
            transform,
            scaling,
            dequant,
            temporal_enabled: cfg.temporal_enabled && loq == Loq::Loq0,
            entry_points: ENTRY_POINTS_PER_TILE,
            deblock: cfg.deblock,
        };
        let mut stats = FrameStats::default();

        // Phase A: base-resolution residuals onto a copy of the base.
        let started = Instant::now();
        let mut corrected: Vec<Surface> = input.planes.iter().map(|p| p.base.clone()).collect();
        let mut units = Vec::new();
        for (plane, (surface, p)) in corrected.iter_mut().zip(&input.planes).enumerate() {
            let rects = partition(surface.width(), surface.height(), lw, lh);
            let tiles = tile_states(plane, &rects, &p.loq1)?;
            let args = pass_args(plane, Loq::Loq1, p.loq1_dequant);
            let regions = surface.split_tiles_mut(lw, lh)?;
            units.extend(
                tiles
                    .into_iter()
                    .zip(regions)
                    .filter(|(tile, _)| tile.coeffs.is_some())
                    .map(|(tile, region)| ResidualUnit { tile, region, args }),
            );
        }
        stats.units += units.len() as u64;
        let counts = self.scheduler.run(
            "loq1",
            units,
            || CmdBuffer::new(transform),
            |buffer, unit| run_residual_unit(&ctx, buffer, unit),
        )?;
        stats.commands += counts.iter().sum::<u64>();
        stats.loq1_time = started.elapsed();

        // Phase B: upscale each output tile, then full-resolution and temporal residuals.
        let started = Instant::now();
        let mut outputs = corrected
            .iter()
            .map(|b| {
                let (w, h) = scale_dims(b.width(), b.height(), scaling);
                Surface::new(w, h, b.fixed_point(), Interleaving::None)
            })
            .collect::<EnhanceResult<Vec<_>>>()?;
        let mut temporal = self.working_temporal(&outputs)?;
        let mut temporal_planes = temporal.iter_mut();
        let mut units = Vec::new();
        for (plane, (out, p)) in outputs.iter_mut().zip(&input.planes).enumerate() {
            let rects = partition(out.width(), out.height(), tw, th);
            let tiles = tile_states(plane, &rects, &p.loq0)?;
            let args = pass_args(plane, Loq::Loq0, p.loq0_dequant);
            let regions = out.split_tiles_mut(tw, th)?;
            let temporal_regions: Vec<Option<SurfaceRegionMut<'_>>> = match temporal_planes.next() {
                Some(t) => t.split_tiles_mut(tw, th)?.into_iter().map(Some).collect(),
                None => rects.iter().map(|_| None).collect(),
            };
            let base = &corrected[plane];
            units.extend(tiles.into_iter().zip(regions).zip(temporal_regions).map(
                |((tile, output), temporal)| OutputUnit {
                    tile,
                    output,
                    temporal,
                    base,
                    args,
                },
            ));
        }
        stats.units += units.len() as u64;
        let counts = self.scheduler.run(
            "loq0",
            units,
            || CmdBuffer::new(transform),
            |buffer, unit| run_output_unit(&ctx, buffer, unit),
        )?;
        stats.commands += counts.iter().sum::<u64>();
        stats.loq0_time = started.elapsed();

        // Phase C: sharpen the full planes in row bands.
        let started = Instant::now();
        if cfg.sharpen.mode.is_enabled() && cfg.sharpen.strength > 0.0 {
            for out in &mut outputs {
                sharpen_surface(
                    out,
                    cfg.sharpen.strength,
                    self.dither.as_ref(),
                    DEFAULT_BAND_HEIGHT,
                    self.scheduler.pool(),
                )?;
                stats.units += u64::from(out.height().div_ceil(DEFAULT_BAND_HEIGHT));
            }
        }
        stats.sharpen_time = started.elapsed();

        // Phase D: requested output format.
        let started = Instant::now();
        let surfaces = convert_output(outputs, input.output)?;
        stats.convert_time = started.elapsed();

        Ok((surfaces, temporal, stats))
    }
}

fn convert_output(planes: Vec<Surface>, format: OutputFormat) -> EnhanceResult<Vec<Surface>> {
    if format.interleaving == Interleaving::None {
        return planes
            .into_iter()
            .map(|p| match format.fixed_point {
                Some(fp) if fp != p.fixed_point() => {
                    let mut dst = Surface::new(p.width(), p.height(), fp, Interleaving::None)?;
                    convert_surface(&p, &mut dst, 0)?;
                    Ok(dst)
                }
                _ => Ok(p),
            })
            .collect();
    }

    let first = planes
        .first()
        .ok_or_else(|| EnhanceError::validation("frame has no planes"))?;
    let fp = format.fixed_point.unwrap_or(first.fixed_point());
    let mut packed = Surface::new(first.width(), first.height(), fp, format.interleaving)?;
    for (plane, channel) in planes.iter().zip(format.interleaving.channels()) {
        convert_surface(plane, &mut packed, channel)?;
    }
    Ok(vec![packed])
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/decoder.rs"]
mod tests;
