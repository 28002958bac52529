use crate::enhancement::cmdbuffer::{CmdBuffer, CmdKind};
use crate::enhancement::coeffs::{TemporalCoeff, TileCoefficients};
use crate::enhancement::transform::{
    Deblock, Dequant, InverseTransform, MAX_LAYERS, Residuals, TemporalSignal,
};
use crate::enhancement::transform_unit::{TuOrder, TuState};
use crate::foundation::core::{Loq, ScalingMode, TransformType};
use crate::foundation::error::{EnhanceError, EnhanceResult};

/// Per-plane, per-pass decode parameters shared by every tile of the pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeParallelArgs {
    /// Plane being decoded.
    pub plane_index: usize,
    /// Level of quality the pass writes.
    pub loq: Loq,
    /// Residual transform.
    pub transform: TransformType,
    /// Upscaling mode; selects the 1D or 2D inverse at LOQ0.
    pub scaling: ScalingMode,
    /// Dequantisation for this plane and pass.
    pub dequant: Dequant,
    /// Emit `Set`/`SetZero`/`Clear` from temporal symbols; otherwise every unit is `Inter`.
    pub temporal_enabled: bool,
    /// Entry points each buffer is split into.
    pub entry_points: usize,
    /// Border weights for 4x4 residuals at LOQ1; ignored for other passes.
    pub deblock: Option<Deblock>,
}

impl DecodeParallelArgs {
    /// Unit enumeration order used by this pass.
    pub fn tu_order(&self) -> TuOrder {
        match self.loq {
            Loq::Loq0 => TuOrder::BlockRaster,
            Loq::Loq1 => TuOrder::SurfaceRaster,
        }
    }

    fn inverse(&self) -> InverseTransform {
        let scaling = match self.loq {
            Loq::Loq0 => self.scaling,
            Loq::Loq1 => ScalingMode::Scale2D,
        };
        InverseTransform::select(self.transform, scaling)
    }

    fn active_deblock(&self) -> Option<Deblock> {
        self.deblock
            .filter(|_| self.loq == Loq::Loq1 && self.transform == TransformType::Dds)
    }
}

/// Turn one tile's coefficients into commands, replacing the contents of `out`.
///
/// Units are visited in `tu`'s order. Zero spans shared by every layer (and by the temporal
/// symbols, unless they are `Intra`) are jumped over. Malformed coefficients are rejected before
/// anything is written.
#[tracing::instrument(skip_all, fields(plane = args.plane_index, loq = ?args.loq, tile = ?tu.tile()))]
pub fn generate_cmd_buffer(
    args: &DecodeParallelArgs,
    tu: &TuState,
    coeffs: &TileCoefficients,
    out: &mut CmdBuffer,
) -> EnhanceResult<()> {
    let layer_count = args.transform.layer_count();
    if tu.tu_size() != args.transform.tu_size() {
        return Err(EnhanceError::validation(format!(
            "transform unit size {} does not match {:?}",
            tu.tu_size(),
            args.transform
        )));
    }
    let total = tu.tu_total();
    coeffs.validate(layer_count, total)?;

    if out.transform() != args.transform {
        *out = CmdBuffer::new(args.transform);
    } else {
        out.reset();
    }

    let inverse = args.inverse();
    let block_order = tu.order() == TuOrder::BlockRaster;
    let deblock = args.active_deblock();
    let temporal = coeffs.temporal.as_ref().filter(|_| args.temporal_enabled);

    let mut values = [0i16; MAX_LAYERS];
    let mut layer_run = [0u32; MAX_LAYERS];
    let mut indices = [0usize; MAX_LAYERS];
    let mut residuals: Residuals = [0; MAX_LAYERS];

    let mut temporal_coeff = TemporalCoeff::Inter;
    let mut temporal_run = 0u32;
    let mut temporal_index = 0usize;
    let mut cleared_until = 0u32;

    let mut tu_index = 0u32;
    while tu_index < total {
        let mut minimum_run = u32::MAX;

        for (i, layer) in coeffs.layers.iter().enumerate() {
            if layer_run[i] > 0 {
                layer_run[i] -= 1;
                values[i] = 0;
            } else if indices[i] < layer.values.len() {
                values[i] = layer.values[indices[i]];
                layer_run[i] = layer.runs[indices[i]];
                indices[i] += 1;
            } else {
                // Exhausted layers run to the end of the tile.
                values[i] = 0;
                layer_run[i] = total;
            }
            minimum_run = minimum_run.min(layer_run[i]);
        }

        match temporal {
            _ if temporal_run > 0 => temporal_run -= 1,
            Some(t) if temporal_index < t.values.len() => {
                temporal_coeff = t.values[temporal_index];
                temporal_run = t.runs[temporal_index];
                temporal_index += 1;
            }
            _ => {
                temporal_coeff = TemporalCoeff::Inter;
                temporal_run = total;
            }
        }
        // Block clears begin on a block start; before one is reached the symbol acts as Intra.
        let symbol = match temporal_coeff {
            TemporalCoeff::IntraBlock
                if !block_order || (tu_index >= cleared_until && !tu.is_block_start(tu_index)) =>
            {
                TemporalCoeff::Intra
            }
            other => other,
        };

        // Intra units must be written even when zero; block-cleared ones need not be, but a skip
        // must not cross into the next block, whose own clear is still pending.
        match symbol {
            TemporalCoeff::Intra => minimum_run = 0,
            TemporalCoeff::IntraBlock => {
                let to_block_end = tu.block_end(tu_index) - tu_index - 1;
                minimum_run = minimum_run.min(temporal_run).min(to_block_end);
            }
            TemporalCoeff::Inter => minimum_run = minimum_run.min(temporal_run),
        }

        let signal = match symbol {
            TemporalCoeff::Inter => TemporalSignal::Inter,
            _ => TemporalSignal::Intra,
        };
        inverse.dequant_inverse(&args.dequant, signal, &values[..layer_count], &mut residuals);
        if let Some(d) = &deblock {
            d.apply(&mut residuals);
        }
        let res = &residuals[..layer_count];
        let is_zero = res.iter().all(|&v| v == 0);

        match symbol {
            TemporalCoeff::Inter => {
                if !is_zero {
                    out.append(CmdKind::Add, tu_index, res)?;
                }
            }
            TemporalCoeff::Intra | TemporalCoeff::IntraBlock => {
                if symbol == TemporalCoeff::IntraBlock && tu.is_block_start(tu_index) {
                    out.append(CmdKind::Clear, tu_index, &[])?;
                    cleared_until = tu.block_end(tu_index);
                }
                if !is_zero {
                    out.append(CmdKind::Set, tu_index, res)?;
                } else if tu_index >= cleared_until {
                    out.append(CmdKind::SetZero, tu_index, &[])?;
                }
            }
        }

        tu_index = tu_index.saturating_add(1).saturating_add(minimum_run);
        for run in layer_run.iter_mut().take(layer_count) {
            *run -= minimum_run;
        }
        temporal_run -= minimum_run;
    }

    out.split(args.entry_points, tu);
    tracing::trace!(commands = out.len(), "generated command buffer");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/enhancement/generate.rs"]
mod tests;
