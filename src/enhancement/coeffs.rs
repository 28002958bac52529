use crate::foundation::error::{EnhanceError, EnhanceResult};

/// Run-length coded coefficients of one transform layer.
///
/// Entry `i` places `values[i]` on the next transform unit and is followed by `runs[i]` units
/// of zero. Units after the last entry's run are zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerCoeffs {
    /// Coefficient values.
    pub values: Vec<i16>,
    /// Zero units following each value.
    pub runs: Vec<u32>,
}

impl LayerCoeffs {
    /// Layer from parallel value/run arrays.
    pub fn new(values: Vec<i16>, runs: Vec<u32>) -> Self {
        Self { values, runs }
    }

    /// Layer with every unit zero.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Encode a dense per-unit layer.
    pub fn from_dense(dense: &[i16]) -> Self {
        let mut out = Self::default();
        let first_nonzero = dense.iter().position(|&v| v != 0);
        let Some(start) = first_nonzero else {
            return out;
        };
        if start > 0 {
            out.values.push(0);
            out.runs.push(start as u32 - 1);
        }
        for &v in &dense[start..] {
            if v == 0 {
                if let Some(run) = out.runs.last_mut() {
                    *run += 1;
                }
            } else {
                out.values.push(v);
                out.runs.push(0);
            }
        }
        out
    }

    pub(crate) fn validate(&self, what: &str, tu_total: u32) -> EnhanceResult<()> {
        validate_runs(what, self.values.len(), &self.runs, tu_total)
    }
}

/// Temporal prediction symbol of a transform unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TemporalCoeff {
    /// Add the residual to the temporal buffer.
    #[default]
    Inter,
    /// Replace the temporal buffer with the residual.
    Intra,
    /// Clear the unit's 32x32 block, then behave as `Intra`.
    IntraBlock,
}

/// Run-length coded temporal symbols.
///
/// Entry `i` applies `values[i]` to the next `1 + runs[i]` units. Units after the last entry are
/// `Inter`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemporalCoeffs {
    /// Symbols.
    pub values: Vec<TemporalCoeff>,
    /// Extra units each symbol repeats over.
    pub runs: Vec<u32>,
}

impl TemporalCoeffs {
    /// Temporal layer from parallel symbol/run arrays.
    pub fn new(values: Vec<TemporalCoeff>, runs: Vec<u32>) -> Self {
        Self { values, runs }
    }

    pub(crate) fn validate(&self, tu_total: u32) -> EnhanceResult<()> {
        validate_runs("temporal layer", self.values.len(), &self.runs, tu_total)
    }
}

/// Decoded coefficients of one tile at one level of quality.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileCoefficients {
    /// One entry per transform layer.
    pub layers: Vec<LayerCoeffs>,
    /// Temporal symbols, when temporal prediction is signalled.
    pub temporal: Option<TemporalCoeffs>,
}

impl TileCoefficients {
    /// Coefficients without temporal symbols.
    pub fn new(layers: Vec<LayerCoeffs>) -> Self {
        Self {
            layers,
            temporal: None,
        }
    }

    /// Attach temporal symbols.
    pub fn with_temporal(mut self, temporal: TemporalCoeffs) -> Self {
        self.temporal = Some(temporal);
        self
    }

    /// Check layer count and that no run reaches past `tu_total` units.
    pub fn validate(&self, layer_count: usize, tu_total: u32) -> EnhanceResult<()> {
        if self.layers.len() != layer_count {
            return Err(EnhanceError::validation(format!(
                "expected {layer_count} coefficient layers, got {}",
                self.layers.len()
            )));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            layer.validate(&format!("layer {i}"), tu_total)?;
        }
        if let Some(t) = &self.temporal {
            t.validate(tu_total)?;
        }
        Ok(())
    }
}

fn validate_runs(what: &str, values: usize, runs: &[u32], tu_total: u32) -> EnhanceResult<()> {
    if values != runs.len() {
        return Err(EnhanceError::validation(format!(
            "{what}: {values} values but {} runs",
            runs.len()
        )));
    }
    let mut end = 0u64;
    for &run in runs {
        end += 1 + u64::from(run);
        if end > u64::from(tu_total) {
            return Err(EnhanceError::validation(format!(
                "{what}: runs cover {end} units, tile has {tu_total}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/enhancement/coeffs.rs"]
mod tests;
