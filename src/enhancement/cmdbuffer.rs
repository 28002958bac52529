use smallvec::SmallVec;

use crate::enhancement::transform_unit::TuState;
use crate::foundation::core::TransformType;
use crate::foundation::error::{EnhanceError, EnhanceResult};

const KIND_SHIFT: u32 = 6;
const JUMP_MASK: u8 = 0x3f;
const JUMP_U16: u8 = 62;
const JUMP_U24: u8 = 63;
const MAX_JUMP: u32 = (1 << 24) - 1;

/// Operation a command performs on its transform unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmdKind {
    /// Add residuals to the destination.
    Add = 0,
    /// Overwrite the destination with residuals.
    Set = 1,
    /// Zero the transform unit.
    SetZero = 2,
    /// Zero the unit's whole 32x32 block.
    Clear = 3,
}

impl CmdKind {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => CmdKind::Add,
            1 => CmdKind::Set,
            2 => CmdKind::SetZero,
            _ => CmdKind::Clear,
        }
    }

    /// `true` when the command carries residuals.
    pub fn has_residuals(self) -> bool {
        matches!(self, CmdKind::Add | CmdKind::Set)
    }
}

/// One decoded command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command<'a> {
    /// Operation.
    pub kind: CmdKind,
    /// Transform unit index within the tile.
    pub tu_index: u32,
    /// Row-major residuals, empty for `SetZero` and `Clear`.
    pub residuals: &'a [i16],
}

/// Resume point for walking part of a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryPoint {
    /// Transform unit the first jump is relative to.
    pub initial_tu: u32,
    /// Byte offset of the first command.
    pub command_offset: usize,
    /// Offset of the first residual.
    pub data_offset: usize,
    /// Commands covered.
    pub count: u32,
    /// Tile-local pixel row where the entry point's band of units begins.
    pub first_row: u32,
}

/// Ordered commands for one tile.
///
/// Commands are one byte each (kind in the top two bits, unit jump in the low six), followed by
/// a 16 or 24-bit little-endian jump when the small form overflows. Residuals live in a separate
/// array, `layer_count` values per `Add`/`Set`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CmdBuffer {
    transform: TransformType,
    commands: Vec<u8>,
    residuals: Vec<i16>,
    count: u32,
    last_tu: Option<u32>,
    last_kind: Option<CmdKind>,
    entry_points: SmallVec<[EntryPoint; 8]>,
}

impl CmdBuffer {
    /// Empty buffer for `transform` units.
    pub fn new(transform: TransformType) -> Self {
        Self {
            transform,
            commands: Vec::new(),
            residuals: Vec::new(),
            count: 0,
            last_tu: None,
            last_kind: None,
            entry_points: SmallVec::new(),
        }
    }

    /// Transform the residuals belong to.
    pub fn transform(&self) -> TransformType {
        self.transform
    }

    /// Commands held.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    /// `true` when no command was appended.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Encoded command bytes.
    pub fn command_bytes(&self) -> usize {
        self.commands.len()
    }

    /// Drop all commands, keeping allocations.
    pub fn reset(&mut self) {
        self.commands.clear();
        self.residuals.clear();
        self.count = 0;
        self.last_tu = None;
        self.last_kind = None;
        self.entry_points.clear();
    }

    /// Append a command for unit `tu_index`.
    ///
    /// Units strictly increase, except that the unit a `Clear` was issued on may be written again
    /// by the next command.
    pub fn append(&mut self, kind: CmdKind, tu_index: u32, residuals: &[i16]) -> EnhanceResult<()> {
        let expected = if kind.has_residuals() {
            self.transform.layer_count()
        } else {
            0
        };
        if residuals.len() != expected {
            return Err(EnhanceError::validation(format!(
                "{kind:?} carries {expected} residuals, got {}",
                residuals.len()
            )));
        }
        let jump = match self.last_tu {
            Some(last)
                if tu_index < last
                    || (tu_index == last && self.last_kind != Some(CmdKind::Clear)) =>
            {
                return Err(EnhanceError::validation(format!(
                    "command for unit {tu_index} does not follow unit {last}"
                )));
            }
            Some(last) => tu_index - last,
            None => tu_index,
        };
        if jump > MAX_JUMP {
            return Err(EnhanceError::validation(format!(
                "jump of {jump} units exceeds the 24-bit limit"
            )));
        }

        let tag = (kind as u8) << KIND_SHIFT;
        if jump < u32::from(JUMP_U16) {
            self.commands.push(tag | jump as u8);
        } else if jump <= u32::from(u16::MAX) {
            self.commands.push(tag | JUMP_U16);
            self.commands.extend_from_slice(&(jump as u16).to_le_bytes());
        } else {
            self.commands.push(tag | JUMP_U24);
            self.commands.extend_from_slice(&jump.to_le_bytes()[..3]);
        }
        self.residuals.extend_from_slice(residuals);
        self.count += 1;
        self.last_tu = Some(tu_index);
        self.last_kind = Some(kind);
        Ok(())
    }

    /// Every command in order.
    pub fn iter(&self) -> CmdIter<'_> {
        CmdIter {
            buffer: self,
            pos: 0,
            data: 0,
            tu: 0,
            remaining: self.count,
        }
    }

    /// Commands of one entry point.
    pub fn iter_entry(&self, entry: &EntryPoint) -> CmdIter<'_> {
        CmdIter {
            buffer: self,
            pos: entry.command_offset,
            data: entry.data_offset,
            tu: entry.initial_tu,
            remaining: entry.count,
        }
    }

    /// Entry points computed by the last [`CmdBuffer::split`].
    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    /// Divide the commands into about `parts` runs.
    ///
    /// Cuts fall only between bands of `tu` (rows of 32x32 blocks, or rows of units in surface
    /// raster), so each entry point writes its own horizontal stripe of the tile.
    pub fn split(&mut self, parts: usize, tu: &TuState) {
        self.entry_points.clear();
        if self.count == 0 {
            return;
        }
        let target = (self.count as usize).div_ceil(parts.max(1)) as u32;

        let mut points = SmallVec::<[EntryPoint; 8]>::new();
        let mut current = EntryPoint::default();
        let mut prev_tu = 0u32;
        let mut last_band = None;
        let mut it = self.iter();
        loop {
            let (pos, data) = (it.pos, it.data);
            let Some(cmd) = it.next() else {
                break;
            };
            let band = tu.band_row(cmd.tu_index);
            if current.count >= target && last_band != Some(band) {
                points.push(current);
                current = EntryPoint {
                    initial_tu: prev_tu,
                    command_offset: pos,
                    data_offset: data,
                    count: 0,
                    first_row: band,
                };
            }
            current.count += 1;
            prev_tu = cmd.tu_index;
            last_band = Some(band);
        }
        points.push(current);
        self.entry_points = points;
    }
}

/// Decoding iterator over a [`CmdBuffer`].
#[derive(Clone, Debug)]
pub struct CmdIter<'a> {
    buffer: &'a CmdBuffer,
    pos: usize,
    data: usize,
    tu: u32,
    remaining: u32,
}

impl<'a> Iterator for CmdIter<'a> {
    type Item = Command<'a>;

    fn next(&mut self) -> Option<Command<'a>> {
        if self.remaining == 0 {
            return None;
        }
        let bytes = &self.buffer.commands;
        let head = *bytes.get(self.pos)?;
        self.pos += 1;
        let jump = match head & JUMP_MASK {
            JUMP_U16 => {
                let b = bytes.get(self.pos..self.pos + 2)?;
                self.pos += 2;
                u32::from(u16::from_le_bytes([b[0], b[1]]))
            }
            JUMP_U24 => {
                let b = bytes.get(self.pos..self.pos + 3)?;
                self.pos += 3;
                u32::from_le_bytes([b[0], b[1], b[2], 0])
            }
            small => u32::from(small),
        };
        let kind = CmdKind::from_bits(head >> KIND_SHIFT);
        let n = if kind.has_residuals() {
            self.buffer.transform.layer_count()
        } else {
            0
        };
        let residuals = self.buffer.residuals.get(self.data..self.data + n)?;
        self.data += n;
        self.tu += jump;
        self.remaining -= 1;
        Some(Command {
            kind,
            tu_index: self.tu,
            residuals,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/enhancement/cmdbuffer.rs"]
mod tests;
