use crate::foundation::core::{FixedPoint, Interleaving, Storage};
use crate::foundation::error::{EnhanceError, EnhanceResult};
use crate::foundation::math::{demote, promote, rescale_unsigned};
use crate::surface::surface::{Sample, Surface};

/// Convert one sample between fixed-point formats.
///
/// Unsigned pairs rescale with round-half-up on the way down, unsigned to signed promotes, signed
/// to unsigned demotes, and signed pairs share a numeric range so they copy.
pub fn convert_value(v: i32, src: FixedPoint, dst: FixedPoint) -> i32 {
    match (src.is_signed(), dst.is_signed()) {
        (false, false) => rescale_unsigned(v, src, dst),
        (false, true) => promote(v, src),
        (true, false) => demote(v, dst),
        (true, true) => v,
    }
}

/// Write planar `src` into channel `channel` of `dst`, converting the sample format.
///
/// `src` must be as wide as the destination channel and as tall as `dst`. Channels that alias
/// `channel` in a packed 4:2:2 layout (the second luma slot) are written too.
#[tracing::instrument(skip(src, dst), fields(src_fp = ?src.fixed_point(), dst_fp = ?dst.fixed_point()))]
pub fn convert_surface(src: &Surface, dst: &mut Surface, channel: usize) -> EnhanceResult<()> {
    if src.interleaving() != Interleaving::None {
        return Err(EnhanceError::surface("conversion source must be planar"));
    }
    let layout = dst.interleaving().layout();
    if channel >= layout.count || layout.map[channel] != channel {
        return Err(EnhanceError::validation(format!(
            "channel {channel} is not a distinct channel of {:?}",
            dst.interleaving()
        )));
    }
    let slots: Vec<usize> = (0..layout.count)
        .filter(|&c| layout.map[c] == channel)
        .collect();
    let slot_width = dst.row_samples() / layout.skip[channel];
    if src.row_samples() != slot_width || src.height() != dst.height() {
        return Err(EnhanceError::surface(format!(
            "source {}x{} does not match destination channel {slot_width}x{}",
            src.row_samples(),
            src.height(),
            dst.height()
        )));
    }

    macro_rules! run {
        ($s:ty, $d:ty) => {
            convert_rows::<$s, $d>(src, dst, &slots, layout.count)
        };
    }
    match (src.fixed_point().storage(), dst.fixed_point().storage()) {
        (Storage::U8, Storage::U8) => run!(u8, u8),
        (Storage::U8, Storage::U16) => run!(u8, u16),
        (Storage::U8, Storage::S16) => run!(u8, i16),
        (Storage::U16, Storage::U8) => run!(u16, u8),
        (Storage::U16, Storage::U16) => run!(u16, u16),
        (Storage::U16, Storage::S16) => run!(u16, i16),
        (Storage::S16, Storage::U8) => run!(i16, u8),
        (Storage::S16, Storage::U16) => run!(i16, u16),
        (Storage::S16, Storage::S16) => run!(i16, i16),
    }
}

fn convert_rows<S: Sample, D: Sample>(
    src: &Surface,
    dst: &mut Surface,
    slots: &[usize],
    count: usize,
) -> EnhanceResult<()> {
    let (sfp, dfp) = (src.fixed_point(), dst.fixed_point());
    let height = dst.height();
    let stride = dst.stride();
    let row_len = dst.row_samples();
    let out = dst
        .samples_mut::<D>()
        .ok_or_else(|| EnhanceError::surface("destination storage mismatch"))?;
    for y in 0..height {
        let in_row = src
            .row::<S>(y)
            .ok_or_else(|| EnhanceError::surface("source storage mismatch"))?;
        let out_row = &mut out[stride * y as usize..stride * y as usize + row_len];
        // Source samples walk the group slots in order, so 4:2:2 luma fills both slots per group.
        let positions = (0..row_len / count).flat_map(|g| slots.iter().map(move |&c| g * count + c));
        for (pos, &v) in positions.zip(in_row) {
            out_row[pos] = D::from_i32(convert_value(v.to_i32(), sfp, dfp));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/surface/convert.rs"]
mod tests;
