use super::*;
use crate::enhancement::transform_unit::TuOrder;
use crate::foundation::core::TileRect;

fn collect(buf: &CmdBuffer) -> Vec<(CmdKind, u32, Vec<i16>)> {
    buf.iter()
        .map(|c| (c.kind, c.tu_index, c.residuals.to_vec()))
        .collect()
}

#[test]
fn commands_decode_in_append_order() {
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::Add, 0, &[1, 2, 3, 4]).unwrap();
    buf.append(CmdKind::SetZero, 3, &[]).unwrap();
    buf.append(CmdKind::Set, 4, &[5, 6, 7, 8]).unwrap();
    buf.append(CmdKind::Clear, 9, &[]).unwrap();
    assert_eq!(buf.len(), 4);
    assert_eq!(buf.command_bytes(), 4);
    assert_eq!(
        collect(&buf),
        vec![
            (CmdKind::Add, 0, vec![1, 2, 3, 4]),
            (CmdKind::SetZero, 3, vec![]),
            (CmdKind::Set, 4, vec![5, 6, 7, 8]),
            (CmdKind::Clear, 9, vec![]),
        ]
    );
}

#[test]
fn a_cleared_unit_may_be_written_again() {
    let mut buf = CmdBuffer::new(TransformType::Dd);
    buf.append(CmdKind::Clear, 4, &[]).unwrap();
    buf.append(CmdKind::Set, 4, &[1, 0, 0, 0]).unwrap();
    assert!(buf.append(CmdKind::Set, 4, &[1, 0, 0, 0]).is_err());
    let tus: Vec<u32> = buf.iter().map(|c| c.tu_index).collect();
    assert_eq!(tus, vec![4, 4]);
}

#[test]
fn long_jumps_use_wide_encodings() {
    let mut buf = CmdBuffer::new(TransformType::Dd);
    let r = [1, 1, 1, 1];
    buf.append(CmdKind::Add, 61, &r).unwrap();
    buf.append(CmdKind::Add, 61 + 62, &r).unwrap();
    buf.append(CmdKind::Add, 61 + 62 + 65_535, &r).unwrap();
    buf.append(CmdKind::Add, 61 + 62 + 65_535 + 65_536, &r).unwrap();
    buf.append(CmdKind::Add, 61 + 62 + 65_535 + 65_536 + 1, &r).unwrap();
    assert_eq!(buf.command_bytes(), 1 + 3 + 3 + 4 + 1);
    let tus: Vec<u32> = buf.iter().map(|c| c.tu_index).collect();
    assert_eq!(
        tus,
        vec![61, 123, 65_658, 131_194, 131_195]
    );
}

#[test]
fn rejects_out_of_order_and_malformed_commands() {
    let mut buf = CmdBuffer::new(TransformType::Dds);
    buf.append(CmdKind::SetZero, 5, &[]).unwrap();
    assert!(buf.append(CmdKind::SetZero, 5, &[]).is_err());
    assert!(buf.append(CmdKind::SetZero, 2, &[]).is_err());
    assert!(buf.append(CmdKind::Add, 6, &[0; 4]).is_err());
    assert!(buf.append(CmdKind::Clear, 6, &[0; 16]).is_err());
    assert!(buf.append(CmdKind::Add, 6 + (1 << 24), &[0; 16]).is_err());
    assert_eq!(buf.len(), 1);
}

#[test]
fn entry_points_cover_every_command_once_on_band_boundaries() {
    // One 32x32 block per band, eight bands of 64 units.
    let tu = TuState::new(TileRect::new(0, 0, 32, 256), 4, TuOrder::BlockRaster).unwrap();
    let mut buf = CmdBuffer::new(TransformType::Dds);
    let r = [0i16; 16];
    for block in 0..8u32 {
        for k in [0, 10, 40] {
            buf.append(CmdKind::Add, block * 64 + k, &r).unwrap();
        }
    }
    buf.split(4, &tu);
    let eps = buf.entry_points().to_vec();
    assert_eq!(eps.len(), 4);
    assert_eq!(eps.iter().map(|e| e.count).sum::<u32>(), 24);

    let mut joined = Vec::new();
    for ep in &eps {
        let cmds: Vec<u32> = buf.iter_entry(ep).map(|c| c.tu_index).collect();
        assert_eq!(cmds[0] % 64, 0, "entry starts mid-block");
        assert_eq!(ep.first_row, tu.band_row(cmds[0]));
        joined.extend(cmds);
    }
    let all: Vec<u32> = buf.iter().map(|c| c.tu_index).collect();
    assert_eq!(joined, all);
    assert_eq!(eps.iter().map(|e| e.first_row).collect::<Vec<_>>(), vec![0, 64, 128, 192]);
}

#[test]
fn entry_points_never_cut_inside_a_band() {
    // Two blocks side by side share one band.
    let tu = TuState::new(TileRect::new(0, 0, 64, 64), 2, TuOrder::BlockRaster).unwrap();
    let mut buf = CmdBuffer::new(TransformType::Dd);
    for index in (0..tu.tu_total()).step_by(64) {
        buf.append(CmdKind::SetZero, index, &[]).unwrap();
    }
    buf.split(16, &tu);
    let rows: Vec<u32> = buf.entry_points().iter().map(|e| e.first_row).collect();
    assert_eq!(rows, vec![0, 32]);
    assert_eq!(buf.entry_points()[0].count, 8);
}

#[test]
fn split_of_single_block_keeps_one_entry() {
    let mut buf = CmdBuffer::new(TransformType::Dd);
    for tu in 0..10 {
        buf.append(CmdKind::SetZero, tu, &[]).unwrap();
    }
    let tu = TuState::new(TileRect::new(0, 0, 32, 32), 2, TuOrder::BlockRaster).unwrap();
    buf.split(5, &tu);
    assert_eq!(buf.entry_points().len(), 1);
    buf.reset();
    assert!(buf.is_empty());
    assert!(buf.entry_points().is_empty());
}
