use enhance::{
    Decoder, DecoderConfig, Dequant, FixedPoint, FrameInput, Interleaving, LayerCoeffs,
    PlaneInput, Surface, TileCoefficients,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let (width, height) = (64u32, 48u32);
    let mut base = Surface::new(width, height, FixedPoint::U10, Interleaving::None)?;
    for y in 0..height {
        for x in 0..width {
            base.set(x as usize, y, ((x * 16 + y * 4) % 1024) as i32)?;
        }
    }

    let cfg = DecoderConfig {
        temporal_enabled: true,
        tile_width: 32,
        tile_height: 32,
        ..DecoderConfig::default()
    };
    let mut decoder = Decoder::new(cfg)?;

    for frame in 0..4i16 {
        // One diagonal of non-zero averages per output tile, growing each frame.
        let tiles = (0..12)
            .map(|_| {
                let dense: Vec<i16> = (0..256)
                    .map(|u| if u % 17 == 0 { 32 * (frame + 1) } else { 0 })
                    .collect();
                let mut layers = vec![LayerCoeffs::from_dense(&dense)];
                layers.extend(std::iter::repeat_n(LayerCoeffs::empty(), 3));
                Some(TileCoefficients::new(layers))
            })
            .collect();
        let input = FrameInput {
            planes: vec![PlaneInput::new(base.clone()).with_loq0(tiles, Dequant::default())],
            ..FrameInput::default()
        };
        let out = decoder.decode_frame(&input)?;
        println!(
            "frame {frame}: {} commands, checksum {:016x}, loq0 {:?}",
            out.stats.commands,
            out.surfaces[0].checksum(),
            out.stats.loq0_time
        );
    }

    Ok(())
}
