use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use enhance::{
    CpuAccelerationFeatures, Decoder, DecoderConfig, FixedPoint, FrameInput, Interleaving,
    OutputFormat, PlaneInput, ScalingMode, SharpenMode, Surface, UpscaleType,
};

#[derive(Parser, Debug)]
#[command(name = "enhance", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print detected CPU features and the kernel family in use.
    Features,
    /// Print the default decoder configuration as JSON.
    Config,
    /// Upscale a PNG through the decoder without residuals.
    Upscale(UpscaleArgs),
}

#[derive(Parser, Debug)]
struct UpscaleArgs {
    /// Input PNG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Decoder configuration JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upscale kernel.
    #[arg(long, value_parser = parse_kernel)]
    kernel: Option<UpscaleType>,

    /// Scaling mode: `0d`, `1d` or `2d`.
    #[arg(long, value_parser = parse_scaling)]
    scaling: Option<ScalingMode>,

    /// Out-of-loop sharpen strength in `[0, 1]`.
    #[arg(long)]
    sharpen: Option<f32>,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Ignore detected CPU features.
    #[arg(long, default_value_t = false)]
    generic: bool,
}

fn parse_kernel(s: &str) -> Result<UpscaleType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_owned()))
        .map_err(|_| format!("unknown kernel '{s}'"))
}

fn parse_scaling(s: &str) -> Result<ScalingMode, String> {
    serde_json::from_value(serde_json::Value::String(s.to_owned()))
        .map_err(|_| format!("unknown scaling mode '{s}'"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Features => cmd_features(),
        Command::Config => cmd_config(),
        Command::Upscale(args) => cmd_upscale(args),
    }
}

fn cmd_features() -> anyhow::Result<()> {
    let detected = CpuAccelerationFeatures::detect();
    let names = detected.names();
    if names.is_empty() {
        println!("detected: none");
    } else {
        println!("detected: {}", names.join(", "));
    }
    let family = if detected.is_accelerated() {
        "accelerated"
    } else {
        "generic"
    };
    println!("kernels: {family}");
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    println!("{}", DecoderConfig::default().to_json_string()?);
    Ok(())
}

fn load_config(args: &UpscaleArgs) -> anyhow::Result<DecoderConfig> {
    let mut cfg = match &args.config {
        Some(path) => DecoderConfig::from_path(path)?,
        None => DecoderConfig::default(),
    };
    if let Some(kernel) = args.kernel {
        cfg.upscale.kernel = kernel;
    }
    if let Some(scaling) = args.scaling {
        cfg.scaling = scaling;
    }
    if let Some(strength) = args.sharpen {
        cfg.sharpen.mode = SharpenMode::OutOfLoop;
        cfg.sharpen.strength = strength;
    }
    if args.threads.is_some() {
        cfg.threading.threads = args.threads;
    }
    cfg.force_generic_kernels |= args.generic;
    Ok(cfg)
}

/// Split an 8-bit PNG into one planar surface per channel.
fn load_planes(path: &Path) -> anyhow::Result<(Vec<PlaneInput>, Interleaving)> {
    let img = image::open(path).with_context(|| format!("read png '{}'", path.display()))?;
    let (interleaving, width, height, data) = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        (Interleaving::Rgba, rgba.width(), rgba.height(), rgba.into_raw())
    } else {
        let rgb = img.to_rgb8();
        (Interleaving::Rgb, rgb.width(), rgb.height(), rgb.into_raw())
    };
    let channels = interleaving.layout().count;
    let planes = (0..channels)
        .map(|c| {
            let samples: Vec<u8> = data.iter().skip(c).step_by(channels).copied().collect();
            let base = Surface::from_samples(
                width,
                height,
                width as usize,
                FixedPoint::U8,
                Interleaving::None,
                samples,
            )?;
            Ok(PlaneInput::new(base))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((planes, interleaving))
}

fn cmd_upscale(args: UpscaleArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let (planes, interleaving) = load_planes(&args.in_path)?;

    let mut decoder = Decoder::new(cfg)?;
    let frame = decoder.decode_frame(&FrameInput {
        planes,
        output: OutputFormat {
            fixed_point: Some(FixedPoint::U8),
            interleaving,
        },
    })?;
    let packed = frame
        .surfaces
        .first()
        .context("decoder returned no surfaces")?;

    let mut bytes = Vec::with_capacity(packed.row_samples() * packed.height() as usize);
    for y in 0..packed.height() {
        let row = packed
            .row::<u8>(y)
            .with_context(|| format!("output row {y} is not 8-bit"))?;
        bytes.extend_from_slice(row);
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let color = match interleaving {
        Interleaving::Rgba => image::ColorType::Rgba8,
        _ => image::ColorType::Rgb8,
    };
    image::save_buffer_with_format(
        &args.out,
        &bytes,
        packed.width(),
        packed.height(),
        color,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, {} commands, {} units)",
        args.out.display(),
        packed.width(),
        packed.height(),
        frame.stats.commands,
        frame.stats.units
    );
    Ok(())
}
