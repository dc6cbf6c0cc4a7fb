use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use shotreel::{
    AspectRatio, Compositor, ExportPipeline, ExportSettings, HttpImageSource, Shot, SubtitleFont,
    SubtitleStyle,
};

#[derive(Parser, Debug)]
#[command(name = "shotreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a shot list as a WebM slideshow (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Composite a single shot to a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input shot-list JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for the artifact.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Output aspect ratio.
    #[arg(long, value_enum, default_value_t = AspectRatio::Wide16x9)]
    aspect: AspectRatio,

    /// Export frame rate.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Per-shot hold duration in milliseconds.
    #[arg(long, default_value_t = shotreel::model::EXPORT_HOLD_MS)]
    hold_ms: u64,

    /// Target video bitrate in bits per second.
    #[arg(long, default_value_t = 8_000_000)]
    bitrate: u64,

    /// Artifact file name prefix.
    #[arg(long, default_value = "storyboard")]
    prefix: String,

    /// Subtitle font (TTF). Defaults to a common system sans-serif.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input shot-list JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Shot index (0-based).
    #[arg(long, default_value_t = 0)]
    shot: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Output aspect ratio.
    #[arg(long, value_enum, default_value_t = AspectRatio::Wide16x9)]
    aspect: AspectRatio,

    /// Subtitle font (TTF). Defaults to a common system sans-serif.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn read_shots_json(path: &Path) -> anyhow::Result<Vec<Shot>> {
    let f = File::open(path).with_context(|| format!("open shot list '{}'", path.display()))?;
    let r = BufReader::new(f);
    let shots: Vec<Shot> = serde_json::from_reader(r).with_context(|| "parse shot list JSON")?;
    Ok(shots)
}

fn load_font(explicit: Option<&Path>) -> anyhow::Result<SubtitleFont> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => shotreel::text::find_system_font().context(
            "no usable system font found; pass one with --font (or set SHOTREEL_FONT)",
        )?,
    };
    Ok(SubtitleFont::from_path(&path)?)
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let shots = read_shots_json(&args.in_path)?;
    let font = load_font(args.font.as_deref())?;
    let mut compositor = Compositor::new(font, SubtitleStyle::default());

    let settings = ExportSettings {
        aspect: args.aspect,
        fps: args.fps,
        bitrate_bps: args.bitrate,
        hold: Duration::from_millis(args.hold_ms),
        file_prefix: args.prefix,
        out_dir: args.out_dir,
    };

    let images = HttpImageSource::new()?;
    let mut pipeline = ExportPipeline::new();
    let report = pipeline.export(&shots, &settings, &images, &mut compositor, None)?;

    eprintln!(
        "wrote {} ({} shots, {} frames)",
        report.artifact.path.display(),
        report.shots,
        report.frames_pushed
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let shots = read_shots_json(&args.in_path)?;
    let shot = shots
        .get(args.shot)
        .with_context(|| format!("shot index {} out of range ({} shots)", args.shot, shots.len()))?;

    let font = load_font(args.font.as_deref())?;
    let mut compositor = Compositor::new(font, SubtitleStyle::default());

    let (width, height) = args.aspect.resolution();
    let mut surface = shotreel::Surface::new(width, height)?;
    let images = HttpImageSource::new()?;
    let image_state = shotreel::load_shot_image(&images, shot);
    compositor.compose_shot(&mut surface, shot, &image_state);

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        surface.data(),
        surface.width(),
        surface.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
