use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use jif::playback::MAX_FPS;
use jif::{
    Canvas, FrameSequence, FrameStatus, PlaybackConfig, PlaybackEngine, PlaybackMode, TimerState,
    TransportState,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jif", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the screen descriptor and a summary of every frame.
    Info(InfoArgs),
    /// Play a GIF for a number of ticks and write each redraw as a PPM.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    file: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    file: PathBuf,

    /// Output directory for the PPM frames.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Number of clock ticks to simulate.
    #[arg(long, default_value_t = 16)]
    ticks: u32,

    /// Playback config JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    mode: Option<ModeChoice>,

    /// Speed control in [-2, 2].
    #[arg(long, allow_negative_numbers = true)]
    speed: Option<f32>,

    /// Phase offset in [0, 1], synced mode only.
    #[arg(long)]
    offset: Option<f32>,

    /// Tempo of the simulated transport in synced mode.
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,

    #[arg(long)]
    loop_start: Option<usize>,

    #[arg(long)]
    loop_end: Option<usize>,

    /// Output width; defaults to the largest frame.
    #[arg(long)]
    width: Option<usize>,

    /// Output height; defaults to the largest frame.
    #[arg(long)]
    height: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    FreeRun,
    Synced,
}

impl From<ModeChoice> for PlaybackMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::FreeRun => PlaybackMode::FreeRun,
            ModeChoice::Synced => PlaybackMode::Synced,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn load(path: &Path) -> anyhow::Result<FrameSequence> {
    let mut seq = FrameSequence::new();
    seq.load_file(path)
        .with_context(|| format!("load '{}'", path.display()))?;
    Ok(seq)
}

fn read_config(path: &Path) -> anyhow::Result<PlaybackConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let config: PlaybackConfig =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse playback config JSON")?;
    Ok(config)
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let seq = load(&args.file)?;
    let (width, height) = seq.canvas_size();
    let bg = seq.background();
    println!("Canvas: {}x{}", width, height);
    println!("Background: #{:02x}{:02x}{:02x}", bg.red, bg.green, bg.blue);
    println!("Frames: {}", seq.len());
    for (idx, frame) in seq.frames().iter().enumerate() {
        let raw = &frame.raw;
        let status = match &raw.status {
            FrameStatus::Complete => "ok".to_string(),
            FrameStatus::Corrupt(reason) => format!("corrupt ({})", reason),
        };
        println!(
            "  #{:<4} {}x{} at ({}, {}) delay {}cs{}{} {}",
            idx,
            raw.width,
            raw.height,
            raw.x,
            raw.y,
            raw.delay,
            if raw.interlaced { " interlaced" } else { "" },
            if raw.has_alpha() { " alpha" } else { "" },
            status,
        );
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => PlaybackConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if let Some(offset) = args.offset {
        config.phase_offset = offset;
    }

    let mut seq = load(&args.file)?;
    if seq.is_empty() {
        anyhow::bail!("'{}' has no frames", args.file.display());
    }
    if args.loop_start.is_some() || args.loop_end.is_some() {
        seq.set_loop_window(
            args.loop_start.unwrap_or(0),
            args.loop_end.unwrap_or(seq.len()),
        );
    }

    let mut canvas = match (args.width, args.height) {
        (None, None) => Canvas::for_sequence(&seq),
        (width, height) => {
            let fallback = Canvas::for_sequence(&seq);
            Canvas::new(
                width.unwrap_or(fallback.width()),
                height.unwrap_or(fallback.height()),
                seq.background(),
            )
        }
    };

    fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    let mut engine = PlaybackEngine::new(config);
    engine.start(&seq);
    info!(
        mode = ?engine.mode(),
        frames = seq.len(),
        loop_start = seq.loop_start(),
        loop_end = seq.loop_end(),
        fps = engine.fps(&seq),
        "starting playback"
    );

    // Synced mode polls the simulated transport at the fastest frame rate.
    let poll_seconds = 1.0 / MAX_FPS as f64;
    let mut transport = TransportState {
        ppq_position: 0.0,
        is_playing: true,
    };
    let mut clock_ms: u128 = 0;
    let mut written = 0;

    canvas.render(&mut seq);
    write_frame(&canvas, &args.out, written)?;
    written += 1;

    for _ in 0..args.ticks {
        let redraw = match engine.mode() {
            PlaybackMode::FreeRun => {
                if let TimerState::Running { interval } = engine.timer() {
                    clock_ms += interval.as_millis();
                }
                engine.tick(&mut seq)
            }
            PlaybackMode::Synced => {
                transport.ppq_position += args.bpm / 60.0 * poll_seconds;
                clock_ms += (poll_seconds * 1000.0) as u128;
                engine.update_transport(transport);
                engine.tick(&mut seq)
            }
        };
        if redraw && canvas.render(&mut seq) {
            write_frame(&canvas, &args.out, written)?;
            written += 1;
        }
    }

    info!(written, elapsed_ms = clock_ms as u64, "done");
    Ok(())
}

fn write_frame(canvas: &Canvas, dir: &Path, idx: usize) -> anyhow::Result<()> {
    let path = dir.join(format!("image_{:04}.ppm", idx));
    fs::write(&path, canvas.to_ppm()).with_context(|| format!("write '{}'", path.display()))?;
    Ok(())
}
