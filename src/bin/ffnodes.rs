use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ffnodes::{
    Batch, FfmpegCli, MergeInput, MergeOpts, NodeContext, NodeRegistry, SplitOpts, TempArea,
    VideoHandle,
};

#[derive(Parser, Debug)]
#[command(name = "ffnodes", version)]
struct Cli {
    /// ffmpeg executable to run (name looked up on PATH, or a path).
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Directory for scratch files (defaults to `<system temp>/ffnodes`).
    #[arg(long, global = true)]
    temp_dir: Option<PathBuf>,

    /// Increase log verbosity (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a video into numbered PNG frames.
    Split(SplitArgs),
    /// Merge numbered PNG frames into a video.
    Merge(MergeArgs),
    /// Round-robin interleave frame directories into one.
    Interleave(InterleaveArgs),
    /// Print the node descriptors as JSON.
    Nodes,
}

#[derive(Parser, Debug)]
struct SplitArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for frames.
    #[arg(long)]
    out: PathBuf,

    /// Target frame rate (0 keeps the native rate).
    #[arg(long, default_value_t = 0.0)]
    fps: f64,
}

#[derive(Parser, Debug)]
struct MergeArgs {
    /// Directory of `frame_%06d.png` files.
    #[arg(long = "in")]
    in_dir: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    #[arg(long, default_value = "libx264")]
    codec: String,

    #[arg(long, default_value = "yuv420p")]
    pix_fmt: String,
}

#[derive(Parser, Debug)]
struct InterleaveArgs {
    /// Frame directory; repeat in interleave order (at least two).
    #[arg(long = "in", required = true)]
    in_dirs: Vec<PathBuf>,

    /// Output directory for the interleaved frames.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let transcoder = FfmpegCli::new(&cli.ffmpeg);
    let temp = match &cli.temp_dir {
        Some(dir) => TempArea::new(dir),
        None => TempArea::system(),
    };
    let ctx = NodeContext::new(&transcoder, &temp);

    match cli.cmd {
        Command::Split(args) => cmd_split(&ctx, args),
        Command::Merge(args) => cmd_merge(&ctx, args),
        Command::Interleave(args) => cmd_interleave(args),
        Command::Nodes => cmd_nodes(),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_split(ctx: &NodeContext<'_>, args: SplitArgs) -> anyhow::Result<()> {
    let frames = ffnodes::split_video(
        ctx,
        VideoHandle::path(&args.in_path),
        &SplitOpts::with_fps(args.fps),
    )?;
    create_dir(&args.out)?;
    let written = ffnodes::frames::save_frames(&frames, &args.out)?;
    eprintln!("wrote {written} frames to {}", args.out.display());
    Ok(())
}

fn cmd_merge(ctx: &NodeContext<'_>, args: MergeArgs) -> anyhow::Result<()> {
    let frames = ffnodes::frames::load_frames(&args.in_dir)?;
    let opts = MergeOpts {
        fps: args.fps,
        codec: args.codec,
        pix_fmt: args.pix_fmt,
    };
    let out = ffnodes::merge_frames(ctx, MergeInput::Frames(frames), &opts)?;
    let produced = out
        .video
        .file_path()
        .context("merge did not produce a file-backed video")?
        .to_path_buf();

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir(parent)?;
    }
    move_file(&produced, &args.out)?;
    if let Some(dir) = produced.parent()
        && let Err(e) = std::fs::remove_dir_all(dir)
    {
        tracing::warn!(path = %dir.display(), error = %e, "failed to remove merge directory");
    }

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_interleave(args: InterleaveArgs) -> anyhow::Result<()> {
    let batches = args
        .in_dirs
        .iter()
        .map(|dir| ffnodes::frames::load_frames(dir).map(Batch::Frames))
        .collect::<Result<Vec<_>, _>>()?;
    let out = ffnodes::interleave(&batches)?;
    let Batch::Frames(frames) = out.batch else {
        anyhow::bail!("interleaving frame directories produced a latent batch");
    };
    create_dir(&args.out)?;
    let written = ffnodes::frames::save_frames(&frames, &args.out)?;
    eprintln!("wrote {written} frames to {}", args.out.display());
    Ok(())
}

fn cmd_nodes() -> anyhow::Result<()> {
    let descriptors = NodeRegistry::builtin().descriptors();
    let json = serde_json::to_string_pretty(&descriptors).context("serialize node descriptors")?;
    println!("{json}");
    Ok(())
}

fn create_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create directory '{}'", dir.display()))
}

fn move_file(from: &Path, to: &Path) -> anyhow::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .with_context(|| format!("copy '{}' to '{}'", from.display(), to.display()))?;
    Ok(())
}
