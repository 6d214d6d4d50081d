use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "montage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the render plan, filter graph and engine arguments for a timeline.
    Graph(GraphArgs),
    /// Render a timeline to a video file (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Layering {
    Top,
    Layer,
}

impl From<Layering> for montage::SubtitleLayering {
    fn from(l: Layering) -> Self {
        match l {
            Layering::Top => Self::AlwaysOnTop,
            Layering::Layer => Self::ByLayer,
        }
    }
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Input timeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path used in the printed argument list.
    #[arg(long, default_value = "out.mp4")]
    out: PathBuf,

    /// Skip checking that referenced files exist.
    #[arg(long, default_value_t = false)]
    no_verify: bool,

    /// Where subtitles land in the overlay stack.
    #[arg(long, value_enum, default_value_t = Layering::Top)]
    subtitles: Layering,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input timeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Overwrite output if it already exists.
    #[arg(long, default_value_t = true)]
    overwrite: bool,

    /// Video encoder. Defaults to the best detected H.264 encoder.
    #[arg(long)]
    codec: Option<String>,

    /// Encoder preset (`ultrafast` .. `placebo`), mapped per encoder family.
    #[arg(long, default_value = "medium")]
    preset: String,

    /// Target video bit rate, e.g. `4M`.
    #[arg(long)]
    bit_rate: Option<String>,

    /// Override worker threads for the pixel pipeline.
    #[arg(long)]
    threads: Option<usize>,

    /// Where subtitles land in the overlay stack.
    #[arg(long, value_enum, default_value_t = Layering::Top)]
    subtitles: Layering,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Graph(args) => cmd_graph(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_graph(args: GraphArgs) -> anyhow::Result<()> {
    let timeline = montage::Timeline::from_path(&args.in_path)?;
    let opts = montage::CompileOpts {
        verify_sources: !args.no_verify,
        subtitle_layering: args.subtitles.into(),
        ..montage::CompileOpts::default()
    };
    println!("strategy: {:?}", montage::plan(&timeline));

    let graph = montage::compile(&timeline, &opts)?;
    println!("filter_complex: {}", graph.filter_complex());
    let caps = montage::EncoderCaps::detect();
    let argv = montage::graph_args(&graph, &montage::EncodeSettings::default(), &caps, &args.out);
    let shown: Vec<_> = argv.iter().map(|a| a.to_string_lossy()).collect();
    println!("ffmpeg {}", shown.join(" "));
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let timeline = montage::Timeline::from_path(&args.in_path)?;
    let opts = montage::RenderOpts {
        compile: montage::CompileOpts {
            subtitle_layering: args.subtitles.into(),
            ..montage::CompileOpts::default()
        },
        encode: montage::EncodeSettings {
            codec: args.codec,
            preset: Some(args.preset).filter(|p| !p.is_empty()),
            bit_rate: args.bit_rate,
            overwrite: args.overwrite,
            ..montage::EncodeSettings::default()
        },
        pixel: montage::PixelPipelineOpts {
            workers: args.threads,
            ..montage::PixelPipelineOpts::default()
        },
    };
    let caps = montage::EncoderCaps::detect();
    let report = montage::render(&timeline, &args.out, &opts, &caps)?;

    match report.pipeline {
        Some(stats) => eprintln!(
            "wrote {} ({:?}, {} frames)",
            args.out.display(),
            report.strategy,
            stats.frames
        ),
        None => eprintln!("wrote {} ({:?})", args.out.display(), report.strategy),
    }
    Ok(())
}
