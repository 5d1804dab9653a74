use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use memoreel::{
    ClipRef, Cutout, FramingMode, GenerationRequest, LayoutOverrides, MemorialTitle, Orchestrator,
    OverlayPipeline, ReelConfig, ReelResult, RenderJob, RunwayClient, SystemClock,
    TitleCardGenerator, TitleSpec, VideoGenerator, VideoRequest, Workspace, cleanup_artifacts,
};
use serde::de::DeserializeOwned;

const API_KEY_ENV: &str = "RUNWAY_API_KEY";

#[derive(Parser, Debug)]
#[command(name = "memoreel", version)]
struct Cli {
    /// Pipeline configuration JSON (defaults apply to anything left out).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a start frame from one or two photos.
    Frame(FrameArgs),
    /// Render a title card still, and optionally its clip.
    Title(TitleArgs),
    /// Stitch clips and run the overlay stages (requires `ffmpeg` on PATH).
    Assemble(AssembleArgs),
    /// Animate a start frame with the video generation service.
    Generate(GenerateArgs),
    /// Run a whole video request.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Portrait photo; pass twice for a pair.
    #[arg(long = "photo", required = true, num_args = 1)]
    photos: Vec<PathBuf>,

    #[arg(long)]
    background: PathBuf,

    /// full-body, waist-up or chest-up.
    #[arg(long, default_value = "full-body")]
    framing: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Also write the placement metrics JSON here.
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Also write a copy with layout guides drawn in.
    #[arg(long)]
    annotated: Option<PathBuf>,

    /// Relative size nudge, e.g. 0.1 for 10% larger.
    #[arg(long, default_value_t = 0.0)]
    scale_pct: f64,

    /// Horizontal nudge in pixels.
    #[arg(long, default_value_t = 0)]
    shift_px: i32,

    /// Preferred gap between two people, in pixels.
    #[arg(long)]
    gap_px: Option<i32>,
}

#[derive(Parser, Debug)]
struct TitleArgs {
    /// Plain one-line title.
    #[arg(long, conflicts_with = "name")]
    text: Option<String>,

    /// Memorial card: full name.
    #[arg(long)]
    name: Option<String>,

    /// Memorial card: date range.
    #[arg(long, default_value = "")]
    dates: String,

    /// Memorial card: free text.
    #[arg(long, default_value = "")]
    epitaph: String,

    /// Decoration image anchored bottom-left on memorial cards.
    #[arg(long)]
    decoration: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Also turn the still into a clip at this path.
    #[arg(long)]
    clip: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct AssembleArgs {
    /// Render job JSON; the flags below are ignored when given.
    #[arg(long)]
    job: Option<PathBuf>,

    /// `<path>:<seconds>`, in playback order.
    #[arg(long = "clip", value_parser = parse_clip)]
    clips: Vec<ClipRef>,

    #[arg(long)]
    music: Option<PathBuf>,

    /// Image for the ambient background layer.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Plain closing title.
    #[arg(long)]
    title: Option<String>,

    /// Apply the free-tier full-frame watermark.
    #[arg(long)]
    free_tier: bool,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Start frame image.
    #[arg(long)]
    frame: PathBuf,

    #[arg(long)]
    prompt: String,

    #[arg(long, default_value_t = 5)]
    duration: u32,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Video request JSON.
    #[arg(long)]
    request: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = match &cli.config {
        Some(path) => ReelConfig::from_path(path)?,
        None => ReelConfig::default(),
    };
    match cli.cmd {
        Command::Frame(args) => cmd_frame(&cfg, args),
        Command::Title(args) => cmd_title(&cfg, args),
        Command::Assemble(args) => cmd_assemble(&cfg, args),
        Command::Generate(args) => cmd_generate(&cfg, args),
        Command::Run(args) => cmd_run(&cfg, args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_clip(s: &str) -> Result<ClipRef, String> {
    let (path, secs) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected <path>:<seconds>, got '{s}'"))?;
    let secs: f64 = secs
        .parse()
        .map_err(|e| format!("bad duration in '{s}': {e}"))?;
    Ok(ClipRef::new(path, secs))
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {what} JSON"))
}

fn workspace(cfg: &ReelConfig) -> anyhow::Result<Workspace> {
    let ws = Workspace::new(&cfg.workspace_root);
    ws.ensure()?;
    Ok(ws)
}

fn orchestrator(
    cfg: &ReelConfig,
    generator: Arc<dyn VideoGenerator>,
) -> anyhow::Result<Orchestrator> {
    let ws = workspace(cfg)?;
    Ok(Orchestrator::new(
        cfg.cutout_provider(&ws.temp())?,
        generator,
        Arc::new(cfg.media_runner(&ws.temp())),
        ws,
        cfg.orchestrator_settings()?,
    ))
}

fn runway(cfg: &ReelConfig) -> anyhow::Result<RunwayClient> {
    let key = std::env::var(API_KEY_ENV).with_context(|| format!("{API_KEY_ENV} is not set"))?;
    Ok(RunwayClient::new(key, cfg.runway.clone())?)
}

fn cmd_frame(cfg: &ReelConfig, args: FrameArgs) -> anyhow::Result<()> {
    let framing: FramingMode = args.framing.parse()?;
    let ws = workspace(cfg)?;
    let cutout = cfg.cutout_provider(&ws.temp())?;
    let settings = cfg.orchestrator_settings()?;

    let cutouts = args
        .photos
        .iter()
        .map(|p| {
            let photo = memoreel::load_rgba(p)?;
            Cutout::new(cutout.cut(&photo)?, Some(p.clone()))
        })
        .collect::<ReelResult<Vec<_>>>()?;
    let footprints: Vec<_> = cutouts.iter().map(Cutout::footprint).collect();
    let spec = settings.layout.framing(framing, cutouts.len())?;
    let overrides = LayoutOverrides {
        gap_px: args.gap_px,
        scale_pct: args.scale_pct,
        shift_px: args.shift_px,
        ..LayoutOverrides::default()
    };
    let outcome = settings.layout.place_with(&footprints, &spec, &overrides)?;
    let background = memoreel::load_rgba(&args.background)?;
    let start = settings.compositor.render(&background, &cutouts, &outcome)?;

    start.save_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    if let Some(path) = &args.metrics {
        start.save_metrics_json(path)?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(path) = &args.annotated {
        memoreel::annotate(&start.frame, &outcome).save_png(path)?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(ratio) = start.metrics.width_mismatch() {
        eprintln!("warning: photo widths differ by x{ratio:.2}; sizes may look uneven");
    }
    Ok(())
}

fn cmd_title(cfg: &ReelConfig, args: TitleArgs) -> anyhow::Result<()> {
    let spec = match (args.text, args.name) {
        (Some(text), _) => TitleSpec::Plain { text },
        (None, Some(name)) => TitleSpec::Memorial(MemorialTitle {
            name,
            dates: args.dates,
            text: args.epitaph,
        }),
        (None, None) => {
            anyhow::bail!("pass --text for a plain title or --name for a memorial card")
        }
    };
    let a = &cfg.assembly;
    let generator =
        TitleCardGenerator::new(a.canvas, a.title.clone(), a.fonts.clone(), a.profile.clone());
    let corner = a.corner_watermark.as_ref();
    match &args.clip {
        Some(clip) => {
            let ws = workspace(cfg)?;
            let runner = cfg.media_runner(&ws.temp());
            generator.generate(&runner, &spec, args.decoration.as_deref(), corner, &args.out, clip)?;
            eprintln!("wrote {} and {}", args.out.display(), clip.display());
        }
        None => {
            let plan = generator.render_still(&spec, args.decoration.as_deref(), corner, &args.out)?;
            if !plan.fits {
                eprintln!("warning: text was shrunk to the minimum size and may be cramped");
            }
            eprintln!("wrote {}", args.out.display());
        }
    }
    Ok(())
}

fn cmd_assemble(cfg: &ReelConfig, args: AssembleArgs) -> anyhow::Result<()> {
    let ws = workspace(cfg)?;
    let job = match &args.job {
        Some(path) => read_json::<RenderJob>(path, "render job")?,
        None => {
            let out = args.out.clone().context("--out is required without --job")?;
            let mut job = RenderJob::new(args.clips, out);
            job.music = args.music;
            job.background_overlay = args.background;
            job.title = args.title.map(|text| TitleSpec::Plain { text });
            job.watermark = args.free_tier.then(|| cfg.free_tier_watermark.clone());
            job
        }
    };
    let runner = cfg.media_runner(&ws.temp());
    if cfg.ffmpeg.components().count() == 1 && !memoreel::is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg not found on PATH");
    }
    let pipeline = OverlayPipeline::new(Arc::new(runner), cfg.assembly.clone());
    let scratch = ws.job_temp("cli");
    let result = pipeline.run(&job, &scratch);
    if let Err(e) = cleanup_artifacts(&ws, &cfg.retention, &scratch) {
        tracing::warn!(error = %e, "cleanup failed");
    }
    let report = result?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!("wrote {}", report.output.display());
    Ok(())
}

fn cmd_generate(cfg: &ReelConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let client = runway(cfg)?;
    let frame = memoreel::encode_start_frame(&args.frame, &cfg.payload)?;
    let request = GenerationRequest {
        image_data_uri: frame.data_uri,
        prompt: args.prompt,
        duration_sec: args.duration,
    };
    let task = client.start(&request)?;
    eprintln!("task {}", task.id);
    let outputs = memoreel::await_task(&client, &task, &cfg.poll, &mut SystemClock::start())?;
    let url = outputs.first().context("no output url")?;
    client.download(url, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_run(cfg: &ReelConfig, args: RunArgs) -> anyhow::Result<()> {
    let request: VideoRequest = read_json(&args.request, "video request")?;
    let orchestrator = orchestrator(cfg, Arc::new(runway(cfg)?))?;
    let outcome = orchestrator.run(&request)?;
    for failure in &outcome.failures {
        eprintln!(
            "scene '{}' skipped: {} ({})",
            failure.scene, failure.message, failure.remedy
        );
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
