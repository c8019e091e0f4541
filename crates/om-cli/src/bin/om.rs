use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use ndarray::Array3;
use orthomosaic::om_color::convert_named;
use orthomosaic::om_resample::AreaResampler;
use orthomosaic::{CutlineConfig, LogFeedback, RelatedPath, compute_cutline, related_file_path};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "om")]
#[command(about = "Orthophoto seam-line tools")]
struct Cli {
    /// Log debug diagnostics (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the cutline polygon of one orthophoto.
    #[command(name = "cutline")]
    Cutline(CutlineArgs),
    /// Convert one pixel between color spaces.
    #[command(name = "convert")]
    Convert(ConvertArgs),
    /// Print the derived path of a stage output.
    #[command(name = "paths")]
    Paths(PathsArgs),
}

#[derive(Args, Debug, Clone)]
struct CutlineArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long, required = true)]
    output: PathBuf,
    /// Polygon layer restricting the cutline.
    #[arg(long)]
    crop: Option<PathBuf>,
    /// JSON cutline configuration; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    scale: Option<f64>,
    #[arg(long)]
    band: Option<usize>,
    #[arg(long)]
    threads: Option<usize>,
    /// Write the final cost grid as a 16-bit PNG.
    #[arg(long)]
    debug_cost: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ConvertArgs {
    #[arg(long, default_value = "rgb")]
    from: String,
    #[arg(long, default_value = "lch")]
    to: String,
    #[arg(num_args = 3, required = true, allow_negative_numbers = true)]
    values: Vec<f64>,
}

#[derive(Args, Debug, Clone)]
struct PathsArgs {
    input: PathBuf,
    #[arg(long, default_value = "")]
    prefix: String,
    #[arg(long, default_value = "")]
    postfix: String,
    #[arg(long)]
    base: Option<String>,
    /// Replacement extension, including the leading dot.
    #[arg(long)]
    ext: Option<String>,
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CutlineSummary {
    path: PathBuf,
    area: f64,
    crs: Option<String>,
    vertices: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.cmd {
        Command::Cutline(args) => run_cutline(args),
        Command::Convert(args) => run_convert(args),
        Command::Paths(args) => run_paths(args),
    }
}

fn run_cutline(args: CutlineArgs) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => CutlineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CutlineConfig::default(),
    };
    if let Some(scale) = args.scale {
        cfg.scale = scale;
    }
    if let Some(band) = args.band {
        cfg.band = band;
    }
    if let Some(threads) = args.threads {
        cfg.resample.threads = threads;
    }
    if args.debug_cost.is_some() {
        cfg.debug_cost_path = args.debug_cost.clone();
    }
    log::debug!("cutline config: {cfg:?}");

    let feedback = LogFeedback::new();
    let cutline = compute_cutline(
        &args.input,
        &args.output,
        &cfg,
        args.crop.as_deref(),
        &AreaResampler,
        &feedback,
    )
    .with_context(|| format!("computing cutline for {}", args.input.display()))?;

    let summary = CutlineSummary {
        vertices: cutline.polygon.exterior().0.len(),
        path: cutline.path,
        area: cutline.area,
        crs: cutline.crs,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("serializing summary")?
    );
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let [a, b, c] = args.values[..] else {
        bail!("expected three channel values, got {}", args.values.len());
    };
    let px = Array3::from_shape_vec((3, 1, 1), vec![a, b, c]).context("building pixel stack")?;
    let out = convert_named(&px.view(), &args.from, &args.to)?;
    let values: Vec<String> = out.iter().map(|v| format!("{v:.6}")).collect();
    println!("{}", values.join(" "));
    Ok(())
}

fn run_paths(args: PathsArgs) -> Result<()> {
    let rule = RelatedPath {
        prefix: &args.prefix,
        postfix: &args.postfix,
        replace_base: args.base.as_deref(),
        replace_ext: args.ext.as_deref(),
        temp_dir: args.temp_dir.as_deref(),
    };
    println!("{}", related_file_path(&args.input, &rule).display());
    Ok(())
}
