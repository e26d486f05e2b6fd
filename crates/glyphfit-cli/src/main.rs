//! glyphfit CLI: fit ellipses to O/C glyphs in SVG diagrams.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use glyphfit::document::{find_glyphs, Document};
use glyphfit::{BatchReport, GlyphFitter, PipelineConfig};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "glyphfit")]
#[command(about = "Isolate O/C glyphs in SVG documents and fit axis-aligned ellipses to them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render, segment and fit every target glyph.
    Fit(CliFitArgs),

    /// List target glyph occurrences without rendering.
    Letters {
        /// SVG document to scan.
        #[arg(long)]
        input: PathBuf,

        /// Target characters.
        #[arg(long, default_value = "OC")]
        letters: String,
    },
}

#[derive(Debug, Clone, Args)]
struct CliFitArgs {
    /// SVG file, or a directory scanned for `*.svg`.
    #[arg(long)]
    input: PathBuf,

    /// Path to write the JSON report.
    #[arg(long)]
    out: PathBuf,

    /// JSON pipeline configuration; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target characters.
    #[arg(long)]
    letters: Option<String>,

    /// Raster pixels per document unit.
    #[arg(long)]
    zoom: Option<f64>,

    /// Worker threads (0 = one per core).
    #[arg(long)]
    jobs: Option<usize>,

    /// External rasterizer program.
    #[arg(long)]
    renderer: Option<String>,

    /// Per-render timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Fail glyphs whose fit did not converge instead of evaluating them.
    #[arg(long)]
    reject_unconverged: bool,

    /// Fail rotated or skewed glyphs instead of fitting them.
    #[arg(long)]
    reject_transformed: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn build_pipeline_config(args: &CliFitArgs) -> CliResult<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| -> CliError {
                format!("Failed to read config {}: {}", path.display(), e).into()
            })?;
            PipelineConfig::from_json_str(&text)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(letters) = &args.letters {
        config.letters = letters.clone();
    }
    if let Some(zoom) = args.zoom {
        config.zoom = zoom;
    }
    if let Some(jobs) = args.jobs {
        config.parallelism = jobs;
    }
    if let Some(program) = &args.renderer {
        config.renderer.program = program.clone();
    }
    if let Some(ms) = args.timeout_ms {
        config.renderer.timeout_ms = ms;
    }
    if args.reject_unconverged {
        config.reject_unconverged = true;
    }
    if args.reject_transformed {
        config.reject_transformed = true;
    }
    Ok(config)
}

/// The input file, or the sorted `*.svg` files of the input directory.
fn collect_inputs(input: &Path) -> CliResult<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(format!("No .svg files in {}", input.display()).into());
    }
    Ok(files)
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fit(args) => {
            init_tracing(args.verbose);
            run_fit(&args)
        }
        Commands::Letters { input, letters } => {
            init_tracing(false);
            run_letters(&input, &letters)
        }
    }
}

// ── letters ────────────────────────────────────────────────────────────

fn run_letters(input: &Path, letters: &str) -> CliResult<()> {
    let text = std::fs::read_to_string(input).map_err(|e| -> CliError {
        format!("Failed to read {}: {}", input.display(), e).into()
    })?;
    let doc = Document::parse(&text)?;
    let occurrences = find_glyphs(&doc, letters);

    println!("{}: {} occurrence(s)", input.display(), occurrences.len());
    for occ in &occurrences {
        let [cx, cy] = occ.nominal_box.center();
        println!(
            "  #{:<3} '{}' {:<6} index {:<3} in {:?}  size {:.2}  nominal center ({:.2}, {:.2}){}",
            occ.id,
            occ.ch,
            occ.shape.code(),
            occ.index_in_run,
            occ.source_text,
            occ.font.size,
            cx,
            cy,
            if occ.axis_aligned { "" } else { "  [transformed]" },
        );
    }
    Ok(())
}

// ── fit ────────────────────────────────────────────────────────────────

fn print_summary(batch: &BatchReport) {
    for doc in &batch.documents {
        match &doc.error {
            Some(e) => println!("{}: error: {}", doc.name, e),
            None => println!(
                "{}: {} glyph(s), {} accepted, {} rejected, {} failed",
                doc.name,
                doc.summary.total,
                doc.summary.accepted,
                doc.summary.rejected,
                doc.summary.failed
            ),
        }
    }
    let g = &batch.summary.glyphs;
    println!(
        "total: {} document(s) ({} unreadable), {} glyph(s), {:.1}% accepted",
        batch.summary.documents,
        batch.summary.documents_failed,
        g.total,
        100.0 * g.acceptance_rate()
    );
    for (reason, n) in &g.failures {
        println!("  failed {:<22} {}", reason.code(), n);
    }
    for (metric, n) in &g.rejections {
        println!("  rejected on {:<17} {}", metric.code(), n);
    }
}

fn run_fit(args: &CliFitArgs) -> CliResult<()> {
    let config = build_pipeline_config(args)?;
    let inputs = collect_inputs(&args.input)?;
    tracing::info!(
        "Fitting '{}' in {} document(s) at zoom {}",
        config.letters,
        inputs.len(),
        config.zoom
    );

    let fitter = GlyphFitter::with_command_renderer(config)?;
    let batch = fitter.fit_batch(&inputs);

    let json = serde_json::to_string_pretty(&batch)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());

    print_summary(&batch);
    Ok(())
}
