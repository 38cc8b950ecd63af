//! CLI binary for evidence-dossier.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `render` ingests a saved report file offline.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use evidence_dossier::{
    ingest, ingest_to_file, serve, CaseStore, DossierConfig, IngestOutput,
    IngestProgressCallback, ItemError, PageSize, ProgressCallback, Report, ServerConfig,
    SubmissionContext,
};
use serde::Serialize;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback ────────────────────────────────────────────────────

/// Prints one line per ingestion event to stderr.
struct CliProgressCallback {
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            skipped: AtomicUsize::new(0),
        })
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_case_allocated(&self, case_id: &str) {
        eprintln!("{} {}", cyan("◆"), bold(&format!("Opened {case_id}")));
    }

    fn on_artifact_saved(&self, _case_id: &str, artifact: &str, bytes: usize) {
        eprintln!(
            "  {} {:<24} {}",
            green("✓"),
            artifact,
            dim(&format!("{bytes:>9} bytes"))
        );
    }

    fn on_item_skipped(&self, _case_id: &str, error: &ItemError) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        eprintln!("  {} {}", red("✗"), red(&error.to_string()));
    }

    fn on_dossier_sealed(&self, case_id: &str, exhibits: usize, bytes: usize) {
        let skipped = self.skipped.load(Ordering::SeqCst);
        let mark = if skipped == 0 { green("✔") } else { cyan("⚠") };
        eprintln!(
            "{} {} sealed: {} exhibits, {} bytes{}",
            mark,
            bold(case_id),
            bold(&exhibits.to_string()),
            bytes,
            if skipped == 0 {
                String::new()
            } else {
                format!("  ({} items skipped)", red(&skipped.to_string()))
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the service on the default port
  dossierd serve

  # Custom address and storage location
  dossierd serve --bind 127.0.0.1:8080 --storage-root /srv/evidence

  # Ingest a saved report and keep a copy of the dossier
  dossierd render report.json -o dossier.pdf

  # Machine-readable summary
  dossierd render report.json --json

REPORT FORMAT:
  {
    "images": ["data:image/jpeg;base64,...", ...],
    "video":  "data:video/webm;base64,...",
    "meta":   { "userAgent": "...", "location": { "lat": 1.0, "lon": 2.0 } }
  }
  Every field is optional.

ENVIRONMENT VARIABLES:
  DOSSIER_STORAGE_ROOT        Case directory root (default: evidence_locker)
  DOSSIER_BIND                Listen address (default: 0.0.0.0:3000)
  DOSSIER_MAX_BODY_MB         Request body limit in MiB (default: 50)
  DOSSIER_PAGE_SIZE           a4 | letter
  DOSSIER_DECODE_CONCURRENCY  Parallel image decodes per report
  RUST_LOG                    tracing filter, overrides -v / -q
"#;

/// Evidence intake service and dossier renderer.
#[derive(Parser, Debug)]
#[command(
    name = "dossierd",
    version,
    about = "Ingest evidence reports and render PDF dossiers",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOSSIER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOSSIER_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Ingest a report JSON file into the case store.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Directory holding one subdirectory per case.
    #[arg(long, env = "DOSSIER_STORAGE_ROOT", default_value = "evidence_locker")]
    storage_root: PathBuf,

    /// Paper size of the dossier.
    #[arg(long, env = "DOSSIER_PAGE_SIZE", value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Parallel image decodes per report.
    #[arg(long, env = "DOSSIER_DECODE_CONCURRENCY", default_value_t = 4)]
    decode_concurrency: usize,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Listen address.
    #[arg(long, env = "DOSSIER_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Request body limit in MiB.
    #[arg(long, env = "DOSSIER_MAX_BODY_MB", default_value_t = 50)]
    max_body_mb: usize,

    /// Do not attach the permissive CORS layer.
    #[arg(long, env = "DOSSIER_NO_CORS")]
    no_cors: bool,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Report JSON file.
    report: PathBuf,

    /// Also write the dossier to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Client address recorded in the dossier.
    #[arg(long, default_value = "localhost")]
    client_addr: String,

    /// Print a JSON summary instead of progress lines.
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PageSizeArg {
    A4,
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::Letter,
        }
    }
}

/// `--json` output of `render`.
#[derive(Serialize)]
struct RenderSummary<'a> {
    case_id: &'a str,
    artifacts: &'a [String],
    item_errors: &'a [ItemError],
    stats: &'a evidence_dossier::IngestStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // `render` prints its own progress lines, so library INFO logs would
    // only duplicate them.
    let interactive = matches!(&cli.command, Command::Render(args) if !args.json);
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || interactive {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Render(args) => run_render(args, cli.quiet).await,
    }
}

fn build_config(args: &PipelineArgs, progress: Option<ProgressCallback>) -> Result<DossierConfig> {
    let mut builder = DossierConfig::builder()
        .storage_root(&args.storage_root)
        .page_size(args.page_size.clone().into())
        .decode_concurrency(args.decode_concurrency);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.pipeline, None)?;
    let server = ServerConfig {
        bind_addr: args.bind,
        max_body_bytes: args.max_body_mb.saturating_mul(1024 * 1024),
        permissive_cors: !args.no_cors,
    };
    serve(server, config).await.context("Service failed")
}

async fn run_render(args: RenderArgs, quiet: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.report)
        .await
        .with_context(|| format!("Failed to read {}", args.report.display()))?;
    let report: Report = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid report", args.report.display()))?;

    let progress: Option<ProgressCallback> = if quiet || args.json {
        None
    } else {
        Some(CliProgressCallback::new())
    };
    let config = build_config(&args.pipeline, progress)?;
    let store = CaseStore::open(&config.storage_root)
        .await
        .context("Failed to open case store")?;
    let context = SubmissionContext::now(args.client_addr);

    let output: IngestOutput = match args.output {
        Some(ref path) => ingest_to_file(report, context, &store, &config, path).await,
        None => ingest(report, context, &store, &config).await,
    }
    .context("Ingestion failed")?;

    if args.json {
        let summary = RenderSummary {
            case_id: &output.case_id,
            artifacts: &output.artifacts,
            item_errors: &output.item_errors,
            stats: &output.stats,
        };
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !quiet {
        let location = store.root().join(&output.case_id);
        eprintln!(
            "{} {}",
            dim("Archived in"),
            location.display()
        );
        if let Some(ref path) = args.output {
            eprintln!("{} {}", dim("Copy written to"), path.display());
        }
        eprintln!(
            "{}",
            dim(&format!(
                "{} pages, decode {}ms, render {}ms",
                output.stats.page_count,
                output.stats.decode_duration_ms,
                output.stats.render_duration_ms
            ))
        );
    }

    Ok(())
}
