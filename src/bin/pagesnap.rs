//! CLI binary for pagesnap.
//!
//! A thin shim over the library crate that maps CLI flags to `RunConfig`
//! and writes the two artifacts.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagesnap::{
    DirectoryCaptureSource, LayoutMode, OcrBackend, PageError, PageRegion, PageSeparator,
    RunConfig, RunProgressCallback, RunStats,
};
use std::io;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one live bar plus per-page log lines.
/// Page events arrive out of order in concurrent mode; the bar only counts.
struct CliProgress {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Recognizing");
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl RunProgressCallback for CliProgress {
    fn on_run_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Captured {total_pages} pages; recognizing…"))
        ));
    }

    fn on_page_complete(&self, page_index: usize, fragments: usize, duration_ms: u64) {
        self.bar.println(format!(
            "  {} Page {:>3}  {:<16}  {}",
            green("✓"),
            page_index + 1,
            dim(&format!("{fragments:>4} fragments")),
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_index: usize, error: &PageError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = truncate_message(&error.to_string(), 79);
        self.bar
            .println(format!("  {} Page {:>3}  {}", red("✗"), page_index + 1, red(&msg)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, stats: &RunStats) {
        self.bar.finish_and_clear();
        if stats.failed_pages == 0 {
            eprintln!(
                "{} {} pages, {} fragments",
                green("✔"),
                bold(&stats.processed_pages.to_string()),
                stats.total_fragments,
            );
        } else {
            eprintln!(
                "{} {}/{} pages recognized  ({} failed, kept as empty pages)",
                cyan("⚠"),
                bold(&stats.processed_pages.to_string()),
                stats.captured_pages,
                red(&stats.failed_pages.to_string()),
            );
        }
    }
}

/// Cap a log line at `max_chars` characters, cutting on a character
/// boundary so multi-byte text (sidecar paths, Japanese error details)
/// never splits mid-glyph.
fn truncate_message(msg: &str, max_chars: usize) -> String {
    match msg.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\u{2026}", &msg[..idx]),
        None => msg.to_string(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Assemble a directory of captures with sidecar OCR results
  pagesnap captures/ -o book.md --pdf book.pdf

  # Vertical Japanese novel, merging layout-broken lines
  pagesnap captures/ --layout vertical --merge-paragraphs -o novel.md --pdf novel.pdf

  # Embed a CJK-capable font in the PDF text layer
  pagesnap captures/ --font NotoSansJP-Regular.ttf -o book.md --pdf book.pdf

SIDECAR OCR RESULTS:
  The default backend reads recognition results from a JSON file next to
  each capture: page_3.png is paired with page_3.json, an array of
  {"text": ..., "bbox": [x, y, w, h], "confidence": ...} entries in pixel
  coordinates with a top-left origin.

  Built with --features ocrs-backend, --backend ocrs runs pure-Rust neural
  OCR instead; models are looked up in ~/.cache/ocrs/ or --model-dir.
"#;

/// Turn e-reader page captures into a Markdown transcript and searchable PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pagesnap",
    version,
    about = "Turn e-reader page captures into a Markdown transcript and a searchable PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory of captured page images (page_1.png, page_2.png, …).
    captures: PathBuf,

    /// Write the Markdown transcript to this file.
    #[arg(short, long, env = "PAGESNAP_OUTPUT", default_value = "book.md")]
    output: PathBuf,

    /// Write the searchable PDF to this file.
    #[arg(long, env = "PAGESNAP_PDF", default_value = "book.pdf")]
    pdf: PathBuf,

    /// Typesetting direction: auto, horizontal, vertical.
    #[arg(long, env = "PAGESNAP_LAYOUT", value_enum, default_value = "auto")]
    layout: LayoutArg,

    /// Crop region the captures were taken with: full, left, right.
    #[arg(long, env = "PAGESNAP_REGION", value_enum, default_value = "full")]
    region: RegionArg,

    /// OCR backend: sidecar, or ocrs (requires the ocrs-backend feature).
    #[arg(long, env = "PAGESNAP_BACKEND", default_value = "sidecar")]
    backend: String,

    /// Directory holding ocrs detection/recognition models.
    #[arg(long, env = "PAGESNAP_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// TTF/OTF font to embed in the PDF text layer (needed for CJK search).
    #[arg(long, env = "PAGESNAP_FONT")]
    font: Option<PathBuf>,

    /// Resolution the captures are placed into the PDF at.
    #[arg(long, env = "PAGESNAP_DPI", default_value_t = 96.0)]
    dpi: f32,

    /// Pages recognized concurrently.
    #[arg(short, long, env = "PAGESNAP_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Hard cap on captured pages.
    #[arg(long, env = "PAGESNAP_MAX_PAGES", default_value_t = 1000)]
    max_pages: usize,

    /// Merge layout-broken lines into paragraphs in the transcript.
    #[arg(long, env = "PAGESNAP_MERGE_PARAGRAPHS")]
    merge_paragraphs: bool,

    /// Page separator: blank, hr, comment, or a custom string.
    #[arg(long, env = "PAGESNAP_SEPARATOR", default_value = "blank")]
    separator: String,

    /// Document title embedded in the PDF.
    #[arg(long, env = "PAGESNAP_TITLE")]
    title: Option<String>,

    /// Disable the progress bar.
    #[arg(long, env = "PAGESNAP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGESNAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGESNAP_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    Auto,
    Horizontal,
    Vertical,
}

impl From<LayoutArg> for LayoutMode {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::Auto => LayoutMode::Auto,
            LayoutArg::Horizontal => LayoutMode::Horizontal,
            LayoutArg::Vertical => LayoutMode::Vertical,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RegionArg {
    Full,
    Left,
    Right,
}

impl From<RegionArg> for PageRegion {
    fn from(v: RegionArg) -> Self {
        match v {
            RegionArg::Full => PageRegion::Full,
            RegionArg::Left => PageRegion::Left,
            RegionArg::Right => PageRegion::Right,
        }
    }
}

fn parse_separator(s: &str) -> PageSeparator {
    match s {
        "blank" | "none" => PageSeparator::Blank,
        "hr" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        custom => PageSeparator::Custom(custom.to_string()),
    }
}

fn build_backend(cli: &Cli) -> Result<Arc<dyn OcrBackend>> {
    match cli.backend.as_str() {
        "sidecar" => Ok(Arc::new(pagesnap::ocr::sidecar::SidecarBackend::new())),
        #[cfg(feature = "ocrs-backend")]
        "ocrs" => {
            let backend = match &cli.model_dir {
                Some(dir) => pagesnap::ocr::ocrs::OcrsBackend::from_model_dir(dir),
                None => pagesnap::ocr::ocrs::OcrsBackend::with_defaults(),
            }
            .context("Failed to load ocrs models")?;
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "ocrs-backend"))]
        "ocrs" => anyhow::bail!(
            "the ocrs backend is not compiled in; rebuild with --features ocrs-backend"
        ),
        other => anyhow::bail!("unknown backend '{other}' (expected sidecar or ocrs)"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    let backend = build_backend(&cli)?;

    let mut builder = RunConfig::builder()
        .region(cli.region.into())
        .layout(cli.layout.into())
        .concurrency(cli.concurrency)
        .max_pages(cli.max_pages)
        .page_separator(parse_separator(&cli.separator))
        .merge_paragraphs(cli.merge_paragraphs)
        .pdf_dpi(cli.dpi);
    if let Some(font) = &cli.font {
        builder = builder.font_path(font);
    }
    if let Some(title) = &cli.title {
        builder = builder.title(title.clone());
    }
    if show_progress {
        builder = builder.progress(CliProgress::new());
    }
    let config = builder.build().context("Invalid configuration")?;

    let mut source = DirectoryCaptureSource::new(&cli.captures, config.region)
        .with_context(|| format!("Failed to scan {}", cli.captures.display()))?;

    let document = pagesnap::run_to_files(&mut source, backend, &config, &cli.output, &cli.pdf)
        .await
        .context("Conversion failed")?;

    if !cli.quiet {
        eprintln!(
            "{} {} → {} + {}",
            green("✔"),
            bold(&format!("{} pages", document.page_count())),
            cli.output.display(),
            cli.pdf.display(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::truncate_message;

    #[test]
    fn short_messages_pass_through() {
        assert_eq!(truncate_message("all fine", 79), "all fine");
    }

    #[test]
    fn truncation_lands_on_char_boundaries() {
        // Multi-byte characters around the cut point must not panic.
        let long = "ページ".repeat(40);
        let cut = truncate_message(&long, 79);
        assert_eq!(cut.chars().count(), 80); // 79 kept + ellipsis
        assert!(cut.ends_with('\u{2026}'));
    }

    #[test]
    fn exact_length_is_not_truncated() {
        let msg = "x".repeat(79);
        assert_eq!(truncate_message(&msg, 79), msg);
    }
}
