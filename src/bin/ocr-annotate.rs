//! CLI binary for ocr-annotate.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnnotationConfig` and the engine settings, then writes the annotated PDF.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr_annotate::pipeline::input::read_pdf;
use ocr_annotate::{
    annotate_to_file, annotate_to_store, inspect, AnnotationConfig, AnnotationProgressCallback,
    AnnotationReport, Engines, PdfEditor, PdfiumEngine, ProgressCallback, Rgb, TesseractConfig,
    TesseractRecognizer,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Spinner while the document is opened and rendered, then a page bar.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering pages…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    /// Stop the spinner and erase it, so an error prints on a clean line.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl AnnotationProgressCallback for CliProgressCallback {
    fn on_annotation_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Annotating");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_message(format!("OCR page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, boxes_drawn: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{boxes_drawn:>5} boxes")),
        ));
        self.bar.inc(1);
    }

    fn on_annotation_complete(&self, total_pages: usize, boxes_drawn: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} boxes drawn on {} pages",
            green("✔"),
            bold(&boxes_drawn.to_string()),
            total_pages
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Annotate, writing annotated_<random>.pdf to the temp directory
  ocr-annotate scan.pdf

  # Choose the output file
  ocr-annotate scan.pdf -o scan.boxes.pdf

  # Stricter filter, blue boxes, 4 OCR workers
  ocr-annotate --threshold 80 --color '#0000ff' -c 4 scan.pdf -o out.pdf

  # German + English text
  ocr-annotate --lang deu+eng brief.pdf -o brief.boxes.pdf

  # Page sizes only, no OCR
  ocr-annotate --inspect-only scan.pdf

  # Per-page report as JSON on stdout
  ocr-annotate --json scan.pdf -o out.pdf > report.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Log filter, e.g. ocr_annotate=debug
  OCR_ANNOTATE_*    Default for the matching flag (see --help)
"#;

/// Draw OCR word boxes onto a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-annotate",
    version,
    about = "Draw OCR word boxes onto a PDF",
    long_about = "Rasterise each page, recognise words with tesseract, and stroke a rectangle \
around every confidently recognised word on the original vector page.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to annotate.
    input: PathBuf,

    /// Write the annotated PDF to this file.
    #[arg(short, long, env = "OCR_ANNOTATE_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for generated output when --output is not given.
    #[arg(long, env = "OCR_ANNOTATE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "OCR_ANNOTATE_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Draw only words with confidence strictly above this value.
    #[arg(long, env = "OCR_ANNOTATE_THRESHOLD", default_value_t = 60,
          allow_negative_numbers = true)]
    threshold: i32,

    /// Box colour: red, green, blue, black, or #rrggbb.
    #[arg(long, env = "OCR_ANNOTATE_COLOR", default_value = "red")]
    color: Rgb,

    /// Box stroke width in points.
    #[arg(long, env = "OCR_ANNOTATE_LINE_WIDTH", default_value_t = 0.8)]
    line_width: f32,

    /// Pages recognised at once.
    #[arg(short, long, env = "OCR_ANNOTATE_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Tesseract language(s), e.g. eng or deu+eng.
    #[arg(long, env = "OCR_ANNOTATE_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode.
    #[arg(long, env = "OCR_ANNOTATE_PSM")]
    psm: Option<u8>,

    /// Tesseract executable.
    #[arg(long, env = "OCR_ANNOTATE_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// pdfium library file or directory (overrides PDFIUM_LIB_PATH).
    #[arg(long, env = "OCR_ANNOTATE_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCR_ANNOTATE_PASSWORD")]
    password: Option<String>,

    /// Print the annotation report as JSON on stdout.
    #[arg(long, env = "OCR_ANNOTATE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OCR_ANNOTATE_NO_PROGRESS")]
    no_progress: bool,

    /// Print page sizes only, no OCR.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR_ANNOTATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCR_ANNOTATE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs when it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Engines ──────────────────────────────────────────────────────────
    let pdfium = Arc::new(
        PdfiumEngine::bind(cli.pdfium_lib.as_deref())
            .context("Failed to load the pdfium library")?
            .with_password(cli.password.clone()),
    );

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let pdf = read_pdf(&cli.input)
            .await
            .with_context(|| format!("Failed to read {}", cli.input.display()))?;
        let info = inspect(pdf, pdfium as Arc<dyn PdfEditor>)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise page info")?
            );
        } else {
            println!("File:   {}", cli.input.display());
            println!("Pages:  {}", info.page_count);
            for (idx, page) in info.pages.iter().enumerate() {
                println!(
                    "  {:>4}  {:.1} × {:.1} pt",
                    idx + 1,
                    page.width,
                    page.height
                );
            }
        }
        return Ok(());
    }

    let tesseract = TesseractRecognizer::new(TesseractConfig {
        binary: cli.tesseract.clone(),
        language: cli.lang.clone(),
        psm: cli.psm,
    });
    tesseract
        .ensure_available()
        .context("Tesseract is required for annotation")?;

    let engines = Engines::new(pdfium.clone(), Arc::new(tesseract), pdfium);

    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn AnnotationProgressCallback>);

    // ── Run annotation ───────────────────────────────────────────────────
    let outcome = async {
        let config = build_config(&cli, progress)?;
        run_annotation(&cli, &engines, &config).await
    }
    .await;
    if outcome.is_err() {
        if let Some(ref cb) = cli_progress {
            cb.clear();
        }
    }
    let (report, path) = outcome?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    }
    if !cli.quiet {
        print_summary(&report, &path);
    }

    Ok(())
}

/// Annotate to `--output` when given, else to a kept file in the store.
async fn run_annotation(
    cli: &Cli,
    engines: &Engines,
    config: &AnnotationConfig,
) -> Result<(AnnotationReport, PathBuf)> {
    if let Some(ref output_path) = cli.output {
        let report = annotate_to_file(&cli.input, output_path, engines, config)
            .await
            .context("Annotation failed")?;
        return Ok((report, output_path.clone()));
    }

    let pdf = read_pdf(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let (stored, report) = annotate_to_store(pdf, engines, config)
        .await
        .context("Annotation failed")?;
    let path = stored.keep().context("Failed to keep output file")?;
    Ok((report, path))
}

/// Map CLI args to `AnnotationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnnotationConfig> {
    let mut builder = AnnotationConfig::builder()
        .dpi(cli.dpi)
        .confidence_threshold(cli.threshold)
        .stroke(cli.color)
        .line_width(cli.line_width)
        .concurrency(cli.concurrency);

    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &AnnotationReport, path: &std::path::Path) {
    eprintln!(
        "{}  {} pages  {} boxes / {} tokens  {}ms  →  {}",
        green("✔"),
        report.page_count(),
        report.total_boxes,
        report.total_tokens,
        report.total_duration_ms,
        bold(&path.display().to_string()),
    );
    eprintln!(
        "   {}",
        dim(&format!(
            "render {}ms  /  ocr {}ms",
            report.render_duration_ms, report.ocr_duration_ms
        )),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_stops_the_spinner() {
        let cb = CliProgressCallback::new();
        assert!(!cb.bar.is_finished());
        cb.clear();
        assert!(cb.bar.is_finished());
    }
}
