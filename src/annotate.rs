//! Annotation entry points.
//!
//! One request runs the whole document through the engines in [`Engines`]:
//!
//! ```text
//! Received ─▶ Opened ─▶ Rasterized ─▶ Annotating(0) ─▶ … ─▶ Annotating(N-1) ─▶ Finalized
//!     └──────────┴───────────┴──────────────┴───────────────────────┴─────────▶ Failed
//! ```
//!
//! Any error aborts the request: nothing is written and no partial PDF is
//! returned. [`annotate_blocking`] is the synchronous core; the `async`
//! functions move it onto tokio's blocking pool because pdfium and tesseract
//! both block.

use crate::config::AnnotationConfig;
use crate::engines::{Engines, PdfEditor, RasterImage, RecognizedToken, Recognizer, VectorDocument};
use crate::error::AnnotateError;
use crate::geometry::{PageGeometry, PointRect, ScaleFactor};
use crate::output::{AnnotatedPdf, AnnotationReport, DocumentInfo, PageReport};
use crate::pipeline::input;
use crate::storage::{OutputStore, StoredOutput};
use futures::executor::{block_on, ThreadPool};
use futures::stream::{self, StreamExt};
use futures::task::SpawnExt;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where a request currently is. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Opened,
    Rasterized,
    /// Drawing boxes on the given page (0-indexed).
    Annotating(usize),
    Finalized,
    /// Terminal; the request produced no output.
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Opened => write!(f, "opened"),
            Self::Rasterized => write!(f, "rasterized"),
            Self::Annotating(idx) => write!(f, "annotating page {}", idx + 1),
            Self::Finalized => write!(f, "finalized"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Page size, bitmap size and transform, fixed before any OCR runs.
struct PageLayout {
    page: PageGeometry,
    scale: ScaleFactor,
    image_width: u32,
    image_height: u32,
}

struct StateLog {
    state: RequestState,
}

impl StateLog {
    fn new() -> Self {
        debug!("Request {}", RequestState::Received);
        Self {
            state: RequestState::Received,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug!("Request {} → {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: &AnnotateError) {
        warn!("Request failed while {}: {}", self.state, err);
        self.state = RequestState::Failed;
    }
}

/// Annotate a PDF held in memory, on the current thread.
///
/// Rasterises every page at `config.dpi`, recognises each page image, and
/// strokes one rectangle per token whose trimmed text is non-empty and whose
/// confidence is strictly above `config.confidence_threshold`.
///
/// # Errors
/// Input errors ([`AnnotateError::EmptyInput`], [`AnnotateError::NotAPdf`])
/// are raised before any engine is touched. Every later failure aborts the
/// whole request.
pub fn annotate_blocking(
    pdf: &[u8],
    engines: &Engines,
    config: &AnnotationConfig,
) -> Result<AnnotatedPdf, AnnotateError> {
    let mut log = StateLog::new();
    let result = run(pdf, engines, config, &mut log);
    if let Err(ref e) = result {
        log.fail(e);
    }
    result
}

fn run(
    pdf: &[u8],
    engines: &Engines,
    config: &AnnotationConfig,
    log: &mut StateLog,
) -> Result<AnnotatedPdf, AnnotateError> {
    let total_start = Instant::now();
    input::validate_pdf_bytes(pdf)?;
    info!("Annotating {} byte PDF at {} DPI", pdf.len(), config.dpi);

    // ── Step 1: Open ─────────────────────────────────────────────────────
    let mut document = engines.editor.open(pdf)?;
    let total_pages = document.page_count();
    log.advance(RequestState::Opened);

    // ── Step 2: Rasterise once, up front ─────────────────────────────────
    let render_start = Instant::now();
    let images = engines.rasterizer.rasterize(pdf, config.dpi)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    if images.len() != total_pages {
        return Err(AnnotateError::PageCountMismatch {
            document: total_pages,
            rasterized: images.len(),
        });
    }
    info!("Rendered {} pages in {}ms", images.len(), render_duration_ms);
    log.advance(RequestState::Rasterized);

    // ── Step 3: Page geometry and scale ──────────────────────────────────
    // A corrupt raster fails here, before any OCR time is spent.
    let layouts = images
        .iter()
        .enumerate()
        .map(|(idx, image)| {
            let page = document.page_geometry(idx)?;
            let scale = ScaleFactor::between(idx + 1, page, image.width(), image.height())?;
            Ok(PageLayout {
                page,
                scale,
                image_width: image.width(),
                image_height: image.height(),
            })
        })
        .collect::<Result<Vec<_>, AnnotateError>>()?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_annotation_start(total_pages);
    }

    // ── Step 4: Recognise and draw ───────────────────────────────────────
    // Each bitmap is dropped as soon as its page has been recognised.
    let mut ocr_time = Duration::ZERO;
    let mut pages = Vec::with_capacity(total_pages);

    if config.concurrency > 1 && total_pages > 1 {
        let ocr_start = Instant::now();
        let recognized = recognize_concurrent(&engines.recognizer, images, config, total_pages)?;
        ocr_time = ocr_start.elapsed();

        for (idx, (tokens, layout)) in recognized.iter().zip(&layouts).enumerate() {
            log.advance(RequestState::Annotating(idx));
            pages.push(draw_page(
                document.as_mut(),
                idx,
                tokens,
                layout,
                config,
                total_pages,
            )?);
        }
    } else {
        for (idx, (image, layout)) in images.into_iter().zip(&layouts).enumerate() {
            let ocr_start = Instant::now();
            let tokens =
                recognize_page(engines.recognizer.as_ref(), idx, &image, config, total_pages)?;
            drop(image);
            ocr_time += ocr_start.elapsed();

            log.advance(RequestState::Annotating(idx));
            pages.push(draw_page(
                document.as_mut(),
                idx,
                &tokens,
                layout,
                config,
                total_pages,
            )?);
        }
    }

    // ── Step 5: Finalise ─────────────────────────────────────────────────
    let bytes = document.finalize()?;
    log.advance(RequestState::Finalized);

    let report = AnnotationReport {
        dpi: config.dpi,
        confidence_threshold: config.confidence_threshold,
        total_tokens: pages.iter().map(|p| p.tokens_recognized).sum(),
        total_boxes: pages.iter().map(|p| p.boxes_drawn).sum(),
        render_duration_ms,
        ocr_duration_ms: ocr_time.as_millis() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        pages,
    };

    info!(
        "Annotation complete: {} pages, {} boxes from {} tokens, {}ms total",
        report.page_count(),
        report.total_boxes,
        report.total_tokens,
        report.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_annotation_complete(total_pages, report.total_boxes);
    }

    Ok(AnnotatedPdf { bytes, report })
}

fn recognize_page(
    recognizer: &dyn Recognizer,
    idx: usize,
    image: &RasterImage,
    config: &AnnotationConfig,
    total_pages: usize,
) -> Result<Vec<RecognizedToken>, AnnotateError> {
    let page_num = idx + 1;
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_start(page_num, total_pages);
    }
    let tokens = recognizer.recognize(image)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_recognized(page_num, total_pages, tokens.len());
    }
    Ok(tokens)
}

/// Recognise pages on a pool of `config.concurrency` worker threads.
///
/// A free worker picks up the next page straight away, so a slow page only
/// holds up itself. Results come back in page order; the first failing page
/// (in page order) wins.
fn recognize_concurrent(
    recognizer: &Arc<dyn Recognizer>,
    images: Vec<RasterImage>,
    config: &AnnotationConfig,
    total_pages: usize,
) -> Result<Vec<Vec<RecognizedToken>>, AnnotateError> {
    let workers = config.concurrency.min(images.len());
    debug!("Recognising {} pages with {} workers", images.len(), workers);

    let pool = ThreadPool::builder()
        .pool_size(workers)
        .name_prefix("ocr-worker-")
        .create()
        .map_err(|e| AnnotateError::Internal(format!("could not start OCR workers: {e}")))?;

    let tasks = images.into_iter().enumerate().map(|(idx, image)| {
        let recognizer = Arc::clone(recognizer);
        let config = config.clone();
        let job = async move {
            recognize_page(recognizer.as_ref(), idx, &image, &config, total_pages)
        };
        let handle = pool.spawn_with_handle(AssertUnwindSafe(job).catch_unwind());
        async move {
            let result = match handle {
                Ok(handle) => handle.await.unwrap_or_else(|_| {
                    Err(AnnotateError::Internal(format!(
                        "OCR worker for page {} panicked",
                        idx + 1
                    )))
                }),
                Err(e) => Err(AnnotateError::Internal(format!(
                    "could not schedule page {}: {e}",
                    idx + 1
                ))),
            };
            (idx, result)
        }
    });

    let mut results: Vec<_> = block_on(stream::iter(tasks).buffer_unordered(workers).collect());
    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, tokens)| tokens).collect()
}

fn draw_page(
    document: &mut (dyn VectorDocument + '_),
    idx: usize,
    tokens: &[RecognizedToken],
    layout: &PageLayout,
    config: &AnnotationConfig,
    total_pages: usize,
) -> Result<PageReport, AnnotateError> {
    let page_num = idx + 1;
    let rects: Vec<PointRect> = tokens
        .iter()
        .filter(|t| t.is_drawable(config.confidence_threshold))
        .map(|t| layout.scale.map(&t.bbox))
        .collect();

    if !rects.is_empty() {
        document.draw_rects(idx, &rects, &config.box_style)?;
    }
    debug!(
        "Page {}/{}: {} tokens, {} boxes",
        page_num,
        total_pages,
        tokens.len(),
        rects.len()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_page_complete(page_num, total_pages, rects.len());
    }

    Ok(PageReport {
        page_num,
        width_pt: layout.page.width,
        height_pt: layout.page.height,
        image_width_px: layout.image_width,
        image_height_px: layout.image_height,
        scale_x: layout.scale.x(),
        scale_y: layout.scale.y(),
        tokens_recognized: tokens.len(),
        boxes_drawn: rects.len(),
    })
}

// ── Async entry points ───────────────────────────────────────────────────

async fn run_blocking<T, F>(f: F) -> Result<T, AnnotateError>
where
    F: FnOnce() -> Result<T, AnnotateError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AnnotateError::Internal(format!("annotation task failed: {e}")))?
}

/// Annotate PDF bytes on tokio's blocking pool.
///
/// # Example
/// ```rust,no_run
/// use ocr_annotate::{annotate_bytes, AnnotationConfig, Engines, PdfiumEngine, TesseractRecognizer};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pdfium = Arc::new(PdfiumEngine::bind(None)?);
/// let engines = Engines::new(pdfium.clone(), Arc::new(TesseractRecognizer::default()), pdfium);
///
/// let bytes = std::fs::read("scan.pdf")?;
/// let annotated = annotate_bytes(bytes, &engines, &AnnotationConfig::default()).await?;
/// std::fs::write("annotated.pdf", &annotated.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn annotate_bytes(
    pdf: Vec<u8>,
    engines: &Engines,
    config: &AnnotationConfig,
) -> Result<AnnotatedPdf, AnnotateError> {
    let engines = engines.clone();
    let config = config.clone();
    run_blocking(move || annotate_blocking(&pdf, &engines, &config)).await
}

/// Annotate an uploaded file.
///
/// The upload name is checked for a `.pdf` extension before anything else;
/// a mismatch is rejected with [`AnnotateError::InvalidInput`] without
/// rasterising or recognising anything.
pub async fn annotate_upload(
    filename: &str,
    pdf: Vec<u8>,
    engines: &Engines,
    config: &AnnotationConfig,
) -> Result<AnnotatedPdf, AnnotateError> {
    input::validate_filename(filename)?;
    info!("Upload '{}' accepted", filename);
    annotate_bytes(pdf, engines, config).await
}

/// Annotate a PDF on disk.
pub async fn annotate_file(
    path: impl AsRef<Path>,
    engines: &Engines,
    config: &AnnotationConfig,
) -> Result<AnnotatedPdf, AnnotateError> {
    let pdf = input::read_pdf(path.as_ref()).await?;
    annotate_bytes(pdf, engines, config).await
}

/// Annotate PDF bytes and write the result into the configured output
/// directory under a fresh `annotated_<random>.pdf` name.
///
/// The returned [`StoredOutput`] deletes the file when dropped; keep or
/// persist it to retain the result.
pub async fn annotate_to_store(
    pdf: Vec<u8>,
    engines: &Engines,
    config: &AnnotationConfig,
) -> Result<(StoredOutput, AnnotationReport), AnnotateError> {
    let store = config
        .output_dir
        .clone()
        .map(OutputStore::new)
        .unwrap_or_default();
    let engines = engines.clone();
    let config = config.clone();

    run_blocking(move || {
        let annotated = annotate_blocking(&pdf, &engines, &config)?;
        let stored = store.write(&annotated.bytes)?;
        info!("Wrote annotated PDF to {}", stored.path().display());
        Ok((stored, annotated.report))
    })
    .await
}

/// Annotate `input` and write the result to `output`.
///
/// The document is first written next to `output` under a temporary name
/// and then renamed into place, so `output` never holds a partial file.
pub async fn annotate_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    engines: &Engines,
    config: &AnnotationConfig,
) -> Result<AnnotationReport, AnnotateError> {
    let pdf = input::read_pdf(input_path.as_ref()).await?;
    let dest = output_path.as_ref().to_path_buf();
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let engines = engines.clone();
    let config = config.clone();

    run_blocking(move || {
        let annotated = annotate_blocking(&pdf, &engines, &config)?;
        let path = OutputStore::new(dir)
            .write(&annotated.bytes)?
            .persist(&dest)?;
        info!("Wrote annotated PDF to {}", path.display());
        Ok(annotated.report)
    })
    .await
}

/// Read page sizes without rasterising or running OCR.
pub async fn inspect(
    pdf: Vec<u8>,
    editor: Arc<dyn PdfEditor>,
) -> Result<DocumentInfo, AnnotateError> {
    run_blocking(move || {
        input::validate_pdf_bytes(&pdf)?;
        let document = editor.open(&pdf)?;
        let pages = (0..document.page_count())
            .map(|idx| document.page_geometry(idx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DocumentInfo {
            page_count: pages.len(),
            pages,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display() {
        assert_eq!(RequestState::Received.to_string(), "received");
        assert_eq!(RequestState::Annotating(0).to_string(), "annotating page 1");
        assert_eq!(RequestState::Annotating(4).to_string(), "annotating page 5");
        assert_eq!(RequestState::Failed.to_string(), "failed");
    }

    #[test]
    fn state_log_tracks_transitions() {
        let mut log = StateLog::new();
        assert_eq!(log.state, RequestState::Received);
        log.advance(RequestState::Opened);
        log.advance(RequestState::Annotating(2));
        assert_eq!(log.state, RequestState::Annotating(2));
        log.fail(&AnnotateError::Internal("boom".into()));
        assert_eq!(log.state, RequestState::Failed);
    }
}
