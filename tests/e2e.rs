//! End-to-end tests against the real engines.
//!
//! These tests need the pdfium shared library and a `tesseract` executable
//! with English language data. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/lib cargo test --test e2e -- --nocapture
//!
//! The input documents are generated on the fly: plain PDFs with large
//! Helvetica text that tesseract reads reliably.

use ocr_annotate::{
    annotate_bytes, annotate_to_file, annotate_upload, inspect, AnnotateError, AnnotationConfig,
    Engines, ErrorCategory, PdfEditor, PdfiumEngine, Rasterizer, Recognizer, ScaleFactor,
    TesseractRecognizer, VectorDocument,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set; otherwise bind both engines.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        real_engines()
    }};
}

fn real_engines() -> (Arc<PdfiumEngine>, Engines) {
    // RUST_LOG=ocr_annotate=debug shows the pipeline's state transitions.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let pdfium = Arc::new(PdfiumEngine::bind(None).expect("pdfium should be loadable"));
    let tesseract = TesseractRecognizer::default();
    tesseract
        .ensure_available()
        .expect("tesseract should be on PATH");
    let engines = Engines::new(pdfium.clone(), Arc::new(tesseract), pdfium.clone());
    (pdfium, engines)
}

/// Build a PDF with one US-letter page per entry, each showing its text in
/// 48pt Helvetica with the baseline at (72, 600).
fn text_pdf(pages: &[&str]) -> Vec<u8> {
    build_pdf(pages, None)
}

/// Like [`text_pdf`], with every page cropped to `crop` (`"l b r t"`).
fn cropped_text_pdf(pages: &[&str], crop: &str) -> Vec<u8> {
    build_pdf(pages, Some(crop))
}

fn build_pdf(pages: &[&str], crop: Option<&str>) -> Vec<u8> {
    let n = pages.len();
    let crop_box = crop
        .map(|c| format!(" /CropBox [{c}]"))
        .unwrap_or_default();
    // 1: catalog, 2: pages, 3: font, then (page, content) pairs.
    let page_id = |i: usize| 4 + 2 * i;
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", page_id(i))).collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        let stream = format!("BT /F1 48 Tf 72 600 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792]{} \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            crop_box,
            page_id(i) + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    pdf
}

// ── Inspect ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_generated_pdf() {
    let (pdfium, _) = e2e_skip_unless_ready!();
    let info = inspect(text_pdf(&["HELLO WORLD", "SECOND PAGE"]), pdfium as Arc<dyn PdfEditor>)
        .await
        .expect("inspect() should succeed");

    assert_eq!(info.page_count, 2);
    for page in &info.pages {
        assert!((page.width - 612.0).abs() < 0.5, "width {}", page.width);
        assert!((page.height - 792.0).abs() < 0.5, "height {}", page.height);
    }
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_annotate_two_pages() {
    let (pdfium, engines) = e2e_skip_unless_ready!();
    let input = text_pdf(&["HELLO WORLD", "SECOND PAGE"]);

    let out = annotate_bytes(input, &engines, &AnnotationConfig::default())
        .await
        .expect("annotation should succeed");

    assert!(out.bytes.starts_with(b"%PDF"));
    assert_eq!(out.report.page_count(), 2);
    for page in &out.report.pages {
        assert_eq!(page.image_width_px, 2550, "page {}", page.page_num);
        assert_eq!(page.image_height_px, 3300, "page {}", page.page_num);
        assert!(page.boxes_drawn >= 2, "page {}: {:?}", page.page_num, page);
        assert!(page.boxes_drawn <= page.tokens_recognized);
    }

    // The annotated document reopens with the same page layout.
    let info = inspect(out.bytes, pdfium as Arc<dyn PdfEditor>)
        .await
        .expect("annotated output should reopen");
    assert_eq!(info.page_count, 2);

    println!("{}", serde_json::to_string_pretty(&out.report).unwrap());
}

#[test]
fn test_boxes_land_on_the_printed_words() {
    let (pdfium, _) = e2e_skip_unless_ready!();
    let pdf = text_pdf(&["HELLO WORLD"]);

    let images = pdfium.rasterize(&pdf, 300).expect("rasterize");
    let tokens = TesseractRecognizer::default()
        .recognize(&images[0])
        .expect("recognize");
    let hello = tokens
        .iter()
        .find(|t| t.text.contains("HELLO") && t.is_drawable(60))
        .unwrap_or_else(|| panic!("HELLO not recognised: {tokens:?}"));

    let document = pdfium.open(&pdf).expect("open");
    let page = document.page_geometry(0).expect("geometry");
    let scale = ScaleFactor::between(1, page, images[0].width(), images[0].height()).unwrap();
    let rect = scale.map(&hello.bbox);

    // Text starts at x = 72pt; the baseline sits 192pt below the top edge and
    // 48pt capitals rise roughly 34pt above it.
    assert!((rect.x0 - 72.0).abs() < 8.0, "{rect:?}");
    assert!(rect.y0 > 145.0 && rect.y0 < 170.0, "{rect:?}");
    assert!(rect.y1 > 180.0 && rect.y1 < 200.0, "{rect:?}");
}

/// Bounding box `(min_x, min_y, max_x, max_y)` of the red pixels in `image`.
fn red_pixel_bounds(image: &image::RgbImage) -> Option<(u32, u32, u32, u32)> {
    image
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 200 && p[1] < 80 && p[2] < 80)
        .fold(None, |acc, (x, y, _)| match acc {
            None => Some((x, y, x, y)),
            Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
        })
}

#[tokio::test]
async fn test_boxes_follow_an_offset_crop_box() {
    let (pdfium, engines) = e2e_skip_unless_ready!();
    // Visible area is [36 36 576 756]: its top-left corner sits at user-space
    // (36, 756), so the word starts 36pt from the left edge and its baseline
    // lies 156pt below the top edge.
    let pdf = cropped_text_pdf(&["HELLO WORLD"], "36 36 576 756");

    let info = inspect(pdf.clone(), pdfium.clone() as Arc<dyn PdfEditor>)
        .await
        .expect("inspect() should succeed");
    assert!((info.pages[0].width - 540.0).abs() < 0.5, "{:?}", info.pages);
    assert!((info.pages[0].height - 720.0).abs() < 0.5, "{:?}", info.pages);

    let out = annotate_bytes(pdf, &engines, &AnnotationConfig::default())
        .await
        .expect("annotation should succeed");
    assert!(out.report.total_boxes >= 2);

    // Render the annotated page and find the stroked boxes, at 300 DPI
    // (300/72 px per point).
    let rendered = pdfium.rasterize(&out.bytes, 300).expect("rasterize");
    let rgb = rendered[0].image.to_rgb8();
    let (min_x, min_y, _, max_y) =
        red_pixel_bounds(&rgb).unwrap_or_else(|| panic!("no boxes drawn: {:?}", out.report));

    let pt = |px: u32| px as f64 * 72.0 / 300.0;
    assert!((pt(min_x) - 36.0).abs() < 8.0, "left edge at {}pt", pt(min_x));
    assert!(pt(min_y) > 110.0 && pt(min_y) < 135.0, "top edge at {}pt", pt(min_y));
    assert!(pt(max_y) > 145.0 && pt(max_y) < 170.0, "bottom edge at {}pt", pt(max_y));
}

#[tokio::test]
async fn test_threshold_above_every_score_draws_nothing() {
    let (_, engines) = e2e_skip_unless_ready!();
    let config = AnnotationConfig::builder()
        .confidence_threshold(100)
        .build()
        .unwrap();

    let out = annotate_bytes(text_pdf(&["HELLO WORLD"]), &engines, &config)
        .await
        .expect("annotation should succeed");

    assert_eq!(out.report.total_boxes, 0);
    assert!(out.report.total_tokens > 0);
    assert!(out.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_concurrent_matches_sequential() {
    let (_, engines) = e2e_skip_unless_ready!();
    let pdf = text_pdf(&["ALPHA", "BRAVO", "CHARLIE", "DELTA"]);

    let seq = annotate_bytes(pdf.clone(), &engines, &AnnotationConfig::default())
        .await
        .unwrap();
    let par = annotate_bytes(
        pdf,
        &engines,
        &AnnotationConfig::builder().concurrency(4).build().unwrap(),
    )
    .await
    .unwrap();

    let boxes = |r: &ocr_annotate::AnnotationReport| {
        r.pages.iter().map(|p| p.boxes_drawn).collect::<Vec<_>>()
    };
    assert_eq!(boxes(&seq.report), boxes(&par.report));
}

#[tokio::test]
async fn test_annotate_to_file() {
    let (_, engines) = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hello.pdf");
    let output = dir.path().join("hello.annotated.pdf");
    std::fs::write(&input, text_pdf(&["HELLO WORLD"])).unwrap();

    let report = annotate_to_file(&input, &output, &engines, &AnnotationConfig::default())
        .await
        .expect("annotate_to_file should succeed");

    assert!(report.total_boxes >= 2);
    let written = std::fs::read(&output).unwrap();
    assert!(written.starts_with(b"%PDF"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

// ── Rejections ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_rejects_non_pdf_name() {
    let (_, engines) = e2e_skip_unless_ready!();
    let err = annotate_upload(
        "notes.txt",
        text_pdf(&["HELLO"]),
        &engines,
        &AnnotationConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AnnotateError::InvalidInput { .. }));
    assert_eq!(err.category(), ErrorCategory::BadInput);
}

#[tokio::test]
async fn test_corrupt_pdf_is_processing_failure() {
    let (_, engines) = e2e_skip_unless_ready!();
    let err = annotate_bytes(
        b"%PDF-1.4\nthis is not really a pdf".to_vec(),
        &engines,
        &AnnotationConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AnnotateError::Open { .. }), "{err}");
    assert_eq!(err.status_code(), 500);
}
