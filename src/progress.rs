//! Progress-callback trait for per-page annotation events.
//!
//! Inject an [`Arc<dyn AnnotationProgressCallback>`] via
//! [`crate::config::AnnotationConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the document. The CLI uses it to
//! drive a terminal progress bar; a server could forward the events to a
//! websocket instead.
//!
//! # Example
//!
//! ```rust
//! use ocr_annotate::{AnnotationConfig, AnnotationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BoxCounter {
//!     boxes: AtomicUsize,
//! }
//!
//! impl AnnotationProgressCallback for BoxCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, boxes_drawn: usize) {
//!         self.boxes.fetch_add(boxes_drawn, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} boxes", page_num, total_pages, boxes_drawn);
//!     }
//! }
//!
//! let counter = Arc::new(BoxCounter { boxes: AtomicUsize::new(0) });
//!
//! let config = AnnotationConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnnotationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the annotation pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `concurrency > 1`, `on_page_start` and
/// `on_page_recognized` may be called from several worker threads at once.
pub trait AnnotationProgressCallback: Send + Sync {
    /// Called once after rasterisation, before any page is recognised.
    fn on_annotation_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before OCR starts on a page.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when OCR for a page has returned.
    fn on_page_recognized(&self, page_num: usize, total_pages: usize, tokens: usize) {
        let _ = (page_num, total_pages, tokens);
    }

    /// Called once a page's boxes have been drawn.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, boxes_drawn: usize) {
        let _ = (page_num, total_pages, boxes_drawn);
    }

    /// Called once after the document has been saved.
    fn on_annotation_complete(&self, total_pages: usize, boxes_drawn: usize) {
        let _ = (total_pages, boxes_drawn);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnnotationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnnotationConfig`].
pub type ProgressCallback = Arc<dyn AnnotationProgressCallback>;
