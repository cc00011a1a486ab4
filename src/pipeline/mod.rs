//! Pipeline stages and the production engines behind them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ ocr ──▶ (geometry) ──▶ draw
//! (%PDF)    (pdfium)   (tesseract)  (px → pt)   (pdfium)
//! ```
//!
//! 1. [`input`]  — reject non-PDF uploads before any work starts
//! 2. [`render`] — rasterise every page once; blocking, so the async entry
//!    points run it inside `spawn_blocking`
//! 3. [`ocr`]    — recognise words on each page image via the tesseract CLI
//! 4. [`draw`]   — stroke one rectangle per accepted word onto the vector
//!    page and save the document
//!
//! Orchestration (ordering, filtering, failure handling) lives in
//! [`crate::annotate`]; the stages here only know about their own engine.

pub mod draw;
pub mod input;
pub mod ocr;
pub mod render;
