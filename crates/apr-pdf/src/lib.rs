//! # apr-pdf
//!
//! PDF handling for the AI Paper Reader backend.
//!
//! [`LopdfProcessor`] implements [`apr_core::PdfProcessor`]:
//! - document info and per-page text via `lopdf`
//! - first-page thumbnails via `pdftoppm`
//! - highlight annotations, locating text with `pdftotext -bbox`
//!
//! External commands run under a timeout (see [`poppler::run_cmd_with_timeout`]).

pub mod annotate;
pub mod document;
pub mod pages;
pub mod poppler;
pub mod processor;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_fixtures;

pub use pages::parse_page_range;
pub use processor::LopdfProcessor;
