//! [`PdfProcessor`] backed by lopdf, with poppler-utils for rendering and
//! word positions.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use apr_core::defaults::{PDF_CMD_TIMEOUT_SECS, THUMBNAIL_SCALE_PX};
use apr_core::{
    Error, HighlightOutcome, HighlightRect, HighlightRequest, PageText, PdfInfo, PdfProcessor,
    Result,
};

use crate::annotate::{self, HighlightStyle};
use crate::document;
use crate::poppler::{self, PageWords};

/// Default PDF processor.
#[derive(Debug, Clone)]
pub struct LopdfProcessor {
    cmd_timeout: Duration,
    thumbnail_px: u32,
}

impl Default for LopdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfProcessor {
    pub fn new() -> Self {
        Self {
            cmd_timeout: Duration::from_secs(PDF_CMD_TIMEOUT_SECS),
            thumbnail_px: THUMBNAIL_SCALE_PX,
        }
    }

    /// Override the timeout applied to each external command.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.cmd_timeout = timeout;
        self
    }

    /// Rectangles (top-left origin, MediaBox scale) of `text` on `page`.
    fn locate_text(
        &self,
        src: &Path,
        page: usize,
        text: &str,
        mediabox: [f32; 4],
    ) -> Result<Vec<HighlightRect>> {
        let words = poppler::page_words(src, page, self.cmd_timeout)?;
        let hits = poppler::find_text(&words.words, text);
        if hits.is_empty() {
            return Err(Error::NotFound(format!(
                "Text '{}' not found on page {}",
                text, page
            )));
        }
        Ok(hits
            .into_iter()
            .map(|rect| rescale(rect, &words, mediabox))
            .collect())
    }
}

/// pdftotext measures boxes against the displayed page size, which can
/// differ from the MediaBox (CropBox, rotation). Map back onto the MediaBox.
fn rescale(rect: HighlightRect, words: &PageWords, mediabox: [f32; 4]) -> HighlightRect {
    let width = mediabox[2] - mediabox[0];
    let height = mediabox[3] - mediabox[1];
    let sx = if words.width > 0.0 { width / words.width } else { 1.0 };
    let sy = if words.height > 0.0 { height / words.height } else { 1.0 };
    HighlightRect {
        x0: rect.x0 * sx,
        y0: rect.y0 * sy,
        x1: rect.x1 * sx,
        y1: rect.y1 * sy,
    }
}

impl PdfProcessor for LopdfProcessor {
    fn inspect(&self, path: &Path) -> Result<PdfInfo> {
        let doc = document::load(path)?;
        Ok(document::info(&doc))
    }

    fn page_text(&self, path: &Path, pages: Option<&[usize]>) -> Result<Vec<PageText>> {
        let started = Instant::now();
        let doc = document::load(path)?;
        let texts = document::page_text(&doc, pages);
        debug!(
            path = %path.display(),
            result_count = texts.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "pdf: extracted page text"
        );
        Ok(texts)
    }

    fn render_thumbnail(&self, pdf: &Path, dest: &Path) -> Result<()> {
        poppler::render_first_page(pdf, dest, self.thumbnail_px, self.cmd_timeout)
    }

    fn add_highlight(
        &self,
        src: &Path,
        dest: &Path,
        request: &HighlightRequest,
    ) -> Result<HighlightOutcome> {
        let mut doc = document::load(src)?;
        let page_id = annotate::page_id(&doc, request.page)?;
        let mediabox = annotate::media_box(&doc, page_id);

        let text = request
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let rects = match (request.rect, text) {
            (Some(rect), _) => vec![rect],
            (None, Some(text)) => self.locate_text(src, request.page, text, mediabox)?,
            (None, None) => {
                return Err(Error::InvalidInput(
                    "Either rect or text must be provided".to_string(),
                ))
            }
        };

        let style = HighlightStyle::new(&request.color, request.opacity, request.comment.clone());
        let mut highlight_ids = Vec::with_capacity(rects.len());
        for rect in rects {
            let user = annotate::to_user_space(rect, mediabox);
            let id = annotate::add_highlight_annot(&mut doc, page_id, user, &style)?;
            highlight_ids.push(annotate::annotation_id(id));
        }

        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)?;
        doc.save_to(&mut staged)
            .map_err(|e| Error::Pdf(format!("Failed to save {}: {}", dest.display(), e)))?;
        staged.flush()?;
        staged.as_file().sync_all()?;
        staged.persist(dest).map_err(|e| Error::Io(e.error))?;

        info!(
            path = %dest.display(),
            page = request.page,
            result_count = highlight_ids.len(),
            "pdf: highlight written"
        );
        Ok(HighlightOutcome {
            highlight_ids,
            saved_path: dest.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sample_pdf;
    use lopdf::{Document, Object};
    use std::fs;
    use tempfile::TempDir;

    fn write_sample(dir: &Path, pages: usize) -> std::path::PathBuf {
        let path = dir.join("Paper.pdf");
        fs::write(&path, sample_pdf(pages, Some("Sample"), None)).unwrap();
        path
    }

    fn request(page: usize) -> HighlightRequest {
        HighlightRequest {
            page,
            rect: None,
            text: None,
            color: "#ff0000".to_string(),
            opacity: 0.5,
            comment: None,
        }
    }

    fn annots_on_first_page(path: &Path) -> Vec<Object> {
        let doc = Document::load(path).unwrap();
        let page = *doc.get_pages().get(&1).unwrap();
        doc.get_dictionary(page)
            .unwrap()
            .get(b"Annots")
            .map(|a| a.as_array().unwrap().clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_inspect_and_text() {
        let tmp = TempDir::new().unwrap();
        let pdf = write_sample(tmp.path(), 2);
        let processor = LopdfProcessor::new();

        let info = processor.inspect(&pdf).unwrap();
        assert_eq!(info.page_count, 2);
        assert_eq!(info.title.as_deref(), Some("Sample"));

        let text = processor.page_text(&pdf, None).unwrap();
        assert_eq!(text.len(), 2);
        assert!(text[1].text.contains("Page 2"));
    }

    #[test]
    fn test_inspect_garbage_is_pdf_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.pdf");
        fs::write(&path, b"%PDF-1.4 but nothing else").unwrap();
        assert!(matches!(
            LopdfProcessor::new().inspect(&path),
            Err(Error::Pdf(_))
        ));
    }

    #[test]
    fn test_rect_highlight_writes_annotated_copy() {
        let tmp = TempDir::new().unwrap();
        let src = write_sample(tmp.path(), 1);
        let dest = tmp.path().join("Paper_annotated.pdf");
        let mut req = request(0);
        req.rect = Some(HighlightRect {
            x0: 72.0,
            y0: 80.0,
            x1: 300.0,
            y1: 100.0,
        });
        req.comment = Some("important".to_string());

        let outcome = LopdfProcessor::new()
            .add_highlight(&src, &dest, &req)
            .unwrap();

        assert_eq!(outcome.highlight_ids.len(), 1);
        assert_eq!(outcome.saved_path, dest);
        assert_eq!(annots_on_first_page(&dest).len(), 1);
        // The source is never modified
        assert!(annots_on_first_page(&src).is_empty());
    }

    #[test]
    fn test_highlight_page_out_of_range() {
        let tmp = TempDir::new().unwrap();
        let src = write_sample(tmp.path(), 1);
        let mut req = request(5);
        req.text = Some("Page".to_string());
        let err = LopdfProcessor::new()
            .add_highlight(&src, &tmp.path().join("out.pdf"), &req)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_highlight_requires_rect_or_text() {
        let tmp = TempDir::new().unwrap();
        let src = write_sample(tmp.path(), 1);
        let mut req = request(0);
        req.text = Some("   ".to_string());
        let err = LopdfProcessor::new()
            .add_highlight(&src, &tmp.path().join("out.pdf"), &req)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!tmp.path().join("out.pdf").exists());
    }

    #[test]
    fn test_text_highlight_with_pdftotext() {
        if !poppler::is_available("pdftotext") {
            eprintln!("Skipping test_text_highlight_with_pdftotext: pdftotext not installed");
            return;
        }
        let tmp = TempDir::new().unwrap();
        let src = write_sample(tmp.path(), 1);
        let dest = tmp.path().join("Paper_annotated.pdf");
        let processor = LopdfProcessor::new();

        let mut req = request(0);
        req.text = Some("sample paper".to_string());
        let outcome = processor.add_highlight(&src, &dest, &req).unwrap();
        assert_eq!(outcome.highlight_ids.len(), 1);

        req.text = Some("nonexistent phrase".to_string());
        let err = processor.add_highlight(&src, &dest, &req).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_thumbnail_with_pdftoppm() {
        if !poppler::is_available("pdftoppm") {
            eprintln!("Skipping test_thumbnail_with_pdftoppm: pdftoppm not installed");
            return;
        }
        let tmp = TempDir::new().unwrap();
        let src = write_sample(tmp.path(), 1);
        let dest = tmp.path().join("thumbnail.jpg");
        LopdfProcessor::new().render_thumbnail(&src, &dest).unwrap();
        let bytes = fs::read(&dest).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
