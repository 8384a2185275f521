//! Paper directories: upload, listing, search and removal.
//!
//! Directory-level operations are not locked. The PDF itself is staged in a
//! temp file inside the paper directory and renamed into place, so a failed
//! write never leaves a truncated PDF behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use apr_core::defaults::{ANNOTATED_SUFFIX, THUMBNAIL_FILE_NAME};
use apr_core::file_safety::{check_size, validate_pdf_upload};
use apr_core::logging::{
    DURATION_MS, ERROR_MSG, OPERATION, PAGE_COUNT, PAPER_ID, QUERY, RESULT_COUNT, SIZE_BYTES,
};
use apr_core::{
    Error, HighlightOutcome, HighlightRequest, PageText, PaperMetadata, PdfInfo, PdfMetadata,
    PdfProcessor, Result,
};

use crate::workspace::{find_pdf, sanitize, Workspace};

/// Path of the annotated copy that sits next to `pdf_path`.
pub fn annotated_path(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    pdf_path.with_file_name(format!("{}{}.pdf", stem, ANNOTATED_SUFFIX))
}

/// Store for paper directories and their PDFs.
#[derive(Clone)]
pub struct PaperStore {
    workspace: Workspace,
    pdf: Arc<dyn PdfProcessor>,
    max_upload_bytes: u64,
}

impl std::fmt::Debug for PaperStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperStore")
            .field("workspace", &self.workspace)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl PaperStore {
    pub fn new(workspace: Workspace, pdf: Arc<dyn PdfProcessor>, max_upload_bytes: u64) -> Self {
        Self {
            workspace,
            pdf,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Sanitized id and directory of an existing paper with its PDF.
    fn existing(&self, paper_id: &str) -> Result<(String, PathBuf, PathBuf)> {
        let safe_id = sanitize(paper_id);
        if safe_id.is_empty() {
            return Err(Error::NotFound(format!("Paper not found: {}", paper_id)));
        }
        let dir = self.workspace.paper_dir(&safe_id);
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("Paper not found: {}", safe_id)));
        }
        let pdf = find_pdf(&dir)
            .ok_or_else(|| Error::NotFound(format!("No PDF found for paper: {}", safe_id)))?;
        Ok((safe_id, dir, pdf))
    }

    /// Best-effort document info; failures degrade to the zero value.
    fn inspect_or_default(&self, paper_id: &str, pdf: &Path) -> PdfInfo {
        match self.pdf.inspect(pdf) {
            Ok(info) => info,
            Err(e) => {
                warn!({ PAPER_ID } = %paper_id, { ERROR_MSG } = %e, "papers: metadata extraction failed");
                PdfInfo::default()
            }
        }
    }

    fn describe(&self, paper_id: &str, pdf: &Path) -> PaperMetadata {
        let info = self.inspect_or_default(paper_id, pdf);
        let file_size = fs::metadata(pdf).map(|m| m.len()).unwrap_or(0);
        PaperMetadata {
            id: paper_id.to_string(),
            name: paper_id.to_string(),
            title: info
                .title
                .filter(|t| !t.trim().is_empty())
                .or_else(|| Some(paper_id.to_string())),
            author: info.author.filter(|a| !a.trim().is_empty()),
            page_count: info.page_count,
            file_size,
        }
    }

    /// Validate an uploaded file (size, `.pdf` name, PDF magic) and store
    /// it under the sanitized stem of its file name.
    pub fn upload(&self, filename: &str, bytes: &[u8]) -> Result<PaperMetadata> {
        let stem = validate_pdf_upload(filename, bytes, self.max_upload_bytes)?;
        self.create(stem, bytes)
    }

    /// Create (or replace the PDF of) a paper.
    ///
    /// The size limit is enforced before anything touches the disk.
    /// Metadata extraction and thumbnail rendering are best-effort.
    pub fn create(&self, raw_name: &str, pdf_bytes: &[u8]) -> Result<PaperMetadata> {
        check_size(pdf_bytes.len() as u64, self.max_upload_bytes)?;

        let safe_id = sanitize(raw_name);
        if safe_id.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "Paper name {:?} has no usable characters",
                raw_name
            )));
        }

        let started = Instant::now();
        let dir = self.workspace.paper_dir(&safe_id);
        let created_dir = !dir.exists();
        fs::create_dir_all(&dir)?;

        let target = find_pdf(&dir).unwrap_or_else(|| dir.join(format!("{}.pdf", safe_id)));
        if let Err(e) = write_staged(&dir, &target, pdf_bytes) {
            warn!({ PAPER_ID } = %safe_id, { ERROR_MSG } = %e, "papers: PDF write failed");
            if created_dir {
                let _ = fs::remove_dir_all(&dir);
            }
            return Err(e);
        }

        if let Err(e) = self
            .pdf
            .render_thumbnail(&target, &dir.join(THUMBNAIL_FILE_NAME))
        {
            warn!({ PAPER_ID } = %safe_id, { ERROR_MSG } = %e, "papers: thumbnail generation failed");
        }

        let paper = self.describe(&safe_id, &target);
        info!(
            { PAPER_ID } = %safe_id,
            { OPERATION } = "create",
            { SIZE_BYTES } = pdf_bytes.len(),
            { PAGE_COUNT } = paper.page_count,
            { DURATION_MS } = started.elapsed().as_millis() as u64,
            "papers: stored"
        );
        Ok(paper)
    }

    /// Every paper in the workspace, sorted by id.
    pub fn list(&self) -> Vec<PaperMetadata> {
        let papers: Vec<PaperMetadata> = self
            .workspace
            .list_papers()
            .into_iter()
            .filter_map(|id| {
                let pdf = find_pdf(&self.workspace.paper_dir(&id))?;
                Some(self.describe(&id, &pdf))
            })
            .collect();
        debug!({ RESULT_COUNT } = papers.len(), "papers: listed");
        papers
    }

    /// Papers whose title, author or directory name contains `query`
    /// (case-insensitive).
    pub fn search(&self, query: &str) -> Result<Vec<PaperMetadata>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let contains = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        };

        let matches: Vec<PaperMetadata> = self
            .list()
            .into_iter()
            .filter(|p| p.id.to_lowercase().contains(&needle) || contains(&p.title) || contains(&p.author))
            .collect();
        debug!({ QUERY } = %query, { RESULT_COUNT } = matches.len(), "papers: searched");
        Ok(matches)
    }

    /// Metadata of one paper.
    pub fn get(&self, paper_id: &str) -> Result<PaperMetadata> {
        let (safe_id, _dir, pdf) = self.existing(paper_id)?;
        Ok(self.describe(&safe_id, &pdf))
    }

    /// Path of a paper's recognized PDF.
    pub fn pdf_path(&self, paper_id: &str) -> Result<PathBuf> {
        self.existing(paper_id).map(|(_, _, pdf)| pdf)
    }

    /// Full document metadata with file timestamps.
    pub fn details(&self, paper_id: &str) -> Result<PdfMetadata> {
        let (safe_id, _dir, pdf) = self.existing(paper_id)?;
        let info = self.pdf.inspect(&pdf)?;
        let meta = fs::metadata(&pdf)?;
        let modified_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let created_at = meta
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified_at);

        Ok(PdfMetadata {
            id: safe_id,
            filename: pdf
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            title: info.title,
            author: info.author,
            subject: info.subject,
            creator: info.creator,
            producer: info.producer,
            page_count: info.page_count,
            file_size: meta.len(),
            created_at,
            modified_at,
        })
    }

    /// Text of selected 0-indexed pages (all pages when `pages` is `None`).
    pub fn page_text(&self, paper_id: &str, pages: Option<&[usize]>) -> Result<Vec<PageText>> {
        let (_, _, pdf) = self.existing(paper_id)?;
        self.pdf.page_text(&pdf, pages)
    }

    /// Text of the first `max_pages` pages joined by blank lines.
    pub fn leading_text(&self, paper_id: &str, max_pages: usize) -> Result<String> {
        let pages: Vec<usize> = (0..max_pages).collect();
        let texts = self.page_text(paper_id, Some(&pages))?;
        Ok(texts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Highlight the recognized PDF and save the result as its annotated copy.
    pub fn highlight(&self, paper_id: &str, request: &HighlightRequest) -> Result<HighlightOutcome> {
        let (safe_id, _dir, pdf) = self.existing(paper_id)?;
        let dest = annotated_path(&pdf);
        let outcome = self.pdf.add_highlight(&pdf, &dest, request)?;
        info!(
            { PAPER_ID } = %safe_id,
            { OPERATION } = "highlight",
            { RESULT_COUNT } = outcome.highlight_ids.len(),
            "papers: highlight saved"
        );
        Ok(outcome)
    }

    /// Recursively remove a paper directory (PDF, note, thumbnail, copies).
    pub fn delete(&self, paper_id: &str) -> Result<()> {
        let safe_id = sanitize(paper_id);
        let dir = self.workspace.paper_dir(&safe_id);
        if safe_id.is_empty() || !dir.is_dir() {
            return Err(Error::NotFound(format!("Paper not found: {}", paper_id)));
        }
        fs::remove_dir_all(&dir)?;
        info!({ PAPER_ID } = %safe_id, { OPERATION } = "delete", "papers: deleted");
        Ok(())
    }
}

/// Write `bytes` to a temp file in `dir`, flush it and rename it to `target`.
fn write_staged(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_core::HighlightRect;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const FAKE_PDF: &[u8] = b"%PDF-1.4\n%fake\n";

    /// Processor that reads "pages=N;title=T" out of the file body.
    #[derive(Default)]
    struct StubPdf {
        thumbnails: AtomicUsize,
    }

    impl PdfProcessor for StubPdf {
        fn inspect(&self, path: &Path) -> Result<PdfInfo> {
            let body = fs::read_to_string(path)?;
            let mut info = PdfInfo::default();
            for part in body.lines().last().unwrap_or_default().split(';') {
                match part.split_once('=') {
                    Some(("pages", n)) => {
                        info.page_count = n.parse().map_err(|_| Error::Pdf("bad".into()))?
                    }
                    Some(("title", t)) => info.title = Some(t.to_string()),
                    Some(("author", a)) => info.author = Some(a.to_string()),
                    _ => return Err(Error::Pdf("unparseable".into())),
                }
            }
            Ok(info)
        }

        fn page_text(&self, _path: &Path, pages: Option<&[usize]>) -> Result<Vec<PageText>> {
            Ok(pages
                .unwrap_or(&[0])
                .iter()
                .map(|&page| PageText {
                    page,
                    text: format!("page {}", page),
                })
                .collect())
        }

        fn render_thumbnail(&self, _pdf: &Path, dest: &Path) -> Result<()> {
            self.thumbnails.fetch_add(1, Ordering::SeqCst);
            fs::write(dest, b"jpg")?;
            Ok(())
        }

        fn add_highlight(
            &self,
            src: &Path,
            dest: &Path,
            _request: &HighlightRequest,
        ) -> Result<HighlightOutcome> {
            fs::copy(src, dest)?;
            Ok(HighlightOutcome {
                highlight_ids: vec!["9-0".to_string()],
                saved_path: dest.to_path_buf(),
            })
        }
    }

    fn store_with_limit(limit: u64) -> (TempDir, PaperStore) {
        let tmp = TempDir::new().unwrap();
        let store = PaperStore::new(
            Workspace::new(tmp.path()),
            Arc::new(StubPdf::default()),
            limit,
        );
        (tmp, store)
    }

    fn pdf_body(meta: &str) -> Vec<u8> {
        let mut body = FAKE_PDF.to_vec();
        body.extend_from_slice(meta.as_bytes());
        body
    }

    #[test]
    fn test_annotated_path() {
        assert_eq!(
            annotated_path(Path::new("/ws/A/A.pdf")),
            PathBuf::from("/ws/A/A_annotated.pdf")
        );
    }

    #[test]
    fn test_create_writes_pdf_and_thumbnail() {
        let (tmp, store) = store_with_limit(1024);
        let paper = store
            .create("Foo Bar", &pdf_body("pages=2;title=Attention;author=Vaswani"))
            .unwrap();

        assert_eq!(paper.id, "Foo Bar");
        assert_eq!(paper.page_count, 2);
        assert_eq!(paper.title.as_deref(), Some("Attention"));
        assert_eq!(paper.author.as_deref(), Some("Vaswani"));
        assert!(tmp.path().join("Foo Bar").join("Foo Bar.pdf").is_file());
        assert!(tmp.path().join("Foo Bar").join("thumbnail.jpg").is_file());
    }

    #[test]
    fn test_create_leaves_no_temp_files() {
        let (tmp, store) = store_with_limit(1024);
        store.create("A", &pdf_body("pages=1")).unwrap();
        let names: Vec<String> = fs::read_dir(tmp.path().join("A"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {:?}", names);
    }

    #[test]
    fn test_create_degrades_on_metadata_failure() {
        let (_tmp, store) = store_with_limit(1024);
        let paper = store.create("Broken", &pdf_body("garbage")).unwrap();
        assert_eq!(paper.page_count, 0);
        assert_eq!(paper.title.as_deref(), Some("Broken"));
        assert!(paper.author.is_none());
    }

    #[test]
    fn test_create_oversize_writes_nothing() {
        let (tmp, store) = store_with_limit(8);
        let err = store.create("Big", &[0u8; 9]).unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { size: 9, limit: 8 }));
        assert!(!tmp.path().join("Big").exists());
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let (_tmp, store) = store_with_limit(1024);
        assert!(matches!(
            store.create("../", FAKE_PDF),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_replaces_existing_pdf() {
        let (tmp, store) = store_with_limit(1024);
        store.create("A", &pdf_body("pages=1")).unwrap();
        let paper = store.create("A", &pdf_body("pages=3")).unwrap();
        assert_eq!(paper.page_count, 3);
        let pdfs = fs::read_dir(tmp.path().join("A"))
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|x| x == "pdf")
            })
            .count();
        assert_eq!(pdfs, 1);
    }

    #[test]
    fn test_upload_rejects_non_pdf_name() {
        let (_tmp, store) = store_with_limit(1024);
        assert!(matches!(
            store.upload("paper.txt", FAKE_PDF),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_list_degrades_per_item() {
        let (_tmp, store) = store_with_limit(1024);
        store.create("A", &pdf_body("pages=4")).unwrap();
        store.create("B", &pdf_body("???")).unwrap();

        let papers = store.list();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].id, "A");
        assert_eq!(papers[0].page_count, 4);
        assert_eq!(papers[1].id, "B");
        assert_eq!(papers[1].page_count, 0);
    }

    #[test]
    fn test_search_matches_title_author_and_name() {
        let (_tmp, store) = store_with_limit(1024);
        store
            .create("alpha", &pdf_body("pages=1;title=Deep Residual Learning"))
            .unwrap();
        store
            .create("beta", &pdf_body("pages=1;author=Hinton"))
            .unwrap();
        store.create("Gamma Rays", &pdf_body("junk")).unwrap();

        let ids = |q: &str| -> Vec<String> {
            store.search(q).unwrap().into_iter().map(|p| p.id).collect()
        };
        assert_eq!(ids("RESIDUAL"), vec!["alpha"]);
        assert_eq!(ids("hinton"), vec!["beta"]);
        assert_eq!(ids("gamma"), vec!["Gamma Rays"]);
        assert!(ids("nothing-matches").is_empty());
    }

    #[test]
    fn test_search_empty_query() {
        let (_tmp, store) = store_with_limit(1024);
        assert!(matches!(store.search("  "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_get_not_found_cases() {
        let (tmp, store) = store_with_limit(1024);
        assert!(matches!(store.get("missing"), Err(Error::NotFound(_))));

        fs::create_dir(tmp.path().join("NoPdf")).unwrap();
        assert!(matches!(store.get("NoPdf"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_details_include_timestamps() {
        let (_tmp, store) = store_with_limit(1024);
        store.create("A", &pdf_body("pages=2;title=T")).unwrap();
        let details = store.details("A").unwrap();
        assert_eq!(details.filename, "A.pdf");
        assert_eq!(details.page_count, 2);
        assert!(details.created_at <= Utc::now());
    }

    #[test]
    fn test_leading_text_joins_pages() {
        let (_tmp, store) = store_with_limit(1024);
        store.create("A", &pdf_body("pages=2")).unwrap();
        assert_eq!(store.leading_text("A", 2).unwrap(), "page 0\n\npage 1");
    }

    #[test]
    fn test_highlight_writes_annotated_copy_and_original_stays_recognized() {
        let (tmp, store) = store_with_limit(1024);
        store.create("A", &pdf_body("pages=1")).unwrap();
        let request = HighlightRequest {
            page: 0,
            rect: Some(HighlightRect {
                x0: 0.0,
                y0: 0.0,
                x1: 10.0,
                y1: 10.0,
            }),
            text: None,
            color: "#ffff00".to_string(),
            opacity: 0.5,
            comment: None,
        };
        let outcome = store.highlight("A", &request).unwrap();
        assert_eq!(outcome.saved_path, tmp.path().join("A").join("A_annotated.pdf"));
        assert_eq!(
            store.pdf_path("A").unwrap(),
            tmp.path().join("A").join("A.pdf")
        );
    }

    #[test]
    fn test_delete_removes_directory() {
        let (tmp, store) = store_with_limit(1024);
        store.create("A", &pdf_body("pages=1")).unwrap();
        fs::write(tmp.path().join("A").join("note.md"), "n").unwrap();

        store.delete("A").unwrap();
        assert!(!tmp.path().join("A").exists());
        assert!(matches!(store.delete("A"), Err(Error::NotFound(_))));
    }
}
