//! Workspace path resolution.
//!
//! The workspace root holds one directory per paper. A directory counts as
//! a paper only if it contains a `.pdf` file. Resolution never creates
//! anything on disk except through [`Workspace::ensure_root`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use apr_core::defaults::NOTE_FILE_NAME;
use apr_core::logging::{ERROR_MSG, PATH};
use apr_core::Result;

/// Reduce a raw identifier to the characters allowed in a paper directory
/// name: alphanumerics, `-`, `_` and space. Never fails; the result may be
/// empty.
pub fn sanitize(raw_id: &str) -> String {
    raw_id
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .collect()
}

/// Regular files in `dir` whose extension equals `ext` (ASCII
/// case-insensitive), sorted by file name. A missing or unreadable
/// directory yields an empty list.
fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            trace!({ PATH } = %dir.display(), { ERROR_MSG } = %e, "workspace: read_dir failed");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

/// The recognized PDF of a paper directory: the lexicographically first
/// `.pdf` file by name.
pub fn find_pdf(paper_dir: &Path) -> Option<PathBuf> {
    files_with_extension(paper_dir, "pdf").into_iter().next()
}

/// The note of a paper directory.
///
/// Discovery order: `note.md`, then a `.md` whose stem equals the directory
/// name, then the first `.md` by sorted name.
pub fn find_note(paper_dir: &Path) -> Option<PathBuf> {
    let preferred = paper_dir.join(NOTE_FILE_NAME);
    if preferred.is_file() {
        return Some(preferred);
    }

    let candidates = files_with_extension(paper_dir, "md");
    let dir_name = paper_dir.file_name();
    candidates
        .iter()
        .find(|path| path.file_stem().is_some() && path.file_stem() == dir_name)
        .or_else(|| candidates.first())
        .cloned()
}

/// Resolver for paper directories under a workspace root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the workspace root if it does not exist.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        debug!({ PATH } = %self.root.display(), "workspace: root ready");
        Ok(())
    }

    /// Directory of a paper. Pure path join, no I/O.
    pub fn paper_dir(&self, safe_id: &str) -> PathBuf {
        self.root.join(safe_id)
    }

    /// Ids of all directories under the root that contain a PDF, sorted.
    pub fn list_papers(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!({ PATH } = %self.root.display(), { ERROR_MSG } = %e, "workspace: root not readable");
                return Vec::new();
            }
        };

        let mut papers: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                find_pdf(&entry.path()).map(|_| name)
            })
            .collect();
        papers.sort();
        papers
    }
}
