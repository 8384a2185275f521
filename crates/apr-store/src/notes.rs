//! Markdown note storage, one note per paper directory.
//!
//! Every write, and every read that feeds a write, happens inside a
//! [`NoteLock`] scope. Deletion is not locked.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use apr_core::defaults::{NOTE_FILE_NAME, NOTE_PATCH_SEPARATOR};
use apr_core::logging::{ERROR_MSG, OPERATION, PAPER_ID, RESULT_COUNT, SIZE_BYTES};
use apr_core::{markdown, Error, Note, NoteMetadata, Result};

use crate::lock::NoteLock;
use crate::workspace::{find_note, sanitize, Workspace};

/// Join existing note content with appended content.
///
/// The separator is inserted only when both sides are non-empty.
pub fn merge_patch(existing: &str, appended: &str) -> String {
    let mut merged =
        String::with_capacity(existing.len() + appended.len() + NOTE_PATCH_SEPARATOR.len());
    merged.push_str(existing);
    if !existing.is_empty() && !appended.is_empty() {
        merged.push_str(NOTE_PATCH_SEPARATOR);
    }
    merged.push_str(appended);
    merged
}

fn to_utc(time: io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

/// Stat-derived metadata for the note at `path`.
pub(crate) fn note_metadata(paper_id: &str, path: &Path) -> Result<NoteMetadata> {
    let meta = fs::metadata(path)?;
    let modified_at = to_utc(meta.modified()).unwrap_or_else(Utc::now);
    let created_at = to_utc(meta.created()).unwrap_or(modified_at);

    Ok(NoteMetadata {
        id: paper_id.to_string(),
        paper_id: paper_id.to_string(),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: meta.len(),
        created_at,
        modified_at,
    })
}

fn not_found(paper_id: &str) -> Error {
    Error::NotFound(format!("No note found for paper: {}", paper_id))
}

/// Read a note file, mapping a vanished file to `NotFound`.
fn read_content(paper_id: &str, path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => not_found(paper_id),
        _ => Error::Io(e),
    })
}

/// Store for paper notes.
#[derive(Debug, Clone)]
pub struct NoteStore {
    workspace: Workspace,
}

impl NoteStore {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// Sanitized id and paper directory. Empty ids are rejected so that the
    /// workspace root itself is never treated as a paper.
    fn resolve(&self, paper_id: &str) -> Result<(String, PathBuf)> {
        let safe_id = sanitize(paper_id);
        if safe_id.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Invalid paper id: {:?}",
                paper_id
            )));
        }
        let dir = self.workspace.paper_dir(&safe_id);
        Ok((safe_id, dir))
    }

    /// Resolve an existing note or fail with `NotFound`.
    fn existing(&self, paper_id: &str) -> Result<(String, PathBuf)> {
        let (safe_id, dir) = self.resolve(paper_id)?;
        let path = find_note(&dir).ok_or_else(|| not_found(&safe_id))?;
        Ok((safe_id, path))
    }

    fn build(&self, paper_id: &str, path: &Path, content: String) -> Result<Note> {
        let metadata = note_metadata(paper_id, path)?;
        let html = markdown::render(&content);
        Ok(Note {
            metadata,
            content,
            html,
        })
    }

    /// Create the note for a paper. Fails with `Conflict` if one resolves.
    pub fn create(&self, paper_id: &str, content: &str) -> Result<Note> {
        let (safe_id, dir) = self.resolve(paper_id)?;
        if find_note(&dir).is_some() {
            warn!({ PAPER_ID } = %safe_id, "notes: create on existing note");
            return Err(Error::Conflict(format!(
                "Note already exists for paper: {}. Use PUT to update.",
                safe_id
            )));
        }

        fs::create_dir_all(&dir)?;
        let path = dir.join(NOTE_FILE_NAME);
        {
            let _lock = NoteLock::acquire(&path)?;
            // Re-check under the lock; a concurrent create may have won.
            if find_note(&dir).is_some() {
                return Err(Error::Conflict(format!(
                    "Note already exists for paper: {}",
                    safe_id
                )));
            }
            fs::write(&path, content)?;
        }

        info!({ PAPER_ID } = %safe_id, { OPERATION } = "create", { SIZE_BYTES } = content.len(), "notes: created");
        self.build(&safe_id, &path, content.to_string())
    }

    /// Read a note and render it.
    pub fn read(&self, paper_id: &str) -> Result<Note> {
        let (safe_id, path) = self.existing(paper_id)?;
        let content = {
            let _lock = NoteLock::acquire(&path)?;
            read_content(&safe_id, &path)?
        };
        debug!({ PAPER_ID } = %safe_id, { OPERATION } = "read", { SIZE_BYTES } = content.len(), "notes: read");
        self.build(&safe_id, &path, content)
    }

    /// Read a note and return only its rendered HTML.
    pub fn render_html(&self, paper_id: &str) -> Result<String> {
        let (safe_id, path) = self.existing(paper_id)?;
        let content = {
            let _lock = NoteLock::acquire(&path)?;
            read_content(&safe_id, &path)?
        };
        Ok(markdown::render(&content))
    }

    /// Replace a note's content.
    pub fn update(&self, paper_id: &str, content: &str) -> Result<Note> {
        let (safe_id, path) = self.existing(paper_id)?;
        {
            let _lock = NoteLock::acquire(&path)?;
            fs::write(&path, content)?;
        }
        info!({ PAPER_ID } = %safe_id, { OPERATION } = "update", { SIZE_BYTES } = content.len(), "notes: updated");
        self.build(&safe_id, &path, content.to_string())
    }

    /// Append to a note. The read and the write share one lock scope.
    pub fn patch(&self, paper_id: &str, appended: &str) -> Result<Note> {
        let (safe_id, path) = self.existing(paper_id)?;
        let merged = {
            let _lock = NoteLock::acquire(&path)?;
            let existing = read_content(&safe_id, &path)?;
            let merged = merge_patch(&existing, appended);
            fs::write(&path, &merged)?;
            merged
        };
        info!({ PAPER_ID } = %safe_id, { OPERATION } = "patch", { SIZE_BYTES } = merged.len(), "notes: patched");
        self.build(&safe_id, &path, merged)
    }

    /// Remove a note file. Not serialized with other note operations.
    pub fn delete(&self, paper_id: &str) -> Result<()> {
        let (safe_id, path) = self.existing(paper_id)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => not_found(&safe_id),
            _ => Error::Io(e),
        })?;
        info!({ PAPER_ID } = %safe_id, { OPERATION } = "delete", "notes: deleted");
        Ok(())
    }

    /// Metadata of every paper's note, newest modification first.
    ///
    /// Notes whose metadata cannot be read are logged and skipped.
    pub fn list(&self, paper_filter: Option<&str>) -> Result<Vec<NoteMetadata>> {
        let filter = paper_filter.map(sanitize);

        let mut notes: Vec<NoteMetadata> = self
            .workspace
            .list_papers()
            .into_iter()
            .filter(|id| filter.as_deref().map_or(true, |f| f == id.as_str()))
            .filter_map(|id| {
                let path = find_note(&self.workspace.paper_dir(&id))?;
                match note_metadata(&id, &path) {
                    Ok(meta) => Some(meta),
                    Err(e) => {
                        warn!({ PAPER_ID } = %id, { ERROR_MSG } = %e, "notes: skipping unreadable note");
                        None
                    }
                }
            })
            .collect();

        notes.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        debug!({ RESULT_COUNT } = notes.len(), "notes: listed");
        Ok(notes)
    }
}
