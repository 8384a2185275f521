//! # apr-store
//!
//! Filesystem storage for the AI Paper Reader backend.
//!
//! This crate provides:
//! - Workspace path resolution and paper directory discovery
//! - Advisory per-note locking with self-cleaning sidecar files
//! - Markdown note CRUD with append-style patching
//! - Paper upload, listing, search, highlighting and removal
//!
//! All operations are synchronous; async callers should run them on a
//! blocking thread.

pub mod lock;
pub mod notes;
pub mod papers;
pub mod workspace;

pub use lock::{lock_path, NoteLock};
pub use notes::{merge_patch, NoteStore};
pub use papers::{annotated_path, PaperStore};
pub use workspace::{find_note, find_pdf, sanitize, Workspace};
