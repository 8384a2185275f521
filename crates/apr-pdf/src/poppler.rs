//! Thin wrappers around poppler-utils (`pdftoppm`, `pdftotext`).
//!
//! Every invocation is bounded by a timeout. Output is captured through temp
//! files so a chatty child can never block on a full pipe while we poll it.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use apr_core::{Error, HighlightRect, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run `cmd` to completion within `timeout` and return its stdout.
///
/// A non-zero exit status is an error carrying the trimmed stderr.
pub fn run_cmd_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<String> {
    let mut stdout = tempfile::tempfile()?;
    let mut stderr = tempfile::tempfile()?;

    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout.try_clone()?))
        .stderr(Stdio::from(stderr.try_clone()?))
        .spawn()
        .map_err(|e| Error::Pdf(format!("Failed to execute {}: {}", program, e)))?;

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            warn!(program = %program, timeout_secs = timeout.as_secs(), "poppler: command timed out");
            return Err(Error::Pdf(format!(
                "{} timed out after {}s",
                program,
                timeout.as_secs()
            )));
        }
        thread::sleep(POLL_INTERVAL);
    };

    if !status.success() {
        let mut message = String::new();
        stderr.seek(SeekFrom::Start(0))?;
        stderr.read_to_string(&mut message)?;
        return Err(Error::Pdf(format!(
            "{} failed ({}): {}",
            program,
            status,
            message.trim()
        )));
    }

    let mut bytes = Vec::new();
    stdout.seek(SeekFrom::Start(0))?;
    stdout.read_to_end(&mut bytes)?;
    debug!(
        program = %program,
        duration_ms = started.elapsed().as_millis() as u64,
        size_bytes = bytes.len(),
        "poppler: command finished"
    );
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Whether `program` can be spawned at all.
pub fn is_available(program: &str) -> bool {
    Command::new(program)
        .arg("-v")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Render page 1 of `pdf` as a JPEG whose longest side is `scale_px`.
pub fn render_first_page(pdf: &Path, dest: &Path, scale_px: u32, timeout: Duration) -> Result<()> {
    // pdftoppm appends ".jpg" to the output prefix
    let prefix = dest.with_extension("");
    let produced = PathBuf::from(format!("{}.jpg", prefix.display()));

    run_cmd_with_timeout(
        Command::new("pdftoppm")
            .args(["-f", "1", "-l", "1", "-jpeg", "-singlefile", "-scale-to"])
            .arg(scale_px.to_string())
            .arg(pdf)
            .arg(&prefix),
        timeout,
    )?;

    if produced != dest {
        fs::rename(&produced, dest)?;
    }
    Ok(())
}

/// A word box reported by `pdftotext -bbox`, top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    pub text: String,
    pub rect: HighlightRect,
}

/// Word boxes of one page plus the page size they are measured against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageWords {
    pub width: f32,
    pub height: f32,
    pub words: Vec<WordBox>,
}

static PAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<page\s+width="([0-9.]+)"\s+height="([0-9.]+)""#).expect("valid page regex")
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<word\s+xMin="([0-9.\-]+)"\s+yMin="([0-9.\-]+)"\s+xMax="([0-9.\-]+)"\s+yMax="([0-9.\-]+)">([^<]*)</word>"#,
    )
    .expect("valid word regex")
});

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Parse the XHTML that `pdftotext -bbox` writes for a single page.
pub fn parse_bbox(xhtml: &str) -> PageWords {
    let mut page = PageWords::default();
    if let Some(caps) = PAGE_RE.captures(xhtml) {
        page.width = caps[1].parse().unwrap_or(0.0);
        page.height = caps[2].parse().unwrap_or(0.0);
    }

    page.words = WORD_RE
        .captures_iter(xhtml)
        .filter_map(|caps| {
            let coord = |i: usize| caps[i].parse::<f32>().ok();
            Some(WordBox {
                rect: HighlightRect {
                    x0: coord(1)?,
                    y0: coord(2)?,
                    x1: coord(3)?,
                    y1: coord(4)?,
                },
                text: unescape_xml(&caps[5]),
            })
        })
        .collect();
    page
}

/// Word boxes of the 0-indexed `page` of `pdf`.
pub fn page_words(pdf: &Path, page: usize, timeout: Duration) -> Result<PageWords> {
    let number = (page + 1).to_string();
    let xhtml = run_cmd_with_timeout(
        Command::new("pdftotext")
            .arg("-bbox")
            .args(["-f", &number, "-l", &number])
            .arg(pdf)
            .arg("-"),
        timeout,
    )?;
    Ok(parse_bbox(&xhtml))
}

fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Bounding rectangles of every occurrence of `needle` among `words`.
///
/// Matching is case-insensitive. A single-word needle matches any word that
/// contains it; a multi-word needle must match consecutive words, ignoring
/// surrounding punctuation.
pub fn find_text(words: &[WordBox], needle: &str) -> Vec<HighlightRect> {
    let tokens: Vec<String> = needle
        .split_whitespace()
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let normalized: Vec<String> = words.iter().map(|w| normalize_token(&w.text)).collect();

    if tokens.len() == 1 {
        return words
            .iter()
            .zip(&normalized)
            .filter(|(_, n)| n.contains(tokens[0].as_str()))
            .map(|(w, _)| w.rect)
            .collect();
    }

    let mut hits = Vec::new();
    let mut i = 0;
    while i + tokens.len() <= words.len() {
        if normalized[i..i + tokens.len()] == tokens[..] {
            let rect = words[i + 1..i + tokens.len()]
                .iter()
                .fold(words[i].rect, |acc, w| acc.union(w.rect));
            hits.push(rect);
            i += tokens.len();
        } else {
            i += 1;
        }
    }
    hits
}
