//! Document-level reads: page count, info dictionary and page text.

use std::path::Path;

use lopdf::{Dictionary, Document, Object};
use tracing::warn;

use apr_core::{Error, PageText, PdfInfo, Result};

pub(crate) fn pdf_error(context: &str, e: lopdf::Error) -> Error {
    Error::Pdf(format!("{}: {}", context, e))
}

/// Load the PDF at `path`.
pub fn load(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|e| pdf_error(&format!("Failed to open {}", path.display()), e))
}

/// Decode a PDF text string: UTF-16BE with BOM, else PDFDocEncoding
/// (treated as Latin-1).
pub fn decode_text_string(bytes: &[u8]) -> String {
    let text = match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => bytes.iter().map(|&b| b as char).collect(),
    };
    text.trim_matches(char::from(0)).trim().to_string()
}

/// The trailer's `/Info` dictionary, following a reference if needed.
fn info_dict(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    let (_, object) = doc.dereference(info).ok()?;
    object.as_dict().ok()
}

fn info_string(doc: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    let value = info.get(key).ok()?;
    let (_, value) = doc.dereference(value).ok()?;
    match value {
        Object::String(bytes, _) => {
            let text = decode_text_string(bytes);
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// Page count and document info of a loaded document.
pub fn info(doc: &Document) -> PdfInfo {
    let mut info = PdfInfo {
        page_count: doc.get_pages().len() as u32,
        ..PdfInfo::default()
    };
    if let Some(dict) = info_dict(doc) {
        info.title = info_string(doc, dict, b"Title");
        info.author = info_string(doc, dict, b"Author");
        info.subject = info_string(doc, dict, b"Subject");
        info.creator = info_string(doc, dict, b"Creator");
        info.producer = info_string(doc, dict, b"Producer");
    }
    info
}

/// Text of the requested 0-indexed pages (every page when `None`).
///
/// Out-of-range indices are skipped. A page whose content cannot be decoded
/// yields empty text rather than failing the whole request.
pub fn page_text(doc: &Document, pages: Option<&[usize]>) -> Vec<PageText> {
    let page_count = doc.get_pages().len();
    let selected: Vec<usize> = match pages {
        Some(indices) => indices.iter().copied().filter(|&p| p < page_count).collect(),
        None => (0..page_count).collect(),
    };

    selected
        .into_iter()
        .map(|page| {
            let text = doc.extract_text(&[page as u32 + 1]).unwrap_or_else(|e| {
                warn!(page, error = %e, "pdf: text extraction failed for page");
                String::new()
            });
            PageText { page, text }
        })
        .collect()
}
