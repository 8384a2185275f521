//! Highlight annotations.
//!
//! Incoming rectangles use a top-left origin with y growing downward. They
//! are converted to PDF user space against the page's MediaBox before being
//! written.

use lopdf::{dictionary, Document, Object, ObjectId};

use apr_core::{Error, HighlightRect, Result};

use crate::document::pdf_error;

const US_LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];

/// Annotation style shared by every rectangle of one request.
#[derive(Debug, Clone)]
pub struct HighlightStyle {
    pub color: [f32; 3],
    pub opacity: f32,
    pub comment: Option<String>,
}

impl HighlightStyle {
    pub fn new(color: &str, opacity: f32, comment: Option<String>) -> Self {
        Self {
            color: parse_hex_color(color).unwrap_or(YELLOW),
            opacity: if opacity.is_finite() {
                opacity.clamp(0.0, 1.0)
            } else {
                1.0
            },
            comment: comment.filter(|c| !c.is_empty()),
        }
    }
}

/// `#rrggbb` to RGB components in `0.0..=1.0`.
pub fn parse_hex_color(color: &str) -> Option<[f32; 3]> {
    let hex = color.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .ok()
            .map(|v| f32::from(v) / 255.0)
    };
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// The page's MediaBox, inherited through `/Parent` when absent.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let mut current = Some(page_id);
    // Page trees are shallow; the bound guards against reference cycles.
    for _ in 0..32 {
        let Some(id) = current else { break };
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Ok(Object::Array(values)) = dict
            .get(b"MediaBox")
            .and_then(|o| doc.dereference(o))
            .map(|(_, o)| o)
        {
            let coords: Vec<f32> = values.iter().filter_map(number).collect();
            if coords.len() == 4 {
                return [coords[0], coords[1], coords[2], coords[3]];
            }
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    US_LETTER
}

/// Convert a top-left-origin rectangle to PDF user space for `mediabox`.
pub fn to_user_space(rect: HighlightRect, mediabox: [f32; 4]) -> HighlightRect {
    let r = rect.normalized();
    let [left, _bottom, _right, top] = mediabox;
    HighlightRect {
        x0: left + r.x0,
        y0: top - r.y1,
        x1: left + r.x1,
        y1: top - r.y0,
    }
}

/// Object id of the 0-indexed `page`.
pub fn page_id(doc: &Document, page: usize) -> Result<ObjectId> {
    let pages = doc.get_pages();
    pages.get(&(page as u32 + 1)).copied().ok_or_else(|| {
        Error::InvalidInput(format!(
            "Invalid page number: {} (document has {} pages)",
            page,
            pages.len()
        ))
    })
}

/// Add a `/Highlight` annotation covering `rect` (user space) to the page.
/// Returns the id of the new annotation object.
pub fn add_highlight_annot(
    doc: &mut Document,
    page_id: ObjectId,
    rect: HighlightRect,
    style: &HighlightStyle,
) -> Result<ObjectId> {
    let HighlightRect { x0, y0, x1, y1 } = rect;
    let mut annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => vec![real(x0), real(y0), real(x1), real(y1)],
        // upper-left, upper-right, lower-left, lower-right
        "QuadPoints" => vec![
            real(x0), real(y1), real(x1), real(y1),
            real(x0), real(y0), real(x1), real(y0),
        ],
        "C" => style.color.iter().map(|&c| real(c)).collect::<Vec<Object>>(),
        "CA" => real(style.opacity),
        "F" => 4i64,
        "P" => page_id,
    };
    if let Some(comment) = &style.comment {
        annot.set("Contents", Object::string_literal(comment.as_str()));
    }
    let annot_id = doc.add_object(annot);

    let annots_ref = doc
        .get_dictionary(page_id)
        .map_err(|e| pdf_error("Page is not a dictionary", e))?
        .get(b"Annots")
        .ok()
        .and_then(|o| o.as_reference().ok());

    match annots_ref {
        Some(array_id) => {
            doc.get_object_mut(array_id)
                .and_then(Object::as_array_mut)
                .map_err(|e| pdf_error("Malformed /Annots array", e))?
                .push(Object::Reference(annot_id));
        }
        None => {
            let page = doc
                .get_dictionary_mut(page_id)
                .map_err(|e| pdf_error("Page is not a dictionary", e))?;
            let mut annots = match page.remove(b"Annots") {
                Some(Object::Array(existing)) => existing,
                _ => Vec::new(),
            };
            annots.push(Object::Reference(annot_id));
            page.set("Annots", annots);
        }
    }

    Ok(annot_id)
}

/// `<object>-<generation>`, the id reported back to clients.
pub fn annotation_id(id: ObjectId) -> String {
    format!("{}-{}", id.0, id.1)
}
