//! Markdown to HTML rendering for notes.
//!
//! Uses `pulldown-cmark` with GFM-style extensions. Headings receive slug
//! anchors, and a paragraph consisting only of `[TOC]` is replaced by a
//! nested table of contents linking to them.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use pulldown_cmark_escape::escape_html;
use regex::Regex;

/// Marker paragraph replaced by the table of contents.
pub const TOC_MARKER: &str = "[TOC]";

#[derive(Debug, Clone)]
struct HeadingEntry {
    level: usize,
    id: String,
    text: String,
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render Markdown to an HTML fragment.
pub fn render(markdown: &str) -> String {
    let mut events: Vec<Event<'_>> = Parser::new_ext(markdown, options()).collect();
    let headings = assign_heading_ids(&mut events);
    let events = replace_toc_markers(events, &headings);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s-]+").expect("valid separator regex"));

/// Lowercased, hyphen-separated anchor for a heading.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept = NON_SLUG_CHARS.replace_all(&lowered, "");
    SLUG_SEPARATORS
        .replace_all(kept.trim(), "-")
        .trim_matches('-')
        .to_string()
}

fn unique_slug(base: String, seen: &mut HashMap<String, usize>) -> String {
    let base = if base.is_empty() {
        "section".to_string()
    } else {
        base
    };
    let count = seen.entry(base.clone()).or_insert(0);
    let slug = if *count == 0 {
        base
    } else {
        format!("{}_{}", base, count)
    };
    *count += 1;
    slug
}

fn assign_heading_ids(events: &mut [Event<'_>]) -> Vec<HeadingEntry> {
    let mut seen = HashMap::new();
    let mut entries = Vec::new();

    let mut i = 0;
    while i < events.len() {
        let heading = match &events[i] {
            Event::Start(Tag::Heading { level, id, .. }) => {
                Some((*level as usize, id.as_ref().map(|s| s.to_string())))
            }
            _ => None,
        };

        if let Some((level, explicit_id)) = heading {
            let mut text = String::new();
            let mut end = i + 1;
            while end < events.len() {
                match &events[end] {
                    Event::End(TagEnd::Heading(_)) => break,
                    Event::Text(t) | Event::Code(t) => text.push_str(t),
                    _ => {}
                }
                end += 1;
            }

            let id = match explicit_id {
                Some(id) => id,
                None => unique_slug(slugify(&text), &mut seen),
            };
            if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[i] {
                *slot = Some(CowStr::from(id.clone()));
            }

            entries.push(HeadingEntry {
                level,
                id,
                text: text.trim().to_string(),
            });
            i = end;
        }
        i += 1;
    }

    entries
}

/// Index of the `End(Paragraph)` closing a `[TOC]`-only paragraph that
/// starts at `start`.
fn toc_paragraph_end(events: &[Event<'_>], start: usize) -> Option<usize> {
    let mut text = String::new();
    for (offset, event) in events[start + 1..].iter().enumerate() {
        match event {
            Event::Text(t) => text.push_str(t),
            Event::End(TagEnd::Paragraph) => {
                return (text.trim() == TOC_MARKER).then_some(start + 1 + offset);
            }
            _ => return None,
        }
    }
    None
}

fn replace_toc_markers<'a>(events: Vec<Event<'a>>, headings: &[HeadingEntry]) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut i = 0;
    while i < events.len() {
        if matches!(events[i], Event::Start(Tag::Paragraph)) {
            if let Some(end) = toc_paragraph_end(&events, i) {
                out.push(Event::Html(CowStr::from(toc_html(headings))));
                i = end + 1;
                continue;
            }
        }
        out.push(events[i].clone());
        i += 1;
    }
    out
}

fn toc_html(headings: &[HeadingEntry]) -> String {
    let mut html = String::from("<div class=\"toc\">\n");
    let mut open: Vec<usize> = Vec::new();

    for heading in headings {
        while let Some(&top) = open.last() {
            if top > heading.level {
                html.push_str("</li>\n</ul>\n");
                open.pop();
            } else {
                break;
            }
        }
        match open.last() {
            Some(&top) if top == heading.level => html.push_str("</li>\n"),
            _ => {
                html.push_str("<ul>\n");
                open.push(heading.level);
            }
        }
        html.push_str("<li><a href=\"#");
        escape_html(&mut html, &heading.id).ok();
        html.push_str("\">");
        escape_html(&mut html, &heading.text).ok();
        html.push_str("</a>");
    }
    while open.pop().is_some() {
        html.push_str("</li>\n</ul>\n");
    }

    html.push_str("</div>\n");
    html
}
