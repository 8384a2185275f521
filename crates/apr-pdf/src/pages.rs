//! Page selection strings such as `"0-5"`, `"0,2,5"` or `"3"`.

use apr_core::{Error, Result};

fn index(raw: &str, spec: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("Invalid page range: {:?}", spec)))
}

/// Parse a 0-indexed page selection.
///
/// Accepts a single page, an inclusive `a-b` range, or a comma-separated
/// list of pages. Anything else, including a reversed range, is rejected.
pub fn parse_page_range(spec: &str) -> Result<Vec<usize>> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Page range cannot be empty".to_string()));
    }

    if let Some((start, end)) = trimmed.split_once('-') {
        let (start, end) = (index(start, spec)?, index(end, spec)?);
        if start > end {
            return Err(Error::InvalidInput(format!(
                "Invalid page range: {:?} (start after end)",
                spec
            )));
        }
        return Ok((start..=end).collect());
    }

    trimmed.split(',').map(|part| index(part, spec)).collect()
}
