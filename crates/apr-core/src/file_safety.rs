//! Upload validation for PDF files.
//!
//! Checks run in a fixed order so the cheapest rejection wins:
//! 1. Size limit (before anything touches the disk)
//! 2. `.pdf` extension
//! 3. Magic byte detection

use crate::error::{Error, Result};

/// MIME type every accepted upload must sniff as.
pub const PDF_MIME: &str = "application/pdf";

/// Reject payloads larger than `max_size_bytes`.
pub fn check_size(len: u64, max_size_bytes: u64) -> Result<()> {
    if len > max_size_bytes {
        return Err(Error::PayloadTooLarge {
            size: len,
            limit: max_size_bytes,
        });
    }
    Ok(())
}

/// Detect actual content type from file magic bytes via `infer`.
pub fn detect_content_type(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|kind| kind.mime_type())
}

/// Strip a case-insensitive `.pdf` extension from `filename`.
///
/// Returns `None` if the name does not end in `.pdf`.
pub fn pdf_stem(filename: &str) -> Option<&str> {
    // Browsers may send a full client path
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if ext.eq_ignore_ascii_case("pdf") {
        Some(stem)
    } else {
        None
    }
}

/// Validate an uploaded PDF and return the stem of its file name.
pub fn validate_pdf_upload<'a>(
    filename: &'a str,
    data: &[u8],
    max_size_bytes: u64,
) -> Result<&'a str> {
    check_size(data.len() as u64, max_size_bytes)?;

    let stem = pdf_stem(filename)
        .ok_or_else(|| Error::InvalidInput("Only PDF files are allowed".to_string()))?;

    match detect_content_type(data) {
        Some(PDF_MIME) => Ok(stem),
        Some(other) => Err(Error::InvalidInput(format!(
            "File '{}' is not a PDF (detected {})",
            filename, other
        ))),
        None => Err(Error::InvalidInput(format!(
            "File '{}' is not a valid PDF (missing %PDF header)",
            filename
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_PDF: &[u8] = b"%PDF-1.5\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n";

    #[test]
    fn test_check_size_at_limit_passes() {
        assert!(check_size(100, 100).is_ok());
    }

    #[test]
    fn test_check_size_one_over_limit_fails() {
        match check_size(101, 100) {
            Err(Error::PayloadTooLarge { size, limit }) => {
                assert_eq!(size, 101);
                assert_eq!(limit, 100);
            }
            other => panic!("Expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_pdf_stem() {
        assert_eq!(pdf_stem("Foo Bar.pdf"), Some("Foo Bar"));
        assert_eq!(pdf_stem("paper.PDF"), Some("paper"));
        assert_eq!(pdf_stem("archive.tar.pdf"), Some("archive.tar"));
        assert_eq!(pdf_stem("C:\\Users\\me\\paper.pdf"), Some("paper"));
        assert_eq!(pdf_stem("notes.md"), None);
        assert_eq!(pdf_stem("pdf"), None);
    }

    #[test]
    fn test_validate_accepts_pdf() {
        let stem = validate_pdf_upload("Attention.pdf", MINIMAL_PDF, 1024).unwrap();
        assert_eq!(stem, "Attention");
    }

    #[test]
    fn test_validate_rejects_extension() {
        let err = validate_pdf_upload("paper.docx", MINIMAL_PDF, 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_non_pdf_content() {
        let err = validate_pdf_upload("paper.pdf", b"hello world", 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_validate_checks_size_before_content() {
        let data = vec![0u8; 2048];
        let err = validate_pdf_upload("paper.txt", &data, 1024).unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_detect_content_type_pdf() {
        assert_eq!(detect_content_type(MINIMAL_PDF), Some(PDF_MIME));
        assert_eq!(detect_content_type(b""), None);
    }
}
