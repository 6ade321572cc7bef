//! MIME type classification for uploaded loan documents.
//!
//! Intake only accepts the document types the OCR engine understands:
//! PDFs and JPEG/PNG scans. Everything else is recorded as skipped.

/// Map a file name to a supported MIME type by extension.
///
/// Returns `None` for unsupported extensions (and for names without an
/// extension), which the extractor records as a skip rather than an error.
pub fn supported_mime_for(file_name: &str) -> Option<&'static str> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        // Dotfiles like ".pdf" are not documents.
        return None;
    }

    match extension.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Map a supported MIME type back to its canonical extension.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => "pdf",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert_eq!(supported_mime_for("loan.pdf"), Some("application/pdf"));
        assert_eq!(supported_mime_for("scan.jpg"), Some("image/jpeg"));
        assert_eq!(supported_mime_for("scan.jpeg"), Some("image/jpeg"));
        assert_eq!(supported_mime_for("id-card.png"), Some("image/png"));
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(supported_mime_for("LOAN.PDF"), Some("application/pdf"));
        assert_eq!(supported_mime_for("Scan.Jpeg"), Some("image/jpeg"));
    }

    #[test]
    fn test_unsupported_extensions() {
        assert_eq!(supported_mime_for("notes.txt"), None);
        assert_eq!(supported_mime_for("sheet.xlsx"), None);
        assert_eq!(supported_mime_for("archive.zip"), None);
    }

    #[test]
    fn test_no_extension() {
        assert_eq!(supported_mime_for("README"), None);
        assert_eq!(supported_mime_for(""), None);
        assert_eq!(supported_mime_for(".pdf"), None);
    }

    #[test]
    fn test_multiple_dots_uses_last() {
        assert_eq!(
            supported_mime_for("statement.2024.pdf"),
            Some("application/pdf")
        );
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("application/pdf"), "pdf");
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("application/unknown"), "bin");
    }
}
