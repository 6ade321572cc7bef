//! Data model for the intake pipeline.
//!
//! Everything here is request-scoped: manifests and OCR maps live only
//! for the duration of one processing request. The reconciled
//! [`ProcessedDocument`] list is the only output that outlives the
//! request, and the caller owns storing it in the document registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder substituted when the OCR engine produced no text for a file.
///
/// Downstream consumers treat a missing `ocr_text` field as a processing
/// bug, so reconciliation always fills this in instead.
pub const NO_OCR_TEXT: &str = "[No OCR text available]";

/// A single file extracted from an uploaded archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFile {
    /// File name as it appeared in the archive (basename only).
    pub name: String,
    /// Absolute path of the extracted file in the staging directory.
    pub storage_path: String,
    /// MIME type inferred from the file extension.
    pub mime_type: String,
}

/// Why an archive entry was not extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// macOS/Finder metadata: `._*`, `.DS_Store`, `__MACOSX/` entries.
    SystemMetadata,
    /// Extension is not one of the supported document types.
    UnsupportedType,
    /// Extraction ran but the target file did not appear on disk.
    ExtractionFailed,
}

impl SkipReason {
    /// Human-readable form used in audit output and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemMetadata => "system metadata file",
            Self::UnsupportedType => "unsupported file type",
            Self::ExtractionFailed => "extraction failed",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An archive entry that was enumerated but not extracted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: SkipReason,
}

/// Result of extracting one archive: accepted files plus a skip audit.
///
/// Invariant: every entry in `files` existed on disk when the manifest
/// was constructed (verified immediately after each extraction).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionManifest {
    pub files: Vec<ExtractedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl ExtractionManifest {
    /// Distinct skip reasons, in first-seen order, joined for diagnostics.
    pub fn skip_reason_summary(&self) -> String {
        let mut seen: Vec<&'static str> = Vec::new();
        for skip in &self.skipped {
            let reason = skip.reason.as_str();
            if !seen.contains(&reason) {
                seen.push(reason);
            }
        }
        seen.join(", ")
    }
}

/// Per-filename OCR output parsed from the engine's stdout payload.
///
/// Keys match [`ExtractedFile::name`], not full paths. `None` means the
/// engine listed the file but returned `null` for its text; absent keys
/// mean the engine never mentioned the file. Both reconcile to
/// [`NO_OCR_TEXT`]. A `BTreeMap` keeps iteration deterministic.
pub type OcrResultMap = BTreeMap<String, Option<String>>;

/// The reconciled unit returned to the caller: one record per extracted
/// file, with OCR text always present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    pub name: String,
    pub storage_path: String,
    pub mime_type: String,
    pub ocr_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_summary_deduplicates() {
        let manifest = ExtractionManifest {
            files: vec![],
            skipped: vec![
                SkippedFile {
                    name: "._a.pdf".into(),
                    reason: SkipReason::SystemMetadata,
                },
                SkippedFile {
                    name: "notes.txt".into(),
                    reason: SkipReason::UnsupportedType,
                },
                SkippedFile {
                    name: "more.txt".into(),
                    reason: SkipReason::UnsupportedType,
                },
            ],
        };
        assert_eq!(
            manifest.skip_reason_summary(),
            "system metadata file, unsupported file type"
        );
    }

    #[test]
    fn test_extracted_file_wire_format() {
        let file = ExtractedFile {
            name: "a.pdf".into(),
            storage_path: "/tmp/uploads/req/a.pdf".into(),
            mime_type: "application/pdf".into(),
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["name"], "a.pdf");
        assert_eq!(json["storagePath"], "/tmp/uploads/req/a.pdf");
        assert_eq!(json["mimeType"], "application/pdf");
    }
}
