//! Error taxonomy for the intake pipeline.
//!
//! Every failure is typed at the point it occurs so the retry
//! orchestrator can classify it without inspecting message strings.
//! Terminal errors mean reattempting cannot help (bad archive, missing
//! deployment); retryable errors cover transient engine and I/O trouble.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised by the intake pipeline.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The archive path handed to the extractor does not exist.
    #[error("archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    /// The archive could not be opened or read as a ZIP.
    #[error("archive could not be read: {0}")]
    MalformedArchive(#[from] zip::result::ZipError),

    /// The archive contains zero file entries.
    #[error("ZIP file is empty or contains no files")]
    EmptyArchive,

    /// Every entry was filtered out; carries the aggregated skip reasons.
    #[error("No valid files found in ZIP. Skipped {skipped} files due to: {reasons}")]
    NoValidFiles { skipped: usize, reasons: String },

    /// The external OCR program or its script is not deployed.
    #[error("OCR engine is not deployed: {0}")]
    ScriptMissing(String),

    /// The OCR subprocess exited with a non-zero status.
    #[error("OCR process exited with status {code:?}: {stderr}")]
    OcrProcess { code: Option<i32>, stderr: String },

    /// No parseable JSON payload was found in the subprocess output,
    /// or the payload held no results.
    #[error("Could not extract JSON data from OCR output: {0}")]
    OutputParse(String),

    /// The engine emitted a well-formed payload carrying an error flag.
    #[error("OCR engine reported an error: {0}")]
    EngineReported(String),

    /// Blob store failure while mirroring the archive.
    #[error("blob store error: {0}")]
    Storage(#[from] StorageError),

    /// Filesystem failure during extraction or staging.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntakeError {
    /// Whether the retry orchestrator may reattempt after this error.
    ///
    /// Archive-shape problems and missing deployments are terminal: the
    /// archive will not improve and the engine will not appear between
    /// attempts. Process, parse, and I/O failures are assumed transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ArchiveNotFound(_)
            | Self::MalformedArchive(_)
            | Self::EmptyArchive
            | Self::NoValidFiles { .. }
            | Self::ScriptMissing(_) => false,
            Self::OcrProcess { .. }
            | Self::OutputParse(_)
            | Self::EngineReported(_)
            | Self::Storage(_)
            | Self::Io(_) => true,
        }
    }

    /// Short human-facing message for the HTTP layer.
    ///
    /// Never includes stderr, paths, or stack traces; those go in the
    /// `technicalDetails` field instead.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ArchiveNotFound(_) | Self::MalformedArchive(_) | Self::EmptyArchive => {
                "The uploaded archive could not be read. Please upload a valid ZIP file."
            }
            Self::NoValidFiles { .. } => {
                "The archive contains no supported documents (PDF, JPEG, or PNG)."
            }
            Self::ScriptMissing(_) => {
                "OCR processing is not available on this deployment. Please contact support."
            }
            Self::OcrProcess { .. } | Self::OutputParse(_) | Self::EngineReported(_) => {
                "OCR processing failed. The service may be temporarily unavailable."
            }
            Self::Storage(_) | Self::Io(_) => "OCR processing failed after multiple retries.",
        }
    }

    /// Remediation hint surfaced alongside failures.
    pub fn action_required(&self) -> &'static str {
        "Please try uploading the file again or contact support if the issue persists."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_errors_are_terminal() {
        assert!(!IntakeError::ArchiveNotFound(PathBuf::from("/x.zip")).is_retryable());
        assert!(!IntakeError::EmptyArchive.is_retryable());
        assert!(!IntakeError::NoValidFiles {
            skipped: 3,
            reasons: "unsupported file type".into()
        }
        .is_retryable());
        assert!(!IntakeError::ScriptMissing("ocr_api.py".into()).is_retryable());
    }

    #[test]
    fn test_engine_errors_are_retryable() {
        assert!(IntakeError::OcrProcess {
            code: Some(1),
            stderr: "boom".into()
        }
        .is_retryable());
        assert!(IntakeError::OutputParse("no JSON object in output".into()).is_retryable());
        assert!(IntakeError::EngineReported("upstream 502".into()).is_retryable());
    }

    #[test]
    fn test_parse_error_message_contains_marker() {
        let err = IntakeError::OutputParse("no JSON object in output".into());
        assert!(err.to_string().contains("Could not extract JSON data"));
    }

    #[test]
    fn test_user_message_never_leaks_details() {
        let err = IntakeError::OcrProcess {
            code: Some(137),
            stderr: "Traceback (most recent call last): secret".into(),
        };
        assert!(!err.user_message().contains("Traceback"));
        assert!(!err.user_message().contains("137"));
    }
}
