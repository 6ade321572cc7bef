//! Archive extraction into per-request staging directories.
//!
//! Takes an untrusted uploaded ZIP, filters out directory entries and
//! platform metadata, extracts only supported document types, and
//! produces a manifest with a parallel skip audit. A single bad entry
//! never fails the batch; an archive with nothing usable does.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::intake::error::IntakeError;
use crate::intake::types::{ExtractedFile, ExtractionManifest, SkipReason, SkippedFile};
use crate::utils::mime::supported_mime_for;

/// Extracts uploaded archives into `{staging_root}/{request_id}/`.
pub struct ArchiveExtractor {
    staging_root: PathBuf,
}

impl ArchiveExtractor {
    pub fn new(staging_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
        }
    }

    /// Staging directory for one request.
    pub fn staging_dir(&self, request_id: &str) -> PathBuf {
        self.staging_root.join(request_id)
    }

    /// Extract all supported entries of `archive_path` into the staging
    /// directory for `request_id`.
    ///
    /// Entries are flattened to their basename; per-request namespacing
    /// keeps concurrent requests from colliding. On failure the partial
    /// staging directory is removed before the error propagates.
    pub fn extract(
        &self,
        archive_path: &Path,
        request_id: &str,
    ) -> Result<ExtractionManifest, IntakeError> {
        if !archive_path.exists() {
            return Err(IntakeError::ArchiveNotFound(archive_path.to_path_buf()));
        }

        let extract_dir = self.staging_dir(request_id);
        std::fs::create_dir_all(&extract_dir)?;

        let result = self.extract_entries(archive_path, &extract_dir);
        if result.is_err() {
            remove_staging_dir(&extract_dir);
        }
        result
    }

    fn extract_entries(
        &self,
        archive_path: &Path,
        extract_dir: &Path,
    ) -> Result<ExtractionManifest, IntakeError> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        tracing::info!(
            entries = archive.len(),
            archive = %archive_path.display(),
            "enumerating archive"
        );

        let mut manifest = ExtractionManifest::default();
        let mut file_entries = 0usize;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                tracing::debug!(name = entry.name(), "skipping directory entry");
                continue;
            }
            file_entries += 1;

            let entry_path = entry.name().to_string();
            let file_name = match Path::new(&entry_path).file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                // Undecodable or empty basename; treat as metadata noise.
                None => {
                    manifest.skipped.push(SkippedFile {
                        name: entry_path,
                        reason: SkipReason::SystemMetadata,
                    });
                    continue;
                }
            };

            if is_system_metadata(&entry_path, &file_name) {
                tracing::debug!(name = %entry_path, "skipping metadata file");
                manifest.skipped.push(SkippedFile {
                    name: file_name,
                    reason: SkipReason::SystemMetadata,
                });
                continue;
            }

            let mime_type = match supported_mime_for(&file_name) {
                Some(mime) => mime,
                None => {
                    tracing::debug!(name = %file_name, "skipping unsupported file type");
                    manifest.skipped.push(SkippedFile {
                        name: file_name,
                        reason: SkipReason::UnsupportedType,
                    });
                    continue;
                }
            };

            let target_path = extract_dir.join(&file_name);
            let extracted =
                File::create(&target_path).and_then(|mut out| std::io::copy(&mut entry, &mut out));

            // Verify the target landed; a bad entry must not fail the batch.
            if extracted.is_err() || !target_path.exists() {
                tracing::warn!(name = %file_name, "failed to extract entry");
                manifest.skipped.push(SkippedFile {
                    name: file_name,
                    reason: SkipReason::ExtractionFailed,
                });
                continue;
            }

            log_content_mismatch(&target_path, mime_type);

            manifest.files.push(ExtractedFile {
                name: file_name,
                storage_path: target_path.to_string_lossy().into_owned(),
                mime_type: mime_type.to_string(),
            });
        }

        if file_entries == 0 {
            remove_staging_dir(extract_dir);
            return Err(IntakeError::EmptyArchive);
        }

        if manifest.files.is_empty() {
            remove_staging_dir(extract_dir);
            return Err(IntakeError::NoValidFiles {
                skipped: manifest.skipped.len(),
                reasons: manifest.skip_reason_summary(),
            });
        }

        tracing::info!(
            accepted = manifest.files.len(),
            skipped = manifest.skipped.len(),
            "extraction complete"
        );
        Ok(manifest)
    }
}

/// macOS metadata conventions: AppleDouble files, Finder droppings, and
/// anything under a `__MACOSX` resource path.
fn is_system_metadata(entry_path: &str, file_name: &str) -> bool {
    file_name.starts_with("._")
        || file_name.starts_with(".DS_Store")
        || entry_path.starts_with("__MACOSX")
        || entry_path.contains("__MACOSX/")
}

/// Compare the file's magic bytes against its extension-derived type.
/// Mismatches are logged for the audit trail but still processed; the
/// OCR engine makes its own call on the content.
fn log_content_mismatch(path: &Path, declared_mime: &str) {
    let mut head = [0u8; 8192];
    let read = File::open(path).and_then(|mut f| f.read(&mut head));
    let Ok(n) = read else { return };
    if n == 0 {
        return;
    }
    if let Some(detected) = infer::get(&head[..n]) {
        if detected.mime_type() != declared_mime {
            tracing::warn!(
                file = %path.display(),
                declared = declared_mime,
                detected = detected.mime_type(),
                "extension does not match file content"
            );
        }
    }
}

fn remove_staging_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), "failed to remove staging directory: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])], dirs: &[&str]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for dir in dirs {
            writer.add_directory(*dir, options).unwrap();
        }
        for (name, bytes) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_sample_archive_accepts_and_skips() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("sample.zip");
        write_zip(
            &archive_path,
            &[
                ("a.pdf", b"%PDF-1.4 fake"),
                ("b.jpg", b"\xff\xd8\xff\xe0 fake"),
                ("__MACOSX/._a.pdf", b"applemeta"),
                ("notes.txt", b"not a document"),
            ],
            &["docs/"],
        );

        let extractor = ArchiveExtractor::new(dir.path().join("staging"));
        let manifest = extractor.extract(&archive_path, "req-1").unwrap();

        let names: Vec<&str> = manifest.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.jpg"]);
        assert_eq!(manifest.skipped.len(), 2);
        assert_eq!(manifest.skipped[0].reason, SkipReason::SystemMetadata);
        assert_eq!(manifest.skipped[1].reason, SkipReason::UnsupportedType);

        // Manifest invariant: every accepted path exists on disk.
        for file in &manifest.files {
            assert!(Path::new(&file.storage_path).exists());
        }
    }

    #[test]
    fn test_nested_entries_flatten_to_basename() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("nested.zip");
        write_zip(&archive_path, &[("docs/2024/loan.pdf", b"pdf")], &[]);

        let extractor = ArchiveExtractor::new(dir.path().join("staging"));
        let manifest = extractor.extract(&archive_path, "req-2").unwrap();

        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].name, "loan.pdf");
        assert!(dir
            .path()
            .join("staging")
            .join("req-2")
            .join("loan.pdf")
            .exists());
    }

    #[test]
    fn test_missing_archive() {
        let dir = tempdir().unwrap();
        let extractor = ArchiveExtractor::new(dir.path().join("staging"));
        let err = extractor
            .extract(&dir.path().join("absent.zip"), "req-3")
            .unwrap_err();
        assert!(matches!(err, IntakeError::ArchiveNotFound(_)));
    }

    #[test]
    fn test_empty_archive() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("empty.zip");
        write_zip(&archive_path, &[], &[]);

        let extractor = ArchiveExtractor::new(dir.path().join("staging"));
        let err = extractor.extract(&archive_path, "req-4").unwrap_err();
        assert!(matches!(err, IntakeError::EmptyArchive));
        assert!(!dir.path().join("staging").join("req-4").exists());
    }

    #[test]
    fn test_directories_only_is_empty() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("dirs.zip");
        write_zip(&archive_path, &[], &["a/", "a/b/"]);

        let extractor = ArchiveExtractor::new(dir.path().join("staging"));
        let err = extractor.extract(&archive_path, "req-5").unwrap_err();
        assert!(matches!(err, IntakeError::EmptyArchive));
    }

    #[test]
    fn test_all_filtered_leaves_no_staging_dir() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("junk.zip");
        write_zip(
            &archive_path,
            &[("notes.txt", b"text"), (".DS_Store", b"meta")],
            &[],
        );

        let extractor = ArchiveExtractor::new(dir.path().join("staging"));
        let err = extractor.extract(&archive_path, "req-6").unwrap_err();
        match err {
            IntakeError::NoValidFiles { skipped, reasons } => {
                assert_eq!(skipped, 2);
                assert!(reasons.contains("unsupported file type"));
                assert!(reasons.contains("system metadata file"));
            }
            other => panic!("expected NoValidFiles, got {other:?}"),
        }
        assert!(!dir.path().join("staging").join("req-6").exists());
    }

    #[test]
    fn test_not_a_zip_is_malformed() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("fake.zip");
        std::fs::write(&archive_path, b"this is not a zip archive").unwrap();

        let extractor = ArchiveExtractor::new(dir.path().join("staging"));
        let err = extractor.extract(&archive_path, "req-7").unwrap_err();
        assert!(matches!(err, IntakeError::MalformedArchive(_)));
        assert!(!dir.path().join("staging").join("req-7").exists());
    }
}
