//! Reconciliation of extraction manifests with OCR results.

use crate::intake::types::{ExtractionManifest, OcrResultMap, ProcessedDocument, NO_OCR_TEXT};

/// Join the manifest with the OCR result map into one record per
/// extracted file.
///
/// Total and pure: every manifest entry yields exactly one document, in
/// manifest order, and `ocr_text` is always populated. Files the engine
/// never mentioned (or returned `null` for) get the [`NO_OCR_TEXT`]
/// placeholder; result-map entries with no matching file are ignored.
pub fn reconcile(manifest: &ExtractionManifest, ocr: &OcrResultMap) -> Vec<ProcessedDocument> {
    manifest
        .files
        .iter()
        .map(|file| {
            let ocr_text = ocr
                .get(&file.name)
                .and_then(|text| text.clone())
                .unwrap_or_else(|| NO_OCR_TEXT.to_string());
            ProcessedDocument {
                name: file.name.clone(),
                storage_path: file.storage_path.clone(),
                mime_type: file.mime_type.clone(),
                ocr_text,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::types::ExtractedFile;
    use std::collections::BTreeMap;

    fn manifest_of(names: &[&str]) -> ExtractionManifest {
        ExtractionManifest {
            files: names
                .iter()
                .map(|name| ExtractedFile {
                    name: name.to_string(),
                    storage_path: format!("/tmp/staging/{name}"),
                    mime_type: "application/pdf".to_string(),
                })
                .collect(),
            skipped: vec![],
        }
    }

    #[test]
    fn test_total_join_with_placeholder() {
        let manifest = manifest_of(&["a.pdf", "b.jpg"]);
        let mut ocr: OcrResultMap = BTreeMap::new();
        ocr.insert("a.pdf".into(), Some("text".into()));

        let docs = reconcile(&manifest, &ocr);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].ocr_text, "text");
        assert_eq!(docs[1].ocr_text, NO_OCR_TEXT);
    }

    #[test]
    fn test_null_text_gets_placeholder() {
        let manifest = manifest_of(&["a.pdf"]);
        let mut ocr: OcrResultMap = BTreeMap::new();
        ocr.insert("a.pdf".into(), None);

        let docs = reconcile(&manifest, &ocr);
        assert_eq!(docs[0].ocr_text, NO_OCR_TEXT);
    }

    #[test]
    fn test_empty_map_still_total() {
        let manifest = manifest_of(&["a.pdf", "b.jpg", "c.png"]);
        let docs = reconcile(&manifest, &BTreeMap::new());
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(|d| d.ocr_text == NO_OCR_TEXT));
    }

    #[test]
    fn test_output_follows_manifest_order() {
        let manifest = manifest_of(&["z.pdf", "a.pdf", "m.jpg"]);
        let docs = reconcile(&manifest, &BTreeMap::new());
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["z.pdf", "a.pdf", "m.jpg"]);
    }

    #[test]
    fn test_unmatched_ocr_entries_ignored() {
        let manifest = manifest_of(&["a.pdf"]);
        let mut ocr: OcrResultMap = BTreeMap::new();
        ocr.insert("a.pdf".into(), Some("text".into()));
        ocr.insert("ghost.pdf".into(), Some("phantom".into()));

        let docs = reconcile(&manifest, &ocr);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "a.pdf");
    }

    #[test]
    fn test_idempotent() {
        let manifest = manifest_of(&["a.pdf"]);
        let ocr = BTreeMap::new();
        assert_eq!(reconcile(&manifest, &ocr), reconcile(&manifest, &ocr));
    }
}
