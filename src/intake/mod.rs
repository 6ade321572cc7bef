//! ZIP ingestion and OCR orchestration pipeline.
//!
//! The pipeline takes an archive key naming an uploaded ZIP in the blob
//! store and produces one reconciled document record per supported file
//! inside it:
//!
//! 1. mirror the archive to local storage,
//! 2. extract it into a per-request staging directory,
//! 3. drive the external OCR engine as a subprocess,
//! 4. reconcile engine output with the extraction manifest,
//! 5. clean up ephemeral storage in the background.
//!
//! Steps 2–3 run inside a bounded-retry loop with exponential backoff.
//! Each attempt repeats the full extract+invoke cycle: the previous
//! attempt's partial staging state may be inconsistent, so nothing is
//! cached across attempts. Isolation between concurrent requests comes
//! entirely from the per-request staging namespace; there is no shared
//! mutable state to lock.

mod archive;
mod cleanup;
mod error;
mod invoke;
mod reconcile;
mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::storage::BlobStore;

pub use archive::ArchiveExtractor;
pub use cleanup::{cleanup, spawn_cleanup, sweep_aged, SweepMode, SweepReport};
pub use error::IntakeError;
pub use invoke::OcrInvoker;
pub use reconcile::reconcile;
pub use types::{
    ExtractedFile, ExtractionManifest, OcrResultMap, ProcessedDocument, SkipReason, SkippedFile,
    NO_OCR_TEXT,
};

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Root under which per-request staging directories and mirrored
    /// archives are created.
    pub uploads_dir: PathBuf,
    /// Bucket identity passed through to the OCR engine.
    pub bucket: String,
    /// Interpreter for the OCR script (e.g. `python3`).
    pub ocr_program: String,
    /// Path to the OCR engine entry script.
    pub ocr_script: PathBuf,
    /// Retries after the first attempt (total attempts = max_retries + 1).
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts.
    pub backoff_base: Duration,
}

impl IntakeConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            uploads_dir: settings.uploads_dir.clone(),
            bucket: settings.bucket.clone(),
            ocr_program: settings.ocr.program.clone(),
            ocr_script: settings.ocr.script.clone(),
            max_retries: settings.ocr.max_retries,
            backoff_base: Duration::from_millis(settings.ocr.backoff_base_ms),
        }
    }
}

/// Everything a successful pipeline run hands back to the caller.
#[derive(Debug)]
pub struct IntakeOutcome {
    pub request_id: String,
    pub documents: Vec<ProcessedDocument>,
    pub manifest: ExtractionManifest,
    pub ocr: OcrResultMap,
}

/// The intake pipeline: extract, OCR, reconcile, clean up.
///
/// Constructed once with its collaborators injected; holds no
/// per-request state, so one instance serves concurrent requests.
pub struct IntakePipeline {
    store: Arc<dyn BlobStore>,
    extractor: ArchiveExtractor,
    invoker: OcrInvoker,
    config: IntakeConfig,
}

impl IntakePipeline {
    pub fn new(store: Arc<dyn BlobStore>, config: IntakeConfig) -> Self {
        let extractor = ArchiveExtractor::new(&config.uploads_dir);
        let invoker = OcrInvoker::new(&config.ocr_program, &config.ocr_script, &config.bucket);
        Self {
            store,
            extractor,
            invoker,
            config,
        }
    }

    /// Process one uploaded archive end to end.
    ///
    /// Cleanup of the staging directory and the mirrored archive is
    /// scheduled exactly once, on success and failure alike, and is not
    /// awaited here.
    pub async fn process(&self, archive_key: &str) -> Result<IntakeOutcome, IntakeError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.process_with_request_id(&request_id, archive_key).await
    }

    /// Like [`process`](Self::process), with a caller-supplied request
    /// id so the caller can key job records before the run starts.
    pub async fn process_with_request_id(
        &self,
        request_id: &str,
        archive_key: &str,
    ) -> Result<IntakeOutcome, IntakeError> {
        tracing::info!(request_id, archive_key, "processing archive");

        let archive_path = self
            .config
            .uploads_dir
            .join(format!("{request_id}_temp.zip"));

        let result = self
            .run_request(request_id, archive_key, &archive_path)
            .await;

        spawn_cleanup(
            self.config.uploads_dir.clone(),
            request_id.to_string(),
            archive_path,
        );

        match &result {
            Ok(outcome) => tracing::info!(
                request_id,
                documents = outcome.documents.len(),
                "archive processed"
            ),
            Err(e) => tracing::error!(request_id, "archive processing failed: {e}"),
        }
        result
    }

    async fn run_request(
        &self,
        request_id: &str,
        archive_key: &str,
        archive_path: &Path,
    ) -> Result<IntakeOutcome, IntakeError> {
        self.mirror_archive(archive_key, archive_path).await?;

        let (manifest, ocr) = self
            .run_with_retry(request_id, archive_key, archive_path)
            .await?;
        let documents = reconcile(&manifest, &ocr);

        Ok(IntakeOutcome {
            request_id: request_id.to_string(),
            documents,
            manifest,
            ocr,
        })
    }

    /// Fetch the archive from the blob store onto local disk.
    async fn mirror_archive(
        &self,
        archive_key: &str,
        archive_path: &Path,
    ) -> Result<(), IntakeError> {
        let bytes = self.store.get(archive_key).await?;
        tracing::info!(archive_key, size = bytes.len(), "downloaded archive");
        if bytes.len() < 10_000 {
            // Real document packages are larger; a tiny ZIP usually means
            // a demo file or a truncated upload slipped through.
            tracing::warn!(
                archive_key,
                size = bytes.len(),
                "downloaded ZIP is suspiciously small"
            );
        }
        tokio::fs::create_dir_all(&self.config.uploads_dir).await?;
        tokio::fs::write(archive_path, &bytes).await?;
        Ok(())
    }

    /// Bounded-retry loop over the full extract+invoke cycle.
    ///
    /// Retryable failures back off exponentially (base doubled per
    /// failed attempt) before the next try; the backoff never runs
    /// after the final attempt. Terminal failures abort immediately,
    /// first attempt included. Once the budget is exhausted the last
    /// error is surfaced; there is no silent partial success.
    async fn run_with_retry(
        &self,
        request_id: &str,
        archive_key: &str,
        archive_path: &Path,
    ) -> Result<(ExtractionManifest, OcrResultMap), IntakeError> {
        let max_retries = self.config.max_retries;
        let mut attempt: u32 = 0;

        loop {
            tracing::info!(
                request_id,
                attempt = attempt + 1,
                of = max_retries + 1,
                "OCR attempt"
            );

            let cycle = async {
                let manifest = self.extractor.extract(archive_path, request_id)?;
                let ocr = self.invoker.invoke(request_id, archive_key).await?;
                Ok::<_, IntakeError>((manifest, ocr))
            };

            match cycle.await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() => {
                    tracing::error!(request_id, "terminal intake failure: {e}");
                    return Err(e);
                }
                Err(e) if attempt >= max_retries => {
                    tracing::error!(
                        request_id,
                        attempts = attempt + 1,
                        "retries exhausted: {e}"
                    );
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    let delay = self.config.backoff_base * 2u32.pow(attempt);
                    tracing::warn!(
                        request_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retryable intake failure, backing off: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
