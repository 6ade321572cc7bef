//! In-memory document registry.
//!
//! Keyed store for processed documents and per-request processing jobs.
//! The pipeline does not own this store; the HTTP layer populates it
//! after a successful run so the dashboard can list what was ingested.
//! State is process-local and lost on restart, which matches the
//! ephemeral deployment model of the rest of the service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::intake::ProcessedDocument;

/// A processed document held by the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: u64,
    pub name: String,
    pub storage_path: String,
    pub mime_type: String,
    pub ocr_text: String,
    /// Archive the document arrived in.
    pub archive_key: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Lifecycle of one processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

/// Record of one archive-processing request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    pub request_id: String,
    pub archive_key: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    documents: Vec<StoredDocument>,
    jobs: Vec<ProcessingJob>,
    last_id: u64,
}

/// Thread-safe registry of documents and jobs.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    inner: RwLock<RegistryInner>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a processed document, assigning the next id.
    pub async fn add_document(
        &self,
        document: &ProcessedDocument,
        archive_key: &str,
    ) -> StoredDocument {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let stored = StoredDocument {
            id: inner.last_id,
            name: document.name.clone(),
            storage_path: document.storage_path.clone(),
            mime_type: document.mime_type.clone(),
            ocr_text: document.ocr_text.clone(),
            archive_key: archive_key.to_string(),
            uploaded_at: Utc::now(),
        };
        inner.documents.push(stored.clone());
        stored
    }

    pub async fn get_document(&self, id: u64) -> Option<StoredDocument> {
        let inner = self.inner.read().await;
        inner.documents.iter().find(|d| d.id == id).cloned()
    }

    pub async fn list_documents(&self) -> Vec<StoredDocument> {
        self.inner.read().await.documents.clone()
    }

    /// Replace a document's OCR text, returning the updated record.
    pub async fn update_document(&self, id: u64, ocr_text: String) -> Option<StoredDocument> {
        let mut inner = self.inner.write().await;
        let doc = inner.documents.iter_mut().find(|d| d.id == id)?;
        doc.ocr_text = ocr_text;
        Some(doc.clone())
    }

    /// Returns whether a document was actually removed.
    pub async fn delete_document(&self, id: u64) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.documents.len();
        inner.documents.retain(|d| d.id != id);
        inner.documents.len() < before
    }

    pub async fn clear_documents(&self) {
        self.inner.write().await.documents.clear();
    }

    /// Record the start of a processing request.
    pub async fn create_job(&self, request_id: &str, archive_key: &str) -> ProcessingJob {
        let job = ProcessingJob {
            request_id: request_id.to_string(),
            archive_key: archive_key.to_string(),
            status: JobStatus::Processing,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        self.inner.write().await.jobs.push(job.clone());
        job
    }

    pub async fn get_job(&self, request_id: &str) -> Option<ProcessingJob> {
        let inner = self.inner.read().await;
        inner.jobs.iter().find(|j| j.request_id == request_id).cloned()
    }

    /// Mark a job finished, successfully or not.
    pub async fn finish_job(
        &self,
        request_id: &str,
        status: JobStatus,
        error: Option<String>,
    ) -> Option<ProcessingJob> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.iter_mut().find(|j| j.request_id == request_id)?;
        job.status = status;
        job.error = error;
        job.finished_at = Some(Utc::now());
        Some(job.clone())
    }
}
