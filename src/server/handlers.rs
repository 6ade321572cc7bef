//! HTTP endpoint handlers.
//!
//! The handlers translate between the wire contract and the typed core.
//! Raw error details never reach the client directly; failures map to a
//! short human message plus a `technicalDetails` field for support.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::intake::{sweep_aged, SweepMode};
use crate::registry::JobStatus;
use crate::storage::StorageError;

/// Minimum plausible size for a real document package. The demo ZIPs
/// that kept sneaking into uploads were under a kilobyte.
const MIN_UPLOAD_BYTES: usize = 10_000;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Request body for archive processing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub archive_key: Option<String>,
}

/// Run the intake pipeline over an uploaded archive.
pub async fn process_ocr_zip(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> impl IntoResponse {
    let Some(archive_key) = request
        .archive_key
        .filter(|key| !key.trim().is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No archive key provided" })),
        )
            .into_response();
    };

    let request_id = uuid::Uuid::new_v4().to_string();
    state.registry.create_job(&request_id, &archive_key).await;

    match state
        .pipeline
        .process_with_request_id(&request_id, &archive_key)
        .await
    {
        Ok(outcome) => {
            for document in &outcome.documents {
                state.registry.add_document(document, &archive_key).await;
            }
            state
                .registry
                .finish_job(&request_id, JobStatus::Complete, None)
                .await;

            Json(json!({
                "success": true,
                "result": outcome.ocr,
                "localFiles": outcome.manifest.files,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!(request_id, archive_key, "intake failed: {e}");
            state
                .registry
                .finish_job(&request_id, JobStatus::Failed, Some(e.to_string()))
                .await;

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.user_message(),
                    "technicalDetails": e.to_string(),
                    "actionRequired": e.action_required(),
                })),
            )
                .into_response()
        }
    }
}

/// Accept a multipart ZIP upload and stage it in the blob store.
pub async fn upload_zip(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("zipFile") {
                    continue;
                }
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some(bytes);
                        break;
                    }
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "error": format!("Failed to read upload: {e}") })),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("Invalid upload: {e}") })),
                )
                    .into_response();
            }
        }
    }

    let Some(bytes) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No file uploaded" })),
        )
            .into_response();
    };

    if bytes.len() < MIN_UPLOAD_BYTES {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "File too small",
                "details": format!(
                    "The uploaded file is only {} bytes. Real document packages \
                     should be at least 10KB. Please ensure you selected the \
                     correct file.",
                    bytes.len()
                ),
                "fileSize": bytes.len(),
            })),
        )
            .into_response();
    }

    let looks_like_zip = infer::get(&bytes)
        .map(|kind| kind.mime_type() == "application/zip")
        .unwrap_or(false);
    if !looks_like_zip {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Uploaded file is not a ZIP archive" })),
        )
            .into_response();
    }

    let archive_key = format!("uploads/{}.zip", uuid::Uuid::new_v4());
    match state
        .store
        .put(&archive_key, &bytes, "application/zip")
        .await
    {
        Ok(_) => {
            tracing::info!(archive_key, size = bytes.len(), "archive uploaded");
            Json(json!({
                "success": true,
                "archiveKey": archive_key,
                "size": bytes.len(),
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("failed to store uploaded archive: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store uploaded file" })),
            )
                .into_response()
        }
    }
}

/// Preview query parameters.
#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    pub key: Option<String>,
}

/// Stream a stored blob back with its content type.
pub async fn preview_document(
    State(state): State<AppState>,
    Query(params): Query<PreviewParams>,
) -> impl IntoResponse {
    let Some(key) = params.key.filter(|k| !k.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No key provided" })),
        )
            .into_response();
    };

    match state.store.get(&key).await {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(&key).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, content_type.to_string())],
                bytes,
            )
                .into_response()
        }
        Err(StorageError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
        }
        Err(StorageError::InvalidKey(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid key" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(key, "preview failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to load document" })),
            )
                .into_response()
        }
    }
}

/// List all registered documents.
pub async fn list_documents(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.list_documents().await)
}

/// Fetch one registered document.
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    match state.registry.get_document(id).await {
        Some(document) => Json(document).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response(),
    }
}

/// Remove one registered document.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    if state.registry.delete_document(id).await {
        Json(json!({ "success": true })).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
    }
}

/// Look up the status of a processing request.
pub async fn get_job(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get_job(&request_id).await {
        Some(job) => Json(job).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response(),
    }
}

/// Cleanup sweep query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupParams {
    pub age_threshold: Option<f64>,
    pub mode: Option<String>,
}

/// Sweep aged upload artifacts.
pub async fn cleanup_sweep(
    State(state): State<AppState>,
    Query(params): Query<CleanupParams>,
) -> impl IntoResponse {
    let threshold = params.age_threshold.unwrap_or(24.0);
    let mode = params
        .mode
        .as_deref()
        .map(SweepMode::parse)
        .unwrap_or_default();

    let report = sweep_aged(&state.settings.uploads_dir, threshold, mode);
    let message = format!(
        "Cleanup completed. Deleted {} items with {} errors.",
        report.deleted, report.errors
    );

    Json(json!({
        "success": true,
        "results": report,
        "message": message,
    }))
}
