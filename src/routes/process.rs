//! Document processing routes
//!
//! Endpoints:
//! - POST /process - single-shot upload, extract text in one request
//! - POST /process/chunk - submit one chunk of a large upload
//! - GET /process/chunk?documentId=... - chunk session progress
//! - DELETE /process/chunk?documentId=... - cancel a chunk session

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extraction::{verify, ExtractionResult, FileFormat};
use crate::session::{ChunkMetadata, ChunkOutcome, SessionState};
use crate::state::AppState;

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process", post(process_document))
        .route(
            "/process/chunk",
            post(process_chunk).get(session_status).delete(cancel_session),
        )
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentMetadataBody {
    file_name: String,
    file_type: &'static str,
    file_size: u64,
    text_length: usize,
    word_count: usize,
    page_count: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessResponse {
    success: bool,
    document_id: String,
    extracted_text: String,
    /// HTML rendition, present when the winning strategy kept layout
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted_text: Option<String>,
    metadata: DocumentMetadataBody,
    processing: ProcessProcessingBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessProcessingBody {
    status: &'static str,
    strategy: &'static str,
    duration_ms: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkAcceptedResponse {
    success: bool,
    complete: bool,
    progress: ChunkProgressBody,
    processing: ChunkProcessingBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkProgressBody {
    processed_chunks: usize,
    total_chunks: usize,
    percentage: u8,
    current_chunk: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkProcessingBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimated_time_remaining: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkCompleteResponse {
    success: bool,
    complete: bool,
    document_id: String,
    extracted_text: String,
    metadata: DocumentMetadataBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatusResponse {
    document_id: String,
    status: SessionState,
    progress: StatusProgressBody,
    processing: StatusProcessingBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusProgressBody {
    processed_chunks: usize,
    total_chunks: usize,
    percentage: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusProcessingBody {
    start_time: chrono::DateTime<chrono::Utc>,
    last_activity: chrono::DateTime<chrono::Utc>,
    elapsed_time: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /process
///
/// Single-shot upload: sniff the format, run the extraction chain, return
/// the text. Nothing is retained server-side.
async fn process_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>> {
    let started = std::time::Instant::now();

    let mut upload: Option<(String, String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            upload = Some((file_name, content_type, bytes.to_vec()));
        }
    }
    let (file_name, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("missing 'file' field".to_string()))?;

    let max = state.config().ingest.max_file_size;
    if data.len() > max {
        return Err(AppError::FileTooLarge {
            size: data.len(),
            max,
        });
    }

    let format = claimed_format(&content_type, &file_name);
    verify(&data, format)?;

    let file_size = data.len() as u64;
    let result = state.pipeline().extract(data, format).await?;

    let document_id = Uuid::new_v4().to_string();
    tracing::info!(
        document_id = %document_id,
        file_name = %file_name,
        format = %format,
        strategy = result.strategy,
        text_length = result.text.len(),
        "Document processed"
    );

    let metadata = metadata_body(&file_name, format, file_size, &result);
    Ok(Json(ProcessResponse {
        success: true,
        document_id,
        metadata,
        processing: ProcessProcessingBody {
            status: "complete",
            strategy: result.strategy,
            duration_ms: started.elapsed().as_millis() as u64,
        },
        formatted_text: result.formatted,
        extracted_text: result.text,
    }))
}

/// POST /process/chunk
///
/// Submit one chunk. The final missing chunk triggers reassembly and
/// returns the completed document in the same response.
async fn process_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut chunk_bytes: Option<Vec<u8>> = None;
    let mut metadata: Option<ChunkMetadata> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("chunk") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                chunk_bytes = Some(bytes.to_vec());
            }
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                metadata = Some(serde_json::from_str(&text).map_err(|e| {
                    AppError::BadRequest(format!("invalid chunk metadata: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let data =
        chunk_bytes.ok_or_else(|| AppError::BadRequest("missing 'chunk' field".to_string()))?;
    let metadata =
        metadata.ok_or_else(|| AppError::BadRequest("missing 'metadata' field".to_string()))?;

    let max = state.config().ingest.max_file_size;
    if data.len() > max {
        return Err(AppError::FileTooLarge {
            size: data.len(),
            max,
        });
    }

    match state.registry().accept_chunk(metadata, data).await? {
        ChunkOutcome::Accepted {
            progress,
            current_chunk,
        } => Ok(Json(ChunkAcceptedResponse {
            success: true,
            complete: false,
            progress: ChunkProgressBody {
                processed_chunks: progress.processed_chunks,
                total_chunks: progress.total_chunks,
                percentage: progress.percentage,
                current_chunk,
            },
            processing: ChunkProcessingBody {
                status: "in-progress",
                estimated_time_remaining: progress.estimated_time_remaining,
            },
        })
        .into_response()),
        ChunkOutcome::Complete(document) => {
            let result = ExtractionResult {
                text: document.text,
                formatted: None,
                page_count: document.page_count,
                strategy: document.strategy,
                layout_preserved: false,
            };
            let metadata = metadata_body(
                &document.file_name,
                document.format,
                document.total_size,
                &result,
            );
            Ok(Json(ChunkCompleteResponse {
                success: true,
                complete: true,
                document_id: document.document_id,
                metadata,
                extracted_text: result.text,
            })
            .into_response())
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionQuery {
    document_id: String,
}

/// GET /process/chunk?documentId=...
async fn session_status(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionStatusResponse>> {
    let view = state.registry().status(&query.document_id).await?;
    Ok(Json(SessionStatusResponse {
        document_id: view.document_id,
        status: view.state,
        progress: StatusProgressBody {
            processed_chunks: view.progress.processed_chunks,
            total_chunks: view.progress.total_chunks,
            percentage: view.progress.percentage,
        },
        processing: StatusProcessingBody {
            start_time: view.created_at,
            last_activity: view.last_activity,
            elapsed_time: view.elapsed_secs,
        },
    }))
}

/// DELETE /process/chunk?documentId=...
async fn cancel_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<StatusCode> {
    state.registry().cancel(&query.document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve the claimed format from the multipart content type, falling back
/// to the file extension when the part carries a generic type.
fn claimed_format(content_type: &str, file_name: &str) -> FileFormat {
    let from_content_type = FileFormat::from_label(content_type);
    if from_content_type != FileFormat::Unrecognized {
        return from_content_type;
    }
    match file_name.rsplit_once('.') {
        Some((_, extension)) => FileFormat::from_label(extension),
        None => FileFormat::Unrecognized,
    }
}

fn metadata_body(
    file_name: &str,
    format: FileFormat,
    file_size: u64,
    result: &ExtractionResult,
) -> DocumentMetadataBody {
    DocumentMetadataBody {
        file_name: file_name.to_string(),
        file_type: format.as_str(),
        file_size,
        text_length: result.text.len(),
        word_count: result.word_count(),
        page_count: result.page_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claimed_format_prefers_content_type() {
        assert_eq!(
            claimed_format("application/pdf", "misleading.txt"),
            FileFormat::Pdf
        );
    }

    #[test]
    fn claimed_format_falls_back_to_extension() {
        assert_eq!(
            claimed_format("application/octet-stream", "report.docx"),
            FileFormat::Ooxml
        );
        assert_eq!(claimed_format("", "notes.txt"), FileFormat::PlainText);
    }

    #[test]
    fn claimed_format_without_any_signal_is_unrecognized() {
        assert_eq!(
            claimed_format("application/octet-stream", "mystery"),
            FileFormat::Unrecognized
        );
    }
}
