use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use docqa_core::{
    AnyEmbedder, AskError, ChatCompletionClient, GenerationError, Industry, IngestError,
    QaPipeline,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info, warn};

pub type ServicePipeline = QaPipeline<AnyEmbedder, ChatCompletionClient>;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ServicePipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ingest", post(ingest))
        .route("/ask", post(ask))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    message: String,
    pages: usize,
    industry: Industry,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: String,
    industry_used: Industry,
    sources_found: usize,
}

#[derive(Debug, Deserialize)]
struct AskForm {
    question: String,
    industry: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// HTTP-facing error: a status code plus a short message safe to return.
/// Internal detail is logged where the error is mapped, never echoed.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        match &error {
            IngestError::UnknownIndustry(unknown) => {
                warn!(%error, "ingestion rejected");
                ApiError::bad_request(unknown.to_string())
            }
            IngestError::NotAPdf(_) => {
                warn!(%error, "ingestion rejected");
                ApiError::bad_request("Only PDF files are allowed")
            }
            IngestError::PdfParse(_) => {
                error!(%error, "pdf extraction failed");
                ApiError::internal("Failed to read PDF file")
            }
            IngestError::Embed(_) => {
                error!(%error, "embedding failed during ingestion");
                ApiError::internal("Failed to compute embeddings")
            }
            IngestError::Index(_) => {
                error!(%error, "index write failed");
                ApiError::internal("Failed to store documents in the index")
            }
            IngestError::Io(_) => {
                error!(%error, "ingestion io failure");
                ApiError::internal("Ingestion failed")
            }
        }
    }
}

impl From<AskError> for ApiError {
    fn from(error: AskError) -> Self {
        match &error {
            AskError::UnknownIndustry(unknown) => {
                warn!(%error, "question rejected");
                ApiError::bad_request(unknown.to_string())
            }
            AskError::EmptyQuestion => {
                warn!(%error, "question rejected");
                ApiError::bad_request("Question cannot be empty")
            }
            AskError::QuestionTooLong { limit, .. } => {
                warn!(%error, "question rejected");
                ApiError::bad_request(format!("Question must be at most {limit} characters"))
            }
            AskError::IndexNotFound(_) => {
                warn!(%error, "query before any ingestion");
                ApiError {
                    status: StatusCode::NOT_FOUND,
                    message: "No documents in the index yet. Please upload documents first using /ingest"
                        .to_string(),
                }
            }
            AskError::Embed(_) => {
                error!(%error, "embedding failed during query");
                ApiError::internal("Failed to compute embeddings")
            }
            AskError::Index(_) => {
                error!(%error, "index read failed");
                ApiError::internal("Failed to search the index")
            }
            AskError::Generation(GenerationError::Timeout { .. }) => {
                error!(%error, "answer generation timed out");
                ApiError::internal("Answer generation timed out")
            }
            AskError::Generation(_) => {
                error!(%error, "answer generation failed");
                ApiError::internal("Failed to generate answer")
            }
        }
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "message": "Multi-Industry RAG API",
        "endpoints": {
            "/ingest": "Upload PDFs with industry tags",
            "/ask": "Ask questions filtered by industry"
        }
    }))
}

async fn ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let mut industry: Option<String> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|error| {
        warn!(%error, "malformed multipart body");
        ApiError::bad_request("Malformed multipart form data")
    })? {
        let name = field.name().map(|name| name.to_string());
        match name.as_deref() {
            Some("industry") => {
                let value = field.text().await.map_err(|error| {
                    warn!(%error, "unreadable industry field");
                    ApiError::bad_request("Malformed multipart form data")
                })?;
                industry = Some(value);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|error| {
                    warn!(%error, "unreadable file field");
                    ApiError::bad_request("Malformed multipart form data")
                })?;
                upload = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let industry = industry.ok_or_else(|| ApiError::bad_request("Missing form field: industry"))?;
    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("Missing form field: file"))?;

    info!(file = %file_name, industry = %industry, bytes = bytes.len(), "ingesting upload");

    // Request-scoped spill of the upload; the file is removed when the
    // guard drops, on success and failure alike.
    let mut spooled = tempfile::NamedTempFile::new().map_err(|error| {
        error!(%error, "could not create temp file");
        ApiError::internal("Ingestion failed")
    })?;
    let spool_error = |error: std::io::Error| {
        error!(%error, "could not spool upload");
        ApiError::internal("Ingestion failed")
    };
    spooled.write_all(&bytes).map_err(spool_error)?;
    spooled.flush().map_err(spool_error)?;

    let receipt = state
        .pipeline
        .ingest(spooled.path(), &file_name, &industry)
        .await?;

    info!(
        document_id = %receipt.document_id,
        pages = receipt.pages,
        industry = %receipt.industry,
        "ingestion complete"
    );

    Ok(Json(IngestResponse {
        message: format!(
            "Successfully added {} to {} storage",
            receipt.file_name, receipt.industry
        ),
        pages: receipt.pages,
        industry: receipt.industry,
    }))
}

async fn ask(
    State(state): State<AppState>,
    Form(form): Form<AskForm>,
) -> Result<Json<AskResponse>, ApiError> {
    info!(
        industry = %form.industry,
        question = %preview(&form.question, 50),
        "processing question"
    );

    let answer = state.pipeline.ask(&form.question, &form.industry).await?;

    if answer.sources_found == 0 {
        warn!(industry = %answer.industry, "no documents retrieved");
    }

    Ok(Json(AskResponse {
        answer: answer.answer,
        industry_used: answer.industry,
        sources_found: answer.sources_found,
    }))
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}
