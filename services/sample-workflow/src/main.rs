//! TerraLab Sample Workflow Service
//!
//! Generates samples from test requests, records intake decisions and
//! issues per-test worksheets with their template and document files.

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use terralab_database::initialize_database;
use terralab_models::{
    AcceptSampleRequest, GenerateSamplesRequest, GenerateSamplesResponse,
    GenerateWorksheetRequest, GenerateWorksheetResponse, RejectSampleRequest, Sample,
    SampleWithTest, Worksheet,
};
use terralab_utils::{
    content_type_for, init_logging, AppConfig, FileStore, HttpTemplateStore, LabError,
};

mod service;

use service::{Download, SampleWorkflowService};

type Service = SampleWorkflowService<HttpTemplateStore>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging)?;
    info!("Starting TerraLab Sample Workflow Service");

    let pool = initialize_database(&terralab_database::DatabaseConfig {
        postgres_url: config.database.postgres_url.clone(),
        max_connections: config.database.max_connections,
        connection_timeout: std::time::Duration::from_secs(
            config.database.connection_timeout_seconds,
        ),
    })
    .await?;

    let files = FileStore::new(&config.storage.upload_dir);
    let templates = HttpTemplateStore::new(&config.templates)?;
    let service = SampleWorkflowService::new(pool, files, templates);

    let app = Router::new()
        .route("/health", get(health_check))
        // Samples
        .route("/api/v1/samples/generate/:request_no", post(generate_samples))
        .route("/api/v1/samples/pending", get(pending_samples))
        .route("/api/v1/samples/recent", get(recent_samples))
        .route("/api/v1/samples/request/:request_no", get(samples_for_request))
        .route("/api/v1/samples/:id/accept", post(accept_sample))
        .route("/api/v1/samples/:id/reject", post(reject_sample))
        .route("/api/v1/samples/:id/worksheets", get(worksheets_for_sample))
        // Worksheets
        .route("/api/v1/worksheets/generate", post(generate_worksheet))
        .route("/api/v1/worksheets/:id/template", get(download_template))
        .route("/api/v1/worksheets/:id/upload", post(upload_worksheet))
        .route("/api/v1/worksheets/:id/download", get(download_worksheet))
        .layer(DefaultBodyLimit::max(config.server.max_request_size))
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Sample Workflow Service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sample-workflow",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn error_response(error: LabError) -> (StatusCode, String) {
    let status = StatusCode::from_u16(error.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, error.to_string())
}

fn file_response(download: Download) -> Response {
    let content_type = content_type_for(&download.file_type);
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download.filename),
            ),
        ],
        download.content,
    )
        .into_response()
}

// ===== Sample Endpoints =====

async fn generate_samples(
    State(service): State<Service>,
    Path(request_no): Path<String>,
    Json(request): Json<GenerateSamplesRequest>,
) -> Result<Json<GenerateSamplesResponse>, (StatusCode, String)> {
    let response = service
        .generate_samples(&request_no, request)
        .await
        .map_err(error_response)?;

    Ok(Json(response))
}

async fn pending_samples(
    State(service): State<Service>,
) -> Result<Json<Vec<SampleWithTest>>, (StatusCode, String)> {
    let samples = service.pending_samples().await.map_err(error_response)?;

    Ok(Json(samples))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<i64>,
}

async fn recent_samples(
    State(service): State<Service>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<SampleWithTest>>, (StatusCode, String)> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let samples = service.recent_samples(limit).await.map_err(error_response)?;

    Ok(Json(samples))
}

async fn samples_for_request(
    State(service): State<Service>,
    Path(request_no): Path<String>,
) -> Result<Json<Vec<SampleWithTest>>, (StatusCode, String)> {
    let samples = service
        .samples_for_request(&request_no)
        .await
        .map_err(error_response)?;

    Ok(Json(samples))
}

async fn accept_sample(
    State(service): State<Service>,
    Path(id): Path<i64>,
    Json(request): Json<AcceptSampleRequest>,
) -> Result<Json<Sample>, (StatusCode, String)> {
    let sample = service
        .accept_sample(id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(sample))
}

async fn reject_sample(
    State(service): State<Service>,
    Path(id): Path<i64>,
    Json(request): Json<RejectSampleRequest>,
) -> Result<Json<Sample>, (StatusCode, String)> {
    let sample = service
        .reject_sample(id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(sample))
}

async fn worksheets_for_sample(
    State(service): State<Service>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Worksheet>>, (StatusCode, String)> {
    let worksheets = service
        .worksheets_for_sample(id)
        .await
        .map_err(error_response)?;

    Ok(Json(worksheets))
}

// ===== Worksheet Endpoints =====

async fn generate_worksheet(
    State(service): State<Service>,
    Json(request): Json<GenerateWorksheetRequest>,
) -> Result<Json<GenerateWorksheetResponse>, (StatusCode, String)> {
    let response = service
        .issue_worksheet(request)
        .await
        .map_err(error_response)?;

    Ok(Json(response))
}

async fn download_template(
    State(service): State<Service>,
    Path(id): Path<i64>,
) -> Result<Response, (StatusCode, String)> {
    let download = service
        .worksheet_template(id)
        .await
        .map_err(error_response)?;

    Ok(file_response(download))
}

async fn upload_worksheet(
    State(service): State<Service>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<Worksheet>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(ToString::to_string)
                .unwrap_or_else(|| "worksheet.xlsx".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

            let worksheet = service
                .upload_worksheet_document(id, &filename, &data)
                .await
                .map_err(error_response)?;

            return Ok(Json(worksheet));
        }
    }

    Err((
        StatusCode::BAD_REQUEST,
        "Missing multipart field 'file'".to_string(),
    ))
}

async fn download_worksheet(
    State(service): State<Service>,
    Path(id): Path<i64>,
) -> Result<Response, (StatusCode, String)> {
    let download = service
        .download_worksheet_document(id)
        .await
        .map_err(error_response)?;

    Ok(file_response(download))
}
