//! TerraLab Reporting Service
//!
//! Report uploads covering one or more samples, group-wide review
//! actions, file replacement, downloads and the test-distribution view.

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use terralab_database::initialize_database;
use terralab_models::{ApproveReportRequest, Report, ReportDetail, ReportGroup, SubmitReportRequest};
use terralab_utils::{
    content_type_for, init_logging, AppConfig, FileStore, HttpTemplateStore, LabError,
};

mod render;
mod service;

use render::DocumentRenderer;
use service::{Download, ReportUpload, ReportingService, TestDistributionResponse};

type Service = ReportingService<HttpTemplateStore>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging)?;
    info!("Starting TerraLab Reporting Service");

    let pool = initialize_database(&terralab_database::DatabaseConfig {
        postgres_url: config.database.postgres_url.clone(),
        max_connections: config.database.max_connections,
        connection_timeout: std::time::Duration::from_secs(
            config.database.connection_timeout_seconds,
        ),
    })
    .await?;

    let files = FileStore::new(&config.storage.upload_dir);
    let renderer = DocumentRenderer::new()?;
    let templates = HttpTemplateStore::new(&config.templates)?;
    let service = ReportingService::new(pool, files, renderer, templates);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/reports/upload", post(upload_report))
        .route("/api/v1/reports", get(list_reports))
        .route("/api/v1/reports/sample/:sample_id", get(reports_for_sample))
        .route("/api/v1/reports/:id", get(report_detail))
        .route("/api/v1/reports/:id/submit", post(submit_report))
        .route("/api/v1/reports/:id/approve", post(approve_report))
        .route("/api/v1/reports/:id/replace", post(replace_report))
        .route("/api/v1/reports/:id/download", get(download_report))
        .route(
            "/api/v1/reports/template/:item_code",
            get(download_report_template),
        )
        .route("/api/v1/distribution/:request_no", get(test_distribution))
        .route(
            "/api/v1/cover-sheet/:request_no/:quotation_item_id",
            get(cover_sheet),
        )
        .layer(DefaultBodyLimit::max(config.server.max_request_size))
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Reporting Service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "reporting",
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

/// Multipart form: `file` plus the anchoring `sample_no`, with optional
/// `notes` and `uploaded_by` fields. Which samples the report covers is
/// derived server-side from the stored assignments.
async fn parse_upload(mut multipart: Multipart) -> Result<ReportUpload, (StatusCode, String)> {
    let mut upload = ReportUpload {
        sample_no: String::new(),
        notes: None,
        uploaded_by: None,
        original_filename: String::new(),
        data: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                upload.original_filename = field
                    .file_name()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "report.pdf".to_string());
                upload.data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
                    .to_vec();
            }
            Some("sample_no") => {
                upload.sample_no = field_text(field).await?.trim().to_string();
            }
            Some("notes") => {
                upload.notes = non_empty(field_text(field).await?);
            }
            Some("uploaded_by") => {
                upload.uploaded_by = non_empty(field_text(field).await?);
            }
            _ => {}
        }
    }

    if upload.data.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing multipart field 'file'".to_string(),
        ));
    }
    if upload.sample_no.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing multipart field 'sample_no'".to_string(),
        ));
    }

    Ok(upload)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, (StatusCode, String)> {
    field
        .text()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ===== Report Endpoints =====

async fn upload_report(
    State(service): State<Service>,
    multipart: Multipart,
) -> Result<Json<Vec<Report>>, (StatusCode, String)> {
    let upload = parse_upload(multipart).await?;
    let reports = service.upload_report(upload).await.map_err(error_response)?;

    Ok(Json(reports))
}

async fn list_reports(
    State(service): State<Service>,
) -> Result<Json<Vec<ReportGroup>>, (StatusCode, String)> {
    let groups = service.list_reports().await.map_err(error_response)?;

    Ok(Json(groups))
}

async fn reports_for_sample(
    State(service): State<Service>,
    Path(sample_id): Path<i64>,
) -> Result<Json<Vec<ReportDetail>>, (StatusCode, String)> {
    let reports = service
        .reports_for_sample(sample_id)
        .await
        .map_err(error_response)?;

    Ok(Json(reports))
}

async fn report_detail(
    State(service): State<Service>,
    Path(id): Path<i64>,
) -> Result<Json<ReportDetail>, (StatusCode, String)> {
    let detail = service.report_detail(id).await.map_err(error_response)?;

    Ok(Json(detail))
}

async fn submit_report(
    State(service): State<Service>,
    Path(id): Path<i64>,
    Json(request): Json<SubmitReportRequest>,
) -> Result<Json<Vec<Report>>, (StatusCode, String)> {
    let group = service
        .submit_report(id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(group))
}

async fn approve_report(
    State(service): State<Service>,
    Path(id): Path<i64>,
    Json(request): Json<ApproveReportRequest>,
) -> Result<Json<Vec<Report>>, (StatusCode, String)> {
    let group = service
        .approve_report(id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(group))
}

async fn replace_report(
    State(service): State<Service>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Report>>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(ToString::to_string)
                .unwrap_or_else(|| "report.pdf".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

            let group = service
                .replace_report_file(id, &filename, &data)
                .await
                .map_err(error_response)?;

            return Ok(Json(group));
        }
    }

    Err((
        StatusCode::BAD_REQUEST,
        "Missing multipart field 'file'".to_string(),
    ))
}

async fn download_report(
    State(service): State<Service>,
    Path(id): Path<i64>,
) -> Result<Response, (StatusCode, String)> {
    let download = service.download_report(id).await.map_err(error_response)?;

    Ok(file_response(download))
}

async fn download_report_template(
    State(service): State<Service>,
    Path(item_code): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let download = service
        .report_template(&item_code)
        .await
        .map_err(error_response)?;

    Ok(file_response(download))
}

async fn test_distribution(
    State(service): State<Service>,
    Path(request_no): Path<String>,
) -> Result<Json<TestDistributionResponse>, (StatusCode, String)> {
    let distribution = service
        .test_distribution(&request_no)
        .await
        .map_err(error_response)?;

    Ok(Json(distribution))
}

async fn cover_sheet(
    State(service): State<Service>,
    Path((request_no, quotation_item_id)): Path<(String, i64)>,
) -> Result<Html<String>, (StatusCode, String)> {
    let html = service
        .cover_sheet(&request_no, quotation_item_id)
        .await
        .map_err(error_response)?;

    Ok(Html(html))
}
