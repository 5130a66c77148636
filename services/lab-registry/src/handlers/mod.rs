pub mod quotations;
pub mod registry;
pub mod requests;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use terralab_utils::{content_type_for, LabError};

use crate::service::Download;

pub fn error_response(error: LabError) -> (StatusCode, String) {
    let status = StatusCode::from_u16(error.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, error.to_string())
}

pub fn file_response(download: Download) -> Response {
    let content_type = content_type_for(&download.file_type);
    (
        [
            (
                axum::http::header::CONTENT_TYPE,
                content_type.to_string(),
            ),
            (
                axum::http::header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download.filename),
            ),
        ],
        download.content,
    )
        .into_response()
}
