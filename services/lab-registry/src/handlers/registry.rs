//! Client, enquiry and project endpoints.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Json, Response},
};
use serde::Deserialize;

use terralab_models::{
    Client, CreateClientRequest, CreateEnquiryRequest, CreateProjectRequest, Enquiry, Project,
};

use super::{error_response, file_response};
use crate::service::RegistryService;

// ===== Clients =====

pub async fn create_client(
    State(service): State<RegistryService>,
    Json(request): Json<CreateClientRequest>,
) -> Result<Json<Client>, (StatusCode, String)> {
    let client = service.create_client(request).await.map_err(error_response)?;

    Ok(Json(client))
}

pub async fn list_clients(
    State(service): State<RegistryService>,
) -> Result<Json<Vec<Client>>, (StatusCode, String)> {
    let clients = service.list_clients().await.map_err(error_response)?;

    Ok(Json(clients))
}

pub async fn get_client(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<Client>, (StatusCode, String)> {
    let client = service.get_client(id).await.map_err(error_response)?;

    Ok(Json(client))
}

// ===== Enquiries =====

pub async fn create_enquiry(
    State(service): State<RegistryService>,
    Json(request): Json<CreateEnquiryRequest>,
) -> Result<Json<Enquiry>, (StatusCode, String)> {
    let enquiry = service.create_enquiry(request).await.map_err(error_response)?;

    Ok(Json(enquiry))
}

pub async fn list_enquiries(
    State(service): State<RegistryService>,
) -> Result<Json<Vec<Enquiry>>, (StatusCode, String)> {
    let enquiries = service.list_enquiries().await.map_err(error_response)?;

    Ok(Json(enquiries))
}

pub async fn get_enquiry(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<Enquiry>, (StatusCode, String)> {
    let enquiry = service.get_enquiry(id).await.map_err(error_response)?;

    Ok(Json(enquiry))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_enquiry_status(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Enquiry>, (StatusCode, String)> {
    let enquiry = service
        .update_enquiry_status(id, &request.status)
        .await
        .map_err(error_response)?;

    Ok(Json(enquiry))
}

// ===== Projects =====

pub async fn create_project(
    State(service): State<RegistryService>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<Json<Project>, (StatusCode, String)> {
    let project = service.create_project(request).await.map_err(error_response)?;

    Ok(Json(project))
}

pub async fn list_projects(
    State(service): State<RegistryService>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    let projects = service.list_projects().await.map_err(error_response)?;

    Ok(Json(projects))
}

pub async fn get_project(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<Project>, (StatusCode, String)> {
    let project = service.get_project(id).await.map_err(error_response)?;

    Ok(Json(project))
}

pub async fn upload_lpo(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<Project>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(ToString::to_string)
                .unwrap_or_else(|| "lpo.pdf".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

            let project = service
                .upload_lpo(id, &filename, &data)
                .await
                .map_err(error_response)?;

            return Ok(Json(project));
        }
    }

    Err((
        StatusCode::BAD_REQUEST,
        "Missing multipart field 'file'".to_string(),
    ))
}

pub async fn download_lpo(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Response, (StatusCode, String)> {
    let download = service.download_lpo(id).await.map_err(error_response)?;

    Ok(file_response(download))
}
