//! Test request endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use terralab_models::{
    AddRequestItemRequest, BulkAddRequestItems, CreateTestRequest, TestRequest, TestRequestItem,
    TestRequestItemDetail,
};

use super::error_response;
use crate::service::{RegistryService, RequestDocument};

pub async fn create_request(
    State(service): State<RegistryService>,
    Json(request): Json<CreateTestRequest>,
) -> Result<Json<TestRequest>, (StatusCode, String)> {
    let created = service.create_request(request).await.map_err(error_response)?;

    Ok(Json(created))
}

pub async fn get_request(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<TestRequest>, (StatusCode, String)> {
    let request = service.get_request(id).await.map_err(error_response)?;

    Ok(Json(request))
}

pub async fn requests_for_project(
    State(service): State<RegistryService>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<TestRequest>>, (StatusCode, String)> {
    let requests = service
        .requests_for_project(project_id)
        .await
        .map_err(error_response)?;

    Ok(Json(requests))
}

pub async fn request_items(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TestRequestItemDetail>>, (StatusCode, String)> {
    let items = service.request_items(id).await.map_err(error_response)?;

    Ok(Json(items))
}

pub async fn add_item(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
    Json(request): Json<AddRequestItemRequest>,
) -> Result<Json<TestRequestItem>, (StatusCode, String)> {
    let item = service
        .add_request_item(id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(item))
}

pub async fn bulk_add_items(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
    Json(request): Json<BulkAddRequestItems>,
) -> Result<Json<Vec<TestRequestItem>>, (StatusCode, String)> {
    let items = service
        .bulk_add_request_items(id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(items))
}

pub async fn copy_all_items(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TestRequestItem>>, (StatusCode, String)> {
    let items = service.copy_all_items(id).await.map_err(error_response)?;

    Ok(Json(items))
}

pub async fn request_document(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<RequestDocument>, (StatusCode, String)> {
    let document = service.request_document(id).await.map_err(error_response)?;

    Ok(Json(document))
}
