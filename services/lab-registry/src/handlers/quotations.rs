//! Quotation endpoints: numbered series, items, revision and status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use terralab_models::{
    AddQuotationItemRequest, CreateQuotationRequest, Quotation, QuotationDetail, QuotationItem,
    UpdateQuotationStatusRequest,
};

use super::error_response;
use crate::service::RegistryService;

pub async fn create_quotation(
    State(service): State<RegistryService>,
    Json(request): Json<CreateQuotationRequest>,
) -> Result<Json<Quotation>, (StatusCode, String)> {
    let quotation = service
        .create_quotation(request)
        .await
        .map_err(error_response)?;

    Ok(Json(quotation))
}

pub async fn list_quotations(
    State(service): State<RegistryService>,
) -> Result<Json<Vec<Quotation>>, (StatusCode, String)> {
    let quotations = service.list_quotations().await.map_err(error_response)?;

    Ok(Json(quotations))
}

pub async fn get_quotation(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<QuotationDetail>, (StatusCode, String)> {
    let detail = service.quotation_detail(id).await.map_err(error_response)?;

    Ok(Json(detail))
}

pub async fn add_item(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
    Json(request): Json<AddQuotationItemRequest>,
) -> Result<Json<QuotationItem>, (StatusCode, String)> {
    let item = service
        .add_quotation_item(id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(item))
}

pub async fn delete_item(
    State(service): State<RegistryService>,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    service
        .delete_quotation_item(item_id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revise_quotation(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
) -> Result<Json<QuotationDetail>, (StatusCode, String)> {
    let revision = service.revise_quotation(id).await.map_err(error_response)?;

    Ok(Json(revision))
}

pub async fn update_status(
    State(service): State<RegistryService>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateQuotationStatusRequest>,
) -> Result<Json<Quotation>, (StatusCode, String)> {
    let quotation = service
        .update_quotation_status(id, &request.status)
        .await
        .map_err(error_response)?;

    Ok(Json(quotation))
}
