//! Test requests: the bridge between an approved quotation and the lab
//! floor. Request items reference quotation items; copy-all seeding and
//! index-based add both resolve against the quotation's ordered lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestRequest {
    pub test_request_id: i64,
    /// GQ-DDMMYY-0N, assigned at creation
    pub request_no: String,
    pub project_id: i64,
    pub requested_by: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestRequestItem {
    pub tri_id: i64,
    pub test_request_id: i64,
    pub quotation_item_id: i64,
    pub quantity: i32,
}

/// Request item joined with its quotation line, as the expansion and
/// worksheet paths consume it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestRequestItemDetail {
    pub tri_id: i64,
    pub test_request_id: i64,
    pub quotation_item_id: i64,
    pub quantity: i32,
    pub item_code: Option<String>,
    pub description: String,
    pub test_standard: Option<String>,
    pub unit_rate: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTestRequest {
    #[validate(range(min = 1))]
    pub project_id: i64,
    pub requested_by: Option<String>,
}

/// Add one line by its 1-based position in the quotation's item list.
/// Quantity falls back to the quotation line's own quantity.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddRequestItemRequest {
    #[validate(range(min = 1))]
    pub item_index: i32,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkAddRequestItems {
    #[validate(length(min = 1))]
    pub items: Vec<AddRequestItemRequest>,
}
