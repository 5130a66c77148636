//! Samples and their intake payloads.
//!
//! The assigned test columns are written once at generation and never
//! updated afterwards; every downstream consumer reads them back rather
//! than replaying the request's line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sample {
    pub sample_id: i64,
    /// GS-{DDMMYY}-{reqseq}-{n}
    pub sample_no: String,
    pub test_request_id: i64,
    pub collected_by: Option<String>,
    pub received_date: Option<DateTime<Utc>>,
    pub status: String,
    pub reason_rejected: Option<String>,
    pub barcode: Option<String>,
    pub storage_location: Option<String>,
    /// Permanent assignment, written at generation
    pub assigned_tri_id: Option<i64>,
    pub assigned_quotation_item_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Sample joined with its assigned test line, for listings and the
/// distribution view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SampleWithTest {
    pub sample_id: i64,
    pub sample_no: String,
    pub test_request_id: i64,
    pub request_no: String,
    pub status: String,
    pub barcode: Option<String>,
    pub storage_location: Option<String>,
    pub assigned_tri_id: Option<i64>,
    pub assigned_quotation_item_id: Option<i64>,
    pub item_code: Option<String>,
    pub test_name: Option<String>,
    pub test_standard: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateSamplesRequest {
    pub collected_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateSamplesResponse {
    pub request_no: String,
    pub samples_created: usize,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AcceptSampleRequest {
    #[validate(length(min = 1, max = 100))]
    pub storage_location: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RejectSampleRequest {
    #[validate(length(min = 1))]
    pub reason: String,
    #[serde(default)]
    pub inform_client: bool,
}
