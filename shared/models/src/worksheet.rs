//! Worksheets: one per (sample, test type), issued at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Worksheet {
    pub worksheet_id: i64,
    /// WKS-{year}-{sample_id:04}-{seq:03}
    pub worksheet_no: String,
    pub sample_id: i64,
    pub quotation_item_id: i64,
    pub test_name: String,
    pub test_standard: Option<String>,
    pub status: String,
    pub technician: Option<String>,
    /// Stored path of the filled-in worksheet document, once uploaded
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Issuance names only the sample; the test type comes from the
/// sample's stored assignment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateWorksheetRequest {
    #[validate(range(min = 1))]
    pub sample_id: i64,
    pub technician: Option<String>,
}

/// Issuance result: `created` is false when the worksheet already
/// existed and the stored row is returned unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateWorksheetResponse {
    pub worksheet: Worksheet,
    pub created: bool,
    /// Whether a blank template is known for this test type
    pub template_available: bool,
}
