//! Clients, enquiries and projects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: i64,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enquiry {
    pub enquiry_id: i64,
    /// ENQ-YYYY-NNN, assigned at creation
    pub enquiry_ref: String,
    pub client_id: i64,
    pub description: Option<String>,
    pub status: String,
    pub enquiry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEnquiryRequest {
    #[validate(range(min = 1))]
    pub client_id: i64,
    pub description: Option<String>,
    pub enquiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub project_id: i64,
    pub project_name: String,
    pub client_id: i64,
    /// Approved quotation this project was opened from, when any
    pub quotation_id: Option<i64>,
    pub location: Option<String>,
    pub lpo_no: Option<String>,
    pub lpo_date: Option<NaiveDate>,
    /// Stored path of the uploaded LPO document
    pub lpo_file_path: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255))]
    pub project_name: String,
    #[validate(range(min = 1))]
    pub client_id: i64,
    pub quotation_id: Option<i64>,
    pub location: Option<String>,
    pub lpo_no: Option<String>,
    pub lpo_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_create_client_validation() {
        let ok = CreateClientRequest {
            name: "Gulf Soils Lab".to_string(),
            contact_person: None,
            email: Some("lab@example.com".to_string()),
            phone: None,
            address: None,
        };
        assert!(ok.validate().is_ok());

        let bad = CreateClientRequest {
            name: String::new(),
            contact_person: None,
            email: Some("not-an-email".to_string()),
            phone: None,
            address: None,
        };
        assert!(bad.validate().is_err());
    }
}
