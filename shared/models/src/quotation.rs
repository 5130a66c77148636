//! Quotations and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quotation {
    pub quotation_id: i64,
    /// {QG|QS|QL}-[{II}-]{seq:03}-{yy}
    pub quotation_no: String,
    pub enquiry_id: Option<i64>,
    pub division: String,
    pub client_initials: Option<String>,
    /// 0 for the original, bumped on each revision
    pub revision: i32,
    /// Quotation this one revises, when any
    pub parent_quotation_id: Option<i64>,
    pub payment_terms: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotationItem {
    pub item_id: i64,
    pub quotation_id: i64,
    pub item_code: Option<String>,
    pub description: String,
    pub test_standard: Option<String>,
    pub unit_rate: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuotationRequest {
    pub enquiry_id: Option<i64>,
    #[validate(length(min = 1, max = 32))]
    pub division: String,
    pub client_initials: Option<String>,
    pub payment_terms: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddQuotationItemRequest {
    pub item_code: Option<String>,
    #[validate(length(min = 1))]
    pub description: String,
    pub test_standard: Option<String>,
    pub unit_rate: Decimal,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuotationStatusRequest {
    pub status: String,
}

/// Quotation with items and the computed total, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub items: Vec<QuotationItem>,
    pub total_amount: Decimal,
}

impl QuotationDetail {
    pub fn new(quotation: Quotation, items: Vec<QuotationItem>) -> Self {
        let total_amount = items
            .iter()
            .map(|i| i.unit_rate * Decimal::from(i.quantity))
            .sum();
        Self {
            quotation,
            items,
            total_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(rate: i64, qty: i32) -> QuotationItem {
        QuotationItem {
            item_id: 1,
            quotation_id: 1,
            item_code: None,
            description: "Test".to_string(),
            test_standard: None,
            unit_rate: Decimal::from(rate),
            quantity: qty,
        }
    }

    #[test]
    fn test_total_amount() {
        let quotation = Quotation {
            quotation_id: 1,
            quotation_no: "QG-AB-001-25".to_string(),
            enquiry_id: None,
            division: "GEO".to_string(),
            client_initials: Some("AB".to_string()),
            revision: 0,
            parent_quotation_id: None,
            payment_terms: None,
            status: "DRAFT".to_string(),
            created_at: Utc::now(),
        };

        let detail = QuotationDetail::new(quotation, vec![item(150, 3), item(200, 2)]);
        assert_eq!(detail.total_amount, Decimal::from(850));
    }
}
