//! Quotation Repository
//!
//! Quotations, their ordered line items and the revision chain. Item
//! order is ascending item_id; the 1-based index paths in the request
//! handlers rely on that order.

use anyhow::{Context, Result};
use sqlx::PgPool;

use terralab_models::{AddQuotationItemRequest, Quotation, QuotationItem};

const QUOTATION_COLUMNS: &str = r#"quotation_id, quotation_no, enquiry_id, division,
    client_initials, revision, parent_quotation_id, payment_terms, status, created_at"#;

pub struct QuotationRepository {
    pool: PgPool,
}

impl QuotationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        quotation_no: &str,
        enquiry_id: Option<i64>,
        division: &str,
        client_initials: Option<&str>,
        payment_terms: Option<&str>,
    ) -> Result<Quotation> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO quotations (quotation_no, enquiry_id, division, client_initials, payment_terms)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {QUOTATION_COLUMNS}
            "#,
        ))
        .bind(quotation_no)
        .bind(enquiry_id)
        .bind(division)
        .bind(client_initials)
        .bind(payment_terms)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create quotation")
    }

    /// Insert a revision row: same series number, bumped revision,
    /// linked back to the quotation it revises.
    pub async fn create_revision(&self, parent: &Quotation) -> Result<Quotation> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO quotations (quotation_no, enquiry_id, division, client_initials,
                                    revision, parent_quotation_id, payment_terms, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'DRAFT')
            RETURNING {QUOTATION_COLUMNS}
            "#,
        ))
        .bind(format!("{}-R{}", parent.quotation_no, parent.revision + 1))
        .bind(parent.enquiry_id)
        .bind(&parent.division)
        .bind(&parent.client_initials)
        .bind(parent.revision + 1)
        .bind(parent.quotation_id)
        .bind(&parent.payment_terms)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create quotation revision")
    }

    pub async fn find_by_id(&self, quotation_id: i64) -> Result<Option<Quotation>> {
        sqlx::query_as(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotations WHERE quotation_id = $1",
        ))
        .bind(quotation_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch quotation by ID")
    }

    pub async fn list(&self) -> Result<Vec<Quotation>> {
        sqlx::query_as(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotations ORDER BY quotation_id DESC",
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list quotations")
    }

    pub async fn update_status(&self, quotation_id: i64, status: &str) -> Result<Option<Quotation>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE quotations SET status = $2
            WHERE quotation_id = $1
            RETURNING {QUOTATION_COLUMNS}
            "#,
        ))
        .bind(quotation_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update quotation status")
    }

    pub async fn add_item(
        &self,
        quotation_id: i64,
        item: &AddQuotationItemRequest,
    ) -> Result<QuotationItem> {
        sqlx::query_as(
            r#"
            INSERT INTO quotation_items (quotation_id, item_code, description, test_standard,
                                         unit_rate, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING item_id, quotation_id, item_code, description, test_standard,
                      unit_rate, quantity
            "#,
        )
        .bind(quotation_id)
        .bind(&item.item_code)
        .bind(&item.description)
        .bind(&item.test_standard)
        .bind(item.unit_rate)
        .bind(item.quantity)
        .fetch_one(&self.pool)
        .await
        .context("Failed to add quotation item")
    }

    /// Items in their canonical order (ascending item_id).
    pub async fn items(&self, quotation_id: i64) -> Result<Vec<QuotationItem>> {
        sqlx::query_as(
            r#"
            SELECT item_id, quotation_id, item_code, description, test_standard,
                   unit_rate, quantity
            FROM quotation_items
            WHERE quotation_id = $1
            ORDER BY item_id
            "#,
        )
        .bind(quotation_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch quotation items")
    }

    pub async fn find_item(&self, item_id: i64) -> Result<Option<QuotationItem>> {
        sqlx::query_as(
            r#"
            SELECT item_id, quotation_id, item_code, description, test_standard,
                   unit_rate, quantity
            FROM quotation_items
            WHERE item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch quotation item")
    }

    pub async fn delete_item(&self, item_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quotation_items WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete quotation item")?;
        Ok(result.rows_affected() > 0)
    }
}
