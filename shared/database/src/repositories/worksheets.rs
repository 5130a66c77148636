//! Worksheet Repository
//!
//! Issuance is idempotent per (sample_id, quotation_item_id): the unique
//! constraint arbitrates races and the loser returns the winner's row.

use anyhow::{Context, Result};
use sqlx::PgPool;

use terralab_models::Worksheet;

const WORKSHEET_COLUMNS: &str = r#"worksheet_id, worksheet_no, sample_id, quotation_item_id,
    test_name, test_standard, status, technician, document_path, created_at"#;

pub struct WorksheetRepository {
    pool: PgPool,
}

impl WorksheetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_pair(
        &self,
        sample_id: i64,
        quotation_item_id: i64,
    ) -> Result<Option<Worksheet>> {
        sqlx::query_as(&format!(
            r#"
            SELECT {WORKSHEET_COLUMNS} FROM worksheets
            WHERE sample_id = $1 AND quotation_item_id = $2
            "#,
        ))
        .bind(sample_id)
        .bind(quotation_item_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch worksheet by sample and test")
    }

    /// Insert unless the pair already has a worksheet. Returns None when
    /// a concurrent issuer won; the caller re-reads the stored row.
    pub async fn try_insert(
        &self,
        worksheet_no: &str,
        sample_id: i64,
        quotation_item_id: i64,
        test_name: &str,
        test_standard: Option<&str>,
        technician: Option<&str>,
    ) -> Result<Option<Worksheet>> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO worksheets (worksheet_no, sample_id, quotation_item_id,
                                    test_name, test_standard, technician)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (sample_id, quotation_item_id) DO NOTHING
            RETURNING {WORKSHEET_COLUMNS}
            "#,
        ))
        .bind(worksheet_no)
        .bind(sample_id)
        .bind(quotation_item_id)
        .bind(test_name)
        .bind(test_standard)
        .bind(technician)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to insert worksheet")
    }

    pub async fn find_by_id(&self, worksheet_id: i64) -> Result<Option<Worksheet>> {
        sqlx::query_as(&format!(
            "SELECT {WORKSHEET_COLUMNS} FROM worksheets WHERE worksheet_id = $1",
        ))
        .bind(worksheet_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch worksheet by ID")
    }

    pub async fn list_for_sample(&self, sample_id: i64) -> Result<Vec<Worksheet>> {
        sqlx::query_as(&format!(
            r#"
            SELECT {WORKSHEET_COLUMNS} FROM worksheets
            WHERE sample_id = $1
            ORDER BY worksheet_id
            "#,
        ))
        .bind(sample_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list worksheets for sample")
    }

    pub async fn set_document(&self, worksheet_id: i64, path: &str) -> Result<Option<Worksheet>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE worksheets SET document_path = $2
            WHERE worksheet_id = $1
            RETURNING {WORKSHEET_COLUMNS}
            "#,
        ))
        .bind(worksheet_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to attach document to worksheet")
    }
}
