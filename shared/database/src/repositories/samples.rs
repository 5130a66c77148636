//! Sample Repository
//!
//! Generation inserts the whole batch in one transaction; the assigned
//! test columns written here are never updated afterwards.

use anyhow::{Context, Result};
use sqlx::PgPool;

use terralab_models::{Sample, SampleWithTest};

const SAMPLE_COLUMNS: &str = r#"sample_id, sample_no, test_request_id, collected_by,
    received_date, status, reason_rejected, barcode, storage_location,
    assigned_tri_id, assigned_quotation_item_id, created_at"#;

const SAMPLE_WITH_TEST_QUERY: &str = r#"
    SELECT s.sample_id, s.sample_no, s.test_request_id, tr.request_no, s.status,
           s.barcode, s.storage_location, s.assigned_tri_id, s.assigned_quotation_item_id,
           qi.item_code, qi.description AS test_name, qi.test_standard, s.created_at
    FROM samples s
    JOIN test_requests tr ON tr.test_request_id = s.test_request_id
    LEFT JOIN quotation_items qi ON qi.item_id = s.assigned_quotation_item_id
"#;

/// One sample to insert, already numbered and assigned.
#[derive(Debug, Clone)]
pub struct NewSample {
    pub sample_no: String,
    pub collected_by: Option<String>,
    pub assigned_tri_id: i64,
    pub assigned_quotation_item_id: i64,
}

pub struct SampleRepository {
    pool: PgPool,
}

impl SampleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a generation batch atomically. Either every slot becomes a
    /// row or none do.
    pub async fn insert_batch(
        &self,
        test_request_id: i64,
        batch: &[NewSample],
    ) -> Result<Vec<Sample>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin sample batch transaction")?;

        let mut samples = Vec::with_capacity(batch.len());
        for new in batch {
            let sample: Sample = sqlx::query_as(&format!(
                r#"
                INSERT INTO samples (sample_no, test_request_id, collected_by,
                                     assigned_tri_id, assigned_quotation_item_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {SAMPLE_COLUMNS}
                "#,
            ))
            .bind(&new.sample_no)
            .bind(test_request_id)
            .bind(&new.collected_by)
            .bind(new.assigned_tri_id)
            .bind(new.assigned_quotation_item_id)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert sample {}", new.sample_no))?;
            samples.push(sample);
        }

        tx.commit()
            .await
            .context("Failed to commit sample batch")?;

        Ok(samples)
    }

    pub async fn find_by_id(&self, sample_id: i64) -> Result<Option<Sample>> {
        sqlx::query_as(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples WHERE sample_id = $1",
        ))
        .bind(sample_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch sample by ID")
    }

    pub async fn find_by_sample_no(&self, sample_no: &str) -> Result<Option<Sample>> {
        sqlx::query_as(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples WHERE sample_no = $1",
        ))
        .bind(sample_no)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch sample by number")
    }

    /// A request's samples in generation order (ascending sample_id).
    pub async fn list_for_request(&self, test_request_id: i64) -> Result<Vec<SampleWithTest>> {
        sqlx::query_as(&format!(
            "{SAMPLE_WITH_TEST_QUERY} WHERE s.test_request_id = $1 ORDER BY s.sample_id",
        ))
        .bind(test_request_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list samples for request")
    }

    pub async fn list_by_status(&self, status: &str) -> Result<Vec<SampleWithTest>> {
        sqlx::query_as(&format!(
            "{SAMPLE_WITH_TEST_QUERY} WHERE s.status = $1 ORDER BY s.sample_id DESC",
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list samples by status")
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<SampleWithTest>> {
        sqlx::query_as(&format!(
            "{SAMPLE_WITH_TEST_QUERY} ORDER BY s.sample_id DESC LIMIT $1",
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recent samples")
    }

    /// Accept a pending sample: status, barcode, storage location and
    /// received timestamp in one write. Returns None when no pending row
    /// matched, so terminal samples cannot be re-accepted.
    pub async fn accept(
        &self,
        sample_id: i64,
        storage_location: &str,
        barcode: &str,
    ) -> Result<Option<Sample>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE samples
            SET status = 'ACCEPTED', storage_location = $2, barcode = $3,
                received_date = NOW()
            WHERE sample_id = $1 AND status = 'PENDING'
            RETURNING {SAMPLE_COLUMNS}
            "#,
        ))
        .bind(sample_id)
        .bind(storage_location)
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to accept sample")
    }

    pub async fn reject(&self, sample_id: i64, reason: &str) -> Result<Option<Sample>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE samples
            SET status = 'REJECTED', reason_rejected = $2
            WHERE sample_id = $1 AND status = 'PENDING'
            RETURNING {SAMPLE_COLUMNS}
            "#,
        ))
        .bind(sample_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to reject sample")
    }
}
