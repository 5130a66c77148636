//! Test Request Repository

use anyhow::{Context, Result};
use sqlx::PgPool;

use terralab_models::{TestRequest, TestRequestItem, TestRequestItemDetail};

const REQUEST_COLUMNS: &str =
    "test_request_id, request_no, project_id, requested_by, status, created_at";

pub struct TestRequestRepository {
    pool: PgPool,
}

impl TestRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        request_no: &str,
        project_id: i64,
        requested_by: Option<&str>,
    ) -> Result<TestRequest> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO test_requests (request_no, project_id, requested_by)
            VALUES ($1, $2, $3)
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(request_no)
        .bind(project_id)
        .bind(requested_by)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create test request")
    }

    pub async fn find_by_id(&self, test_request_id: i64) -> Result<Option<TestRequest>> {
        sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM test_requests WHERE test_request_id = $1",
        ))
        .bind(test_request_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch test request by ID")
    }

    pub async fn find_by_request_no(&self, request_no: &str) -> Result<Option<TestRequest>> {
        sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM test_requests WHERE request_no = $1",
        ))
        .bind(request_no)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch test request by number")
    }

    pub async fn list_for_project(&self, project_id: i64) -> Result<Vec<TestRequest>> {
        sqlx::query_as(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM test_requests
            WHERE project_id = $1
            ORDER BY test_request_id DESC
            "#,
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list test requests for project")
    }

    pub async fn add_item(
        &self,
        test_request_id: i64,
        quotation_item_id: i64,
        quantity: i32,
    ) -> Result<TestRequestItem> {
        sqlx::query_as(
            r#"
            INSERT INTO test_request_items (test_request_id, quotation_item_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING tri_id, test_request_id, quotation_item_id, quantity
            "#,
        )
        .bind(test_request_id)
        .bind(quotation_item_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .context("Failed to add test request item")
    }

    /// Seed a request with every line of its project's quotation, all or
    /// nothing. Returns None without writing when the request already
    /// has items, so callers can tell that apart from a failed write.
    pub async fn copy_all_items(
        &self,
        test_request_id: i64,
        lines: &[(i64, i32)],
    ) -> Result<Option<Vec<TestRequestItem>>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin copy-all transaction")?;

        let (existing,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM test_request_items WHERE test_request_id = $1",
        )
        .bind(test_request_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count existing request items")?;

        if existing > 0 {
            return Ok(None);
        }

        let mut inserted = Vec::with_capacity(lines.len());
        for (quotation_item_id, quantity) in lines {
            let item: TestRequestItem = sqlx::query_as(
                r#"
                INSERT INTO test_request_items (test_request_id, quotation_item_id, quantity)
                VALUES ($1, $2, $3)
                RETURNING tri_id, test_request_id, quotation_item_id, quantity
                "#,
            )
            .bind(test_request_id)
            .bind(quotation_item_id)
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to copy quotation item into request")?;
            inserted.push(item);
        }

        tx.commit()
            .await
            .context("Failed to commit copy-all transaction")?;

        Ok(Some(inserted))
    }

    /// Request items joined with their quotation lines, in tri_id order.
    pub async fn items_detailed(&self, test_request_id: i64) -> Result<Vec<TestRequestItemDetail>> {
        sqlx::query_as(
            r#"
            SELECT tri.tri_id, tri.test_request_id, tri.quotation_item_id, tri.quantity,
                   qi.item_code, qi.description, qi.test_standard, qi.unit_rate
            FROM test_request_items tri
            JOIN quotation_items qi ON qi.item_id = tri.quotation_item_id
            WHERE tri.test_request_id = $1
            ORDER BY tri.tri_id
            "#,
        )
        .bind(test_request_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch request items with quotation lines")
    }

    pub async fn update_status(&self, test_request_id: i64, status: &str) -> Result<Option<TestRequest>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE test_requests SET status = $2
            WHERE test_request_id = $1
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(test_request_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update test request status")
    }
}
