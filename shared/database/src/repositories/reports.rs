//! Report Repository
//!
//! One upload covering N samples is persisted as one primary row plus
//! N-1 linked rows; the primary must land, linked rows are inserted one
//! by one. Review updates run as single statements over the whole
//! report_no group, so a group can never end up half submitted or half
//! approved.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use terralab_models::Report;

const REPORT_COLUMNS: &str = r#"report_id, report_no, sample_id, original_filename,
    stored_filename, file_path, file_type, linked_to_report_id, covers_test_type,
    status, is_locked, notes, uploaded_by, checked_by, checked_at,
    approved_by, approved_at, created_at"#;

/// Report row joined with its sample number, for listings.
#[derive(Debug, Clone, FromRow)]
pub struct ReportWithSample {
    pub report_id: i64,
    pub report_no: String,
    pub sample_id: i64,
    pub sample_no: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_path: String,
    pub file_type: String,
    pub linked_to_report_id: Option<i64>,
    pub covers_test_type: Option<String>,
    pub status: String,
    pub is_locked: bool,
    pub notes: Option<String>,
    pub uploaded_by: Option<String>,
    pub checked_by: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReportWithSample {
    pub fn into_parts(self) -> (Report, String) {
        let sample_no = self.sample_no;
        let report = Report {
            report_id: self.report_id,
            report_no: self.report_no,
            sample_id: self.sample_id,
            original_filename: self.original_filename,
            stored_filename: self.stored_filename,
            file_path: self.file_path,
            file_type: self.file_type,
            linked_to_report_id: self.linked_to_report_id,
            covers_test_type: self.covers_test_type,
            status: self.status,
            is_locked: self.is_locked,
            notes: self.notes,
            uploaded_by: self.uploaded_by,
            checked_by: self.checked_by,
            checked_at: self.checked_at,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            created_at: self.created_at,
        };
        (report, sample_no)
    }
}

/// File metadata shared by every row of one upload.
#[derive(Debug, Clone)]
pub struct NewReportFile {
    pub report_no: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_path: String,
    pub file_type: String,
    pub covers_test_type: Option<String>,
    pub notes: Option<String>,
    pub uploaded_by: Option<String>,
}

pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the primary row of an upload. The caller deletes the
    /// stored blob if this fails.
    pub async fn insert_primary(&self, file: &NewReportFile, sample_id: i64) -> Result<Report> {
        self.insert_row(file, sample_id, None).await
    }

    /// Insert one linked fan-out row pointing at the primary. Callers
    /// log and skip failures; the primary row stands on its own.
    pub async fn insert_linked(
        &self,
        file: &NewReportFile,
        sample_id: i64,
        primary_report_id: i64,
    ) -> Result<Report> {
        self.insert_row(file, sample_id, Some(primary_report_id)).await
    }

    async fn insert_row(
        &self,
        file: &NewReportFile,
        sample_id: i64,
        linked_to: Option<i64>,
    ) -> Result<Report> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO reports (report_no, sample_id, original_filename, stored_filename,
                                 file_path, file_type, linked_to_report_id,
                                 covers_test_type, notes, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {REPORT_COLUMNS}
            "#,
        ))
        .bind(&file.report_no)
        .bind(sample_id)
        .bind(&file.original_filename)
        .bind(&file.stored_filename)
        .bind(&file.file_path)
        .bind(&file.file_type)
        .bind(linked_to)
        .bind(&file.covers_test_type)
        .bind(&file.notes)
        .bind(&file.uploaded_by)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to insert report row for sample {}", sample_id))
    }

    pub async fn find_by_id(&self, report_id: i64) -> Result<Option<Report>> {
        sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE report_id = $1",
        ))
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch report by ID")
    }

    pub async fn find_with_sample(&self, report_id: i64) -> Result<Option<ReportWithSample>> {
        sqlx::query_as(
            r#"
            SELECT r.report_id, r.report_no, r.sample_id, s.sample_no, r.original_filename,
                   r.stored_filename, r.file_path, r.file_type, r.linked_to_report_id,
                   r.covers_test_type, r.status, r.is_locked, r.notes, r.uploaded_by,
                   r.checked_by, r.checked_at, r.approved_by, r.approved_at, r.created_at
            FROM reports r
            JOIN samples s ON s.sample_id = r.sample_id
            WHERE r.report_id = $1
            "#,
        )
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch report with sample")
    }

    /// Every row of the listing, newest group first, primary rows before
    /// their linked rows within a group. Groups sort by their primary
    /// row's id, not the report_no text, so day boundaries order
    /// correctly.
    pub async fn list_with_samples(&self) -> Result<Vec<ReportWithSample>> {
        sqlx::query_as(
            r#"
            SELECT r.report_id, r.report_no, r.sample_id, s.sample_no, r.original_filename,
                   r.stored_filename, r.file_path, r.file_type, r.linked_to_report_id,
                   r.covers_test_type, r.status, r.is_locked, r.notes, r.uploaded_by,
                   r.checked_by, r.checked_at, r.approved_by, r.approved_at, r.created_at
            FROM reports r
            JOIN samples s ON s.sample_id = r.sample_id
            ORDER BY COALESCE(r.linked_to_report_id, r.report_id) DESC, r.report_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list reports")
    }

    /// Earliest report row covering any of the given samples, if one
    /// exists. The upload path uses this to refuse a second report for a
    /// test type whose samples are already covered.
    pub async fn find_any_for_samples(&self, sample_ids: &[i64]) -> Result<Option<Report>> {
        sqlx::query_as(&format!(
            r#"
            SELECT {REPORT_COLUMNS} FROM reports
            WHERE sample_id = ANY($1)
            ORDER BY report_id
            LIMIT 1
            "#,
        ))
        .bind(sample_ids)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to scan reports for covered samples")
    }

    pub async fn list_for_sample(&self, sample_id: i64) -> Result<Vec<ReportWithSample>> {
        sqlx::query_as(
            r#"
            SELECT r.report_id, r.report_no, r.sample_id, s.sample_no, r.original_filename,
                   r.stored_filename, r.file_path, r.file_type, r.linked_to_report_id,
                   r.covers_test_type, r.status, r.is_locked, r.notes, r.uploaded_by,
                   r.checked_by, r.checked_at, r.approved_by, r.approved_at, r.created_at
            FROM reports r
            JOIN samples s ON s.sample_id = r.sample_id
            WHERE r.sample_id = $1
            ORDER BY r.report_id DESC
            "#,
        )
        .bind(sample_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list reports for sample")
    }

    pub async fn group_rows(&self, report_no: &str) -> Result<Vec<Report>> {
        sqlx::query_as(&format!(
            r#"
            SELECT {REPORT_COLUMNS} FROM reports
            WHERE report_no = $1
            ORDER BY report_id
            "#,
        ))
        .bind(report_no)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch report group")
    }

    /// Move every Draft row of the group to Under Review. Returns the
    /// number of rows moved; one statement, so the group transitions
    /// atomically. Locking happens at approval, not here.
    pub async fn submit_group(&self, report_no: &str, checked_by: Option<&str>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = 'UNDER_REVIEW', checked_by = $2, checked_at = NOW()
            WHERE report_no = $1 AND status = 'DRAFT'
            "#,
        )
        .bind(report_no)
        .bind(checked_by)
        .execute(&self.pool)
        .await
        .context("Failed to submit report group")?;

        Ok(result.rows_affected())
    }

    /// Approve every Under Review row of the group; approval is the one
    /// transition that locks the rows.
    pub async fn approve_group(&self, report_no: &str, approved_by: Option<&str>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = 'APPROVED', is_locked = TRUE,
                approved_by = $2, approved_at = NOW()
            WHERE report_no = $1 AND status = 'UNDER_REVIEW'
            "#,
        )
        .bind(report_no)
        .bind(approved_by)
        .execute(&self.pool)
        .await
        .context("Failed to approve report group")?;

        Ok(result.rows_affected())
    }

    /// Swap the stored file on every row of the group, only while the
    /// whole group is still editable Draft.
    pub async fn replace_group_file(
        &self,
        report_no: &str,
        original_filename: &str,
        stored_filename: &str,
        file_path: &str,
        file_type: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET original_filename = $2, stored_filename = $3, file_path = $4, file_type = $5
            WHERE report_no = $1 AND status = 'DRAFT' AND is_locked = FALSE
            "#,
        )
        .bind(report_no)
        .bind(original_filename)
        .bind(stored_filename)
        .bind(file_path)
        .bind(file_type)
        .execute(&self.pool)
        .await
        .context("Failed to replace report group file")?;

        Ok(result.rows_affected())
    }
}
