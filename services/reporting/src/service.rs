//! Reporting Service
//!
//! Consolidated report uploads (fan-out rows per covered sample), the
//! review lifecycle over whole report groups, file replacement and the
//! test-distribution view built from stored sample assignments.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use terralab_database::{
    counters, ClientRepository, CounterStore, NewReportFile, ProjectRepository,
    QuotationRepository, ReportRepository, ReportWithSample, SampleRepository,
    TestRequestRepository,
};
use terralab_models::{
    ApproveReportRequest, Report, ReportDetail, ReportGroup, ReportSampleRef, SampleWithTest,
    SubmitReportRequest,
};
use terralab_utils::allocation::{covered_set, group_by_test, AssignedSample, SampleRef, TestGroup};
use terralab_utils::{extension_of, numbering, FileStore, LabError, LabResult, TemplateStore};

use crate::render::{CoverSheetContext, DocumentRenderer};

/// Everything one multipart upload carries. The caller names a single
/// sample; which samples the report covers is derived from the stored
/// assignments, never from the request.
#[derive(Debug, Clone)]
pub struct ReportUpload {
    pub sample_no: String,
    pub notes: Option<String>,
    pub uploaded_by: Option<String>,
    pub original_filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub file_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TestDistributionResponse {
    pub request_no: String,
    pub total_samples: usize,
    pub groups: Vec<TestGroup>,
}

#[derive(Clone)]
pub struct ReportingService<T: TemplateStore> {
    pool: PgPool,
    files: FileStore,
    renderer: Arc<DocumentRenderer>,
    templates: T,
}

impl<T: TemplateStore> ReportingService<T> {
    pub fn new(pool: PgPool, files: FileStore, renderer: DocumentRenderer, templates: T) -> Self {
        Self {
            pool,
            files,
            renderer: Arc::new(renderer),
            templates,
        }
    }

    fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    fn samples(&self) -> SampleRepository {
        SampleRepository::new(self.pool.clone())
    }

    fn requests(&self) -> TestRequestRepository {
        TestRequestRepository::new(self.pool.clone())
    }

    fn quotations(&self) -> QuotationRepository {
        QuotationRepository::new(self.pool.clone())
    }

    fn counter(&self) -> CounterStore {
        CounterStore::new(self.pool.clone())
    }

    // ===== Upload =====

    /// Resolve the named sample's assigned test, fan the upload out over
    /// every sample of the request sharing that test, and refuse the
    /// upload when any covered sample already carries a report row. The
    /// primary insert is compensated by deleting the stored blob; linked
    /// rows that fail afterwards are logged and skipped, leaving the
    /// group smaller but consistent.
    pub async fn upload_report(&self, upload: ReportUpload) -> LabResult<Vec<Report>> {
        let sample_no = upload.sample_no.trim();
        if sample_no.is_empty() {
            return Err(LabError::validation("sample_no", "Sample number is required"));
        }
        if upload.data.is_empty() {
            return Err(LabError::validation("file", "Uploaded file is empty"));
        }

        let sample = self
            .samples()
            .find_by_sample_no(sample_no)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("sample {}", sample_no)))?;

        let assigned: Vec<AssignedSample> = self
            .samples()
            .list_for_request(sample.test_request_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .iter()
            .map(to_assigned)
            .collect();

        let (item_id, covered) = resolve_coverage(sample.sample_id, &assigned)?;

        let item = self
            .quotations()
            .find_item(item_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("quotation item {}", item_id)))?;

        let covered_ids: Vec<i64> = covered.iter().map(|s| s.sample_id).collect();
        let existing = self
            .reports()
            .find_any_for_samples(&covered_ids)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;
        ensure_unreported(existing, &item.description)?;

        let today = Utc::now().date_naive();
        let seq = self
            .counter()
            .next(&counters::report_scope(today))
            .await
            .map_err(|e| LabError::database(e.to_string()))?;
        let report_no = numbering::report_no(today, seq);

        let code = item
            .item_code
            .clone()
            .unwrap_or_else(|| format!("T{}", item_id));
        let ext = extension_of(&upload.original_filename, ".pdf");
        let file_type = ext.trim_start_matches('.').to_string();
        let stored_filename = numbering::report_filename(&report_no, &code, &ext);

        let path = self
            .files
            .save(&stored_filename, &upload.data)
            .await
            .map_err(|e| LabError::storage(e.to_string()))?;

        let file = NewReportFile {
            report_no: report_no.clone(),
            original_filename: upload.original_filename.clone(),
            stored_filename,
            file_path: path.to_string_lossy().into_owned(),
            file_type,
            covers_test_type: Some(item.description.clone()),
            notes: upload.notes.clone(),
            uploaded_by: upload.uploaded_by.clone(),
        };

        let primary = match self.reports().insert_primary(&file, covered[0].sample_id).await {
            Ok(report) => report,
            Err(e) => {
                // Compensating cleanup: the blob must not outlive the row
                if let Err(del) = self.files.delete(&path).await {
                    warn!("Failed to clean up orphaned report file {}: {}", file.file_path, del);
                }
                return Err(LabError::database(e.to_string()));
            }
        };

        let mut reports = vec![primary];
        for linked in &covered[1..] {
            match self
                .reports()
                .insert_linked(&file, linked.sample_id, reports[0].report_id)
                .await
            {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(
                        "Skipping linked report row for sample {} under {}: {}",
                        linked.sample_no, report_no, e
                    );
                }
            }
        }

        info!(
            "Uploaded report {} covering {} samples",
            report_no,
            reports.len()
        );
        Ok(reports)
    }

    // ===== Listings =====

    /// Consolidated listing: one entry per report_no with its covered
    /// samples, newest group first.
    pub async fn list_reports(&self) -> LabResult<Vec<ReportGroup>> {
        let rows = self
            .reports()
            .list_with_samples()
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        Ok(group_reports(rows))
    }

    pub async fn reports_for_sample(&self, sample_id: i64) -> LabResult<Vec<ReportDetail>> {
        let rows = self
            .reports()
            .list_for_sample(sample_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (report, sample_no) = row.into_parts();
                ReportDetail::new(report, sample_no)
            })
            .collect())
    }

    pub async fn report_detail(&self, report_id: i64) -> LabResult<ReportDetail> {
        let row = self
            .reports()
            .find_with_sample(report_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("report {}", report_id)))?;

        let (report, sample_no) = row.into_parts();
        Ok(ReportDetail::new(report, sample_no))
    }

    // ===== Review lifecycle =====

    /// Submit the whole report_no group for review. The group stays
    /// unlocked until approval.
    pub async fn submit_report(
        &self,
        report_id: i64,
        payload: SubmitReportRequest,
    ) -> LabResult<Vec<Report>> {
        let report = self.find_report(report_id).await?;

        if !report.can_submit() {
            return Err(LabError::conflict(format!(
                "Report {} is {} and cannot be submitted",
                report.report_no, report.status
            )));
        }

        let moved = self
            .reports()
            .submit_group(&report.report_no, payload.checked_by.as_deref())
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        if moved == 0 {
            return Err(LabError::conflict(format!(
                "Report {} was submitted concurrently",
                report.report_no
            )));
        }

        info!("Report {} submitted for review ({} rows)", report.report_no, moved);
        self.group(&report.report_no).await
    }

    /// Approve the whole group; every row becomes immutable.
    pub async fn approve_report(
        &self,
        report_id: i64,
        payload: ApproveReportRequest,
    ) -> LabResult<Vec<Report>> {
        let report = self.find_report(report_id).await?;

        if !report.can_approve() {
            return Err(LabError::conflict(format!(
                "Report {} is {} and cannot be approved",
                report.report_no, report.status
            )));
        }

        let moved = self
            .reports()
            .approve_group(&report.report_no, payload.approved_by.as_deref())
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        if moved == 0 {
            return Err(LabError::conflict(format!(
                "Report {} was approved concurrently",
                report.report_no
            )));
        }

        info!("Report {} approved ({} rows)", report.report_no, moved);
        self.group(&report.report_no).await
    }

    /// Swap the file on a still-editable group. The old blob is removed
    /// best-effort once the rows point at the new one.
    pub async fn replace_report_file(
        &self,
        report_id: i64,
        original_filename: &str,
        data: &[u8],
    ) -> LabResult<Vec<Report>> {
        let report = self.find_report(report_id).await?;

        if !report.can_edit() {
            return Err(LabError::conflict(format!(
                "Report {} is locked and its file cannot be replaced",
                report.report_no
            )));
        }

        let ext = extension_of(original_filename, ".pdf");
        let file_type = ext.trim_start_matches('.').to_string();
        let stored_filename = numbering::replacement_filename(&report.report_no, &ext);

        let path = self
            .files
            .save(&stored_filename, data)
            .await
            .map_err(|e| LabError::storage(e.to_string()))?;

        let updated = self
            .reports()
            .replace_group_file(
                &report.report_no,
                original_filename,
                &stored_filename,
                &path.to_string_lossy(),
                &file_type,
            )
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        if updated == 0 {
            if let Err(del) = self.files.delete(&path).await {
                warn!("Failed to clean up unused replacement file: {}", del);
            }
            return Err(LabError::conflict(format!(
                "Report {} was locked concurrently",
                report.report_no
            )));
        }

        let old_path = Path::new(&report.file_path);
        if let Err(e) = self.files.delete(old_path).await {
            warn!("Failed to delete superseded report file {}: {}", report.file_path, e);
        }

        info!("Replaced file on report {} ({} rows)", report.report_no, updated);
        self.group(&report.report_no).await
    }

    pub async fn download_report(&self, report_id: i64) -> LabResult<Download> {
        let report = self.find_report(report_id).await?;

        let path = Path::new(&report.file_path);
        if !self.files.exists(path).await {
            return Err(LabError::not_found(format!(
                "stored file for report {}",
                report.report_no
            )));
        }

        let content = self
            .files
            .read(path)
            .await
            .map_err(|e| LabError::storage(e.to_string()))?;

        Ok(Download {
            filename: report.original_filename,
            file_type: report.file_type,
            content,
        })
    }

    /// Blank report template for a test item, straight from the store.
    pub async fn report_template(&self, item_code: &str) -> LabResult<Download> {
        let template = self
            .templates
            .report_template(item_code)
            .await?
            .ok_or_else(|| {
                LabError::not_found(format!("report template for test {}", item_code))
            })?;

        let file_type = extension_of(&template.filename, ".xlsx")
            .trim_start_matches('.')
            .to_string();
        Ok(Download {
            filename: template.filename,
            file_type,
            content: template.content,
        })
    }

    // ===== Distribution and cover sheet =====

    /// How a request's samples distribute over test types, straight from
    /// the stored assignments.
    pub async fn test_distribution(&self, request_no: &str) -> LabResult<TestDistributionResponse> {
        let (request, assigned) = self.assigned_samples(request_no).await?;

        let total_samples = assigned.len();
        let groups: Vec<TestGroup> = group_by_test(&assigned).into_values().collect();

        Ok(TestDistributionResponse {
            request_no: request,
            total_samples,
            groups,
        })
    }

    /// Populated cover sheet for one test of a request, rendered from
    /// the field map.
    pub async fn cover_sheet(&self, request_no: &str, quotation_item_id: i64) -> LabResult<String> {
        let request = self
            .requests()
            .find_by_request_no(request_no)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("test request {}", request_no)))?;

        let (_, assigned) = self.assigned_samples(request_no).await?;
        let covered = covered_set(&assigned, quotation_item_id);
        if covered.is_empty() {
            return Err(LabError::not_found(format!(
                "samples assigned to test {} on request {}",
                quotation_item_id, request_no
            )));
        }

        let item = self
            .quotations()
            .find_item(quotation_item_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("quotation item {}", quotation_item_id)))?;

        let project = ProjectRepository::new(self.pool.clone())
            .find_by_id(request.project_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("project {}", request.project_id)))?;

        let client = ClientRepository::new(self.pool.clone())
            .find_by_id(project.client_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("client {}", project.client_id)))?;

        // The real number is only drawn when the report file is uploaded
        let context = CoverSheetContext {
            report_no: "To be assigned".to_string(),
            report_date: Utc::now().date_naive().to_string(),
            request_no: request.request_no,
            project_name: project.project_name,
            client_name: client.name,
            location: project.location.unwrap_or_default(),
            test_name: item.description,
            test_standard: item.test_standard.unwrap_or_default(),
            sample_numbers: covered.into_iter().map(|s| s.sample_no).collect(),
        };

        self.renderer.render_cover_sheet(&context)
    }

    async fn assigned_samples(&self, request_no: &str) -> LabResult<(String, Vec<AssignedSample>)> {
        let request = self
            .requests()
            .find_by_request_no(request_no)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("test request {}", request_no)))?;

        let samples = self
            .samples()
            .list_for_request(request.test_request_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        Ok((request.request_no, samples.iter().map(to_assigned).collect()))
    }

    async fn find_report(&self, report_id: i64) -> LabResult<Report> {
        self.reports()
            .find_by_id(report_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("report {}", report_id)))
    }

    async fn group(&self, report_no: &str) -> LabResult<Vec<Report>> {
        self.reports()
            .group_rows(report_no)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }
}

fn to_assigned(sample: &SampleWithTest) -> AssignedSample {
    AssignedSample {
        sample_id: sample.sample_id,
        sample_no: sample.sample_no.clone(),
        quotation_item_id: sample.assigned_quotation_item_id,
        item_code: sample.item_code.clone(),
        test_name: sample.test_name.clone(),
    }
}

/// The uploading sample's assigned test plus every sample of its request
/// sharing that test, the uploading sample first. A sample without a
/// stored assignment cannot anchor an upload.
fn resolve_coverage(sample_id: i64, assigned: &[AssignedSample]) -> LabResult<(i64, Vec<SampleRef>)> {
    let uploading = assigned
        .iter()
        .find(|s| s.sample_id == sample_id)
        .ok_or_else(|| LabError::not_found(format!("sample {}", sample_id)))?;

    let item_id = uploading.quotation_item_id.ok_or_else(|| {
        LabError::validation(
            "sample_no",
            format!(
                "Sample {} has no assigned test; regenerate samples for its request",
                uploading.sample_no
            ),
        )
    })?;

    let mut covered = covered_set(assigned, item_id);
    if let Some(pos) = covered.iter().position(|s| s.sample_id == sample_id) {
        let front = covered.remove(pos);
        covered.insert(0, front);
    }

    Ok((item_id, covered))
}

/// One non-duplicate report per test type: any existing row on a covered
/// sample blocks the upload.
fn ensure_unreported(existing: Option<Report>, test_name: &str) -> LabResult<()> {
    match existing {
        Some(report) => Err(LabError::conflict(format!(
            "A report already exists for {} (report {}); duplicate reports are not allowed",
            test_name, report.report_no
        ))),
        None => Ok(()),
    }
}

/// Fold the flat row listing into one entry per report_no, preserving
/// row order (newest group first, primary row first within a group).
fn group_reports(rows: Vec<ReportWithSample>) -> Vec<ReportGroup> {
    let mut groups: Vec<ReportGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let (report, sample_no) = row.into_parts();
        let entry = ReportSampleRef {
            report_id: report.report_id,
            sample_id: report.sample_id,
            sample_no,
        };

        match index.get(&report.report_no) {
            Some(&i) => {
                groups[i].samples.push(entry);
                groups[i].sample_count += 1;
            }
            None => {
                index.insert(report.report_no.clone(), groups.len());
                groups.push(ReportGroup {
                    report_no: report.report_no.clone(),
                    primary_report_id: report.report_id,
                    original_filename: report.original_filename.clone(),
                    file_type: report.file_type.clone(),
                    status: report.status.clone(),
                    is_locked: report.is_locked,
                    covers_test_type: report.covers_test_type.clone(),
                    uploaded_by: report.uploaded_by.clone(),
                    created_at: report.created_at,
                    sample_count: 1,
                    samples: vec![entry],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned(sample_id: i64, sample_no: &str, item: Option<i64>) -> AssignedSample {
        AssignedSample {
            sample_id,
            sample_no: sample_no.to_string(),
            quotation_item_id: item,
            item_code: item.map(|i| format!("C{}", i)),
            test_name: item.map(|i| format!("Test {}", i)),
        }
    }

    fn row(report_id: i64, report_no: &str, sample_id: i64, linked_to: Option<i64>) -> ReportWithSample {
        ReportWithSample {
            report_id,
            report_no: report_no.to_string(),
            sample_id,
            sample_no: format!("SMP-{:03}", sample_id),
            original_filename: "report.pdf".to_string(),
            stored_filename: format!("{}.pdf", report_no),
            file_path: format!("/tmp/{}.pdf", report_no),
            file_type: "pdf".to_string(),
            linked_to_report_id: linked_to,
            covers_test_type: Some("Proctor Compaction".to_string()),
            status: "DRAFT".to_string(),
            is_locked: false,
            notes: None,
            uploaded_by: None,
            checked_by: None,
            checked_at: None,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_coverage_spans_samples_sharing_the_assigned_test() {
        let samples = vec![
            assigned(1, "SMP-001", Some(7)),
            assigned(2, "SMP-002", Some(9)),
            assigned(3, "SMP-003", Some(7)),
            assigned(4, "SMP-004", None),
        ];

        let (item_id, covered) = resolve_coverage(3, &samples).unwrap();

        assert_eq!(item_id, 7);
        let ids: Vec<i64> = covered.iter().map(|s| s.sample_id).collect();
        // The uploading sample leads; others keep generation order
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_coverage_requires_persisted_assignment() {
        let samples = vec![assigned(1, "SMP-001", None), assigned(2, "SMP-002", Some(7))];

        let err = resolve_coverage(1, &samples).unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("no assigned test"));
    }

    #[test]
    fn test_coverage_rejects_unknown_sample() {
        let samples = vec![assigned(1, "SMP-001", Some(7))];

        let err = resolve_coverage(99, &samples).unwrap_err();

        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_existing_report_on_a_covered_sample_blocks_upload() {
        let (existing, _) = row(10, "RPT-150126-01", 3, None).into_parts();

        let err = ensure_unreported(Some(existing), "Proctor Compaction").unwrap_err();

        assert_eq!(err.error_code(), "CONFLICT");
        assert!(err.to_string().contains("RPT-150126-01"));
    }

    #[test]
    fn test_no_existing_report_allows_upload() {
        assert!(ensure_unreported(None, "Proctor Compaction").is_ok());
    }

    #[test]
    fn test_grouping_keeps_newest_group_first_and_primary_leading() {
        // Listing order: group of ids 5..7 (newer primary) before id 2
        let rows = vec![
            row(5, "RPT-010226-01", 11, None),
            row(6, "RPT-010226-01", 12, Some(5)),
            row(7, "RPT-010226-01", 13, Some(5)),
            row(2, "RPT-311225-04", 8, None),
        ];

        let groups = group_reports(rows);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].report_no, "RPT-010226-01");
        assert_eq!(groups[0].primary_report_id, 5);
        assert_eq!(groups[0].sample_count, 3);
        let sample_ids: Vec<i64> = groups[0].samples.iter().map(|s| s.sample_id).collect();
        assert_eq!(sample_ids, vec![11, 12, 13]);
        assert_eq!(groups[1].report_no, "RPT-311225-04");
        assert_eq!(groups[1].sample_count, 1);
    }
}
