//! Sample Workflow Service
//!
//! Sample generation, intake decisions and worksheet issuance. Repos
//! are constructed per call from the shared pool; the template store is
//! injected so issuance never depends on the object store being up.

use chrono::{Datelike, Utc};
use sqlx::PgPool;
use tracing::{info, warn};

use terralab_database::{
    counters, CounterStore, QuotationRepository, SampleRepository, TestRequestRepository,
    NewSample, WorksheetRepository,
};
use terralab_models::{
    AcceptSampleRequest, GenerateSamplesRequest, GenerateSamplesResponse,
    GenerateWorksheetRequest, GenerateWorksheetResponse, RejectSampleRequest, Sample,
    SampleStatus, SampleWithTest, Worksheet,
};
use terralab_utils::allocation::{expand, TestLine};
use terralab_utils::{
    extension_of, numbering, validate_model, FileStore, LabError, LabResult, TemplateStore,
};

/// A downloadable blob plus the name to serve it under.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub file_type: String,
    pub content: Vec<u8>,
}

#[derive(Clone)]
pub struct SampleWorkflowService<T: TemplateStore> {
    pool: PgPool,
    files: FileStore,
    templates: T,
}

impl<T: TemplateStore> SampleWorkflowService<T> {
    pub fn new(pool: PgPool, files: FileStore, templates: T) -> Self {
        Self {
            pool,
            files,
            templates,
        }
    }

    fn requests(&self) -> TestRequestRepository {
        TestRequestRepository::new(self.pool.clone())
    }

    fn samples(&self) -> SampleRepository {
        SampleRepository::new(self.pool.clone())
    }

    fn worksheets(&self) -> WorksheetRepository {
        WorksheetRepository::new(self.pool.clone())
    }

    fn quotations(&self) -> QuotationRepository {
        QuotationRepository::new(self.pool.clone())
    }

    fn counter(&self) -> CounterStore {
        CounterStore::new(self.pool.clone())
    }

    // ===== Sample generation =====

    /// Expand the request's line items into numbered samples, one row
    /// per ordered unit, each permanently assigned its test. Calling
    /// this again appends a fresh batch; it is not idempotent.
    pub async fn generate_samples(
        &self,
        request_no: &str,
        payload: GenerateSamplesRequest,
    ) -> LabResult<GenerateSamplesResponse> {
        validate_model(&payload)?;

        let request = self
            .requests()
            .find_by_request_no(request_no)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("test request {}", request_no)))?;

        let items = self
            .requests()
            .items_detailed(request.test_request_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        if items.is_empty() {
            return Err(LabError::validation(
                "items",
                format!("Test request {} has no line items", request_no),
            ));
        }

        let lines: Vec<TestLine> = items
            .iter()
            .map(|item| TestLine {
                tri_id: item.tri_id,
                quotation_item_id: item.quotation_item_id,
                quantity: item.quantity,
                item_code: item
                    .item_code
                    .clone()
                    .unwrap_or_else(|| format!("T{}", item.quotation_item_id)),
                description: item.description.clone(),
                test_standard: item.test_standard.clone(),
                unit_rate: item.unit_rate,
            })
            .collect();

        let slots = expand(&lines);
        if slots.is_empty() {
            return Err(LabError::validation(
                "quantity",
                format!("Test request {} expands to zero samples", request_no),
            ));
        }

        let created_date = request.created_at.date_naive();
        let batch: Vec<NewSample> = slots
            .iter()
            .map(|slot| NewSample {
                sample_no: numbering::sample_no(&request.request_no, created_date, slot.sequence),
                collected_by: payload.collected_by.clone(),
                assigned_tri_id: slot.tri_id,
                assigned_quotation_item_id: slot.quotation_item_id,
            })
            .collect();

        let samples = self
            .samples()
            .insert_batch(request.test_request_id, &batch)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        info!(
            "Generated {} samples for request {}",
            samples.len(),
            request.request_no
        );

        Ok(GenerateSamplesResponse {
            request_no: request.request_no,
            samples_created: samples.len(),
            samples,
        })
    }

    // ===== Intake decisions =====

    pub async fn accept_sample(
        &self,
        sample_id: i64,
        payload: AcceptSampleRequest,
    ) -> LabResult<Sample> {
        validate_model(&payload)?;

        let sample = self.find_sample(sample_id).await?;
        self.check_pending(&sample)?;

        let barcode = numbering::barcode();
        self.samples()
            .accept(sample_id, &payload.storage_location, &barcode)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| {
                LabError::conflict(format!("Sample {} was decided concurrently", sample_id))
            })
    }

    pub async fn reject_sample(
        &self,
        sample_id: i64,
        payload: RejectSampleRequest,
    ) -> LabResult<Sample> {
        validate_model(&payload)?;

        let sample = self.find_sample(sample_id).await?;
        self.check_pending(&sample)?;

        if payload.inform_client {
            // TODO: wire up client notification once the mailer service lands
            info!("Client notification requested for rejected sample {}", sample_id);
        }

        self.samples()
            .reject(sample_id, &payload.reason)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| {
                LabError::conflict(format!("Sample {} was decided concurrently", sample_id))
            })
    }

    async fn find_sample(&self, sample_id: i64) -> LabResult<Sample> {
        self.samples()
            .find_by_id(sample_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("sample {}", sample_id)))
    }

    fn check_pending(&self, sample: &Sample) -> LabResult<()> {
        let status = SampleStatus::parse(&sample.status)
            .ok_or_else(|| LabError::internal(format!("Unknown sample status {}", sample.status)))?;

        if status.is_terminal() {
            return Err(LabError::conflict(format!(
                "Sample {} is already {}",
                sample.sample_id, sample.status
            )));
        }
        Ok(())
    }

    // ===== Listings =====

    pub async fn pending_samples(&self) -> LabResult<Vec<SampleWithTest>> {
        self.samples()
            .list_by_status(&SampleStatus::Pending.to_string())
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn recent_samples(&self, limit: i64) -> LabResult<Vec<SampleWithTest>> {
        self.samples()
            .list_recent(limit)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn samples_for_request(&self, request_no: &str) -> LabResult<Vec<SampleWithTest>> {
        let request = self
            .requests()
            .find_by_request_no(request_no)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("test request {}", request_no)))?;

        self.samples()
            .list_for_request(request.test_request_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    // ===== Worksheets =====

    /// Issue the worksheet for the sample's stored test assignment, or
    /// return the stored one. The unique pair constraint arbitrates
    /// concurrent issuers; the loser re-reads the winner's row.
    pub async fn issue_worksheet(
        &self,
        payload: GenerateWorksheetRequest,
    ) -> LabResult<GenerateWorksheetResponse> {
        validate_model(&payload)?;

        let sample = self.find_sample(payload.sample_id).await?;
        let item_id = assigned_item(&sample)?;
        let item = self
            .quotations()
            .find_item(item_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("quotation item {}", item_id)))?;

        if let Some(existing) = self
            .worksheets()
            .find_by_pair(sample.sample_id, item.item_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
        {
            let template_available = self.template_available(&item.item_code).await;
            return Ok(GenerateWorksheetResponse {
                worksheet: existing,
                created: false,
                template_available,
            });
        }

        let year = Utc::now().date_naive().year();
        let seq = self
            .counter()
            .next(&counters::worksheet_scope(year))
            .await
            .map_err(|e| LabError::database(e.to_string()))?;
        let worksheet_no = numbering::worksheet_no(year, sample.sample_id, seq);

        let inserted = self
            .worksheets()
            .try_insert(
                &worksheet_no,
                sample.sample_id,
                item.item_id,
                &item.description,
                item.test_standard.as_deref(),
                payload.technician.as_deref(),
            )
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        let (worksheet, created) = match inserted {
            Some(worksheet) => {
                info!("Issued worksheet {} for sample {}", worksheet.worksheet_no, sample.sample_no);
                (worksheet, true)
            }
            // Lost the race; the stored row is authoritative
            None => {
                let stored = self
                    .worksheets()
                    .find_by_pair(sample.sample_id, item.item_id)
                    .await
                    .map_err(|e| LabError::database(e.to_string()))?
                    .ok_or_else(|| {
                        LabError::internal("Worksheet insert conflicted but no row found")
                    })?;
                (stored, false)
            }
        };

        let template_available = self.template_available(&item.item_code).await;
        Ok(GenerateWorksheetResponse {
            worksheet,
            created,
            template_available,
        })
    }

    async fn template_available(&self, item_code: &Option<String>) -> bool {
        let Some(code) = item_code else {
            return false;
        };
        match self.templates.worksheet_template(code).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!("Template availability check failed for {}: {}", code, e);
                false
            }
        }
    }

    pub async fn worksheets_for_sample(&self, sample_id: i64) -> LabResult<Vec<Worksheet>> {
        self.find_sample(sample_id).await?;
        self.worksheets()
            .list_for_sample(sample_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    /// Blank template for the worksheet's test type, fetched from the
    /// template store.
    pub async fn worksheet_template(&self, worksheet_id: i64) -> LabResult<Download> {
        let worksheet = self.find_worksheet(worksheet_id).await?;
        let item = self
            .quotations()
            .find_item(worksheet.quotation_item_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| {
                LabError::not_found(format!("quotation item {}", worksheet.quotation_item_id))
            })?;

        let code = item.item_code.ok_or_else(|| {
            LabError::not_found(format!("template for worksheet {}", worksheet.worksheet_no))
        })?;

        let template = self
            .templates
            .worksheet_template(&code)
            .await?
            .ok_or_else(|| {
                LabError::not_found(format!("worksheet template for test {}", code))
            })?;

        let file_type = extension_of(&template.filename, ".xlsx")
            .trim_start_matches('.')
            .to_string();
        Ok(Download {
            filename: format!("{}_{}", worksheet.worksheet_no, template.filename),
            file_type,
            content: template.content,
        })
    }

    /// Attach the filled-in worksheet document.
    pub async fn upload_worksheet_document(
        &self,
        worksheet_id: i64,
        original_filename: &str,
        data: &[u8],
    ) -> LabResult<Worksheet> {
        let worksheet = self.find_worksheet(worksheet_id).await?;

        let ext = extension_of(original_filename, ".xlsx");
        let stored_name = format!(
            "{}_{}{}",
            worksheet.worksheet_no,
            numbering::file_token(),
            ext
        );
        let path = self
            .files
            .save(&stored_name, data)
            .await
            .map_err(|e| LabError::storage(e.to_string()))?;

        self.worksheets()
            .set_document(worksheet_id, &path.to_string_lossy())
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("worksheet {}", worksheet_id)))
    }

    pub async fn download_worksheet_document(&self, worksheet_id: i64) -> LabResult<Download> {
        let worksheet = self.find_worksheet(worksheet_id).await?;
        let sample = self.find_sample(worksheet.sample_id).await?;

        let path = worksheet.document_path.as_deref().ok_or_else(|| {
            LabError::not_found(format!(
                "document for worksheet {}",
                worksheet.worksheet_no
            ))
        })?;

        let path = std::path::Path::new(path);
        if !self.files.exists(path).await {
            return Err(LabError::not_found(format!(
                "stored file for worksheet {}",
                worksheet.worksheet_no
            )));
        }

        let content = self
            .files
            .read(path)
            .await
            .map_err(|e| LabError::storage(e.to_string()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("xlsx")
            .to_string();
        let test_name = worksheet.test_name.replace(' ', "_");
        Ok(Download {
            filename: format!(
                "{}_{}_{}.{}",
                sample.sample_no, worksheet.worksheet_no, test_name, ext
            ),
            file_type: ext,
            content,
        })
    }

    async fn find_worksheet(&self, worksheet_id: i64) -> LabResult<Worksheet> {
        self.worksheets()
            .find_by_id(worksheet_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("worksheet {}", worksheet_id)))
    }
}

/// Worksheets are keyed to the sample's stored assignment; a sample
/// generated before assignment existed (or corrupted since) cannot be
/// issued one.
fn assigned_item(sample: &Sample) -> LabResult<i64> {
    sample.assigned_quotation_item_id.ok_or_else(|| {
        LabError::validation(
            "sample_id",
            format!(
                "Sample {} has no assigned test; regenerate samples for its request",
                sample.sample_no
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(assigned: Option<i64>) -> Sample {
        Sample {
            sample_id: 42,
            sample_no: "GS-150126-01-1".to_string(),
            test_request_id: 7,
            collected_by: None,
            received_date: None,
            status: "ACCEPTED".to_string(),
            reason_rejected: None,
            barcode: None,
            storage_location: None,
            assigned_tri_id: assigned.map(|_| 3),
            assigned_quotation_item_id: assigned,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_worksheet_keys_to_the_stored_assignment() {
        assert_eq!(assigned_item(&sample(Some(9))).unwrap(), 9);
    }

    #[test]
    fn test_unassigned_sample_cannot_be_issued_a_worksheet() {
        let err = assigned_item(&sample(None)).unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("no assigned test"));
    }
}
