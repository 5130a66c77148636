//! Lab Registry Service
//!
//! The commercial front of the lab: clients, enquiries, projects,
//! quotations with their numbered series, and test requests that seed
//! the sample workflow. All business numbers draw from the durable
//! counter store.

use chrono::{Datelike, Utc};
use sqlx::PgPool;
use tracing::info;

use terralab_database::{
    counters, ClientRepository, CounterStore, EnquiryRepository, ProjectRepository,
    QuotationRepository, TestRequestRepository,
};
use terralab_models::{
    AddQuotationItemRequest, AddRequestItemRequest, BulkAddRequestItems, Client,
    CreateClientRequest, CreateEnquiryRequest, CreateProjectRequest, CreateQuotationRequest,
    CreateTestRequest, Enquiry, EnquiryStatus, Project, Quotation, QuotationDetail, QuotationItem,
    QuotationStatus, TestRequest, TestRequestItem, TestRequestItemDetail,
};
use terralab_utils::{
    extension_of, numbering, validate_model, FileStore, LabError, LabResult,
};

#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub file_type: String,
    pub content: Vec<u8>,
}

/// Field map for the printable test request document. Rendering is the
/// consumer's concern; this service only assembles the data.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RequestDocument {
    pub request_no: String,
    pub request_date: String,
    pub requested_by: Option<String>,
    pub project_name: String,
    pub client_name: String,
    pub location: Option<String>,
    pub items: Vec<TestRequestItemDetail>,
}

#[derive(Clone)]
pub struct RegistryService {
    pool: PgPool,
    files: FileStore,
}

impl RegistryService {
    pub fn new(pool: PgPool, files: FileStore) -> Self {
        Self { pool, files }
    }

    fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    fn enquiries(&self) -> EnquiryRepository {
        EnquiryRepository::new(self.pool.clone())
    }

    fn projects(&self) -> ProjectRepository {
        ProjectRepository::new(self.pool.clone())
    }

    fn quotations(&self) -> QuotationRepository {
        QuotationRepository::new(self.pool.clone())
    }

    fn requests(&self) -> TestRequestRepository {
        TestRequestRepository::new(self.pool.clone())
    }

    fn counter(&self) -> CounterStore {
        CounterStore::new(self.pool.clone())
    }

    // ===== Clients =====

    pub async fn create_client(&self, payload: CreateClientRequest) -> LabResult<Client> {
        validate_model(&payload)?;
        self.clients()
            .create(&payload)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn list_clients(&self) -> LabResult<Vec<Client>> {
        self.clients()
            .list()
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn get_client(&self, client_id: i64) -> LabResult<Client> {
        self.clients()
            .find_by_id(client_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("client {}", client_id)))
    }

    // ===== Enquiries =====

    pub async fn create_enquiry(&self, payload: CreateEnquiryRequest) -> LabResult<Enquiry> {
        validate_model(&payload)?;
        self.get_client(payload.client_id).await?;

        let today = Utc::now().date_naive();
        let enquiry_date = payload.enquiry_date.unwrap_or(today);
        let year = today.year();
        let seq = self
            .counter()
            .next(&counters::enquiry_scope(year))
            .await
            .map_err(|e| LabError::database(e.to_string()))?;
        let enquiry_ref = numbering::enquiry_ref(year, seq);

        let enquiry = self
            .enquiries()
            .create(
                &enquiry_ref,
                payload.client_id,
                payload.description.as_deref(),
                enquiry_date,
            )
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        info!("Created enquiry {}", enquiry.enquiry_ref);
        Ok(enquiry)
    }

    pub async fn list_enquiries(&self) -> LabResult<Vec<Enquiry>> {
        self.enquiries()
            .list()
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn get_enquiry(&self, enquiry_id: i64) -> LabResult<Enquiry> {
        self.enquiries()
            .find_by_id(enquiry_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("enquiry {}", enquiry_id)))
    }

    pub async fn update_enquiry_status(&self, enquiry_id: i64, status: &str) -> LabResult<Enquiry> {
        let enquiry = self.get_enquiry(enquiry_id).await?;

        let current = EnquiryStatus::parse(&enquiry.status)
            .ok_or_else(|| LabError::internal(format!("Unknown enquiry status {}", enquiry.status)))?;
        let target = EnquiryStatus::parse(status)
            .ok_or_else(|| LabError::validation("status", format!("Unknown status '{}'", status)))?;

        if !current.can_transition_to(target) {
            return Err(LabError::conflict(format!(
                "Enquiry {} cannot move from {} to {}",
                enquiry.enquiry_ref, current, target
            )));
        }

        self.enquiries()
            .update_status(enquiry_id, &target.to_string())
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("enquiry {}", enquiry_id)))
    }

    // ===== Projects =====

    pub async fn create_project(&self, payload: CreateProjectRequest) -> LabResult<Project> {
        validate_model(&payload)?;
        self.get_client(payload.client_id).await?;
        if let Some(quotation_id) = payload.quotation_id {
            self.get_quotation(quotation_id).await?;
        }

        self.projects()
            .create(&payload)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn list_projects(&self) -> LabResult<Vec<Project>> {
        self.projects()
            .list()
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn get_project(&self, project_id: i64) -> LabResult<Project> {
        self.projects()
            .find_by_id(project_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("project {}", project_id)))
    }

    pub async fn upload_lpo(
        &self,
        project_id: i64,
        original_filename: &str,
        data: &[u8],
    ) -> LabResult<Project> {
        self.get_project(project_id).await?;

        let ext = extension_of(original_filename, ".pdf");
        let stored_name = format!("LPO_{}_{}{}", project_id, numbering::file_token(), ext);
        let path = self
            .files
            .save(&stored_name, data)
            .await
            .map_err(|e| LabError::storage(e.to_string()))?;

        self.projects()
            .set_lpo_file(project_id, &path.to_string_lossy())
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("project {}", project_id)))
    }

    pub async fn download_lpo(&self, project_id: i64) -> LabResult<Download> {
        let project = self.get_project(project_id).await?;
        let path = project.lpo_file_path.as_deref().ok_or_else(|| {
            LabError::not_found(format!("LPO document for project {}", project_id))
        })?;

        let path = std::path::Path::new(path);
        if !self.files.exists(path).await {
            return Err(LabError::not_found(format!(
                "stored LPO file for project {}",
                project_id
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
            .unwrap_or("pdf")
            .to_string();
        Ok(Download {
            filename: format!("LPO_{}.{}", project.project_name.replace(' ', "_"), ext),
            file_type: ext,
            content,
        })
    }

    // ===== Quotations =====

    pub async fn create_quotation(&self, payload: CreateQuotationRequest) -> LabResult<Quotation> {
        validate_model(&payload)?;
        if let Some(enquiry_id) = payload.enquiry_id {
            self.get_enquiry(enquiry_id).await?;
        }

        let year = Utc::now().date_naive().year();
        let prefix = numbering::quotation_prefix(&payload.division);
        let seq = self
            .counter()
            .next(&counters::quotation_scope(prefix, year))
            .await
            .map_err(|e| LabError::database(e.to_string()))?;
        let quotation_no = numbering::quotation_no(
            &payload.division,
            payload.client_initials.as_deref(),
            seq,
            year,
        );

        let quotation = self
            .quotations()
            .create(
                &quotation_no,
                payload.enquiry_id,
                &payload.division,
                payload.client_initials.as_deref(),
                payload.payment_terms.as_deref(),
            )
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        info!("Created quotation {}", quotation.quotation_no);
        Ok(quotation)
    }

    pub async fn list_quotations(&self) -> LabResult<Vec<Quotation>> {
        self.quotations()
            .list()
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn get_quotation(&self, quotation_id: i64) -> LabResult<Quotation> {
        self.quotations()
            .find_by_id(quotation_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("quotation {}", quotation_id)))
    }

    /// Quotation with items and the recomputed total.
    pub async fn quotation_detail(&self, quotation_id: i64) -> LabResult<QuotationDetail> {
        let quotation = self.get_quotation(quotation_id).await?;
        let items = self
            .quotations()
            .items(quotation_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        Ok(QuotationDetail::new(quotation, items))
    }

    pub async fn add_quotation_item(
        &self,
        quotation_id: i64,
        payload: AddQuotationItemRequest,
    ) -> LabResult<QuotationItem> {
        validate_model(&payload)?;
        let quotation = self.get_quotation(quotation_id).await?;
        self.check_quotation_editable(&quotation)?;

        self.quotations()
            .add_item(quotation_id, &payload)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn delete_quotation_item(&self, item_id: i64) -> LabResult<()> {
        let item = self
            .quotations()
            .find_item(item_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("quotation item {}", item_id)))?;

        let quotation = self.get_quotation(item.quotation_id).await?;
        self.check_quotation_editable(&quotation)?;

        let deleted = self
            .quotations()
            .delete_item(item_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;
        if !deleted {
            return Err(LabError::not_found(format!("quotation item {}", item_id)));
        }
        Ok(())
    }

    /// New revision of a sent quotation: bumped revision suffix, items
    /// carried over, status reset to DRAFT.
    pub async fn revise_quotation(&self, quotation_id: i64) -> LabResult<QuotationDetail> {
        let parent = self.get_quotation(quotation_id).await?;

        let status = self.parse_quotation_status(&parent)?;
        if status.is_terminal() {
            return Err(LabError::conflict(format!(
                "Quotation {} is {} and cannot be revised",
                parent.quotation_no, parent.status
            )));
        }

        let revision = self
            .quotations()
            .create_revision(&parent)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        let items = self
            .quotations()
            .items(parent.quotation_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;
        for item in &items {
            let add = AddQuotationItemRequest {
                item_code: item.item_code.clone(),
                description: item.description.clone(),
                test_standard: item.test_standard.clone(),
                unit_rate: item.unit_rate,
                quantity: item.quantity,
            };
            self.quotations()
                .add_item(revision.quotation_id, &add)
                .await
                .map_err(|e| LabError::database(e.to_string()))?;
        }

        info!(
            "Created revision {} of quotation {}",
            revision.quotation_no, parent.quotation_no
        );
        self.quotation_detail(revision.quotation_id).await
    }

    pub async fn update_quotation_status(
        &self,
        quotation_id: i64,
        status: &str,
    ) -> LabResult<Quotation> {
        let quotation = self.get_quotation(quotation_id).await?;

        let current = self.parse_quotation_status(&quotation)?;
        let target = QuotationStatus::parse(status)
            .ok_or_else(|| LabError::validation("status", format!("Unknown status '{}'", status)))?;

        if !current.can_transition_to(target) {
            return Err(LabError::conflict(format!(
                "Quotation {} cannot move from {} to {}",
                quotation.quotation_no, current, target
            )));
        }

        self.quotations()
            .update_status(quotation_id, &target.to_string())
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("quotation {}", quotation_id)))
    }

    fn parse_quotation_status(&self, quotation: &Quotation) -> LabResult<QuotationStatus> {
        QuotationStatus::parse(&quotation.status).ok_or_else(|| {
            LabError::internal(format!("Unknown quotation status {}", quotation.status))
        })
    }

    fn check_quotation_editable(&self, quotation: &Quotation) -> LabResult<()> {
        if QuotationStatus::parse(&quotation.status) != Some(QuotationStatus::Draft) {
            return Err(LabError::conflict(format!(
                "Quotation {} is {} and its items cannot change",
                quotation.quotation_no, quotation.status
            )));
        }
        Ok(())
    }

    // ===== Test requests =====

    pub async fn create_request(&self, payload: CreateTestRequest) -> LabResult<TestRequest> {
        validate_model(&payload)?;
        self.get_project(payload.project_id).await?;

        let today = Utc::now().date_naive();
        let seq = self
            .counter()
            .next(&counters::request_scope(today))
            .await
            .map_err(|e| LabError::database(e.to_string()))?;
        let request_no = numbering::request_no(today, seq);

        let request = self
            .requests()
            .create(&request_no, payload.project_id, payload.requested_by.as_deref())
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        info!("Created test request {}", request.request_no);
        Ok(request)
    }

    pub async fn get_request(&self, test_request_id: i64) -> LabResult<TestRequest> {
        self.requests()
            .find_by_id(test_request_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?
            .ok_or_else(|| LabError::not_found(format!("test request {}", test_request_id)))
    }

    pub async fn requests_for_project(&self, project_id: i64) -> LabResult<Vec<TestRequest>> {
        self.get_project(project_id).await?;
        self.requests()
            .list_for_project(project_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn request_items(&self, test_request_id: i64) -> LabResult<Vec<TestRequestItemDetail>> {
        self.get_request(test_request_id).await?;
        self.requests()
            .items_detailed(test_request_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    /// Add one line by its 1-based position in the project quotation's
    /// ordered item list.
    pub async fn add_request_item(
        &self,
        test_request_id: i64,
        payload: AddRequestItemRequest,
    ) -> LabResult<TestRequestItem> {
        validate_model(&payload)?;
        let (_, items) = self.request_catalog(test_request_id).await?;

        let index = payload.item_index as usize;
        let item = items.get(index - 1).ok_or_else(|| {
            LabError::validation(
                "item_index",
                format!("Index {} is out of range (1..={})", index, items.len()),
            )
        })?;

        let quantity = payload.quantity.unwrap_or(item.quantity);
        self.requests()
            .add_item(test_request_id, item.item_id, quantity)
            .await
            .map_err(|e| LabError::database(e.to_string()))
    }

    pub async fn bulk_add_request_items(
        &self,
        test_request_id: i64,
        payload: BulkAddRequestItems,
    ) -> LabResult<Vec<TestRequestItem>> {
        validate_model(&payload)?;
        let (_, items) = self.request_catalog(test_request_id).await?;

        // Resolve every index before writing anything
        let mut resolved = Vec::with_capacity(payload.items.len());
        for entry in &payload.items {
            validate_model(entry)?;
            let index = entry.item_index as usize;
            let item = items.get(index - 1).ok_or_else(|| {
                LabError::validation(
                    "item_index",
                    format!("Index {} is out of range (1..={})", index, items.len()),
                )
            })?;
            resolved.push((item.item_id, entry.quantity.unwrap_or(item.quantity)));
        }

        let mut added = Vec::with_capacity(resolved.len());
        for (item_id, quantity) in resolved {
            let item = self
                .requests()
                .add_item(test_request_id, item_id, quantity)
                .await
                .map_err(|e| LabError::database(e.to_string()))?;
            added.push(item);
        }
        Ok(added)
    }

    /// Seed the request with the whole quotation, all or nothing.
    pub async fn copy_all_items(&self, test_request_id: i64) -> LabResult<Vec<TestRequestItem>> {
        let (_, items) = self.request_catalog(test_request_id).await?;
        if items.is_empty() {
            return Err(LabError::validation(
                "quotation",
                "The project quotation has no items to copy",
            ));
        }

        let lines: Vec<(i64, i32)> = items.iter().map(|i| (i.item_id, i.quantity)).collect();
        let copied = self
            .requests()
            .copy_all_items(test_request_id, &lines)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        copied_or_conflict(test_request_id, copied)
    }

    /// Data for the printable request document.
    pub async fn request_document(&self, test_request_id: i64) -> LabResult<RequestDocument> {
        let request = self.get_request(test_request_id).await?;
        let project = self.get_project(request.project_id).await?;
        let client = self.get_client(project.client_id).await?;
        let items = self
            .requests()
            .items_detailed(test_request_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        Ok(RequestDocument {
            request_no: request.request_no,
            request_date: request.created_at.date_naive().to_string(),
            requested_by: request.requested_by,
            project_name: project.project_name,
            client_name: client.name,
            location: project.location,
            items,
        })
    }

    /// The request's quotation catalog: the project's quotation and its
    /// ordered items, for 1-based index resolution.
    async fn request_catalog(
        &self,
        test_request_id: i64,
    ) -> LabResult<(Quotation, Vec<QuotationItem>)> {
        let request = self.get_request(test_request_id).await?;
        let project = self.get_project(request.project_id).await?;

        let quotation_id = project.quotation_id.ok_or_else(|| {
            LabError::validation(
                "project",
                format!("Project {} has no quotation to draw items from", project.project_id),
            )
        })?;

        let quotation = self.get_quotation(quotation_id).await?;
        let items = self
            .quotations()
            .items(quotation_id)
            .await
            .map_err(|e| LabError::database(e.to_string()))?;

        Ok((quotation, items))
    }
}

/// An already-seeded request is a conflict; anything else the copy
/// could not survive surfaced earlier as a database error.
fn copied_or_conflict(
    test_request_id: i64,
    copied: Option<Vec<TestRequestItem>>,
) -> LabResult<Vec<TestRequestItem>> {
    copied.ok_or_else(|| {
        LabError::conflict(format!(
            "Test request {} already has items",
            test_request_id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_all_passes_seeded_items_through() {
        let items = vec![TestRequestItem {
            tri_id: 1,
            test_request_id: 5,
            quotation_item_id: 9,
            quantity: 3,
        }];

        let copied = copied_or_conflict(5, Some(items)).unwrap();

        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].quotation_item_id, 9);
    }

    #[test]
    fn test_copy_all_into_a_seeded_request_is_a_conflict() {
        let err = copied_or_conflict(5, None).unwrap_err();

        assert_eq!(err.error_code(), "CONFLICT");
        assert!(err.to_string().contains("already has items"));
    }
}
