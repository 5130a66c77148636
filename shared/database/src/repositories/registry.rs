//! Registry Repositories
//!
//! Clients, enquiries and projects. Runtime SQL queries, so no
//! DATABASE_URL is needed at compile time.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;

use terralab_models::{Client, CreateClientRequest, CreateProjectRequest, Enquiry, Project};

pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: &CreateClientRequest) -> Result<Client> {
        sqlx::query_as(
            r#"
            INSERT INTO clients (name, contact_person, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING client_id, name, contact_person, email, phone, address, created_at
            "#,
        )
        .bind(&req.name)
        .bind(&req.contact_person)
        .bind(&req.email)
        .bind(&req.phone)
        .bind(&req.address)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create client")
    }

    pub async fn find_by_id(&self, client_id: i64) -> Result<Option<Client>> {
        sqlx::query_as(
            r#"
            SELECT client_id, name, contact_person, email, phone, address, created_at
            FROM clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch client by ID")
    }

    pub async fn list(&self) -> Result<Vec<Client>> {
        sqlx::query_as(
            r#"
            SELECT client_id, name, contact_person, email, phone, address, created_at
            FROM clients
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list clients")
    }
}

pub struct EnquiryRepository {
    pool: PgPool,
}

impl EnquiryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        enquiry_ref: &str,
        client_id: i64,
        description: Option<&str>,
        enquiry_date: NaiveDate,
    ) -> Result<Enquiry> {
        sqlx::query_as(
            r#"
            INSERT INTO enquiries (enquiry_ref, client_id, description, enquiry_date)
            VALUES ($1, $2, $3, $4)
            RETURNING enquiry_id, enquiry_ref, client_id, description, status,
                      enquiry_date, created_at
            "#,
        )
        .bind(enquiry_ref)
        .bind(client_id)
        .bind(description)
        .bind(enquiry_date)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create enquiry")
    }

    pub async fn find_by_id(&self, enquiry_id: i64) -> Result<Option<Enquiry>> {
        sqlx::query_as(
            r#"
            SELECT enquiry_id, enquiry_ref, client_id, description, status,
                   enquiry_date, created_at
            FROM enquiries
            WHERE enquiry_id = $1
            "#,
        )
        .bind(enquiry_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch enquiry by ID")
    }

    pub async fn list(&self) -> Result<Vec<Enquiry>> {
        sqlx::query_as(
            r#"
            SELECT enquiry_id, enquiry_ref, client_id, description, status,
                   enquiry_date, created_at
            FROM enquiries
            ORDER BY enquiry_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list enquiries")
    }

    pub async fn update_status(&self, enquiry_id: i64, status: &str) -> Result<Option<Enquiry>> {
        sqlx::query_as(
            r#"
            UPDATE enquiries SET status = $2
            WHERE enquiry_id = $1
            RETURNING enquiry_id, enquiry_ref, client_id, description, status,
                      enquiry_date, created_at
            "#,
        )
        .bind(enquiry_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update enquiry status")
    }
}

pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: &CreateProjectRequest) -> Result<Project> {
        sqlx::query_as(
            r#"
            INSERT INTO projects (project_name, client_id, quotation_id, location, lpo_no, lpo_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING project_id, project_name, client_id, quotation_id, location,
                      lpo_no, lpo_date, lpo_file_path, status, created_at
            "#,
        )
        .bind(&req.project_name)
        .bind(req.client_id)
        .bind(req.quotation_id)
        .bind(&req.location)
        .bind(&req.lpo_no)
        .bind(req.lpo_date)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create project")
    }

    pub async fn find_by_id(&self, project_id: i64) -> Result<Option<Project>> {
        sqlx::query_as(
            r#"
            SELECT project_id, project_name, client_id, quotation_id, location,
                   lpo_no, lpo_date, lpo_file_path, status, created_at
            FROM projects
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch project by ID")
    }

    pub async fn list(&self) -> Result<Vec<Project>> {
        sqlx::query_as(
            r#"
            SELECT project_id, project_name, client_id, quotation_id, location,
                   lpo_no, lpo_date, lpo_file_path, status, created_at
            FROM projects
            ORDER BY project_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list projects")
    }

    pub async fn set_lpo_file(&self, project_id: i64, path: &str) -> Result<Option<Project>> {
        sqlx::query_as(
            r#"
            UPDATE projects SET lpo_file_path = $2
            WHERE project_id = $1
            RETURNING project_id, project_name, client_id, quotation_id, location,
                      lpo_no, lpo_date, lpo_file_path, status, created_at
            "#,
        )
        .bind(project_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to attach LPO file to project")
    }
}
