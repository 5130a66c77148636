use anyhow::Result;
use sqlx::PgPool;

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    // Durable number sequences, one row per scope
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS counters (
            scope VARCHAR PRIMARY KEY,
            value BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clients (
            client_id BIGSERIAL PRIMARY KEY,
            name VARCHAR NOT NULL,
            contact_person VARCHAR,
            email VARCHAR,
            phone VARCHAR,
            address TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enquiries (
            enquiry_id BIGSERIAL PRIMARY KEY,
            enquiry_ref VARCHAR NOT NULL UNIQUE,
            client_id BIGINT NOT NULL REFERENCES clients(client_id),
            description TEXT,
            status VARCHAR NOT NULL DEFAULT 'OPEN',
            enquiry_date DATE NOT NULL DEFAULT CURRENT_DATE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quotations (
            quotation_id BIGSERIAL PRIMARY KEY,
            quotation_no VARCHAR NOT NULL UNIQUE,
            enquiry_id BIGINT REFERENCES enquiries(enquiry_id),
            division VARCHAR NOT NULL,
            client_initials VARCHAR,
            revision INTEGER NOT NULL DEFAULT 0,
            parent_quotation_id BIGINT REFERENCES quotations(quotation_id),
            payment_terms TEXT,
            status VARCHAR NOT NULL DEFAULT 'DRAFT',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quotation_items (
            item_id BIGSERIAL PRIMARY KEY,
            quotation_id BIGINT NOT NULL REFERENCES quotations(quotation_id),
            item_code VARCHAR,
            description TEXT NOT NULL,
            test_standard VARCHAR,
            unit_rate DECIMAL NOT NULL,
            quantity INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            project_id BIGSERIAL PRIMARY KEY,
            project_name VARCHAR NOT NULL,
            client_id BIGINT NOT NULL REFERENCES clients(client_id),
            quotation_id BIGINT REFERENCES quotations(quotation_id),
            location VARCHAR,
            lpo_no VARCHAR,
            lpo_date DATE,
            lpo_file_path VARCHAR,
            status VARCHAR NOT NULL DEFAULT 'ACTIVE',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_requests (
            test_request_id BIGSERIAL PRIMARY KEY,
            request_no VARCHAR NOT NULL UNIQUE,
            project_id BIGINT NOT NULL REFERENCES projects(project_id),
            requested_by VARCHAR,
            status VARCHAR NOT NULL DEFAULT 'PENDING',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_request_items (
            tri_id BIGSERIAL PRIMARY KEY,
            test_request_id BIGINT NOT NULL REFERENCES test_requests(test_request_id),
            quotation_item_id BIGINT NOT NULL REFERENCES quotation_items(item_id),
            quantity INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // assigned_* columns are written once at generation and never updated
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS samples (
            sample_id BIGSERIAL PRIMARY KEY,
            sample_no VARCHAR NOT NULL UNIQUE,
            test_request_id BIGINT NOT NULL REFERENCES test_requests(test_request_id),
            collected_by VARCHAR,
            received_date TIMESTAMPTZ,
            status VARCHAR NOT NULL DEFAULT 'PENDING',
            reason_rejected TEXT,
            barcode VARCHAR,
            storage_location VARCHAR,
            assigned_tri_id BIGINT REFERENCES test_request_items(tri_id),
            assigned_quotation_item_id BIGINT REFERENCES quotation_items(item_id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_samples_request ON samples(test_request_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_samples_assigned_item ON samples(assigned_quotation_item_id)",
    )
    .execute(pool)
    .await?;

    // The (sample, test type) pair is the idempotency key for issuance
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS worksheets (
            worksheet_id BIGSERIAL PRIMARY KEY,
            worksheet_no VARCHAR NOT NULL UNIQUE,
            sample_id BIGINT NOT NULL REFERENCES samples(sample_id),
            quotation_item_id BIGINT NOT NULL REFERENCES quotation_items(item_id),
            test_name VARCHAR NOT NULL,
            test_standard VARCHAR,
            status VARCHAR NOT NULL DEFAULT 'GENERATED',
            technician VARCHAR,
            document_path VARCHAR,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (sample_id, quotation_item_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            report_id BIGSERIAL PRIMARY KEY,
            report_no VARCHAR NOT NULL,
            sample_id BIGINT NOT NULL REFERENCES samples(sample_id),
            original_filename VARCHAR NOT NULL,
            stored_filename VARCHAR NOT NULL,
            file_path VARCHAR NOT NULL,
            file_type VARCHAR NOT NULL,
            linked_to_report_id BIGINT REFERENCES reports(report_id),
            covers_test_type VARCHAR,
            status VARCHAR NOT NULL DEFAULT 'DRAFT',
            is_locked BOOLEAN NOT NULL DEFAULT FALSE,
            notes TEXT,
            uploaded_by VARCHAR,
            checked_by VARCHAR,
            checked_at TIMESTAMPTZ,
            approved_by VARCHAR,
            approved_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_report_no ON reports(report_no)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_sample ON reports(sample_id)")
        .execute(pool)
        .await?;

    tracing::info!("PostgreSQL migrations completed");
    Ok(())
}
