//! TerraLab Lab Registry Service
//!
//! The commercial registry: clients, enquiries, projects with LPO
//! documents, quotations and test requests.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use terralab_database::initialize_database;
use terralab_utils::{init_logging, AppConfig, FileStore};

mod handlers;
mod service;

use service::RegistryService;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging)?;
    info!("Starting TerraLab Lab Registry Service");

    let pool = initialize_database(&terralab_database::DatabaseConfig {
        postgres_url: config.database.postgres_url.clone(),
        max_connections: config.database.max_connections,
        connection_timeout: std::time::Duration::from_secs(
            config.database.connection_timeout_seconds,
        ),
    })
    .await?;

    let files = FileStore::new(&config.storage.upload_dir);
    let service = RegistryService::new(pool, files);

    let app = Router::new()
        .route("/health", get(health_check))
        // Clients
        .route("/api/v1/clients", post(handlers::registry::create_client))
        .route("/api/v1/clients", get(handlers::registry::list_clients))
        .route("/api/v1/clients/:id", get(handlers::registry::get_client))
        // Enquiries
        .route("/api/v1/enquiries", post(handlers::registry::create_enquiry))
        .route("/api/v1/enquiries", get(handlers::registry::list_enquiries))
        .route("/api/v1/enquiries/:id", get(handlers::registry::get_enquiry))
        .route(
            "/api/v1/enquiries/:id/status",
            put(handlers::registry::update_enquiry_status),
        )
        // Projects
        .route("/api/v1/projects", post(handlers::registry::create_project))
        .route("/api/v1/projects", get(handlers::registry::list_projects))
        .route("/api/v1/projects/:id", get(handlers::registry::get_project))
        .route("/api/v1/projects/:id/lpo", post(handlers::registry::upload_lpo))
        .route("/api/v1/projects/:id/lpo", get(handlers::registry::download_lpo))
        .route(
            "/api/v1/projects/:id/requests",
            get(handlers::requests::requests_for_project),
        )
        // Quotations
        .route("/api/v1/quotations", post(handlers::quotations::create_quotation))
        .route("/api/v1/quotations", get(handlers::quotations::list_quotations))
        .route("/api/v1/quotations/:id", get(handlers::quotations::get_quotation))
        .route("/api/v1/quotations/:id/items", post(handlers::quotations::add_item))
        .route(
            "/api/v1/quotations/items/:item_id",
            delete(handlers::quotations::delete_item),
        )
        .route(
            "/api/v1/quotations/:id/revise",
            post(handlers::quotations::revise_quotation),
        )
        .route(
            "/api/v1/quotations/:id/status",
            put(handlers::quotations::update_status),
        )
        // Test requests
        .route("/api/v1/requests", post(handlers::requests::create_request))
        .route("/api/v1/requests/:id", get(handlers::requests::get_request))
        .route("/api/v1/requests/:id/items", get(handlers::requests::request_items))
        .route("/api/v1/requests/:id/items", post(handlers::requests::add_item))
        .route(
            "/api/v1/requests/:id/items/bulk",
            post(handlers::requests::bulk_add_items),
        )
        .route(
            "/api/v1/requests/:id/items/copy-all",
            post(handlers::requests::copy_all_items),
        )
        .route(
            "/api/v1/requests/:id/document",
            get(handlers::requests::request_document),
        )
        .layer(DefaultBodyLimit::max(config.server.max_request_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Lab Registry Service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "lab-registry",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
