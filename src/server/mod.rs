//! HTTP surface for document intake.
//!
//! Thin layer over the intake pipeline: accepts archive uploads, kicks
//! off processing, serves previews and registry contents, and exposes a
//! maintenance sweep for aged upload artifacts.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::intake::{IntakeConfig, IntakePipeline};
use crate::registry::DocumentRegistry;
use crate::storage::{BlobStore, LocalBlobStore};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn BlobStore>,
    pub registry: Arc<DocumentRegistry>,
    pub pipeline: Arc<IntakePipeline>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&settings.blob_root));
        let pipeline = Arc::new(IntakePipeline::new(
            store.clone(),
            IntakeConfig::from_settings(&settings),
        ));
        Self {
            settings: Arc::new(settings),
            store,
            registry: Arc::new(DocumentRegistry::new()),
            pipeline,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings.clone());
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
