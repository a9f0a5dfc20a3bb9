//! Onboarding HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and assembles the shared
//! application state injected into handlers.
//!
//! # Notes
//! `build_state` and `run_with_shutdown` live here rather than in `main` so
//! tests can drive the full wiring without a process.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::config::OnboardingConfig;
use crate::observability;
use crate::provision::SchemaProvisioner;
use crate::provision::job::JobTracker;
use crate::store::{OnboardingStore, memory::InMemoryStore};
use anyhow::Context;
use axum::Router;
use quill_grid::GridClient;
use quill_schema::catalog;
use quill_schema::definition::SchemaDefinition;
use quill_schema::mapping::{FieldMappingRegistry, TenantMapping};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub schema: Arc<SchemaDefinition>,
    pub store: Arc<dyn OnboardingStore + Send + Sync>,
    pub registry: Arc<FieldMappingRegistry>,
    pub jobs: JobTracker,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/tenants",
            axum::routing::get(api::tenants::list_tenants),
        )
        .route(
            "/v1/tenants/:tenant_id/provision",
            axum::routing::post(api::tenants::start_provision),
        )
        .route(
            "/v1/tenants/:tenant_id/mapping",
            axum::routing::get(api::tenants::tenant_mapping),
        )
        .route(
            "/v1/provision/jobs/:job_id",
            axum::routing::get(api::jobs::get_job),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}

pub async fn build_state(config: &OnboardingConfig) -> anyhow::Result<AppState> {
    let schema = Arc::new(catalog::load_default().context("load schema catalog")?);
    let grid = Arc::new(GridClient::new(&config.grid).context("build grid client")?);
    let store: Arc<dyn OnboardingStore + Send + Sync> = Arc::new(InMemoryStore::new());
    let registry = Arc::new(FieldMappingRegistry::new());
    if let Some(path) = &config.mappings_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read mappings file: {}", path.display()))?;
        let mappings: Vec<TenantMapping> =
            serde_yaml::from_str(&raw).context("parse tenant mappings yaml")?;
        tracing::info!(
            count = mappings.len(),
            "hydrating mapping registry from file"
        );
        registry.load_all(mappings);
    }
    let provisioner = SchemaProvisioner::new(grid, schema.clone());
    let jobs = JobTracker::new(provisioner, store.clone(), registry.clone());
    Ok(AppState {
        api_version: "v1".to_string(),
        schema,
        store,
        registry,
        jobs,
    })
}

pub async fn run_with_shutdown<F>(config: OnboardingConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("quill-onboarding");
    let state = build_state(&config).await?;
    tracing::info!(
        backend = state.store.backend_name(),
        schema_version = state.schema.version,
        tables = state.schema.tables.len(),
        "onboarding state ready"
    );
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);

    let addr = config.bind_addr;
    tracing::info!(%addr, "onboarding service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}
