//! Tenant API handlers.
//!
//! # Purpose
//! Accepts provisioning requests, lists provisioned tenants, and serves
//! each tenant's field mapping with consistent error mapping for conflicts
//! and missing records.
use crate::api::error::{
    ApiError, api_conflict, api_internal, api_not_found, api_validation_error,
};
use crate::api::types::{
    ProvisionAccepted, ProvisionRequest, TenantListResponse, TenantMappingResponse, TenantSummary,
};
use crate::app::AppState;
use crate::provision::job::StartError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/v1/tenants",
    tag = "tenants",
    responses(
        (status = 200, description = "List provisioned tenants", body = TenantListResponse)
    )
)]
pub(crate) async fn list_tenants(
    State(state): State<AppState>,
) -> Result<Json<TenantListResponse>, ApiError> {
    let records = state
        .store
        .list_tenants()
        .await
        .map_err(|err| api_internal("failed to list tenants", &err))?;
    let items = records.iter().map(TenantSummary::from).collect();
    Ok(Json(TenantListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/tenants/{tenant_id}/provision",
    tag = "tenants",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier")
    ),
    request_body = ProvisionRequest,
    responses(
        (status = 202, description = "Provisioning job accepted", body = ProvisionAccepted),
        (status = 400, description = "Invalid tenant id or display name", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Job already running or tenant already provisioned", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn start_provision(
    Path(tenant_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<ProvisionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_tenant_id(&tenant_id)?;
    let display_name = body.display_name.trim();
    if display_name.is_empty() || display_name.len() > 128 {
        return Err(api_validation_error(
            "display_name must be 1..=128 characters",
        ));
    }

    match state.jobs.start(&tenant_id, display_name).await {
        Ok(job_id) => Ok((
            StatusCode::ACCEPTED,
            Json(ProvisionAccepted { job_id, tenant_id }),
        )),
        Err(StartError::AlreadyRunning(_)) => Err(api_conflict(
            "job_active",
            "a provisioning job is already running for this tenant",
        )),
        Err(StartError::AlreadyProvisioned(_)) => Err(api_conflict(
            "already_provisioned",
            "tenant is already provisioned",
        )),
        Err(StartError::Store(err)) => Err(api_internal("failed to check tenant state", &err)),
    }
}

#[utoipa::path(
    get,
    path = "/v1/tenants/{tenant_id}/mapping",
    tag = "tenants",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier")
    ),
    responses(
        (status = 200, description = "Tenant field mapping", body = TenantMappingResponse),
        (status = 404, description = "No mapping for this tenant", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn tenant_mapping(
    Path(tenant_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TenantMappingResponse>, ApiError> {
    let Some(mapping) = state.registry.get(&tenant_id) else {
        return Err(api_not_found("tenant mapping not found"));
    };
    let tables = serde_json::to_value(&mapping.tables).map_err(|err| {
        tracing::error!(error = %err, "failed to serialize tenant mapping");
        crate::api::error::api_internal_message("failed to serialize tenant mapping")
    })?;
    Ok(Json(TenantMappingResponse {
        tenant_id: mapping.tenant_id.clone(),
        schema_version: mapping.schema_version,
        tables,
    }))
}

fn validate_tenant_id(tenant_id: &str) -> Result<(), ApiError> {
    if tenant_id.is_empty() || tenant_id.len() > 64 {
        return Err(api_validation_error("tenant_id must be 1..=64 characters"));
    }
    let valid = tenant_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(api_validation_error(
            "tenant_id must be lowercase alphanumeric, '-' or '_'",
        ));
    }
    Ok(())
}
