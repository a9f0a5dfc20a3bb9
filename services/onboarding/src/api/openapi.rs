//! OpenAPI schema aggregation for the onboarding API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for
//! docs and client generation.
use crate::api::{
    jobs, system, tenants,
    types::{
        ErrorResponse, FeatureFlags, HealthStatus, ProvisionAccepted, ProvisionRequest,
        SystemInfo, TenantListResponse, TenantMappingResponse, TenantSummary,
    },
};
use crate::provision::FailurePoint;
use crate::provision::job::{JobRecord, JobState};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "quill-onboarding",
        version = "v1",
        description = "Quill tenant onboarding HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        tenants::list_tenants,
        tenants::start_provision,
        tenants::tenant_mapping,
        jobs::get_job
    ),
    components(schemas(
        ErrorResponse,
        FeatureFlags,
        SystemInfo,
        HealthStatus,
        ProvisionRequest,
        ProvisionAccepted,
        TenantSummary,
        TenantListResponse,
        TenantMappingResponse,
        JobRecord,
        JobState,
        FailurePoint
    ))
)]
pub struct ApiDoc;
