//! Request and response bodies for the onboarding API.
use crate::store::TenantRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Uniform error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeatureFlags {
    pub durable_storage: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SystemInfo {
    pub api_version: String,
    /// Version of the schema catalog new tenants are provisioned with.
    pub schema_version: u32,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProvisionRequest {
    /// Human-readable name; becomes the remote workspace name.
    pub display_name: String,
}

/// Returned with 202 Accepted; poll the job endpoint with `job_id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProvisionAccepted {
    pub job_id: Uuid,
    pub tenant_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantSummary {
    pub tenant_id: String,
    pub display_name: String,
    pub workspace_id: u64,
    pub schema_version: u32,
    /// False when the linking phase is still owed to this tenant.
    pub linked: bool,
    pub provisioned_at: DateTime<Utc>,
}

impl From<&TenantRecord> for TenantSummary {
    fn from(record: &TenantRecord) -> Self {
        Self {
            tenant_id: record.tenant_id.clone(),
            display_name: record.display_name.clone(),
            workspace_id: record.result.workspace_id,
            schema_version: record.result.schema_version,
            linked: record.linked,
            provisioned_at: record.provisioned_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantListResponse {
    pub items: Vec<TenantSummary>,
}

/// A tenant's field mapping: table key to remote table id and per-field
/// `{field_id, shape}` entries, as served to CRUD translation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantMappingResponse {
    pub tenant_id: String,
    pub schema_version: u32,
    #[schema(value_type = Object)]
    pub tables: serde_json::Value,
}
