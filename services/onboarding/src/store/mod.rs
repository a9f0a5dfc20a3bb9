//! Persistence seam for provisioned tenants.
//!
//! # Purpose
//! Defines the store trait the rest of the service programs against, so the
//! in-memory backend can later be swapped for a durable one without touching
//! handlers or the job runner.
//!
//! # Key invariants
//! - A tenant record carries its provisioning result and derived field
//!   mapping together; `save_tenant` persists both in one write so no reader
//!   can observe a provisioned tenant without its mapping.
//! - `save_tenant` has create semantics; re-provisioning an existing tenant
//!   is a conflict, not an overwrite.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_schema::mapping::TenantMapping;
use quill_schema::provisioned::ProvisioningResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything recorded about one provisioned tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub tenant_id: String,
    pub display_name: String,
    /// False while the linking phase is still owed to this tenant.
    pub linked: bool,
    pub provisioned_at: DateTime<Utc>,
    pub result: ProvisioningResult,
    pub mapping: TenantMapping,
}

#[async_trait]
pub trait OnboardingStore: Send + Sync {
    /// Persist a freshly provisioned tenant, result and mapping together.
    async fn save_tenant(&self, record: TenantRecord) -> StoreResult<()>;

    async fn get_tenant(&self, tenant_id: &str) -> StoreResult<TenantRecord>;

    /// All provisioned tenants, ordered by tenant id.
    async fn list_tenants(&self) -> StoreResult<Vec<TenantRecord>>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;

    fn is_durable(&self) -> bool;
}
