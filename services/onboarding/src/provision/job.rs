//! Provisioning job tracking.
//!
//! # Purpose
//! Runs each provisioning attempt as a detached background job, enforces the
//! one-job-per-tenant guard, and keeps a pollable record of every attempt.
//!
//! # Key invariants
//! - At most one job per tenant is in flight; a second start is rejected
//!   while the guard is held and after the tenant is persisted.
//! - On success the tenant record and its mapping are persisted and the
//!   mapping published before the job's terminal state becomes observable,
//!   so a poller that sees `succeeded` can immediately resolve the mapping.
//! - Job records are in-memory only and do not survive a restart; the
//!   provisioned tenants themselves live in the store.
use crate::provision::{FailurePoint, ProvisionError, SchemaProvisioner};
use crate::store::{OnboardingStore, StoreError, TenantRecord};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use quill_schema::mapping::{FieldMappingRegistry, TenantMapping};
use quill_schema::provisioned::ProvisioningResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
    RollbackFailed,
    LinkFailed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::RollbackFailed => "rollback_failed",
            JobState::LinkFailed => "link_failed",
        }
    }
}

/// Pollable record of one provisioning attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub tenant_id: String,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure_point: Option<FailurePoint>,
    /// Remote table ids a failed rollback left behind; operator cleanup.
    pub orphaned_table_ids: Vec<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("provisioning already running for tenant {0}")]
    AlreadyRunning(String),
    #[error("tenant {0} is already provisioned")]
    AlreadyProvisioned(String),
    #[error(transparent)]
    Store(StoreError),
}

#[derive(Clone)]
pub struct JobTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    provisioner: SchemaProvisioner,
    store: Arc<dyn OnboardingStore + Send + Sync>,
    registry: Arc<FieldMappingRegistry>,
    jobs: DashMap<Uuid, JobRecord>,
    active: DashMap<String, Uuid>,
}

impl JobTracker {
    pub fn new(
        provisioner: SchemaProvisioner,
        store: Arc<dyn OnboardingStore + Send + Sync>,
        registry: Arc<FieldMappingRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                provisioner,
                store,
                registry,
                jobs: DashMap::new(),
                active: DashMap::new(),
            }),
        }
    }

    /// Start a provisioning job for `tenant_id` unless one is already
    /// running or the tenant is already provisioned.
    pub async fn start(&self, tenant_id: &str, display_name: &str) -> Result<Uuid, StartError> {
        match self.inner.store.get_tenant(tenant_id).await {
            Ok(_) => return Err(StartError::AlreadyProvisioned(tenant_id.to_string())),
            Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(StartError::Store(err)),
        }

        let job_id = Uuid::new_v4();
        // The entry claim is the actual mutual exclusion; the store check
        // above only catches tenants from finished jobs.
        match self.inner.active.entry(tenant_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(StartError::AlreadyRunning(tenant_id.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(job_id);
            }
        }
        self.inner.jobs.insert(
            job_id,
            JobRecord {
                job_id,
                tenant_id: tenant_id.to_string(),
                state: JobState::Running,
                started_at: Utc::now(),
                finished_at: None,
                failure_point: None,
                orphaned_table_ids: Vec::new(),
                error: None,
            },
        );
        metrics::gauge!("quill_provision_jobs_active").increment(1.0);
        tracing::info!(%job_id, tenant_id, "provisioning job started");

        let tracker = self.clone();
        let tenant = tenant_id.to_string();
        let name = display_name.to_string();
        // Detached on purpose: the job must run to completion even when the
        // request that started it is gone.
        tokio::spawn(async move {
            tracker.run(job_id, tenant, name).await;
        });
        Ok(job_id)
    }

    pub fn job(&self, job_id: &Uuid) -> Option<JobRecord> {
        self.inner.jobs.get(job_id).map(|record| record.clone())
    }

    async fn run(&self, job_id: Uuid, tenant_id: String, display_name: String) {
        let outcome = self
            .inner
            .provisioner
            .provision(&tenant_id, &display_name)
            .await;
        match outcome {
            Ok(result) => match self.persist(&tenant_id, &display_name, result, true).await {
                Ok(()) => {
                    self.finish(job_id, &tenant_id, JobState::Succeeded, None, Vec::new(), None);
                }
                Err(error) => {
                    tracing::error!(
                        tenant_id,
                        error = %error,
                        "schema provisioned but the record could not be persisted"
                    );
                    self.finish(
                        job_id,
                        &tenant_id,
                        JobState::Failed,
                        None,
                        Vec::new(),
                        Some(format!("persist failed: {error}")),
                    );
                }
            },
            Err(ProvisionError::Link {
                result,
                point,
                source,
            }) => {
                // The structure exists remotely; persist it so the tenant
                // stays addressable and a later repair can finish the links.
                if let Err(error) = self.persist(&tenant_id, &display_name, *result, false).await {
                    tracing::error!(
                        tenant_id,
                        error = %error,
                        "could not persist link-failed tenant"
                    );
                }
                self.finish(
                    job_id,
                    &tenant_id,
                    JobState::LinkFailed,
                    Some(point),
                    Vec::new(),
                    Some(source.to_string()),
                );
            }
            Err(ProvisionError::Rollback(error)) => {
                self.finish(
                    job_id,
                    &tenant_id,
                    JobState::RollbackFailed,
                    Some(error.point.clone()),
                    error.orphaned_table_ids.clone(),
                    Some(error.to_string()),
                );
            }
            Err(error) => {
                let point = if let ProvisionError::Create { point, .. } = &error {
                    Some(point.clone())
                } else {
                    None
                };
                self.finish(
                    job_id,
                    &tenant_id,
                    JobState::Failed,
                    point,
                    Vec::new(),
                    Some(error.to_string()),
                );
            }
        }
    }

    async fn persist(
        &self,
        tenant_id: &str,
        display_name: &str,
        result: ProvisioningResult,
        linked: bool,
    ) -> anyhow::Result<()> {
        let mapping = TenantMapping::from_provisioning(self.inner.provisioner.schema(), &result)?;
        let record = TenantRecord {
            tenant_id: tenant_id.to_string(),
            display_name: display_name.to_string(),
            linked,
            provisioned_at: Utc::now(),
            result,
            mapping: mapping.clone(),
        };
        self.inner.store.save_tenant(record).await?;
        self.inner.registry.publish(mapping);
        Ok(())
    }

    fn finish(
        &self,
        job_id: Uuid,
        tenant_id: &str,
        state: JobState,
        failure_point: Option<FailurePoint>,
        orphaned_table_ids: Vec<u64>,
        error: Option<String>,
    ) {
        if let Some(mut record) = self.inner.jobs.get_mut(&job_id) {
            record.state = state;
            record.finished_at = Some(Utc::now());
            record.failure_point = failure_point;
            record.orphaned_table_ids = orphaned_table_ids;
            record.error = error;
        }
        // Guard release comes after the terminal state is written, so a
        // racing start can never observe a guard-free running job.
        self.inner.active.remove(tenant_id);
        metrics::gauge!("quill_provision_jobs_active").decrement(1.0);
        metrics::counter!("quill_provision_jobs_total", "state" => state.as_str()).increment(1);
        tracing::info!(%job_id, tenant_id, state = state.as_str(), "provisioning job finished");
    }
}
