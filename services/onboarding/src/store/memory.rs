//! In-memory tenant store.
//!
//! Default backend for single-instance deployments and tests. State lives
//! for the lifetime of the process; restarts rely on `QUILL_MAPPINGS_FILE`
//! to re-hydrate the mapping registry.
use crate::store::{OnboardingStore, StoreError, StoreResult, TenantRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<String, TenantRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OnboardingStore for InMemoryStore {
    async fn save_tenant(&self, record: TenantRecord) -> StoreResult<()> {
        let mut tenants = self.tenants.write().await;
        if tenants.contains_key(&record.tenant_id) {
            return Err(StoreError::Conflict(record.tenant_id));
        }
        // Result and mapping enter together under the same write guard.
        tenants.insert(record.tenant_id.clone(), record);
        metrics::gauge!("quill_tenants_total").set(tenants.len() as f64);
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: &str) -> StoreResult<TenantRecord> {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(tenant_id.to_string()))
    }

    async fn list_tenants(&self) -> StoreResult<Vec<TenantRecord>> {
        let tenants = self.tenants.read().await;
        let mut items: Vec<TenantRecord> = tenants.values().cloned().collect();
        items.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        Ok(items)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn is_durable(&self) -> bool {
        false
    }
}
