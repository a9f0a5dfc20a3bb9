//! The record of what one successful provisioning attempt created.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Remote identifiers for one provisioned table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedTable {
    pub table_id: u64,
    /// Semantic field name → remote field id, recorded as each field is
    /// created. Link fields join during the linking phase, so an unlinked
    /// result legitimately lacks them.
    pub field_ids: BTreeMap<String, u64>,
}

impl ProvisionedTable {
    pub fn new(table_id: u64) -> Self {
        Self {
            table_id,
            field_ids: BTreeMap::new(),
        }
    }
}

/// Everything the rest of the system needs to address a tenant's remote
/// schema: the workspace, the long-lived per-tenant API token key, and the
/// id of every table and field, keyed by their stable semantic names.
///
/// Persisted together with the success decision; the field mapping is
/// derived from this plus the schema declaration it was provisioned from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningResult {
    pub tenant_id: String,
    pub workspace_id: u64,
    pub database_token_key: String,
    pub schema_version: u32,
    pub tables: BTreeMap<String, ProvisionedTable>,
}

impl ProvisioningResult {
    pub fn new(
        tenant_id: impl Into<String>,
        workspace_id: u64,
        database_token_key: impl Into<String>,
        schema_version: u32,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            workspace_id,
            database_token_key: database_token_key.into(),
            schema_version,
            tables: BTreeMap::new(),
        }
    }

    pub fn table(&self, key: &str) -> Option<&ProvisionedTable> {
        self.tables.get(key)
    }

    pub fn field_id(&self, table_key: &str, field_name: &str) -> Option<u64> {
        self.tables
            .get(table_key)
            .and_then(|table| table.field_ids.get(field_name))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_crosses_table_and_field() {
        let mut result = ProvisioningResult::new("acme", 501, "tok-1", 1);
        let mut table = ProvisionedTable::new(9001);
        table.field_ids.insert("Title".to_string(), 77);
        result.tables.insert("content_posts".to_string(), table);

        assert_eq!(result.field_id("content_posts", "Title"), Some(77));
        assert_eq!(result.field_id("content_posts", "Missing"), None);
        assert_eq!(result.field_id("missing", "Title"), None);
    }

    #[test]
    fn serializes_with_stable_key_order() {
        let mut result = ProvisioningResult::new("acme", 501, "tok-1", 1);
        result
            .tables
            .insert("zeta".to_string(), ProvisionedTable::new(2));
        result
            .tables
            .insert("alpha".to_string(), ProvisionedTable::new(1));

        let json = serde_json::to_string(&result).expect("serialize");
        assert!(json.find("alpha").unwrap() < json.find("zeta").unwrap());

        let back: ProvisioningResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, result);
    }
}
