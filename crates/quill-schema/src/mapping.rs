//! Bidirectional translation between semantic records and remote records.
//!
//! # Purpose
//! The grid backend addresses cell values by opaque per-tenant field
//! identifiers (`field_<id>`), while the application speaks stable
//! semantic names (`Title`, `Campaign`). A [`TenantMapping`] carries the
//! per-table name ↔ id correspondence plus each field's declared
//! [`ValueShape`]; the shared [`FieldMappingRegistry`] serves concurrent
//! CRUD callers.
//!
//! # Key invariants
//! - Every field normalizes to exactly one canonical shape (string,
//!   string list, or identifier list) chosen by its declared kind, no
//!   matter which wire shape arrived. Reading is total; writing rejects
//!   values of the wrong shape instead of guessing.
//! - `from_remote(to_remote(x)) == x` for every canonical value.
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use quill_grid::value::{LinkRef, RemoteFieldValue};

use crate::definition::{SchemaDefinition, ValueShape};
use crate::provisioned::ProvisioningResult;

/// Application-side record: semantic field name → canonical value.
pub type SemanticRecord = BTreeMap<String, SemanticValue>;

/// Backend-side record: `field_<id>` → decoded wire value.
pub type RemoteRecord = BTreeMap<String, RemoteFieldValue>;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("no mapping registered for tenant {0:?}")]
    UnknownTenant(String),
    #[error("no mapping for table {0:?}")]
    UnknownTable(String),
    #[error("no mapping for field {0:?}")]
    UnknownField(String),
    #[error("field {field:?} expects {expected} values, got {got}")]
    ShapeMismatch {
        field: String,
        expected: ValueShape,
        got: &'static str,
    },
    #[error("provisioning result lacks table {0:?}")]
    MissingTable(String),
    #[error("provisioning result lacks field {field:?} of table {table:?}")]
    MissingFieldId { table: String, field: String },
}

/// One canonical application-side value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SemanticValue {
    Text(String),
    TextList(Vec<String>),
    IdList(Vec<u64>),
}

impl SemanticValue {
    pub fn text(value: impl Into<String>) -> Self {
        SemanticValue::Text(value.into())
    }

    pub fn texts<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SemanticValue::TextList(values.into_iter().map(Into::into).collect())
    }

    pub fn ids(values: impl IntoIterator<Item = u64>) -> Self {
        SemanticValue::IdList(values.into_iter().collect())
    }

    fn shape_name(&self) -> &'static str {
        match self {
            SemanticValue::Text(_) => "text",
            SemanticValue::TextList(_) => "text_list",
            SemanticValue::IdList(_) => "id_list",
        }
    }
}

/// Remote id and declared shape for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field_id: u64,
    pub shape: ValueShape,
}

/// Name ↔ id correspondence for one provisioned table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMapping {
    pub table_id: u64,
    pub fields: BTreeMap<String, FieldMapping>,
}

impl TableMapping {
    /// The key a field's value travels under in a remote record.
    pub fn remote_key(field_id: u64) -> String {
        format!("field_{field_id}")
    }

    /// Translates a semantic record into the backend's write shape.
    /// Unknown field names and wrong-shaped values are rejected.
    pub fn to_remote(&self, record: &SemanticRecord) -> Result<RemoteRecord, MappingError> {
        let mut remote = RemoteRecord::new();
        for (name, value) in record {
            let mapping = self
                .fields
                .get(name)
                .ok_or_else(|| MappingError::UnknownField(name.clone()))?;
            let wire = write_value(name, mapping.shape, value)?;
            remote.insert(Self::remote_key(mapping.field_id), wire);
        }
        Ok(remote)
    }

    /// Translates a remote record into canonical semantic values.
    ///
    /// Total by construction: every decoded wire shape normalizes under
    /// the field's declared shape. Row metadata (`id`, `order`) and fields
    /// created outside the catalog are skipped, not errors.
    pub fn from_remote(&self, record: &RemoteRecord) -> SemanticRecord {
        let mut semantic = SemanticRecord::new();
        for (key, value) in record {
            let Some(field_id) = parse_remote_key(key) else {
                continue;
            };
            let Some((name, mapping)) = self.field_by_id(field_id) else {
                continue;
            };
            semantic.insert(name.to_string(), normalize_read(mapping.shape, value));
        }
        semantic
    }

    fn field_by_id(&self, field_id: u64) -> Option<(&str, &FieldMapping)> {
        self.fields
            .iter()
            .find(|(_, mapping)| mapping.field_id == field_id)
            .map(|(name, mapping)| (name.as_str(), mapping))
    }
}

/// All of one tenant's table mappings at a given schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMapping {
    pub tenant_id: String,
    pub schema_version: u32,
    pub tables: BTreeMap<String, TableMapping>,
}

impl TenantMapping {
    /// Derives the mapping for a freshly provisioned tenant.
    ///
    /// A link field absent from the result is tolerated (the linking phase
    /// may still be pending); an absent scalar field is corruption and is
    /// reported.
    pub fn from_provisioning(
        schema: &SchemaDefinition,
        result: &ProvisioningResult,
    ) -> Result<Self, MappingError> {
        let mut tables = BTreeMap::new();
        for table_spec in &schema.tables {
            let provisioned = result
                .table(&table_spec.key)
                .ok_or_else(|| MappingError::MissingTable(table_spec.key.clone()))?;
            let mut fields = BTreeMap::new();
            for field in &table_spec.fields {
                match field_id_for(provisioned.field_ids.get(&field.name), field.kind.is_link()) {
                    FieldIdLookup::Present(field_id) => {
                        fields.insert(
                            field.name.clone(),
                            FieldMapping {
                                field_id,
                                shape: field.kind.value_shape(),
                            },
                        );
                    }
                    FieldIdLookup::PendingLink => {}
                    FieldIdLookup::Missing => {
                        return Err(MappingError::MissingFieldId {
                            table: table_spec.key.clone(),
                            field: field.name.clone(),
                        });
                    }
                }
            }
            tables.insert(
                table_spec.key.clone(),
                TableMapping {
                    table_id: provisioned.table_id,
                    fields,
                },
            );
        }
        Ok(Self {
            tenant_id: result.tenant_id.clone(),
            schema_version: result.schema_version,
            tables,
        })
    }

    pub fn table(&self, key: &str) -> Option<&TableMapping> {
        self.tables.get(key)
    }
}

enum FieldIdLookup {
    Present(u64),
    PendingLink,
    Missing,
}

fn field_id_for(recorded: Option<&u64>, is_link: bool) -> FieldIdLookup {
    match (recorded, is_link) {
        (Some(&field_id), _) => FieldIdLookup::Present(field_id),
        (None, true) => FieldIdLookup::PendingLink,
        (None, false) => FieldIdLookup::Missing,
    }
}

/// Shared tenant-mapping registry for concurrent CRUD callers.
///
/// Entries are published after a successful provision (or after the
/// structurally complete part of a link-failed one) and can be hydrated
/// from externally supplied configuration for pre-existing tenants.
#[derive(Default)]
pub struct FieldMappingRegistry {
    entries: DashMap<String, Arc<TenantMapping>>,
}

impl FieldMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, mapping: TenantMapping) {
        tracing::debug!(
            tenant_id = %mapping.tenant_id,
            tables = mapping.tables.len(),
            schema_version = mapping.schema_version,
            "publishing tenant field mapping"
        );
        self.entries
            .insert(mapping.tenant_id.clone(), Arc::new(mapping));
        metrics::gauge!("quill_mapping_tenants").set(self.entries.len() as f64);
    }

    pub fn load_all(&self, mappings: impl IntoIterator<Item = TenantMapping>) {
        for mapping in mappings {
            self.publish(mapping);
        }
    }

    pub fn get(&self, tenant_id: &str) -> Option<Arc<TenantMapping>> {
        self.entries.get(tenant_id).map(|entry| entry.value().clone())
    }

    pub fn to_remote(
        &self,
        tenant_id: &str,
        table_key: &str,
        record: &SemanticRecord,
    ) -> Result<RemoteRecord, MappingError> {
        let tenant = self
            .get(tenant_id)
            .ok_or_else(|| MappingError::UnknownTenant(tenant_id.to_string()))?;
        let table = tenant
            .table(table_key)
            .ok_or_else(|| MappingError::UnknownTable(table_key.to_string()))?;
        table.to_remote(record)
    }

    pub fn from_remote(
        &self,
        tenant_id: &str,
        table_key: &str,
        record: &RemoteRecord,
    ) -> Result<SemanticRecord, MappingError> {
        let tenant = self
            .get(tenant_id)
            .ok_or_else(|| MappingError::UnknownTenant(tenant_id.to_string()))?;
        let table = tenant
            .table(table_key)
            .ok_or_else(|| MappingError::UnknownTable(table_key.to_string()))?;
        Ok(table.from_remote(record))
    }
}

fn parse_remote_key(key: &str) -> Option<u64> {
    key.strip_prefix("field_")?.parse().ok()
}

fn write_value(
    field: &str,
    expected: ValueShape,
    value: &SemanticValue,
) -> Result<RemoteFieldValue, MappingError> {
    match (expected, value) {
        (ValueShape::Text, SemanticValue::Text(text)) => Ok(RemoteFieldValue::Text(text.clone())),
        (ValueShape::TextList, SemanticValue::TextList(items)) => {
            Ok(RemoteFieldValue::ScalarList(items.clone()))
        }
        (ValueShape::IdList, SemanticValue::IdList(ids)) => {
            Ok(RemoteFieldValue::link_rows(ids.iter().copied()))
        }
        (expected, value) => Err(MappingError::ShapeMismatch {
            field: field.to_string(),
            expected,
            got: value.shape_name(),
        }),
    }
}

fn normalize_read(shape: ValueShape, value: &RemoteFieldValue) -> SemanticValue {
    match shape {
        ValueShape::Text => SemanticValue::Text(first_text(value)),
        ValueShape::TextList => SemanticValue::TextList(all_texts(value)),
        ValueShape::IdList => SemanticValue::IdList(all_ids(value)),
    }
}

fn first_text(value: &RemoteFieldValue) -> String {
    match value {
        RemoteFieldValue::Null => String::new(),
        RemoteFieldValue::Text(text) => text.clone(),
        RemoteFieldValue::Number(number) => number.to_string(),
        RemoteFieldValue::Bool(flag) => flag.to_string(),
        RemoteFieldValue::SelectOption(option) => option.value.clone(),
        RemoteFieldValue::SelectOptionList(options) => {
            options.first().map(|o| o.value.clone()).unwrap_or_default()
        }
        RemoteFieldValue::FileList(files) => {
            files.first().map(|f| f.url.clone()).unwrap_or_default()
        }
        RemoteFieldValue::LinkRowList(links) => {
            links.first().map(link_text).unwrap_or_default()
        }
        RemoteFieldValue::ScalarList(items) => items.first().cloned().unwrap_or_default(),
    }
}

fn all_texts(value: &RemoteFieldValue) -> Vec<String> {
    match value {
        RemoteFieldValue::Null => Vec::new(),
        RemoteFieldValue::Text(text) => vec![text.clone()],
        RemoteFieldValue::Number(number) => vec![number.to_string()],
        RemoteFieldValue::Bool(flag) => vec![flag.to_string()],
        RemoteFieldValue::SelectOption(option) => vec![option.value.clone()],
        RemoteFieldValue::SelectOptionList(options) => {
            options.iter().map(|o| o.value.clone()).collect()
        }
        RemoteFieldValue::FileList(files) => files.iter().map(|f| f.url.clone()).collect(),
        RemoteFieldValue::LinkRowList(links) => links.iter().map(link_text).collect(),
        RemoteFieldValue::ScalarList(items) => items.clone(),
    }
}

/// Arrivals that carry no identifier normalize to the empty list.
fn all_ids(value: &RemoteFieldValue) -> Vec<u64> {
    match value {
        RemoteFieldValue::Null | RemoteFieldValue::Bool(_) | RemoteFieldValue::FileList(_) => {
            Vec::new()
        }
        RemoteFieldValue::LinkRowList(links) => links.iter().map(|link| link.id).collect(),
        RemoteFieldValue::SelectOption(option) => vec![option.id],
        RemoteFieldValue::SelectOptionList(options) => {
            options.iter().map(|option| option.id).collect()
        }
        RemoteFieldValue::ScalarList(items) => {
            items.iter().filter_map(|item| item.parse().ok()).collect()
        }
        RemoteFieldValue::Text(text) => text.parse::<u64>().ok().into_iter().collect(),
        RemoteFieldValue::Number(number) => integral_id(*number).into_iter().collect(),
    }
}

fn integral_id(number: f64) -> Option<u64> {
    (number >= 0.0 && number.fract() == 0.0 && number <= u64::MAX as f64).then_some(number as u64)
}

fn link_text(link: &LinkRef) -> String {
    link.value.clone().unwrap_or_else(|| link.id.to_string())
}
