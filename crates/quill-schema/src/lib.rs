//! Tenant schema declaration and field mapping for the grid backend.
//!
//! # Purpose
//! Declares WHAT a tenant's remote schema contains (the versioned
//! [`SchemaDefinition`] with its built-in content-marketing catalog) and
//! keeps the translation between stable semantic field names and the
//! opaque per-tenant identifiers the backend assigns at creation time
//! (the [`FieldMappingRegistry`]). Creating the remote objects is the
//! onboarding service's job; this crate never talks to the network.
pub mod catalog;
pub mod definition;
pub mod mapping;
pub mod provisioned;

pub use definition::{FieldKind, FieldSpec, SchemaDefinition, SchemaError, TableSpec, ValueShape};
pub use mapping::{
    FieldMapping, FieldMappingRegistry, MappingError, RemoteRecord, SemanticRecord, SemanticValue,
    TableMapping, TenantMapping,
};
pub use provisioned::{ProvisionedTable, ProvisioningResult};
