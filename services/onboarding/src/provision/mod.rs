//! Tenant schema provisioning against the grid backend.
//!
//! # Purpose
//! Drives the multi-step creation of a tenant's remote schema: workspace,
//! per-tenant API token, tables and their fields, and the cross-table link
//! fields that must wait until their target tables exist.
//!
//! # Key invariants
//! - Structure is created strictly in declared order, and every created
//!   table id is recorded before the next remote call can fail.
//! - A failed create deletes every created table in reverse creation order;
//!   only the empty workspace shell is left behind, and that is logged.
//! - Linking is a separate idempotent phase. It lists the remote fields
//!   first and matches by name, so re-running it never duplicates a link
//!   field. A linking failure keeps all tables and hands back the
//!   structurally complete result for a later repair.
use quill_grid::wire::{FieldCreateRequest, SelectOptionSpec};
use quill_grid::{AuthError, GridClient, GridError};
use quill_schema::definition::{FieldKind, FieldSpec, SchemaDefinition};
use quill_schema::provisioned::{ProvisionedTable, ProvisioningResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

pub mod job;

/// Where in the creation sequence an attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailurePoint {
    pub table_key: String,
    /// None when the table create itself failed.
    pub field_name: Option<String>,
}

impl FailurePoint {
    pub fn table(key: &str) -> Self {
        Self {
            table_key: key.to_string(),
            field_name: None,
        }
    }

    pub fn field(key: &str, name: &str) -> Self {
        Self {
            table_key: key.to_string(),
            field_name: Some(name.to_string()),
        }
    }
}

impl fmt::Display for FailurePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field_name {
            Some(field) => write!(f, "table {}, field {}", self.table_key, field),
            None => write!(f, "table {}", self.table_key),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No remote object was created; the admin credential itself was the
    /// problem.
    #[error("authentication failed before provisioning started: {0}")]
    Auth(#[from] AuthError),
    /// Workspace or tenant-token creation failed; no tables existed yet, so
    /// there was nothing to roll back.
    #[error("workspace setup failed for tenant {tenant_id}: {source}")]
    Setup {
        tenant_id: String,
        #[source]
        source: GridError,
    },
    /// A table or field create failed and the rollback completed cleanly.
    #[error("creation failed for tenant {tenant_id} at {point}; rolled back {} tables", rolled_back.len())]
    Create {
        tenant_id: String,
        point: FailurePoint,
        /// Table ids deleted during rollback, in deletion order.
        rolled_back: Vec<u64>,
        #[source]
        source: GridError,
    },
    #[error(transparent)]
    Rollback(#[from] RollbackError),
    /// Linking failed after every table was created. Tables are retained
    /// and the structurally complete result rides along for repair.
    #[error("linking failed for tenant {} at {point}; tables retained", result.tenant_id)]
    Link {
        result: Box<ProvisioningResult>,
        point: FailurePoint,
        #[source]
        source: GridError,
    },
}

/// A create failed and the rollback could not delete everything it made.
///
/// The orphaned table ids need operator cleanup; they are surfaced here and
/// in the job record rather than absorbed into the create failure.
#[derive(Debug, Error)]
#[error(
    "rollback for tenant {tenant_id} after failure at {point} left tables {orphaned_table_ids:?} behind"
)]
pub struct RollbackError {
    pub tenant_id: String,
    pub point: FailurePoint,
    pub orphaned_table_ids: Vec<u64>,
    pub deleted_table_ids: Vec<u64>,
    /// The create failure that triggered the rollback.
    pub trigger: GridError,
    /// The first failed delete; later deletes are still attempted.
    #[source]
    pub source: GridError,
}

pub struct SchemaProvisioner {
    grid: Arc<GridClient>,
    schema: Arc<SchemaDefinition>,
}

impl SchemaProvisioner {
    pub fn new(grid: Arc<GridClient>, schema: Arc<SchemaDefinition>) -> Self {
        Self { grid, schema }
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    /// Provision the full declared schema for one tenant.
    ///
    /// On success the returned result addresses every table and field,
    /// link fields included. See [`ProvisionError`] for the failure
    /// contract: `Auth` means nothing was created, `Create` means
    /// everything created was deleted again, `Link` means the tables exist
    /// and only link fields are owed.
    pub async fn provision(
        &self,
        tenant_id: &str,
        display_name: &str,
    ) -> Result<ProvisioningResult, ProvisionError> {
        tracing::info!(
            tenant_id,
            schema_version = self.schema.version,
            "provisioning tenant schema"
        );

        // Step 1: a valid admin credential before any mutation. Failing
        // here guarantees zero remote side effects.
        self.grid.tokens().valid_token().await?;

        // Step 2: the tenant's workspace; its id doubles as the database id
        // for table creation.
        let workspace = match self.grid.create_workspace(display_name).await {
            Ok(workspace) => workspace,
            Err(source) => {
                metrics::counter!("quill_provision_attempts_total", "outcome" => "setup_failed")
                    .increment(1);
                return Err(ProvisionError::Setup {
                    tenant_id: tenant_id.to_string(),
                    source,
                });
            }
        };

        // Step 3: the long-lived per-tenant API token for CRUD traffic.
        let token_name = format!("quill-{tenant_id}");
        let token = match self
            .grid
            .create_database_token(&token_name, workspace.id)
            .await
        {
            Ok(token) => token,
            Err(source) => {
                metrics::counter!("quill_provision_attempts_total", "outcome" => "setup_failed")
                    .increment(1);
                tracing::warn!(
                    tenant_id,
                    workspace_id = workspace.id,
                    "token creation failed, empty workspace shell left behind"
                );
                return Err(ProvisionError::Setup {
                    tenant_id: tenant_id.to_string(),
                    source,
                });
            }
        };

        // Step 4: tables and their non-link fields, in declared order.
        let mut result =
            ProvisioningResult::new(tenant_id, workspace.id, token.key, self.schema.version);
        let mut created: Vec<u64> = Vec::new();
        for table_spec in &self.schema.tables {
            let table = match self.grid.create_table(workspace.id, &table_spec.name).await {
                Ok(table) => table,
                Err(source) => {
                    let point = FailurePoint::table(&table_spec.key);
                    return Err(self.roll_back(tenant_id, point, source, &created).await);
                }
            };
            created.push(table.id);
            let mut provisioned = ProvisionedTable::new(table.id);
            for field_spec in table_spec.fields.iter().filter(|f| !f.kind.is_link()) {
                let request = scalar_field_request(field_spec);
                match self.grid.create_field(table.id, &request).await {
                    Ok(field) => {
                        provisioned.field_ids.insert(field_spec.name.clone(), field.id);
                    }
                    Err(source) => {
                        let point = FailurePoint::field(&table_spec.key, &field_spec.name);
                        return Err(self.roll_back(tenant_id, point, source, &created).await);
                    }
                }
            }
            result.tables.insert(table_spec.key.clone(), provisioned);
        }

        // Step 5: link fields, now that every target table exists.
        let result = match self.run_linking(result).await {
            Ok(result) => result,
            Err(error) => {
                metrics::counter!("quill_provision_attempts_total", "outcome" => "link_failed")
                    .increment(1);
                return Err(error);
            }
        };

        metrics::counter!("quill_provision_attempts_total", "outcome" => "ok").increment(1);
        tracing::info!(
            tenant_id,
            workspace_id = result.workspace_id,
            tables = result.tables.len(),
            "tenant schema provisioned"
        );
        Ok(result)
    }

    /// Re-run the linking phase for a tenant whose tables exist but whose
    /// link fields are incomplete. Safe to call on a fully linked tenant.
    pub async fn repair_links(
        &self,
        result: ProvisioningResult,
    ) -> Result<ProvisioningResult, ProvisionError> {
        let tenant_id = result.tenant_id.clone();
        match self.run_linking(result).await {
            Ok(result) => {
                metrics::counter!("quill_link_repairs_total", "outcome" => "ok").increment(1);
                tracing::info!(tenant_id, "link repair complete");
                Ok(result)
            }
            Err(error) => {
                metrics::counter!("quill_link_repairs_total", "outcome" => "failed").increment(1);
                Err(error)
            }
        }
    }

    async fn run_linking(
        &self,
        mut result: ProvisioningResult,
    ) -> Result<ProvisioningResult, ProvisionError> {
        for table_spec in &self.schema.tables {
            if !table_spec.fields.iter().any(|f| f.kind.is_link()) {
                continue;
            }
            let Some(table_id) = result.table(&table_spec.key).map(|t| t.table_id) else {
                tracing::warn!(
                    table = %table_spec.key,
                    "table missing from provisioning record, skipping its links"
                );
                continue;
            };
            // Idempotency: consult the remote state instead of trusting the
            // record, so a repair after a partial run never duplicates.
            let existing = match self.grid.list_fields(table_id).await {
                Ok(fields) => fields,
                Err(source) => {
                    return Err(link_failed(
                        result,
                        FailurePoint::table(&table_spec.key),
                        source,
                    ));
                }
            };
            for field_spec in &table_spec.fields {
                let FieldKind::LinkRow { target } = &field_spec.kind else {
                    continue;
                };
                if result.field_id(&table_spec.key, &field_spec.name).is_some() {
                    continue;
                }
                let field_id = if let Some(found) =
                    existing.iter().find(|field| field.name == field_spec.name)
                {
                    // Created by an earlier run; adopt it.
                    found.id
                } else {
                    let Some(target_table_id) = result.table(target).map(|t| t.table_id) else {
                        tracing::warn!(
                            table = %table_spec.key,
                            field = %field_spec.name,
                            "link target missing from provisioning record, skipping"
                        );
                        continue;
                    };
                    let request =
                        FieldCreateRequest::link_row(field_spec.name.clone(), target_table_id);
                    match self.grid.create_field(table_id, &request).await {
                        Ok(field) => field.id,
                        Err(source) => {
                            return Err(link_failed(
                                result,
                                FailurePoint::field(&table_spec.key, &field_spec.name),
                                source,
                            ));
                        }
                    }
                };
                if let Some(table) = result.tables.get_mut(&table_spec.key) {
                    table.field_ids.insert(field_spec.name.clone(), field_id);
                }
            }
        }
        Ok(result)
    }

    /// Best-effort reverse-order deletion of everything created so far.
    /// Returns the error the caller should surface for the whole attempt.
    async fn roll_back(
        &self,
        tenant_id: &str,
        point: FailurePoint,
        trigger: GridError,
        created: &[u64],
    ) -> ProvisionError {
        tracing::warn!(
            tenant_id,
            %point,
            tables = created.len(),
            error = %trigger,
            "provisioning failed, rolling back created tables"
        );
        let mut deleted = Vec::new();
        let mut orphaned = Vec::new();
        let mut first_failure = None;
        for &table_id in created.iter().rev() {
            match self.grid.delete_table(table_id).await {
                Ok(()) => deleted.push(table_id),
                Err(error) => {
                    tracing::error!(
                        tenant_id,
                        table_id,
                        error = %error,
                        "rollback delete failed, table orphaned"
                    );
                    orphaned.push(table_id);
                    if first_failure.is_none() {
                        first_failure = Some(error);
                    }
                }
            }
        }
        match first_failure {
            None => {
                metrics::counter!("quill_provision_attempts_total", "outcome" => "rolled_back")
                    .increment(1);
                tracing::info!(
                    tenant_id,
                    deleted = deleted.len(),
                    "rollback complete, empty workspace shell left behind"
                );
                ProvisionError::Create {
                    tenant_id: tenant_id.to_string(),
                    point,
                    rolled_back: deleted,
                    source: trigger,
                }
            }
            Some(source) => {
                metrics::counter!("quill_provision_attempts_total", "outcome" => "rollback_failed")
                    .increment(1);
                ProvisionError::Rollback(RollbackError {
                    tenant_id: tenant_id.to_string(),
                    point,
                    orphaned_table_ids: orphaned,
                    deleted_table_ids: deleted,
                    trigger,
                    source,
                })
            }
        }
    }
}

fn link_failed(result: ProvisioningResult, point: FailurePoint, source: GridError) -> ProvisionError {
    tracing::warn!(
        tenant_id = %result.tenant_id,
        %point,
        error = %source,
        "linking failed, tables retained"
    );
    ProvisionError::Link {
        result: Box::new(result),
        point,
        source,
    }
}

const SELECT_PALETTE: [&str; 6] = ["blue", "green", "red", "dark-yellow", "dark-blue", "gray"];

fn select_options(choices: &[String]) -> Vec<SelectOptionSpec> {
    choices
        .iter()
        .enumerate()
        .map(|(index, choice)| SelectOptionSpec {
            value: choice.clone(),
            color: SELECT_PALETTE[index % SELECT_PALETTE.len()].to_string(),
        })
        .collect()
}

/// Write payload for a non-link field. Link fields are built in the linking
/// phase, where their target table ids are known.
fn scalar_field_request(field: &FieldSpec) -> FieldCreateRequest {
    debug_assert!(!field.kind.is_link());
    match &field.kind {
        FieldKind::SingleSelect { choices } | FieldKind::MultiSelect { choices } => {
            FieldCreateRequest::select(
                field.name.clone(),
                field.kind.wire_type(),
                select_options(choices),
            )
        }
        kind => FieldCreateRequest::scalar(field.name.clone(), kind.wire_type()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_point_names_table_and_field() {
        assert_eq!(FailurePoint::table("assets").to_string(), "table assets");
        assert_eq!(
            FailurePoint::field("assets", "Kind").to_string(),
            "table assets, field Kind"
        );
    }

    #[test]
    fn select_fields_carry_their_choices() {
        let field = FieldSpec {
            name: "Status".to_string(),
            kind: FieldKind::SingleSelect {
                choices: vec!["Draft".to_string(), "Published".to_string()],
            },
        };
        let request = scalar_field_request(&field);
        assert_eq!(request.kind, "single_select");
        let options = request.select_options.expect("options");
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].value, "Draft");
    }

    #[test]
    fn scalar_fields_have_no_options() {
        let field = FieldSpec {
            name: "Active".to_string(),
            kind: FieldKind::Boolean,
        };
        let request = scalar_field_request(&field);
        assert_eq!(request.kind, "boolean");
        assert!(request.select_options.is_none());
        assert!(request.link_row_table_id.is_none());
    }

    #[test]
    fn palette_cycles_for_long_choice_lists() {
        let choices: Vec<String> = (0..8).map(|i| format!("choice-{i}")).collect();
        let options = select_options(&choices);
        assert_eq!(options.len(), 8);
        assert_eq!(options[0].color, options[6].color);
        assert_ne!(options[0].color, options[1].color);
    }
}
