//! Authenticated grid backend operations used during tenant provisioning.
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;

use crate::config::GridConfig;
use crate::endpoints::Endpoints;
use crate::error::{ConfigError, GridError, GridResult, detail_snippet};
use crate::token::TokenManager;
use crate::wire::{
    DatabaseTokenCreateRequest, DatabaseTokenResponse, FieldCreateRequest, FieldResponse,
    TableCreateRequest, TableResponse, WorkspaceCreateRequest, WorkspaceResponse,
};

/// HTTP client for the grid backend's schema mutation surface.
///
/// Owns the [`TokenManager`]; every operation resolves a valid admin
/// session token first, so callers never handle credentials directly.
pub struct GridClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    tokens: TokenManager,
}

impl GridClient {
    pub fn new(config: &GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| ConfigError::Invalid {
                key: "grid http client",
                detail: error.to_string(),
            })?;
        let endpoints = Endpoints::for_version(&config.base_url, config.api_version)?;
        let tokens = TokenManager::new(config, http.clone())?;
        Ok(Self {
            http,
            endpoints,
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Creates the remote container a tenant's tables live in.
    pub async fn create_workspace(&self, name: &str) -> GridResult<WorkspaceResponse> {
        tracing::debug!(workspace = name, "creating grid workspace");
        let request = self
            .authorized(self.http.post(self.endpoints.workspaces()))
            .await?
            .json(&WorkspaceCreateRequest { name });
        self.send_json(request, "create_workspace").await
    }

    /// Mints the long-lived per-tenant API token scoped to one workspace.
    /// Ordinary CRUD traffic presents this key instead of the admin session.
    pub async fn create_database_token(
        &self,
        name: &str,
        workspace_id: u64,
    ) -> GridResult<DatabaseTokenResponse> {
        tracing::debug!(workspace_id, "creating tenant database token");
        let request = self
            .authorized(self.http.post(self.endpoints.database_tokens()))
            .await?
            .json(&DatabaseTokenCreateRequest {
                name,
                workspace: workspace_id,
            });
        self.send_json(request, "create_database_token").await
    }

    pub async fn create_table(&self, database_id: u64, name: &str) -> GridResult<TableResponse> {
        tracing::debug!(database_id, table = name, "creating grid table");
        let request = self
            .authorized(self.http.post(self.endpoints.tables()))
            .await?
            .json(&TableCreateRequest { name, database_id });
        self.send_json(request, "create_table").await
    }

    pub async fn delete_table(&self, table_id: u64) -> GridResult<()> {
        tracing::debug!(table_id, "deleting grid table");
        let request = self
            .authorized(self.http.delete(self.endpoints.table(table_id)))
            .await?;
        self.send_expect_success(request, "delete_table").await
    }

    pub async fn create_field(
        &self,
        table_id: u64,
        field: &FieldCreateRequest,
    ) -> GridResult<FieldResponse> {
        tracing::debug!(table_id, field = %field.name, kind = %field.kind, "creating grid field");
        let request = self
            .authorized(self.http.post(self.endpoints.table_fields(table_id)))
            .await?
            .json(field);
        self.send_json(request, "create_field").await
    }

    /// Lists a table's fields as the backend currently knows them. Used by
    /// the linking phase to skip fields that already exist.
    pub async fn list_fields(&self, table_id: u64) -> GridResult<Vec<FieldResponse>> {
        let request = self
            .authorized(self.http.get(self.endpoints.table_fields(table_id)))
            .await?;
        self.send_json(request, "list_fields").await
    }

    async fn authorized(
        &self,
        request: reqwest::RequestBuilder,
    ) -> GridResult<reqwest::RequestBuilder> {
        let token = self.tokens.valid_token().await?;
        Ok(request.header(AUTHORIZATION, token.authorization()))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> GridResult<T> {
        let response = self.send_checked(request, operation).await?;
        match response.json().await {
            Ok(decoded) => {
                record_call(operation, "ok");
                Ok(decoded)
            }
            Err(source) => {
                record_call(operation, "transport");
                Err(GridError::Http { operation, source })
            }
        }
    }

    async fn send_expect_success(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> GridResult<()> {
        self.send_checked(request, operation).await?;
        record_call(operation, "ok");
        Ok(())
    }

    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> GridResult<reqwest::Response> {
        let response = request.send().await.map_err(|source| {
            record_call(operation, "transport");
            GridError::Http { operation, source }
        })?;
        let status = response.status();
        if !status.is_success() {
            record_call(operation, "rejected");
            let detail = detail_snippet(&response.text().await.unwrap_or_default());
            return Err(GridError::Api {
                operation,
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response)
    }
}

fn record_call(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "quill_grid_api_calls_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
