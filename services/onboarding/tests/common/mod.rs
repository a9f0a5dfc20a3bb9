#![allow(dead_code)]
//! Shared test plumbing: a scriptable stand-in for the grid backend.
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};
use quill_grid::{ApiVersion, GridConfig};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[derive(Debug, Clone)]
pub struct FieldRow {
    pub id: u64,
    pub name: String,
    pub kind: String,
}

/// Scripted faults plus a full call ledger. Tables and fields get ids from
/// disjoint ranges (workspaces 101.., tables 201.., fields 1001..) so test
/// assertions cannot confuse them.
#[derive(Default)]
pub struct GridState {
    pub fail_auth: bool,
    pub fail_workspace: bool,
    pub fail_token_create: bool,
    /// Fail the create of the table with this display name.
    pub fail_table_create: Option<String>,
    /// Fail the create of (table display name, field name). Link fields are
    /// only created during the linking phase, so naming one targets that
    /// phase.
    pub fail_field_on: Option<(String, String)>,
    /// Fail the delete of the table with this display name.
    pub fail_delete_of: Option<String>,
    /// Sleep this long before each table create; widens race windows.
    pub table_create_delay_ms: u64,

    pub auth_calls: usize,
    pub workspace_calls: usize,
    next_workspace_id: u64,
    next_table_id: u64,
    next_field_id: u64,
    /// Table display names in creation order.
    pub table_creates: Vec<String>,
    /// (table id, field name, wire type) in creation order.
    pub field_creates: Vec<(u64, String, String)>,
    /// Table ids in deletion order.
    pub deleted_tables: Vec<u64>,
    /// Live remote tables: id to display name.
    pub tables: HashMap<u64, String>,
    /// Live remote fields per table.
    pub fields: HashMap<u64, Vec<FieldRow>>,
}

type Shared = Arc<Mutex<GridState>>;

pub struct MockGrid {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl MockGrid {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(GridState::default()));
        let router = Router::new()
            .route("/token-auth", post(token_auth))
            .route("/token-refresh", post(token_refresh))
            .route("/workspaces", post(create_workspace))
            .route("/database/tokens", post(create_database_token))
            .route("/database/tables", post(create_table))
            .route("/database/tables/:table_id", delete(delete_table))
            .route(
                "/database/fields/table/:table_id",
                post(create_field).get(list_fields),
            )
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock grid");
        let addr = listener.local_addr().expect("mock grid addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router.into_make_service()).await;
        });
        Self { addr, state }
    }

    pub fn grid_config(&self) -> GridConfig {
        GridConfig {
            base_url: format!("http://{}", self.addr),
            admin_email: "admin@quill.test".to_string(),
            admin_password: "secret".to_string(),
            api_version: ApiVersion::V1,
            refresh_buffer: Duration::from_secs(60),
            request_timeout: Duration::from_secs(5),
        }
    }
}

async fn token_auth(State(state): State<Shared>, Json(_body): Json<serde_json::Value>) -> axum::response::Response {
    let mut state = state.lock().await;
    state.auth_calls += 1;
    if state.fail_auth {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "bad credentials"})),
        )
            .into_response();
    }
    let n = state.auth_calls;
    Json(json!({
        "access_token": format!("access-{n}"),
        "refresh_token": format!("refresh-{n}"),
        "expires_in": 3600
    }))
    .into_response()
}

async fn token_refresh(State(state): State<Shared>, Json(_body): Json<serde_json::Value>) -> axum::response::Response {
    let mut state = state.lock().await;
    state.auth_calls += 1;
    let n = state.auth_calls;
    Json(json!({
        "access_token": format!("access-{n}"),
        "refresh_token": format!("refresh-{n}"),
        "expires_in": 3600
    }))
    .into_response()
}

async fn create_workspace(State(state): State<Shared>, Json(body): Json<serde_json::Value>) -> axum::response::Response {
    let mut state = state.lock().await;
    state.workspace_calls += 1;
    if state.fail_workspace {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "workspace backend down"})),
        )
            .into_response();
    }
    state.next_workspace_id += 1;
    let id = 100 + state.next_workspace_id;
    let name = body["name"].as_str().unwrap_or_default();
    Json(json!({"id": id, "name": name})).into_response()
}

async fn create_database_token(State(state): State<Shared>, Json(body): Json<serde_json::Value>) -> axum::response::Response {
    let state = state.lock().await;
    if state.fail_token_create {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "token mint failed"})),
        )
            .into_response();
    }
    let workspace = body["workspace"].as_u64().unwrap_or_default();
    let name = body["name"].as_str().unwrap_or_default();
    Json(json!({"key": format!("grid-key-{workspace}"), "name": name})).into_response()
}

async fn create_table(State(state): State<Shared>, Json(body): Json<serde_json::Value>) -> axum::response::Response {
    let delay = { state.lock().await.table_create_delay_ms };
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let mut state = state.lock().await;
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if state.fail_table_create.as_deref() == Some(name.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("cannot create table {name}")})),
        )
            .into_response();
    }
    state.next_table_id += 1;
    let id = 200 + state.next_table_id;
    state.table_creates.push(name.clone());
    state.tables.insert(id, name.clone());
    state.fields.insert(id, Vec::new());
    Json(json!({"id": id, "name": name})).into_response()
}

async fn delete_table(Path(table_id): Path<u64>, State(state): State<Shared>) -> axum::response::Response {
    let mut state = state.lock().await;
    let name = state.tables.get(&table_id).cloned().unwrap_or_default();
    if state.fail_delete_of.as_deref() == Some(name.as_str()) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("cannot delete table {name}")})),
        )
            .into_response();
    }
    state.tables.remove(&table_id);
    state.fields.remove(&table_id);
    state.deleted_tables.push(table_id);
    StatusCode::NO_CONTENT.into_response()
}

async fn create_field(
    Path(table_id): Path<u64>,
    State(state): State<Shared>,
    Json(body): Json<serde_json::Value>,
) -> axum::response::Response {
    let mut state = state.lock().await;
    let table_name = state.tables.get(&table_id).cloned().unwrap_or_default();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let kind = body["type"].as_str().unwrap_or_default().to_string();
    if let Some((fail_table, fail_field)) = &state.fail_field_on {
        if fail_table == &table_name && fail_field == &name {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("cannot create field {name}")})),
            )
                .into_response();
        }
    }
    state.next_field_id += 1;
    let id = 1000 + state.next_field_id;
    state.field_creates.push((table_id, name.clone(), kind.clone()));
    state.fields.entry(table_id).or_default().push(FieldRow {
        id,
        name: name.clone(),
        kind: kind.clone(),
    });
    Json(json!({"id": id, "name": name, "type": kind})).into_response()
}

async fn list_fields(Path(table_id): Path<u64>, State(state): State<Shared>) -> axum::response::Response {
    let state = state.lock().await;
    let rows: Vec<serde_json::Value> = state
        .fields
        .get(&table_id)
        .map(|rows| {
            rows.iter()
                .map(|row| json!({"id": row.id, "name": row.name, "type": row.kind}))
                .collect()
        })
        .unwrap_or_default();
    Json(serde_json::Value::Array(rows)).into_response()
}
