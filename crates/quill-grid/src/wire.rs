//! Request/response payloads for the grid backend HTTP contract.
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct TokenAuthRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TokenRefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Shared response shape of `POST /token-auth` and `POST /token-refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Remaining lifetime in seconds, relative to the moment of issuance.
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceCreateRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceResponse {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseTokenCreateRequest<'a> {
    pub name: &'a str,
    pub workspace: u64,
}

/// The long-lived per-tenant API token used by ordinary CRUD traffic.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseTokenResponse {
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TableCreateRequest<'a> {
    pub name: &'a str,
    pub database_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableResponse {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// Field creation payload. `kind` is the backend's wire type code; the
/// optional members apply only to the kinds that use them.
#[derive(Debug, Clone, Serialize)]
pub struct FieldCreateRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_options: Option<Vec<SelectOptionSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_row_table_id: Option<u64>,
}

impl FieldCreateRequest {
    pub fn scalar(name: impl Into<String>, kind: &str) -> Self {
        Self {
            name: name.into(),
            kind: kind.to_string(),
            select_options: None,
            link_row_table_id: None,
        }
    }

    pub fn select(name: impl Into<String>, kind: &str, options: Vec<SelectOptionSpec>) -> Self {
        Self {
            name: name.into(),
            kind: kind.to_string(),
            select_options: Some(options),
            link_row_table_id: None,
        }
    }

    pub fn link_row(name: impl Into<String>, target_table_id: u64) -> Self {
        Self {
            name: name.into(),
            kind: "link_row".to_string(),
            select_options: None,
            link_row_table_id: Some(target_table_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOptionSpec {
    pub value: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldResponse {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_create_request_skips_unused_members() {
        let scalar = FieldCreateRequest::scalar("Title", "text");
        let json = serde_json::to_value(&scalar).expect("json");
        assert_eq!(json["name"], "Title");
        assert_eq!(json["type"], "text");
        assert!(json.get("select_options").is_none());
        assert!(json.get("link_row_table_id").is_none());
    }

    #[test]
    fn field_create_request_link_row_carries_target() {
        let link = FieldCreateRequest::link_row("Campaign", 91);
        let json = serde_json::to_value(&link).expect("json");
        assert_eq!(json["type"], "link_row");
        assert_eq!(json["link_row_table_id"], 91);
    }

    #[test]
    fn token_response_decodes_contract_shape() {
        let raw = r#"{"access_token":"A1","refresh_token":"R1","expires_in":600}"#;
        let decoded: TokenResponse = serde_json::from_str(raw).expect("decode");
        assert_eq!(decoded.access_token, "A1");
        assert_eq!(decoded.refresh_token, "R1");
        assert_eq!(decoded.expires_in, 600);
    }

    #[test]
    fn responses_tolerate_extra_members() {
        let raw = r#"{"id":7,"name":"Quill Media","order":3,"permissions":"ADMIN"}"#;
        let decoded: WorkspaceResponse = serde_json::from_str(raw).expect("decode");
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.name, "Quill Media");
    }
}
