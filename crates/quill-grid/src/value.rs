//! Tagged decoding of the grid backend's field value shapes.
//!
//! # Purpose
//! The backend represents a single logical cell value in several wire
//! shapes: a bare scalar, a selection wrapper, a list of selection
//! wrappers, a list of file attachment descriptors, or a list of row
//! references. [`RemoteFieldValue`] decodes whichever shape arrives into
//! one tagged union at the HTTP boundary, so nothing downstream ever
//! re-inspects raw JSON.
//!
//! # Key invariants
//! - Decoding is total over the shapes the backend is known to emit;
//!   an unrecognized shape is a deserialization error, not a silent pass.
//! - Variant order matters: serde tries untagged variants top to bottom,
//!   so the most specific object shapes are listed before the catch-all
//!   scalars.
use serde::{Deserialize, Serialize};

/// One selection choice as the backend returns it for single- and
/// multi-selection fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: u64,
    pub value: String,
    pub color: String,
}

/// One attachment descriptor as returned for file fields. The backend
/// sends more members (size, mime type, thumbnails); only the members the
/// mapping layer consumes are modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
    pub name: String,
}

/// One row reference as returned for relational link fields. `value` is
/// the referenced row's primary text and is absent in the write shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl LinkRef {
    pub fn new(id: u64) -> Self {
        Self { id, value: None }
    }
}

/// Every wire shape a grid cell value can arrive in.
///
/// Deserialization order is significant. Lists of objects are tried most
/// specific first (`SelectOption` requires `value` and `color`, `FileRef`
/// requires `url`, `LinkRef` only `id`), so a shape can never be captured
/// by a looser variant listed above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteFieldValue {
    Null,
    SelectOption(SelectOption),
    SelectOptionList(Vec<SelectOption>),
    FileList(Vec<FileRef>),
    LinkRowList(Vec<LinkRef>),
    ScalarList(Vec<String>),
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RemoteFieldValue {
    pub fn link_rows(ids: impl IntoIterator<Item = u64>) -> Self {
        RemoteFieldValue::LinkRowList(ids.into_iter().map(LinkRef::new).collect())
    }

    /// True for `Null` and for any empty list shape.
    pub fn is_empty(&self) -> bool {
        match self {
            RemoteFieldValue::Null => true,
            RemoteFieldValue::SelectOptionList(items) => items.is_empty(),
            RemoteFieldValue::FileList(items) => items.is_empty(),
            RemoteFieldValue::LinkRowList(items) => items.is_empty(),
            RemoteFieldValue::ScalarList(items) => items.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> RemoteFieldValue {
        serde_json::from_value(value).expect("decode remote value")
    }

    #[test]
    fn decodes_bare_scalars() {
        assert_eq!(decode(json!("draft")), RemoteFieldValue::Text("draft".into()));
        assert_eq!(decode(json!(12.5)), RemoteFieldValue::Number(12.5));
        assert_eq!(decode(json!(true)), RemoteFieldValue::Bool(true));
        assert_eq!(decode(json!(null)), RemoteFieldValue::Null);
    }

    #[test]
    fn decodes_selection_wrapper() {
        let decoded = decode(json!({"id": 3, "value": "Approved", "color": "green"}));
        assert_eq!(
            decoded,
            RemoteFieldValue::SelectOption(SelectOption {
                id: 3,
                value: "Approved".into(),
                color: "green".into(),
            })
        );
    }

    #[test]
    fn decodes_selection_wrapper_list() {
        let decoded = decode(json!([
            {"id": 1, "value": "blog", "color": "blue"},
            {"id": 2, "value": "social", "color": "red"}
        ]));
        let RemoteFieldValue::SelectOptionList(options) = decoded else {
            panic!("expected selection list");
        };
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].value, "social");
    }

    #[test]
    fn decodes_file_descriptor_list() {
        let decoded = decode(json!([
            {"url": "https://cdn.test/a.png", "name": "a.png", "size": 1024, "is_image": true}
        ]));
        let RemoteFieldValue::FileList(files) = decoded else {
            panic!("expected file list");
        };
        assert_eq!(files[0].name, "a.png");
    }

    #[test]
    fn decodes_link_reference_list() {
        let decoded = decode(json!([{"id": 11, "value": "Spring launch"}, {"id": 12}]));
        let RemoteFieldValue::LinkRowList(links) = decoded else {
            panic!("expected link list");
        };
        assert_eq!(links[0].id, 11);
        assert_eq!(links[0].value.as_deref(), Some("Spring launch"));
        assert_eq!(links[1].value, None);
    }

    #[test]
    fn decodes_string_list_as_scalar_list() {
        let decoded = decode(json!(["blog", "social"]));
        assert_eq!(
            decoded,
            RemoteFieldValue::ScalarList(vec!["blog".into(), "social".into()])
        );
    }

    #[test]
    fn link_write_shape_serializes_ids_only() {
        let value = RemoteFieldValue::link_rows([4, 9]);
        let json = serde_json::to_value(&value).expect("serialize");
        assert_eq!(json, json!([{"id": 4}, {"id": 9}]));
    }

    #[test]
    fn null_round_trips() {
        let json = serde_json::to_value(RemoteFieldValue::Null).expect("serialize");
        assert_eq!(json, serde_json::Value::Null);
        assert_eq!(decode(json), RemoteFieldValue::Null);
    }

    #[test]
    fn empty_list_decodes_without_error() {
        // An empty array is shape-ambiguous; callers normalize by declared
        // field kind, so which list variant captures it is irrelevant.
        let decoded = decode(json!([]));
        assert!(decoded.is_empty());
    }
}
