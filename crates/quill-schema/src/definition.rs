//! The versioned declaration of a tenant's tables and fields.
//!
//! # Purpose
//! A [`SchemaDefinition`] is the single source of truth for what gets
//! provisioned: an ordered list of tables, each with an ordered list of
//! typed fields. It is immutable once loaded and validated; declaration
//! order is meaningful, because a relational link may only reference a
//! table declared before its own.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Problems in a schema declaration or its source file.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema declares no tables")]
    Empty,
    #[error("invalid table key {0:?}: expected lowercase snake_case")]
    InvalidTableKey(String),
    #[error("duplicate table key {0:?}")]
    DuplicateTableKey(String),
    #[error("duplicate table name {0:?}")]
    DuplicateTableName(String),
    #[error("table {0:?} declares no fields")]
    NoFields(String),
    #[error("table {table:?} declares field with an empty name")]
    EmptyFieldName { table: String },
    #[error("duplicate field name {field:?} in table {table:?}")]
    DuplicateFieldName { table: String, field: String },
    #[error("selection field {field:?} in table {table:?} declares no choices")]
    NoChoices { table: String, field: String },
    #[error("duplicate choice {choice:?} on field {field:?} in table {table:?}")]
    DuplicateChoice {
        table: String,
        field: String,
        choice: String,
    },
    #[error(
        "link field {field:?} in table {table:?} references {target:?}, \
         which is not declared before it"
    )]
    LinkTargetNotDeclared {
        table: String,
        field: String,
        target: String,
    },
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse schema file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// The canonical application-side shape every value of a field kind
/// normalizes to, regardless of which wire shape the backend sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    Text,
    TextList,
    IdList,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueShape::Text => "text",
            ValueShape::TextList => "text_list",
            ValueShape::IdList => "id_list",
        };
        f.write_str(name)
    }
}

/// A field's type, carrying the kind-specific options inline so a YAML
/// declaration stays flat: `kind: single_select` next to its `choices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    LongText,
    Url,
    Date,
    Number,
    Boolean,
    SingleSelect { choices: Vec<String> },
    MultiSelect { choices: Vec<String> },
    File,
    LinkRow { target: String },
}

impl FieldKind {
    /// The backend's wire type code for field creation.
    pub fn wire_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::LongText => "long_text",
            FieldKind::Url => "url",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::SingleSelect { .. } => "single_select",
            FieldKind::MultiSelect { .. } => "multi_select",
            FieldKind::File => "file",
            FieldKind::LinkRow { .. } => "link_row",
        }
    }

    pub fn value_shape(&self) -> ValueShape {
        match self {
            FieldKind::MultiSelect { .. } | FieldKind::File => ValueShape::TextList,
            FieldKind::LinkRow { .. } => ValueShape::IdList,
            _ => ValueShape::Text,
        }
    }

    /// Link fields are deferred to the linking phase because their target
    /// table must exist remotely before the field can be created.
    pub fn is_link(&self) -> bool {
        matches!(self, FieldKind::LinkRow { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Stable semantic key, e.g. `content_posts`. Used in mappings and
    /// lookups; never shown to end users.
    pub key: String,
    /// Display name the remote table is created under.
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl TableSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub version: u32,
    pub tables: Vec<TableSpec>,
}

impl SchemaDefinition {
    pub fn table(&self, key: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|table| table.key == key)
    }

    /// Checks the declaration invariants. Runs once at load time; a
    /// violation is a configuration error, never a provisioning error.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.tables.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen_keys: Vec<&str> = Vec::new();
        let mut seen_names: Vec<&str> = Vec::new();
        for table in &self.tables {
            if !is_snake_case_key(&table.key) {
                return Err(SchemaError::InvalidTableKey(table.key.clone()));
            }
            if seen_keys.contains(&table.key.as_str()) {
                return Err(SchemaError::DuplicateTableKey(table.key.clone()));
            }
            if seen_names.contains(&table.name.as_str()) {
                return Err(SchemaError::DuplicateTableName(table.name.clone()));
            }
            self.validate_table(table, &seen_keys)?;
            seen_keys.push(&table.key);
            seen_names.push(&table.name);
        }
        Ok(())
    }

    fn validate_table(&self, table: &TableSpec, earlier_keys: &[&str]) -> Result<(), SchemaError> {
        if table.fields.is_empty() {
            return Err(SchemaError::NoFields(table.key.clone()));
        }
        let mut field_names: Vec<&str> = Vec::new();
        for field in &table.fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    table: table.key.clone(),
                });
            }
            if field_names.contains(&field.name.as_str()) {
                return Err(SchemaError::DuplicateFieldName {
                    table: table.key.clone(),
                    field: field.name.clone(),
                });
            }
            field_names.push(&field.name);
            match &field.kind {
                FieldKind::SingleSelect { choices } | FieldKind::MultiSelect { choices } => {
                    validate_choices(table, field, choices)?;
                }
                FieldKind::LinkRow { target } => {
                    // Declaration order doubles as creation order, so a
                    // link may only point backwards.
                    if !earlier_keys.contains(&target.as_str()) {
                        return Err(SchemaError::LinkTargetNotDeclared {
                            table: table.key.clone(),
                            field: field.name.clone(),
                            target: target.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn validate_choices(
    table: &TableSpec,
    field: &FieldSpec,
    choices: &[String],
) -> Result<(), SchemaError> {
    if choices.is_empty() {
        return Err(SchemaError::NoChoices {
            table: table.key.clone(),
            field: field.name.clone(),
        });
    }
    for (index, choice) in choices.iter().enumerate() {
        if choices[..index].contains(choice) {
            return Err(SchemaError::DuplicateChoice {
                table: table.key.clone(),
                field: field.name.clone(),
                choice: choice.clone(),
            });
        }
    }
    Ok(())
}

fn is_snake_case_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !key.starts_with('_')
}
