//! Built-in content-marketing catalog and schema loading.
//!
//! Every new tenant is provisioned from the same versioned catalog. The
//! built-in declaration below is the default; deployments can swap it for
//! a YAML file named by `QUILL_SCHEMA_FILE` without rebuilding, subject to
//! the same validation.
use crate::definition::{FieldKind, FieldSpec, SchemaDefinition, SchemaError, TableSpec};

/// Version stamped into every provisioning result produced from the
/// built-in catalog.
pub const CATALOG_VERSION: u32 = 1;

pub const SCHEMA_FILE_ENV: &str = "QUILL_SCHEMA_FILE";

/// Loads the schema the process will provision tenants from: the YAML
/// override when `QUILL_SCHEMA_FILE` names one, the built-in catalog
/// otherwise. Always validated.
pub fn load_default() -> Result<SchemaDefinition, SchemaError> {
    match std::env::var(SCHEMA_FILE_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            tracing::info!(path = %path, "loading schema catalog from file");
            from_yaml_file(&path)
        }
        _ => {
            let schema = builtin();
            schema.validate()?;
            Ok(schema)
        }
    }
}

pub fn from_yaml_file(path: &str) -> Result<SchemaDefinition, SchemaError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_string(),
        source,
    })?;
    let schema: SchemaDefinition = serde_yaml::from_str(&raw).map_err(|source| SchemaError::Parse {
        path: path.to_string(),
        source,
    })?;
    schema.validate()?;
    Ok(schema)
}

/// The content-marketing catalog: campaigns and channels first, then the
/// editorial pipeline from idea to published post, then the artifacts that
/// hang off posts. Declaration order is creation order, so every link
/// points at a table above it.
pub fn builtin() -> SchemaDefinition {
    SchemaDefinition {
        version: CATALOG_VERSION,
        tables: vec![
            TableSpec {
                key: "campaigns".to_string(),
                name: "Campaigns".to_string(),
                fields: vec![
                    text("Name"),
                    long_text("Objective"),
                    single_select("Status", &["Planned", "Active", "Completed"]),
                    date("Start Date"),
                    date("End Date"),
                    number("Budget"),
                ],
            },
            TableSpec {
                key: "channels".to_string(),
                name: "Channels".to_string(),
                fields: vec![
                    text("Name"),
                    single_select(
                        "Platform",
                        &["Blog", "Newsletter", "LinkedIn", "X", "Instagram", "YouTube"],
                    ),
                    long_text("Audience"),
                    boolean("Active"),
                ],
            },
            TableSpec {
                key: "ideas".to_string(),
                name: "Content Ideas".to_string(),
                fields: vec![
                    text("Title"),
                    long_text("Pitch"),
                    single_select("Status", &["Proposed", "Accepted", "Rejected"]),
                    multi_select("Tags", &["SEO", "Brand", "Product", "Seasonal"]),
                    link("Campaign", "campaigns"),
                ],
            },
            TableSpec {
                key: "content_posts".to_string(),
                name: "Content Posts".to_string(),
                fields: vec![
                    text("Title"),
                    long_text("Body"),
                    single_select("Status", &["Draft", "In Review", "Approved", "Published"]),
                    multi_select("Formats", &["Article", "Video", "Carousel", "Story"]),
                    date("Publish Date"),
                    link("Campaign", "campaigns"),
                    link("Idea", "ideas"),
                ],
            },
            TableSpec {
                key: "assets".to_string(),
                name: "Assets".to_string(),
                fields: vec![
                    text("Name"),
                    file("File"),
                    single_select("Kind", &["Image", "Video", "Audio", "Document"]),
                    url("Source URL"),
                    link("Post", "content_posts"),
                ],
            },
            TableSpec {
                key: "publications".to_string(),
                name: "Publications".to_string(),
                fields: vec![
                    text("Reference"),
                    date("Published At"),
                    url("Permalink"),
                    link("Post", "content_posts"),
                    link("Channel", "channels"),
                ],
            },
            TableSpec {
                key: "metrics".to_string(),
                name: "Channel Metrics".to_string(),
                fields: vec![
                    text("Period"),
                    number("Views"),
                    number("Clicks"),
                    number("Engagement Rate"),
                    link("Publication", "publications"),
                    link("Channel", "channels"),
                ],
            },
        ],
    }
}

fn text(name: &str) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::Text,
    }
}

fn long_text(name: &str) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::LongText,
    }
}

fn url(name: &str) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::Url,
    }
}

fn date(name: &str) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::Date,
    }
}

fn number(name: &str) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::Number,
    }
}

fn boolean(name: &str) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::Boolean,
    }
}

fn file(name: &str) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::File,
    }
}

fn single_select(name: &str, choices: &[&str]) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::SingleSelect {
            choices: choices.iter().map(|c| c.to_string()).collect(),
        },
    }
}

fn multi_select(name: &str, choices: &[&str]) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::MultiSelect {
            choices: choices.iter().map(|c| c.to_string()).collect(),
        },
    }
}

fn link(name: &str, target: &str) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind: FieldKind::LinkRow {
            target: target.to_string(),
        },
    }
}
