//! Client crate for the grid backend, the remote spreadsheet-database
//! service that hosts each tenant's tables.
//!
//! # Purpose
//! Owns everything that touches the grid backend's HTTP API: endpoint
//! resolution for a declared API version, the admin credential lifecycle
//! (acquire, cache, refresh), the schema mutation operations used during
//! tenant provisioning, and the tagged decoding of the backend's
//! heterogeneous field value shapes.
//!
//! # Notes
//! The admin credential handled here is the short-lived privileged token
//! used only for provisioning. It is distinct from the long-lived
//! per-tenant API token minted by [`client::GridClient::create_database_token`],
//! which ordinary CRUD traffic uses.
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod token;
pub mod value;
pub mod wire;

pub use client::GridClient;
pub use config::GridConfig;
pub use endpoints::{ApiVersion, Endpoints};
pub use error::{AuthError, ConfigError, GridError};
pub use token::{AccessToken, Credential, TokenManager};
pub use value::{FileRef, LinkRef, RemoteFieldValue, SelectOption};
