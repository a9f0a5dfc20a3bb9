//! Quill onboarding service.
//!
//! # Purpose
//! Turns a tenant signup into a ready-to-use remote schema: provisions the
//! tenant's workspace and tables on the grid backend, tracks the provisioning
//! job, persists the outcome, and serves the field mappings that CRUD traffic
//! translates through.
//!
//! # Notes
//! The library crate exists so integration tests can build the router and
//! state without going through `main`.
pub mod api;
pub mod app;
pub mod config;
pub mod observability;
pub mod provision;
pub mod store;
