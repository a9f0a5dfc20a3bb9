pub mod error;
pub mod jobs;
pub mod openapi;
pub mod system;
pub mod tenants;
pub mod types;
