//! # Multi-tenant RBAC service
//!
//! Authorization backend in which tenants ("clients", identified by an
//! opaque UUIDv4 credential) independently manage roles, the permissions
//! each role grants, and which users belong to which roles. External
//! applications ask one critical question at request time: does user U,
//! under tenant C, hold permission P?
//!
//! ## Architecture
//!
//! - **config**: typed settings loaded once per process
//! - **crypto**: deterministic field encryption for queryable columns
//! - **database**: connection pool, schema, row-level upsert primitives
//! - **validation**: syntactic checks applied before anything reaches the engine
//! - **service**: the tenant-scoped decision and mutation engine
//! - **audit**: append-only operation log
//! - **handlers**: the HTTP boundary (axum router, envelopes, audit emission)
//! - **client**: typed API object, one method per endpoint
//!
//! The binary entry point lives in `main.rs`; everything else is library
//! code so the integration tests can drive the router directly.

pub mod audit;
pub mod client;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod response;
pub mod service;
pub mod validation;

pub use config::Settings;
pub use error::AuthError;
pub use handlers::{router, AppState, SharedState};
pub use service::AuthorizationService;
