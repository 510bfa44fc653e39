//! # Catalog relay - product catalog CSV ingestion for shop catalog APIs
//!
//! Takes a delimited product catalog, checks and normalizes it, and relays
//! every product to the upstream catalog API under its shop's credentials.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌───────────┐
//! │ CSV file │──▶│ Parser │──▶│ Schema   │──▶│ Normalize │──▶│ Partition │──▶│ Dispatch  │──▶ report
//! │ (upload) │   │        │   │ check    │   │ (typed)   │   │ (by shop) │   │ (bounded) │
//! └──────────┘   └────────┘   └──────────┘   └───────────┘   └───────────┘   └───────────┘
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per pipeline stage
//! - [`table`] - Column-oriented cell table
//! - [`models`] - Upload schema, product payload and report
//! - [`parser`] - Delimited text decoding
//! - [`validation`] - Required-column check
//! - [`transform`] - Normalization, partitioning and the pipeline
//! - [`dispatch`] - Credential resolution and upstream submission
//! - [`config`] - Environment settings
//! - [`api`] - HTTP server

// Core modules
pub mod error;
pub mod models;
pub mod table;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Upstream
pub mod dispatch;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CoercionError, ConfigError, CsvError, DispatchError, PipelineError, SchemaError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CatalogProduct, FailureDetail, IntegrationReport, ProductRecord, ShopFailures, ShopPartition,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use parser::{parse_bytes, parse_file};
pub use transform::pipeline::{aggregate, integrate_bytes, prepare_bytes, PipelineOptions};
pub use validation::validate_schema;

// =============================================================================
// Re-exports - Dispatch
// =============================================================================

pub use dispatch::{
    CredentialSource, DispatchSettings, Dispatcher, EnvCredentials, StaticCredentials,
};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::{load_settings, Settings};
