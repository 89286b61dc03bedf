//! Shared types, error model, and configuration for the claims workspace.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`LeadgenError`], the unified error type
//! - Domain types ([`Claim`], [`ClaimBatch`], [`QualifiedId`], [`RunManifest`])
//! - Configuration ([`AppConfig`], [`MergeOptions`], [`DataFlowConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DataFlowConfig, DataFlowSection, MergeOptions, MergeSection, ReportSection,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{LeadgenError, Result};
pub use types::{
    CURRENT_SCHEMA_VERSION, Claim, ClaimBatch, ClaimType, MAX_STATEMENT_CHARS, QualifiedId,
    RESERVED_CLAIM_KEYS, ReportFile, RunId, RunManifest, UNKNOWN_CLAIM_ID,
};
