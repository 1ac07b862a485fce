//! relship: tag-driven project release pipeline
//!
//! This crate provides tools for:
//! - Archiving immediate subdirectories of a projects root into zip files
//! - Reconciling a GitHub release for a version tag (idempotent get-or-create)
//! - Uploading archives as release assets, skipping names already attached
//! - Pushing archives to GHCR as tagged OCI artifacts

pub mod archive;
pub mod checksum;
pub mod config;
pub mod error;
pub mod pipeline;

pub use archive::Archive;
pub use checksum::Checksums;
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::RunSummary;
