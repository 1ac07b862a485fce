//! relship-github: remote publishing clients for relship
//!
//! This crate provides:
//! - A GitHub Releases API client with idempotent get-or-create reconciliation
//! - Release asset listing and upload
//! - GHCR push support via `oras` with OCI annotations
//! - Repository path segment sanitization

pub mod error;
pub mod ghcr;
pub mod releases;

pub use error::{Error, Result};
pub use ghcr::{package_reference, sanitize_repo_segment, GhcrClient, PackageAnnotations};
pub use releases::{Release, ReleaseAsset, ReleaseClient};
