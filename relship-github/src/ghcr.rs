//! GHCR (GitHub Container Registry) push utilities
//!
//! Pushes project archives to GHCR as OCI artifacts using `oras`, with an
//! empty config payload and the archive typed as a zip media type.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use crate::{Error, Result};

const ZIP_MEDIA_TYPE: &str = "application/zip";
const EMPTY_CONFIG: &str = "/dev/null:application/vnd.oci.empty.v1+json";

/// OCI annotation source for a pushed archive
#[derive(Debug, Clone)]
pub struct PackageAnnotations {
    pub title: String,
    pub version: String,
    pub source: String,
    pub sha256: Option<String>,
}

/// GHCR client for pushing archives
pub struct GhcrClient {
    token: String,
    registry: String,
}

impl GhcrClient {
    pub fn new(token: String, registry: String) -> Self {
        Self { token, registry }
    }

    /// Check if oras is available
    pub fn check_oras() -> Result<()> {
        if which::which("oras").is_err() {
            return Err(Error::OrasNotFound);
        }
        Ok(())
    }

    /// Login to the registry
    pub fn login(&self) -> Result<()> {
        let output = Command::new("oras")
            .args(["login", &self.registry, "-u", "token", "-p", &self.token])
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::AuthFailed(stderr.to_string()));
        }

        Ok(())
    }

    /// Push one archive to `registry/repository:tag`
    pub fn push<P: AsRef<Path>>(
        &self,
        archive: P,
        repository: &str,
        tag: &str,
        annotations: &PackageAnnotations,
    ) -> Result<String> {
        let target = format!("{}/{}:{}", self.registry, repository, tag);

        let mut cmd = Command::new("oras");
        cmd.arg("push")
            .arg("--disable-path-validation")
            .arg("--config")
            .arg(EMPTY_CONFIG);

        for (key, value) in build_annotations(annotations) {
            cmd.arg("--annotation").arg(format!("{}={}", key, value));
        }

        cmd.arg(&target);
        cmd.arg(format!(
            "{}:{}",
            archive.as_ref().display(),
            ZIP_MEDIA_TYPE
        ));

        let output = cmd.output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::PushFailed(stderr.to_string()));
        }

        Ok(target)
    }
}

/// Build standard OCI annotations for a pushed archive
fn build_annotations(meta: &PackageAnnotations) -> HashMap<String, String> {
    let mut annotations = HashMap::new();

    annotations.insert(
        "org.opencontainers.image.created".to_string(),
        chrono::Utc::now().to_rfc3339(),
    );
    annotations.insert(
        "org.opencontainers.image.title".to_string(),
        meta.title.clone(),
    );
    annotations.insert(
        "org.opencontainers.image.version".to_string(),
        meta.version.clone(),
    );
    annotations.insert(
        "org.opencontainers.image.source".to_string(),
        meta.source.clone(),
    );
    if let Some(ref sha256) = meta.sha256 {
        annotations.insert(
            "org.opencontainers.image.ref.name".to_string(),
            format!("sha256:{}", sha256),
        );
    }

    annotations
}

/// Sanitize an archive stem into a repository path segment.
///
/// Rule order is load-bearing: case-fold, substitute separators, strip
/// invalid characters, collapse repeated hyphens, trim edge hyphens.
/// Returns an empty string when nothing valid remains.
pub fn sanitize_repo_segment(name: &str) -> String {
    let lowered = name.to_lowercase();

    let substituted: String = lowered
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect();

    let stripped: String = substituted
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    let mut collapsed = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    collapsed.trim_matches('-').to_string()
}

/// Full package reference for a sanitized name and tag
pub fn package_reference(registry: &str, namespace: &str, name: &str, tag: &str) -> String {
    format!("{}/{}/{}:{}", registry, namespace, name, tag)
}
