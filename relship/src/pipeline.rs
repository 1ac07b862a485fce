//! Pipeline orchestration
//!
//! Runs the archiver to completion, then the asset publisher and the package
//! publisher concurrently. The two publishers are independent failure
//! domains: a fatal error in one never cancels the other.

use std::collections::HashMap;

use relship_github::releases::partition_uploads;
use relship_github::{
    package_reference, sanitize_repo_segment, GhcrClient, PackageAnnotations, ReleaseClient,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::archive::{self, Archive};
use crate::config::{is_version_tag, Config};
use crate::{Error, Result};

/// Per-archive outcomes of the asset publishing stage
#[derive(Debug, Default, Serialize)]
pub struct AssetOutcome {
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Per-archive outcomes of the package publishing stage
#[derive(Debug, Default, Serialize)]
pub struct PackageOutcome {
    pub pushed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Outcome of one full pipeline run. A `None` stage failed fatally; the
/// error was reported when it happened.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub archive_count: usize,
    pub assets: Option<AssetOutcome>,
    pub packages: Option<PackageOutcome>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        if self.archive_count == 0 {
            return true;
        }
        match (&self.assets, &self.packages) {
            (Some(assets), Some(packages)) => {
                assets.failed.is_empty() && packages.failed.is_empty()
            }
            _ => false,
        }
    }
}

/// Reconcile the release for `tag` and upload any archive not yet attached
pub async fn publish_release_assets(
    config: &Config,
    tag: &str,
    archives: &[Archive],
) -> Result<AssetOutcome> {
    let mut outcome = AssetOutcome::default();
    if archives.is_empty() {
        return Ok(outcome);
    }

    let client = ReleaseClient::new(config.token.clone(), config.repo.full_name());
    let release = client.ensure_release(tag).await?;
    let upload_target = release.upload_target()?;

    let existing = client.list_asset_names(release.id).await?;
    let names: Vec<String> = archives.iter().map(|a| a.name.clone()).collect();
    let by_name: HashMap<&str, &Archive> =
        archives.iter().map(|a| (a.name.as_str(), a)).collect();

    let (to_upload, to_skip) = partition_uploads(&names, &existing);

    for name in to_skip {
        info!("Asset {} already attached to release {}, skipping", name, release.id);
        outcome.skipped.push(name.to_string());
    }

    for name in to_upload {
        let archive = by_name[name];
        let bytes = match tokio::fs::read(&archive.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read {}: {}", archive.path.display(), e);
                outcome.failed.push((name.to_string(), e.to_string()));
                continue;
            }
        };

        match client.upload_asset(&upload_target, name, bytes).await {
            Ok(asset) => {
                info!("Uploaded asset {} ({} bytes)", asset.name, asset.size);
                outcome.uploaded.push(name.to_string());
            }
            Err(e) => {
                warn!("Failed to upload {}: {}", name, e);
                outcome.failed.push((name.to_string(), e.to_string()));
            }
        }
    }

    Ok(outcome)
}

/// Push each archive to the registry under its sanitized name
pub fn publish_packages(config: &Config, tag: &str, archives: &[Archive]) -> Result<PackageOutcome> {
    let mut outcome = PackageOutcome::default();
    if archives.is_empty() {
        return Ok(outcome);
    }

    GhcrClient::check_oras()?;
    let client = GhcrClient::new(config.token.clone(), config.registry.clone());
    client.login()?;

    for archive in archives {
        let segment = sanitize_repo_segment(&archive.stem);
        if segment.is_empty() {
            warn!(
                "No valid repository segment derivable from '{}', skipping",
                archive.stem
            );
            outcome.skipped.push(archive.name.clone());
            continue;
        }

        let repository = format!("{}/{}", config.namespace, segment);
        let annotations = PackageAnnotations {
            title: segment.clone(),
            version: tag.to_string(),
            source: config.repo.html_url(),
            sha256: Some(archive.checksums.sha256.clone()),
        };

        match client.push(&archive.path, &repository, tag, &annotations) {
            Ok(target) => {
                info!("Pushed {}", target);
                outcome.pushed.push(target);
            }
            Err(e) => {
                warn!(
                    "Failed to push {}: {}",
                    package_reference(&config.registry, &config.namespace, &segment, tag),
                    e
                );
                outcome.failed.push((archive.name.clone(), e.to_string()));
            }
        }
    }

    Ok(outcome)
}

/// Run the full pipeline for a tag
pub async fn run(config: &Config, tag: &str) -> Result<RunSummary> {
    if tag.is_empty() {
        return Err(Error::Config("Empty tag".into()));
    }
    if !is_version_tag(tag) {
        warn!("Tag '{}' does not match v<major>.<minor>.<patch>[-suffix]", tag);
    }

    let archives = archive::archive_projects(&config.projects_root, &config.staging)?;
    if archives.is_empty() {
        info!("No project archives produced, nothing to publish");
        return Ok(RunSummary {
            archive_count: 0,
            assets: Some(AssetOutcome::default()),
            packages: Some(PackageOutcome::default()),
        });
    }
    info!("Produced {} archives", archives.len());

    let assets_fut = publish_release_assets(config, tag, &archives);

    let package_config = config.clone();
    let package_tag = tag.to_string();
    let package_archives = archives.clone();
    let packages_task = tokio::task::spawn_blocking(move || {
        publish_packages(&package_config, &package_tag, &package_archives)
    });

    let (assets, packages) = tokio::join!(assets_fut, packages_task);

    let assets = match assets {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!("Asset publishing failed: {}", e);
            None
        }
    };

    let packages = match packages {
        Ok(Ok(outcome)) => Some(outcome),
        Ok(Err(e)) => {
            error!("Package publishing failed: {}", e);
            None
        }
        Err(e) => {
            error!("Package publishing task panicked: {}", e);
            None
        }
    };

    Ok(RunSummary {
        archive_count: archives.len(),
        assets,
        packages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config(projects_root: &str) -> Config {
        Config::new(
            "acme/widgets",
            "token".into(),
            "ghcr.io".into(),
            None,
            PathBuf::from(projects_root),
            tempfile::tempdir().unwrap().keep(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_missing_root_is_success() {
        let config = test_config("/nonexistent/projects");
        let summary = run(&config, "v1.0.0").await.unwrap();
        assert_eq!(summary.archive_count, 0);
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_run_rejects_empty_tag() {
        let config = test_config("/nonexistent/projects");
        assert!(run(&config, "").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_archive_set_publishes_nothing() {
        let config = test_config("/nonexistent/projects");
        let outcome = publish_release_assets(&config, "v1.0.0", &[])
            .await
            .unwrap();
        assert!(outcome.uploaded.is_empty());
        assert!(outcome.skipped.is_empty());

        let outcome = publish_packages(&config, "v1.0.0", &[]).unwrap();
        assert!(outcome.pushed.is_empty());
    }

    #[test]
    fn test_summary_success_accounting() {
        let summary = RunSummary {
            archive_count: 2,
            assets: Some(AssetOutcome {
                uploaded: vec!["a.zip".into()],
                skipped: vec!["b.zip".into()],
                failed: vec![],
            }),
            packages: Some(PackageOutcome::default()),
        };
        assert!(summary.is_success());
    }

    #[test]
    fn test_summary_failed_upload_is_failure() {
        let summary = RunSummary {
            archive_count: 1,
            assets: Some(AssetOutcome {
                uploaded: vec![],
                skipped: vec![],
                failed: vec![("a.zip".into(), "503".into())],
            }),
            packages: Some(PackageOutcome::default()),
        };
        assert!(!summary.is_success());
    }

    #[test]
    fn test_summary_fatal_stage_is_failure() {
        let summary = RunSummary {
            archive_count: 1,
            assets: None,
            packages: Some(PackageOutcome::default()),
        };
        assert!(!summary.is_success());
    }
}
