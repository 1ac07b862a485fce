//! GitHub Releases API client
//!
//! Provides idempotent release reconciliation (get-or-create by tag) and
//! asset listing/upload for a single repository.

use std::collections::HashSet;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

const GITHUB_API_BASE: &str = "https://api.github.com";
const ZIP_MEDIA_TYPE: &str = "application/zip";

/// A release record as returned by the Releases API
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub upload_url: String,
    pub html_url: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

impl Release {
    /// Resolved upload target with the URI template suffix stripped.
    /// Fails if the raw locator is absent or not an assets endpoint.
    pub fn upload_target(&self) -> Result<String> {
        resolve_upload_target(&self.upload_url)
            .ok_or_else(|| Error::UploadTarget(self.tag_name.clone()))
    }
}

/// An asset attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Serialize)]
struct CreateRelease<'a> {
    tag_name: &'a str,
    name: String,
    body: String,
    draft: bool,
    prerelease: bool,
}

/// Client for the Releases API of one repository
#[derive(Clone)]
pub struct ReleaseClient {
    client: reqwest::Client,
    token: String,
    repo: String,
}

impl ReleaseClient {
    /// Create a client for `owner/name` authenticated with `token`
    pub fn new(token: String, repo: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("relship/0.1.0")
                .build()
                .expect("Failed to create HTTP client"),
            token,
            repo,
        }
    }

    fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static("2022-11-28"),
        );
        headers
    }

    /// Fetch the release for a tag, if one exists
    pub async fn get_by_tag(&self, tag: &str) -> Result<Option<Release>> {
        let url = format!(
            "{}/repos/{}/releases/tags/{}",
            GITHUB_API_BASE, self.repo, tag
        );

        let response = self
            .client
            .get(&url)
            .headers(self.api_headers())
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Error::Release(format!(
                "Failed to query release for tag {}: {}",
                tag,
                response.status()
            )));
        }

        let release: Release = response.json().await.map_err(Error::Http)?;
        Ok(Some(release))
    }

    /// Create a non-draft, non-prerelease release for a tag
    pub async fn create(&self, tag: &str) -> Result<Release> {
        let url = format!("{}/repos/{}/releases", GITHUB_API_BASE, self.repo);
        let payload = CreateRelease {
            tag_name: tag,
            name: format!("Release {}", tag),
            body: format!("Automated release for {}", tag),
            draft: false,
            prerelease: false,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.api_headers())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Release(format!(
                "Failed to create release for tag {}: {}",
                tag,
                response.status()
            )));
        }

        response.json().await.map_err(Error::Http)
    }

    /// Get-or-create the release for a tag.
    ///
    /// Query-then-create is not atomic: a concurrent run for the same tag
    /// can create a second release. One trigger per tag is assumed.
    /// An unresolvable upload target on either path is fatal.
    pub async fn ensure_release(&self, tag: &str) -> Result<Release> {
        if tag.is_empty() {
            return Err(Error::Release("Empty tag".into()));
        }

        let release = match self.get_by_tag(tag).await? {
            Some(existing) => {
                info!("Reusing release {} for tag {}", existing.id, tag);
                existing
            }
            None => {
                info!("No release for tag {}, creating one", tag);
                self.create(tag).await?
            }
        };

        release.upload_target()?;
        Ok(release)
    }

    /// List the names of all assets attached to a release
    pub async fn list_asset_names(&self, release_id: u64) -> Result<HashSet<String>> {
        let mut names = HashSet::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/repos/{}/releases/{}/assets?per_page=100&page={}",
                GITHUB_API_BASE, self.repo, release_id, page
            );

            let response = self
                .client
                .get(&url)
                .headers(self.api_headers())
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Error::Release(format!(
                    "Failed to list assets for release {}: {}",
                    release_id,
                    response.status()
                )));
            }

            let assets: Vec<ReleaseAsset> = response.json().await.map_err(Error::Http)?;
            let count = assets.len();
            names.extend(assets.into_iter().map(|a| a.name));

            if count < 100 {
                break;
            }
            page += 1;
        }

        debug!("Release {} has {} assets", release_id, names.len());
        Ok(names)
    }

    /// Upload raw zip bytes as a named asset to a resolved upload target
    pub async fn upload_asset(
        &self,
        upload_target: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<ReleaseAsset> {
        let url = format!("{}?name={}", upload_target, urlencode(name));

        let mut headers = self.api_headers();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ZIP_MEDIA_TYPE));

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::AssetUpload {
                name: name.to_string(),
                reason: response.status().to_string(),
            });
        }

        response.json().await.map_err(Error::Http)
    }
}

/// Strip the `{?name,label}` URI template suffix from an upload locator.
/// Returns `None` when the locator is empty or not an assets endpoint.
pub fn resolve_upload_target(raw: &str) -> Option<String> {
    let base = match raw.find('{') {
        Some(idx) => &raw[..idx],
        None => raw,
    };

    if base.is_empty() || !base.ends_with("/assets") {
        return None;
    }
    Some(base.to_string())
}

/// Partition archive names into (to upload, to skip) against the asset
/// names already attached to a release. Input order is preserved.
pub fn partition_uploads<'a>(
    names: &'a [String],
    existing: &HashSet<String>,
) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut upload = Vec::new();
    let mut skip = Vec::new();

    for name in names {
        if existing.contains(name) {
            skip.push(name.as_str());
        } else {
            upload.push(name.as_str());
        }
    }

    (upload, skip)
}

/// Percent-encode the characters GitHub rejects in asset name queries
fn urlencode(name: &str) -> String {
    name.chars()
        .flat_map(|c| match c {
            ' ' => "%20".chars().collect::<Vec<_>>(),
            '%' => "%25".chars().collect(),
            '&' => "%26".chars().collect(),
            '+' => "%2B".chars().collect(),
            '?' => "%3F".chars().collect(),
            '#' => "%23".chars().collect(),
            _ => vec![c],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_json() -> &'static str {
        r#"{
            "id": 101,
            "tag_name": "v1.0.0",
            "upload_url": "https://uploads.github.com/repos/acme/widgets/releases/101/assets{?name,label}",
            "html_url": "https://github.com/acme/widgets/releases/tag/v1.0.0",
            "draft": false,
            "prerelease": false
        }"#
    }

    #[test]
    fn test_release_parsing() {
        let release: Release = serde_json::from_str(release_json()).unwrap();
        assert_eq!(release.id, 101);
        assert_eq!(release.tag_name, "v1.0.0");
        assert!(!release.draft);
        assert!(!release.prerelease);
    }

    #[test]
    fn test_upload_target_strips_template() {
        let release: Release = serde_json::from_str(release_json()).unwrap();
        assert_eq!(
            release.upload_target().unwrap(),
            "https://uploads.github.com/repos/acme/widgets/releases/101/assets"
        );
    }

    #[test]
    fn test_resolve_upload_target_plain() {
        let target = resolve_upload_target("https://uploads.example.com/releases/1/assets");
        assert_eq!(
            target.as_deref(),
            Some("https://uploads.example.com/releases/1/assets")
        );
    }

    #[test]
    fn test_resolve_upload_target_invalid() {
        assert_eq!(resolve_upload_target(""), None);
        assert_eq!(resolve_upload_target("{?name,label}"), None);
        assert_eq!(
            resolve_upload_target("https://uploads.example.com/releases/1"),
            None
        );
    }

    #[test]
    fn test_partition_uploads() {
        let names = vec![
            "alpha.zip".to_string(),
            "beta.zip".to_string(),
            "gamma.zip".to_string(),
        ];
        let existing: HashSet<String> = ["beta.zip".to_string()].into_iter().collect();

        let (upload, skip) = partition_uploads(&names, &existing);
        assert_eq!(upload, vec!["alpha.zip", "gamma.zip"]);
        assert_eq!(skip, vec!["beta.zip"]);
    }

    #[test]
    fn test_partition_uploads_idempotent() {
        let names = vec!["alpha.zip".to_string(), "beta.zip".to_string()];
        let existing: HashSet<String> = names.iter().cloned().collect();

        // Everything already present: second run uploads nothing.
        let (upload, skip) = partition_uploads(&names, &existing);
        assert!(upload.is_empty());
        assert_eq!(skip.len(), 2);
    }

    #[test]
    fn test_partition_uploads_empty_set() {
        let (upload, skip) = partition_uploads(&[], &HashSet::new());
        assert!(upload.is_empty());
        assert!(skip.is_empty());
    }

    #[test]
    fn test_urlencode_spaces() {
        assert_eq!(urlencode("Alpha Beta.zip"), "Alpha%20Beta.zip");
        assert_eq!(urlencode("gamma.zip"), "gamma.zip");
    }
}
