//! Run configuration
//!
//! All environment coupling lives here: the configuration is assembled once
//! per run from CLI arguments (with env fallbacks) and is immutable after.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};

/// `owner/name` pair identifying the hosting repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    /// Parse the `owner/name` form used by the hosting platform
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.splitn(2, '/');
        let owner = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(Error::Config(format!(
                "Invalid repository '{}', expected owner/name",
                raw
            )));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}", self.full_name())
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Immutable per-run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub repo: RepoId,
    pub token: String,
    pub registry: String,
    pub namespace: String,
    pub projects_root: PathBuf,
    pub staging: PathBuf,
}

impl Config {
    pub fn new(
        repo: &str,
        token: String,
        registry: String,
        namespace: Option<String>,
        projects_root: PathBuf,
        staging: PathBuf,
    ) -> Result<Self> {
        let repo = RepoId::parse(repo)?;

        if token.is_empty() {
            return Err(Error::Config("Empty platform token".into()));
        }

        // Registry namespaces are lowercase even when the owner is not.
        let namespace = namespace
            .unwrap_or_else(|| repo.owner.clone())
            .to_lowercase();

        Ok(Self {
            repo,
            token,
            registry,
            namespace,
            projects_root,
            staging,
        })
    }
}

/// Whether a tag matches the `v<major>.<minor>.<patch>[-suffix]` trigger
/// pattern. Non-matching tags are warned about, never rejected.
pub fn is_version_tag(tag: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"^v\d+\.\d+\.\d+(-[0-9A-Za-z.\-]+)?$").expect("Invalid version tag pattern")
    });
    re.is_match(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_parse() {
        let repo = RepoId::parse("acme/widgets").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.full_name(), "acme/widgets");
    }

    #[test]
    fn test_repo_parse_invalid() {
        assert!(RepoId::parse("acme").is_err());
        assert!(RepoId::parse("acme/").is_err());
        assert!(RepoId::parse("/widgets").is_err());
        assert!(RepoId::parse("a/b/c").is_err());
        assert!(RepoId::parse("").is_err());
    }

    #[test]
    fn test_namespace_defaults_to_owner() {
        let config = Config::new(
            "Acme/widgets",
            "token".into(),
            "ghcr.io".into(),
            None,
            PathBuf::from("projects"),
            PathBuf::from("dist"),
        )
        .unwrap();
        assert_eq!(config.namespace, "acme");
    }

    #[test]
    fn test_namespace_override() {
        let config = Config::new(
            "acme/widgets",
            "token".into(),
            "ghcr.io".into(),
            Some("Forge".into()),
            PathBuf::from("projects"),
            PathBuf::from("dist"),
        )
        .unwrap();
        assert_eq!(config.namespace, "forge");
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = Config::new(
            "acme/widgets",
            String::new(),
            "ghcr.io".into(),
            None,
            PathBuf::from("projects"),
            PathBuf::from("dist"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_version_tag_pattern() {
        assert!(is_version_tag("v1.2.3"));
        assert!(is_version_tag("v0.0.1"));
        assert!(is_version_tag("v10.20.30-rc.1"));
        assert!(is_version_tag("v1.0.0-alpha"));

        assert!(!is_version_tag("1.2.3"));
        assert!(!is_version_tag("v1.2"));
        assert!(!is_version_tag("v1.2.3.4"));
        assert!(!is_version_tag("latest"));
        assert!(!is_version_tag(""));
    }
}
