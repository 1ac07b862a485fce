use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Release API error: {0}")]
    Release(String),

    #[error("Release for tag '{0}' has no usable upload target")]
    UploadTarget(String),

    #[error("Asset upload failed for '{name}': {reason}")]
    AssetUpload { name: String, reason: String },

    #[error("oras command not found - install oras to push packages")]
    OrasNotFound,

    #[error("Registry authentication failed: {0}")]
    AuthFailed(String),

    #[error("Push failed: {0}")]
    PushFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
