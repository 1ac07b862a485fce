use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Github(#[from] relship_github::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Archive stage failed: {0}")]
    Archive(String),
}

pub type Result<T> = std::result::Result<T, Error>;
