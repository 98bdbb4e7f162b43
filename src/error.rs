use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching images or generating the site
#[derive(Error, Debug)]
pub enum SiteError {
    /// The recipe export to build from does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Failed to read a file
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file or create a directory
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The recipe export is not valid JSON or has the wrong shape
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required page template is missing
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// The remote host answered but the image could not be retrieved
    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to serialize a JSON document
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl SiteError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SiteError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SiteError::Write {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SiteError>;
