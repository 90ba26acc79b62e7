use thiserror::Error;

/// Errors raised by the backup library.
///
/// Only local filesystem and report failures are fatal to a run; everything
/// that comes back from a remote service is handled per item.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("VK API error {code}: {message}")]
    VkApi { code: i64, message: String },

    #[error("Unexpected response shape from {endpoint}: {source}")]
    Shape {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Google Drive request failed: {status} - {body}")]
    Drive { status: u16, body: String },

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the run has to stop instead of skipping the current item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
