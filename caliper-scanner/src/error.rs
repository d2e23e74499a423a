use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why a candidate URL never reached the frontier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    #[error("disallowed scheme: {0}")]
    DisallowedScheme(String),

    #[error("unresolvable reference {candidate:?}: {reason}")]
    Unresolvable { candidate: String, reason: String },

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
}
