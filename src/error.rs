//! Error types for cloudns-sync.

use thiserror::Error;

/// Result type alias for cloudns-sync.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Synchronization error types.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failure or timeout talking to the API.
    #[error("Connection error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// ClouDNS rejected the request.
    #[error("ClouDNS error: {0}")]
    Provider(String),

    /// Response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The record listing came back empty.
    #[error("No DNS record found for host '{host}' in {domain}")]
    RecordNotFound { host: String, domain: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Exit status for transport failures (sysexits `EX_TEMPFAIL`).
pub const EXIT_TEMPFAIL: u8 = 75;

impl SyncError {
    /// Whether this is a transport-level failure rather than a bad answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_transport() {
            EXIT_TEMPFAIL
        } else {
            1
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        // Strip the URL so the auth-password query parameter never ends up in output.
        let e = e.without_url();
        if e.is_builder() {
            SyncError::Config(e.to_string())
        } else if e.is_decode() {
            SyncError::UnexpectedResponse(e.to_string())
        } else {
            SyncError::Transport(e.to_string())
        }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(e: toml::de::Error) -> Self {
        SyncError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(e: toml::ser::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}
