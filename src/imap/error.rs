use thiserror::Error;

/// Transport-level faults from the source/destination IMAP clients.
///
/// The `is_transient` classification is what the retry wrapper (`crate::retry`)
/// consults: connection/TLS/timeout/IO faults are worth retrying, protocol-level
/// refusals are not.
#[derive(Debug, Error, Clone)]
pub enum ImapError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl ImapError {
    /// True for faults the retry wrapper should treat as transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ImapError::Connection(_) | ImapError::Tls(_) | ImapError::Timeout(_) | ImapError::Io(_)
        )
    }
}

impl From<async_imap::error::Error> for ImapError {
    fn from(err: async_imap::error::Error) -> Self {
        match err {
            async_imap::error::Error::Parse(e) => ImapError::BadResponse(e.to_string()),
            async_imap::error::Error::No(msg) => ImapError::Command(msg),
            async_imap::error::Error::Bad(msg) => ImapError::BadResponse(msg),
            async_imap::error::Error::Io(e) => ImapError::Io(e.to_string()),
            async_imap::error::Error::Validate(e) => ImapError::Command(e.to_string()),
            other => ImapError::Unknown(other.to_string()),
        }
    }
}

impl From<tokio_native_tls::native_tls::Error> for ImapError {
    fn from(err: tokio_native_tls::native_tls::Error) -> Self {
        ImapError::Tls(err.to_string())
    }
}

impl From<std::io::Error> for ImapError {
    fn from(err: std::io::Error) -> Self {
        ImapError::Io(err.to_string())
    }
}
