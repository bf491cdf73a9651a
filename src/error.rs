use thiserror::Error;

/// How a failed remote call should be treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected to clear up on its own; wait and call again.
    Transient,
    /// The addressed item vanished remotely; skip it.
    NotFound,
    /// Anything else; abort the enclosing operation.
    Fatal,
}

/// Failure of a single raw call against the remote photo library.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service answered with a non-success HTTP status.
    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect, timeout, reset).
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// A response arrived but its body could not be understood.
    #[error("malformed response: {0}")]
    Decode(String),

    /// No usable access token is available.
    #[error("credentials unavailable: {0}")]
    Credentials(String),
}

impl RemoteError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            Self::Status { status: 503, .. } => ErrorClass::Transient,
            Self::Status { status: 404, .. } => ErrorClass::NotFound,
            Self::Status { .. } => ErrorClass::Fatal,
            Self::Transport(_) => ErrorClass::Transient,
            Self::Decode(_) | Self::Credentials(_) => ErrorClass::Fatal,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

/// A remote operation that could not be completed and must abort its caller.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{call} failed")]
    Remote {
        call: String,
        #[source]
        source: RemoteError,
    },

    #[error("{call} still failing after {attempts} attempts")]
    RetriesExhausted {
        call: String,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    #[error("{call} reported not found")]
    UnexpectedNotFound { call: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Selection was attempted before any photo id was loaded.
    #[error("photo cache is empty")]
    Empty,
}
