//! Error types for glbridge.

use thiserror::Error;

/// Main error type for glbridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An argument violated its declared constraints
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required argument was not supplied
    #[error("missing required argument: {0}")]
    MissingRequired(String),

    /// A polymorphic value did not have the expected shape
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream rejected the credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Upstream denied access to the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream rate limit hit
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// API returned an error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Upstream payload could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Argument descriptors that cannot be turned into a tool schema
    #[error("invalid tool descriptor: {}", .0.join("; "))]
    Descriptor(Vec<String>),

    /// Failure annotated with the operation that produced it
    #[error("{operation}: {source}")]
    Context {
        operation: String,
        #[source]
        source: Box<Error>,
    },

    /// Several independent failures
    #[error("{}", join_messages(.0))]
    Joined(Vec<Error>),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Map an upstream HTTP status to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            429 => Error::RateLimited(message),
            _ => Error::Api { status, message },
        }
    }

    /// Wrap this error with the name of the operation that failed.
    pub fn context(self, operation: impl Into<String>) -> Self {
        Error::Context {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// Combine independent failures into one error.
    ///
    /// Returns `Ok(())` when there is nothing to report and the bare error
    /// when there is exactly one.
    pub fn join(errors: Vec<Error>) -> Result<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::joined(errors))
        }
    }

    /// Like [`Error::join`] for callers that already know something failed.
    pub fn joined(mut errors: Vec<Error>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Error::Joined(errors)
        }
    }

    /// Whether the error stems from the caller's arguments rather than
    /// from the upstream or the server itself.
    pub fn is_invalid_params(&self) -> bool {
        match self {
            Error::InvalidArgument(_) | Error::MissingRequired(_) | Error::InvalidType(_) => true,
            Error::Context { source, .. } => source.is_invalid_params(),
            _ => false,
        }
    }
}

/// Extension for attaching operation context to results.
pub trait ResultExt<T> {
    /// Wrap the error (if any) with the operation name.
    fn context(self, operation: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`] but builds the name lazily.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(operation))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}

/// Result type alias for glbridge operations.
pub type Result<T> = std::result::Result<T, Error>;
