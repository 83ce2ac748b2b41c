//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cache engine
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (simple form)
    #[error("I/O error: {source}")]
    IoSimple {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// I/O operation error (with context)
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// YAML parsing error (workspace manifest)
    #[error("YAML error: {message}")]
    Yaml {
        /// Description of the YAML error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Resource not found error
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// Workspace manifest failed schema validation
    #[error("Manifest invalid: {message}")]
    ManifestInvalid {
        /// Description of the violated rule
        message: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage engine error (after retry budget exhausted)
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A subprocess (extractor, recall, git) exceeded its configured timeout
    #[error("Subprocess '{binary}' timed out after {timeout_s}s")]
    SubprocessTimeout {
        /// The binary that was invoked
        binary: String,
        /// The configured timeout, in seconds
        timeout_s: u64,
    },

    /// A subprocess exited non-zero or emitted output that failed validation
    #[error("Subprocess '{binary}' failed: {message}")]
    SubprocessFailed {
        /// The binary that was invoked
        binary: String,
        /// Truncated stderr or a decode-failure description
        message: String,
    },

    /// The vector-index extension was requested but is unavailable
    #[error("Vector extension unavailable: {message}")]
    VectorExtensionUnavailable {
        /// Description of why the extension could not be loaded
        message: String,
    },

    /// Single-writer queue is not running (enqueue attempted before start / after stop)
    #[error("Writer not running: {message}")]
    WriterNotRunning {
        /// Context for the failed operation
        message: String,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Generic / validation error creation methods
impl Error {
    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a manifest validation error
    pub fn manifest_invalid<S: Into<String>>(message: S) -> Self {
        Self::ManifestInvalid {
            message: message.into(),
        }
    }

    /// Create an internal invariant-violation error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// I/O / YAML error creation methods
impl Error {
    /// Create an I/O error with context and no source
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error with context and a source error
    pub fn io_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a YAML error with context and a source error
    pub fn yaml_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Yaml {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Configuration error creation methods
impl Error {
    /// Create a configuration error with no source
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with a source error
    pub fn config_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Storage error creation methods
impl Error {
    /// Create a storage error with no source
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with a source error
    pub fn storage_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Subprocess error creation methods
impl Error {
    /// Create a subprocess-timeout error
    pub fn subprocess_timeout<S: Into<String>>(binary: S, timeout_s: u64) -> Self {
        Self::SubprocessTimeout {
            binary: binary.into(),
            timeout_s,
        }
    }

    /// Create a subprocess-failed error
    pub fn subprocess_failed<S: Into<String>, M: Into<String>>(binary: S, message: M) -> Self {
        Self::SubprocessFailed {
            binary: binary.into(),
            message: message.into(),
        }
    }
}

impl Error {
    /// Create a vector-extension-unavailable error
    pub fn vector_extension_unavailable<S: Into<String>>(message: S) -> Self {
        Self::VectorExtensionUnavailable {
            message: message.into(),
        }
    }

    /// Create a writer-not-running error
    pub fn writer_not_running<S: Into<String>>(message: S) -> Self {
        Self::WriterNotRunning {
            message: message.into(),
        }
    }
}
