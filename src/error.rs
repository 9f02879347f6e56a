//! Error taxonomy for registration and serving.

use thiserror::Error;

/// Malformed command path or route pattern, raised while the console is
/// being assembled. These are fatal at startup and never deferred to
/// request time.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A command path was empty or consisted only of spaces.
    #[error("command path cannot be empty")]
    EmptyCommand,

    /// A route pattern was empty.
    #[error("route pattern cannot be empty")]
    EmptyPattern,

    /// A route pattern failed to compile.
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A verb filter failed to compile.
    #[error("invalid verb filter '{filter}': {source}")]
    InvalidVerbFilter {
        filter: String,
        #[source]
        source: regex::Error,
    },
}

/// Failure to start the HTTP transport.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to spawn I/O thread: {0}")]
    Spawn(#[from] std::io::Error),
}
