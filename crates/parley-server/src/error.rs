//! Server error types.

use thiserror::Error;

/// Errors that can occur in the server runtime.
///
/// Only [`ServerError::Bind`] is fatal to the process; everything after
/// startup is contained within the session it belongs to.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listening socket failed at startup.
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    /// Transport-level I/O error.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
