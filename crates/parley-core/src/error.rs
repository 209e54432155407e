//! Core error types.

use thiserror::Error;

/// Terminal failure of one session.
///
/// Admission rejections are not errors at this level; the session
/// re-prompts or closes inline. A `SessionError` always means the
/// session is over, and registry cleanup still runs on that path.
#[derive(Debug, Error)]
pub enum SessionError {
    /// I/O failure on the session's own connection.
    #[error("connection failure: {0}")]
    Connection(#[from] std::io::Error),
}
