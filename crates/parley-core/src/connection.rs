//! Connection capability abstraction.
//!
//! The core never touches sockets directly. A transport hands each
//! session an object implementing [`Connection`], and the same handle is
//! shared with the broadcast engine so other sessions can push lines to
//! it concurrently. Production uses a TCP stream; tests use the
//! in-memory fake from [`crate::testing`].

use async_trait::async_trait;

/// Opaque handle identifying one accepted connection.
///
/// The registry is keyed by `ConnId`, never by participant name, so a
/// connection that fails name negotiation occupies no registry slot and
/// a name can be re-proposed by a later connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    /// Wrap a raw connection counter value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Bidirectional line-oriented I/O capability for one peer.
///
/// Both methods take `&self`: the broadcast engine writes to a
/// connection from other sessions' tasks while the owning session blocks
/// in [`read_line`](Connection::read_line), so implementations need
/// interior mutability (separate read/write halves behind their own
/// locks).
#[async_trait]
pub trait Connection: Send + Sync {
    /// Push text to the peer exactly as given.
    ///
    /// No line terminator is appended; prompts deliberately end without
    /// one so the peer's cursor rests on the prompt line.
    async fn send_text(&self, text: &str) -> std::io::Result<()>;

    /// Read the next line from the peer, with the trailing `\r\n` or
    /// `\n` stripped.
    ///
    /// Blocks until a line arrives. Returns `Ok(None)` once the peer has
    /// closed its end of the stream.
    async fn read_line(&self) -> std::io::Result<Option<String>>;

    /// Origin of the peer (e.g. a socket address), informational only.
    fn remote_identity(&self) -> String;
}
