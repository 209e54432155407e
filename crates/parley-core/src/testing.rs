//! In-memory connection fakes for tests.
//!
//! [`FakeConnection`] plays back a scripted sequence of input lines and
//! captures everything the server pushes to it, so session and broadcast
//! behavior can be asserted without sockets or timing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::connection::Connection;

/// Scripted in-memory [`Connection`].
///
/// `read_line` yields the scripted lines in order and then reports end
/// of stream, which a session treats as the peer disconnecting. All
/// output is accumulated verbatim and can be inspected with
/// [`sent`](Self::sent).
pub struct FakeConnection {
    identity: String,
    incoming: Mutex<VecDeque<String>>,
    sent: Mutex<String>,
    fail_writes: AtomicBool,
}

impl FakeConnection {
    /// Create a fake peer that will type the given lines and then hang
    /// up.
    pub fn scripted<I, S>(identity: &str, lines: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            identity: identity.to_string(),
            incoming: Mutex::new(lines.into_iter().map(Into::into).collect()),
            sent: Mutex::new(String::new()),
            fail_writes: AtomicBool::new(false),
        })
    }

    /// Everything the server has written to this peer so far.
    pub fn sent(&self) -> String {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Make every subsequent write fail, simulating a dead peer.
    pub fn break_pipe(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn send_text(&self, text: &str) -> std::io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        }
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push_str(text);
        Ok(())
    }

    async fn read_line(&self) -> std::io::Result<Option<String>> {
        Ok(self.incoming.lock().unwrap_or_else(PoisonError::into_inner).pop_front())
    }

    fn remote_identity(&self) -> String {
        self.identity.clone()
    }
}
