//! Append-only message history.
//!
//! Every accepted broadcast is recorded here exactly once, in the order
//! the room's sequence lock admitted it, and the full log is replayed to
//! each newly admitted participant. The log is unbounded and lives only
//! for the life of the process.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};

/// Timestamp layout used in prompts, message prefixes, and replay.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether a message was typed by a participant or generated by the
/// server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Participant-authored chat line, delivered with a
    /// `[timestamp][author]:` prefix.
    User,
    /// Server announcement (join/leave), delivered verbatim.
    System,
}

/// One immutable entry in the history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Line of text; never empty (validated before construction).
    pub content: String,
    /// Capture time at broadcast.
    pub timestamp: DateTime<Local>,
    /// Originating participant, `None` for server announcements.
    pub author: Option<String>,
    /// Formatting discriminator.
    pub kind: MessageKind,
}

impl Message {
    /// Build a participant-authored message stamped now.
    pub fn user(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Local::now(),
            author: Some(author.into()),
            kind: MessageKind::User,
        }
    }

    /// Build a server announcement stamped now.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Local::now(),
            author: None,
            kind: MessageKind::System,
        }
    }

    /// Render the replay form of this message, terminator included.
    ///
    /// System entries replay as their literal content; user entries keep
    /// the prefix they were originally broadcast with, built from the
    /// *stored* timestamp.
    pub fn render(&self) -> String {
        match self.kind {
            MessageKind::System => format!("{}\n", self.content),
            MessageKind::User => format!(
                "[{}][{}]:{}\n",
                self.timestamp.format(TIMESTAMP_FORMAT),
                self.author.as_deref().unwrap_or_default(),
                self.content
            ),
        }
    }
}

/// Concurrency-safe append-only log of [`Message`]s.
///
/// The internal mutex covers only the vector; callers never perform I/O
/// while it is held.
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<Vec<Message>>,
}

impl History {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message to the tail.
    pub fn append(&self, message: Message) {
        self.lock_entries().push(message);
    }

    /// Consistent snapshot of all messages so far, in append order.
    pub fn replay(&self) -> Vec<Message> {
        self.lock_entries().clone()
    }

    /// Number of messages recorded so far.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// True when nothing has been broadcast yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<Message>> {
        // A poisoned lock only means another worker panicked mid-append;
        // the vector itself is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
