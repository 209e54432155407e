//! Chat room broadcast engine.
//!
//! [`ChatRoom`] owns the participant registry and the history log and
//! composes them into the two operations with real ordering semantics:
//! recording a message and fanning it out, and admitting a joiner and
//! replaying history to it. Both contend for one async sequence lock, so
//! a participant admitted concurrently with an in-flight broadcast lands
//! deterministically on exactly one side of it: the message arrives via
//! replay or via live fan-out, never both and never neither.
//!
//! ## Lock order
//!
//! Sequence lock → history mutex → registry mutex, always in that
//! direction. The component mutexes are short and never cover network
//! I/O; only the async sequence lock is held across sends.

use std::sync::Arc;

use chrono::Local;

use crate::connection::{ConnId, Connection};
use crate::history::{History, Message, MessageKind, TIMESTAMP_FORMAT};
use crate::registry::{AdmissionError, Participant, Registry};

/// Fresh input prompt for a participant, stamped now. No trailing
/// newline: the recipient's cursor rests on the prompt line.
pub(crate) fn prompt_for(name: &str) -> String {
    format!("[{}][{}]:", Local::now().format(TIMESTAMP_FORMAT), name)
}

/// Shared chat room state: registry, history, and the broadcast engine.
pub struct ChatRoom {
    registry: Registry,
    history: History,
    /// Serializes record+fan-out against admit+replay.
    sequence: tokio::sync::Mutex<()>,
}

impl ChatRoom {
    /// Create an empty room with the given participant cap.
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Registry::new(capacity),
            history: History::new(),
            sequence: tokio::sync::Mutex::new(()),
        }
    }

    /// The participant registry (for accept-time gating and teardown).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The message history log.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Record a message in history and deliver it to every participant
    /// except the sender, as one atomic step.
    ///
    /// `sender` is the excluded party; `None` (a server announcement
    /// with no originating session) notifies everyone. User messages
    /// are prefixed `[timestamp][sender]:`; system messages go out
    /// verbatim. Each delivery ends with a fresh prompt for its
    /// recipient.
    pub async fn record_and_notify(&self, sender: Option<&str>, content: &str, kind: MessageKind) {
        let _ordered = self.sequence.lock().await;

        let message = match kind {
            MessageKind::User => Message::user(sender.unwrap_or_default(), content),
            MessageKind::System => Message::system(content),
        };
        self.history.append(message.clone());
        self.notify(sender, &message).await;
    }

    /// Admit a joiner, announce it, replay the full history to it, and
    /// leave it with an initial prompt.
    ///
    /// Runs under the same sequence lock as
    /// [`record_and_notify`](Self::record_and_notify): the join
    /// announcement lands in history before the replay snapshot is
    /// taken, so the joiner sees its own announcement at the end of the
    /// replay and misses nothing broadcast afterwards.
    pub async fn admit_and_replay(
        &self,
        conn_id: ConnId,
        name: &str,
        remote_identity: String,
        connection: Arc<dyn Connection>,
    ) -> Result<Participant, AdmissionError> {
        let _ordered = self.sequence.lock().await;

        let participant =
            self.registry.try_admit(conn_id, name, remote_identity, Arc::clone(&connection))?;

        let announcement = Message::system(format!("{name} has joined our chat..."));
        self.history.append(announcement.clone());
        self.notify(Some(name), &announcement).await;

        let mut transcript: String =
            self.history.replay().iter().map(Message::render).collect();
        transcript.push_str(&prompt_for(name));
        if let Err(e) = connection.send_text(&transcript).await {
            // The joiner's own session will notice on its next read.
            tracing::debug!("replay to {} failed: {}", name, e);
        }

        Ok(participant)
    }

    /// Fan one message out to the registry's current snapshot, skipping
    /// the sender. Write failures are logged and skipped; a dead peer is
    /// detected by its own session's next read, never here.
    async fn notify(&self, sender: Option<&str>, message: &Message) {
        for recipient in self.registry.snapshot() {
            if sender == Some(recipient.name.as_str()) {
                continue;
            }

            // Leading newline breaks into the recipient's pending input
            // line; the prompt leaves the terminal ready to type again.
            let payload = format!("\n{}{}", message.render(), prompt_for(&recipient.name));
            if let Err(e) = recipient.connection.send_text(&payload).await {
                tracing::debug!("broadcast to {} failed: {}", recipient.name, e);
            }
        }
    }
}

impl std::fmt::Debug for ChatRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRoom")
            .field("participants", &self.registry.count())
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}
