//! Per-connection session protocol.
//!
//! One [`Session`] runs to completion per accepted connection, driving
//! the lifecycle `Connected → NameNegotiation → Admitted → Active →
//! Closed`. Sessions never talk to each other directly; all shared
//! state goes through the [`ChatRoom`].
//!
//! Whatever path leads to `Closed` — explicit `exit`, peer disconnect,
//! or an I/O error — the participant is removed from the registry
//! (idempotently) before the session returns.

use std::sync::Arc;

use crate::connection::{ConnId, Connection};
use crate::error::SessionError;
use crate::history::MessageKind;
use crate::registry::{AdmissionError, Participant};
use crate::room::{ChatRoom, prompt_for};

/// Notice written when the participant cap is already reached, either at
/// accept time or when admission races past the accept-time gate.
pub const SERVER_FULL_NOTICE: &str = "Server is full. Please try again later.\n";

const EMPTY_NAME_NOTICE: &str = "Empty username is not allowed! Please enter a valid username: ";
const NAME_TAKEN_NOTICE: &str = "Username is already taken. Please enter a different username: ";
const EMPTY_MESSAGE_NOTICE: &str = "Empty messages are not allowed!\n";
const FAREWELL: &str = "Goodbye!\n";
const EXIT_COMMAND: &str = "exit";

/// How an admitted session left the `Active` state.
enum Departure {
    /// The peer typed `exit`; the leave announcement is already out.
    Graceful,
    /// The peer's stream ended without an `exit`.
    Dropped,
}

/// The admission/lifecycle state machine for one connection.
pub struct Session {
    id: ConnId,
    conn: Arc<dyn Connection>,
    room: Arc<ChatRoom>,
    banner: String,
}

impl Session {
    /// Create a session for a freshly accepted connection.
    ///
    /// `banner` is the full welcome text, name prompt included; it is
    /// written verbatim before negotiation begins.
    pub fn new(
        id: ConnId,
        conn: Arc<dyn Connection>,
        room: Arc<ChatRoom>,
        banner: impl Into<String>,
    ) -> Self {
        Self { id, conn, room, banner: banner.into() }
    }

    /// Drive the session to completion.
    ///
    /// Always removes this connection's registry entry on return,
    /// whichever path closed the session.
    pub async fn run(self) -> Result<(), SessionError> {
        let result = self.drive().await;
        self.room.registry().remove(self.id);
        result
    }

    async fn drive(&self) -> Result<(), SessionError> {
        self.conn.send_text(&self.banner).await?;

        let Some(participant) = self.negotiate_name().await? else {
            return Ok(());
        };
        tracing::info!(
            "{} has joined the server from {}",
            participant.name,
            participant.remote_identity
        );

        let name = participant.name;
        match self.exchange_messages(&name).await {
            Ok(Departure::Graceful) => Ok(()),
            Ok(Departure::Dropped) => {
                self.announce_leave(&name).await;
                Ok(())
            },
            Err(e) => {
                self.announce_leave(&name).await;
                Err(e)
            },
        }
    }

    /// `NameNegotiation`: read proposals until one is admitted.
    ///
    /// Empty input re-prompts without consuming anything; a duplicate
    /// name re-prompts with the rejection notice; hitting the capacity
    /// cap (or the peer hanging up) ends the session with `Ok(None)`.
    async fn negotiate_name(&self) -> Result<Option<Participant>, SessionError> {
        loop {
            let Some(name) = self.conn.read_line().await? else {
                return Ok(None);
            };
            if name.is_empty() {
                self.conn.send_text(EMPTY_NAME_NOTICE).await?;
                continue;
            }

            let admission = self
                .room
                .admit_and_replay(
                    self.id,
                    &name,
                    self.conn.remote_identity(),
                    Arc::clone(&self.conn),
                )
                .await;
            match admission {
                Ok(participant) => return Ok(Some(participant)),
                Err(AdmissionError::DuplicateName(_)) => {
                    tracing::debug!("username already taken: {}", name);
                    self.conn.send_text(NAME_TAKEN_NOTICE).await?;
                },
                Err(AdmissionError::CapacityExceeded(cap)) => {
                    tracing::info!("{} rejected, participant cap {} reached", self.id, cap);
                    let _ = self.conn.send_text(SERVER_FULL_NOTICE).await;
                    return Ok(None);
                },
            }
        }
    }

    /// `Active`: dispatch lines until the peer exits or vanishes.
    async fn exchange_messages(&self, name: &str) -> Result<Departure, SessionError> {
        loop {
            let Some(line) = self.conn.read_line().await? else {
                return Ok(Departure::Dropped);
            };

            if line == EXIT_COMMAND {
                tracing::info!("{} has requested to close the connection", name);
                self.announce_leave(name).await;
                let _ = self.conn.send_text(FAREWELL).await;
                return Ok(Departure::Graceful);
            }
            if line.is_empty() {
                let rejection = format!("{EMPTY_MESSAGE_NOTICE}{}", prompt_for(name));
                self.conn.send_text(&rejection).await?;
                continue;
            }

            self.room.record_and_notify(Some(name), &line, MessageKind::User).await;
            self.conn.send_text(&prompt_for(name)).await?;
        }
    }

    async fn announce_leave(&self, name: &str) {
        self.room
            .record_and_notify(
                Some(name),
                &format!("{name} has left our chat..."),
                MessageKind::System,
            )
            .await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}
