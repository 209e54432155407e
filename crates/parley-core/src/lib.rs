//! Parley chat core.
//!
//! Transport-independent implementation of a line-oriented multi-user
//! chat room: the concurrency-safe participant registry, the append-only
//! message history, the fan-out broadcast engine, and the per-connection
//! session protocol.
//!
//! ## Architecture
//!
//! ```text
//! parley-core
//!   ├─ Connection       (line I/O capability, implemented by transports)
//!   ├─ Registry         (admission, capacity, name uniqueness)
//!   ├─ History          (append-only message log, replay to joiners)
//!   ├─ ChatRoom         (broadcast engine; serializes append + fan-out)
//!   └─ Session          (per-connection lifecycle state machine)
//! ```
//!
//! The crate performs no socket I/O itself. Transports implement the
//! [`Connection`] trait; tests run against in-memory fakes from the
//! [`testing`] module.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod history;
mod registry;
mod room;
mod session;
pub mod testing;

pub use connection::{ConnId, Connection};
pub use error::SessionError;
pub use history::{History, Message, MessageKind, TIMESTAMP_FORMAT};
pub use registry::{AdmissionError, Participant, Registry};
pub use room::ChatRoom;
pub use session::{SERVER_FULL_NOTICE, Session};
