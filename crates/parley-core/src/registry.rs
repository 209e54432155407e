//! Participant registry.
//!
//! Concurrency-safe bookkeeping of admitted participants, keyed by
//! connection handle. Admission is an atomic check-then-insert: name
//! uniqueness and the capacity cap are both evaluated inside one
//! critical section so two racing admissions can never both succeed.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local};

use crate::connection::{ConnId, Connection};

/// Why an admission attempt was rejected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdmissionError {
    /// Another participant currently holds this exact name.
    #[error("name already taken: {0}")]
    DuplicateName(String),

    /// The registry is at its configured participant cap.
    #[error("participant cap reached ({0})")]
    CapacityExceeded(usize),
}

/// A currently admitted chat user.
#[derive(Clone)]
pub struct Participant {
    /// Unique, case-sensitive display name; immutable for the session.
    pub name: String,
    /// Origin of the peer (e.g. socket address), informational only.
    pub remote_identity: String,
    /// When admission succeeded.
    pub joined_at: DateTime<Local>,
    /// Live handle used to push lines to this participant.
    pub connection: Arc<dyn Connection>,
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("name", &self.name)
            .field("remote_identity", &self.remote_identity)
            .field("joined_at", &self.joined_at)
            .finish_non_exhaustive()
    }
}

/// Concurrency-safe map from connection handle to [`Participant`].
///
/// Entries are stored in admission order; with a cap of ten the linear
/// scans are cheaper than a map. The internal mutex covers only the
/// vector, never any I/O.
#[derive(Debug)]
pub struct Registry {
    entries: Mutex<Vec<(ConnId, Participant)>>,
    capacity: usize,
}

impl Registry {
    /// Create an empty registry with the given participant cap.
    pub fn new(capacity: usize) -> Self {
        Self { entries: Mutex::new(Vec::new()), capacity }
    }

    /// The configured participant cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Atomically admit a new participant.
    ///
    /// Fails with [`AdmissionError::CapacityExceeded`] at the cap and
    /// with [`AdmissionError::DuplicateName`] on a case-sensitive name
    /// collision. Check and insert happen under one lock, so at most
    /// one of any set of racing admissions for the same name succeeds.
    pub fn try_admit(
        &self,
        conn_id: ConnId,
        name: &str,
        remote_identity: String,
        connection: Arc<dyn Connection>,
    ) -> Result<Participant, AdmissionError> {
        let mut entries = self.lock_entries();

        if entries.len() >= self.capacity {
            return Err(AdmissionError::CapacityExceeded(self.capacity));
        }
        if entries.iter().any(|(_, p)| p.name == name) {
            return Err(AdmissionError::DuplicateName(name.to_string()));
        }

        let participant = Participant {
            name: name.to_string(),
            remote_identity,
            joined_at: Local::now(),
            connection,
        };
        entries.push((conn_id, participant.clone()));
        Ok(participant)
    }

    /// Remove the entry for this connection, if present. Idempotent.
    pub fn remove(&self, conn_id: ConnId) {
        self.lock_entries().retain(|(id, _)| *id != conn_id);
    }

    /// Point-in-time copy of all participants, in admission order.
    ///
    /// Safe to iterate (and perform I/O against) while other workers
    /// mutate the registry.
    pub fn snapshot(&self) -> Vec<Participant> {
        self.lock_entries().iter().map(|(_, p)| p.clone()).collect()
    }

    /// Current number of admitted participants.
    ///
    /// Used for the accept-time capacity gate, before name negotiation
    /// begins.
    pub fn count(&self) -> usize {
        self.lock_entries().len()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<(ConnId, Participant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeConnection;

    fn conn() -> Arc<dyn Connection> {
        FakeConnection::scripted("test-peer", Vec::<String>::new())
    }

    #[test]
    fn admit_then_lookup_via_snapshot() {
        let registry = Registry::new(10);
        registry.try_admit(ConnId::new(1), "alice", "1.2.3.4:5".into(), conn()).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "alice");
        assert_eq!(snapshot[0].remote_identity, "1.2.3.4:5");
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = Registry::new(10);
        registry.try_admit(ConnId::new(1), "alice", String::new(), conn()).unwrap();

        let result = registry.try_admit(ConnId::new(2), "alice", String::new(), conn());
        assert!(matches!(result, Err(AdmissionError::DuplicateName(_))));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn name_matching_is_case_sensitive() {
        let registry = Registry::new(10);
        registry.try_admit(ConnId::new(1), "alice", String::new(), conn()).unwrap();
        registry.try_admit(ConnId::new(2), "Alice", String::new(), conn()).unwrap();
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn capacity_is_enforced() {
        let registry = Registry::new(2);
        registry.try_admit(ConnId::new(1), "a", String::new(), conn()).unwrap();
        registry.try_admit(ConnId::new(2), "b", String::new(), conn()).unwrap();

        let result = registry.try_admit(ConnId::new(3), "c", String::new(), conn());
        assert!(matches!(result, Err(AdmissionError::CapacityExceeded(2))));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn removed_slot_frees_name_and_capacity() {
        let registry = Registry::new(1);
        registry.try_admit(ConnId::new(1), "alice", String::new(), conn()).unwrap();
        registry.remove(ConnId::new(1));

        registry.try_admit(ConnId::new(2), "alice", String::new(), conn()).unwrap();
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = Registry::new(10);
        registry.try_admit(ConnId::new(1), "alice", String::new(), conn()).unwrap();

        registry.remove(ConnId::new(1));
        registry.remove(ConnId::new(1));
        registry.remove(ConnId::new(99));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn snapshot_keeps_admission_order() {
        let registry = Registry::new(10);
        for (i, name) in ["alice", "bob", "carol"].into_iter().enumerate() {
            registry.try_admit(ConnId::new(i as u64), name, String::new(), conn()).unwrap();
        }

        let names: Vec<_> = registry.snapshot().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }

    #[test]
    fn racing_admissions_for_one_name_admit_exactly_one() {
        let registry = Arc::new(Registry::new(64));

        let handles: Vec<_> = (0..16u64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .try_admit(ConnId::new(i), "alice", String::new(), conn())
                        .is_ok()
                })
            })
            .collect();

        let admitted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(admitted, 1);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn racing_admissions_never_exceed_capacity() {
        let registry = Arc::new(Registry::new(4));

        let handles: Vec<_> = (0..32u64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .try_admit(ConnId::new(i), &format!("user-{i}"), String::new(), conn())
                        .is_ok()
                })
            })
            .collect();

        let admitted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(admitted, 4);
        assert_eq!(registry.count(), 4);
    }
}
