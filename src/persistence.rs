//! Save/submit collaborator contract.
//!
//! The session core never talks to a network or a database directly; it hands
//! an [`AnswerSnapshot`] to a [`PersistenceBackend`] and reacts to the result.

use crate::session::lock_unpoisoned;
use std::sync::Mutex;

/// Point-in-time copy of the answers, ordered by question position. Only
/// non-empty answers are included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSnapshot {
    pub assessment_id: String,
    pub answers: Vec<(String, String)>,
}

/// Host-provided durable storage for progress saves and final submissions.
///
/// Errors are reported as plain strings; the session core folds them into
/// [`crate::error::SessionError::Persistence`].
pub trait PersistenceBackend: Send {
    fn save(&self, snapshot: &AnswerSnapshot) -> Result<(), String>;
    fn submit(&self, snapshot: &AnswerSnapshot) -> Result<(), String>;
}

/// In-memory backend that records every call, with scriptable failures.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    inner: Mutex<RecordingInner>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    saves: Vec<AnswerSnapshot>,
    submissions: Vec<AnswerSnapshot>,
    fail_next: Option<String>,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next save or submit call fail with `reason`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        lock_unpoisoned(&self.inner).fail_next = Some(reason.into());
    }

    #[must_use]
    pub fn saves(&self) -> Vec<AnswerSnapshot> {
        lock_unpoisoned(&self.inner).saves.clone()
    }

    #[must_use]
    pub fn submissions(&self) -> Vec<AnswerSnapshot> {
        lock_unpoisoned(&self.inner).submissions.clone()
    }

    fn record(
        &self,
        snapshot: &AnswerSnapshot,
        pick: impl FnOnce(&mut RecordingInner) -> &mut Vec<AnswerSnapshot>,
    ) -> Result<(), String> {
        let mut inner = lock_unpoisoned(&self.inner);
        if let Some(reason) = inner.fail_next.take() {
            return Err(reason);
        }
        pick(&mut inner).push(snapshot.clone());
        Ok(())
    }
}

impl PersistenceBackend for RecordingBackend {
    fn save(&self, snapshot: &AnswerSnapshot) -> Result<(), String> {
        self.record(snapshot, |inner| &mut inner.saves)
    }

    fn submit(&self, snapshot: &AnswerSnapshot) -> Result<(), String> {
        self.record(snapshot, |inner| &mut inner.submissions)
    }
}
