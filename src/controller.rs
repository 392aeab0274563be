//! Presentation-facing controller.
//!
//! Bundles the session, the fetch coordinator, and the persistence backend
//! behind the handful of operations a view layer needs. The controller never
//! holds the session lock across a persistence or channel call.

use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

use question_channel::{question_or_fallback, FetchId};

use crate::assessment::{days_remaining, deadline_approaching, Question};
use crate::coordinator::FetchCoordinator;
use crate::error::SessionError;
use crate::persistence::PersistenceBackend;
use crate::session::{lock_unpoisoned, Direction, SessionState, SessionStatus};

/// Shown in the dialogue view while no question has arrived yet.
pub const LOADING_PROMPT: &str = "Loading question...";

pub struct AssessmentController {
    session: Arc<Mutex<SessionState>>,
    coordinator: Arc<FetchCoordinator>,
    persistence: Box<dyn PersistenceBackend>,
}

impl AssessmentController {
    #[must_use]
    pub fn new(coordinator: Arc<FetchCoordinator>, persistence: Box<dyn PersistenceBackend>) -> Self {
        Self {
            session: coordinator.session(),
            coordinator,
            persistence,
        }
    }

    #[must_use]
    pub fn session(&self) -> Arc<Mutex<SessionState>> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        lock_unpoisoned(&self.session).status()
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        lock_unpoisoned(&self.session).progress()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        lock_unpoisoned(&self.session).current_question().cloned()
    }

    /// Whole days until the deadline, rounded up; `None` before an
    /// assessment is loaded.
    #[must_use]
    pub fn days_remaining(&self, now: OffsetDateTime) -> Option<i64> {
        lock_unpoisoned(&self.session)
            .assessment()
            .map(|assessment| days_remaining(assessment.deadline, now))
    }

    #[must_use]
    pub fn deadline_approaching(&self, now: OffsetDateTime) -> bool {
        lock_unpoisoned(&self.session)
            .assessment()
            .is_some_and(|assessment| deadline_approaching(assessment.deadline, now))
    }

    /// Text for the AI-dialogue view: the latest question once one arrived,
    /// the loading prompt otherwise.
    #[must_use]
    pub fn question_text(&self) -> String {
        let session = lock_unpoisoned(&self.session);
        if session.is_loading() {
            return LOADING_PROMPT.to_string();
        }
        match session.latest_response() {
            Some(response) => question_or_fallback(response).to_string(),
            None => LOADING_PROMPT.to_string(),
        }
    }

    #[must_use]
    pub fn fetch_error(&self) -> Option<String> {
        lock_unpoisoned(&self.session)
            .fetch_error()
            .map(str::to_string)
    }

    pub fn answer_change(
        &self,
        question_id: &str,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        lock_unpoisoned(&self.session).set_answer(question_id, value)
    }

    /// Moves between questions. Advancing past a question requires a
    /// non-empty answer to it; going back never does. Review sessions
    /// navigate freely.
    pub fn navigate(&self, direction: Direction) -> Result<bool, SessionError> {
        let mut session = lock_unpoisoned(&self.session);

        if direction == Direction::Next && !session.is_view_only() {
            let unanswered = session.current_question().is_some_and(|question| {
                !session
                    .answer(&question.id)
                    .is_some_and(|answer| !answer.trim().is_empty())
            });
            if unanswered {
                return Err(SessionError::EmptyAnswer);
            }
        }

        Ok(session.navigate(direction))
    }

    /// Persists current progress. On backend failure the session returns to
    /// its pre-request status and the reason is surfaced.
    pub fn save(&self) -> Result<(), SessionError> {
        let snapshot = {
            let mut session = lock_unpoisoned(&self.session);
            session.begin_save()?;
            session.snapshot()?
        };

        match self.persistence.save(&snapshot) {
            Ok(()) => lock_unpoisoned(&self.session).ack_save(),
            Err(reason) => {
                lock_unpoisoned(&self.session).fail_save()?;
                Err(SessionError::Persistence { reason })
            }
        }
    }

    /// Submits the completed assessment. Requires `acknowledged` from an
    /// explicit confirmation step; nothing is touched without it.
    pub fn submit(&self, acknowledged: bool) -> Result<(), SessionError> {
        if !acknowledged {
            return Err(SessionError::NotConfirmed);
        }

        let snapshot = {
            let mut session = lock_unpoisoned(&self.session);
            session.begin_submit()?;
            session.snapshot()?
        };

        match self.persistence.submit(&snapshot) {
            Ok(()) => lock_unpoisoned(&self.session).ack_submit(),
            Err(reason) => {
                lock_unpoisoned(&self.session).fail_submit()?;
                Err(SessionError::Persistence { reason })
            }
        }
    }

    pub fn request_reattempt(&self) -> Result<(), SessionError> {
        lock_unpoisoned(&self.session).request_reattempt()
    }

    /// Sends the current answer to the question channel and marks a fetch in
    /// flight. A blank answer is rejected before anything is dispatched.
    pub fn request_next_question(&self) -> Result<FetchId, SessionError> {
        let content = {
            let session = lock_unpoisoned(&self.session);
            let question = session.current_question().ok_or(SessionError::NotLoaded)?;
            session
                .answer(&question.id)
                .filter(|answer| !answer.trim().is_empty())
                .ok_or(SessionError::EmptyAnswer)?
                .to_string()
        };

        self.coordinator.request_question(content)
    }

    /// Applies buffered fetch outcomes; call from the host's update loop.
    pub fn poll_fetch_events(&self) -> usize {
        self.coordinator.flush_pending_fetch_events()
    }
}
