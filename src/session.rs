//! Authoritative in-memory record of one candidate's assessment attempt.
//!
//! All mutation flows through [`SessionState`]'s operations; the terminal
//! states reject every later change, which substitutes for locking under the
//! cooperative scheduling model.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use question_channel::{ExchangeRecord, FetchId};

use crate::assessment::{Assessment, Question};
use crate::error::SessionError;
use crate::persistence::AnswerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Saving,
    Submitting,
    Failed,
    Completed,
}

impl SessionStatus {
    /// Terminal states accept no further mutation.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Saving => "saving",
            Self::Submitting => "submitting",
            Self::Failed => "failed",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Whether the candidate can interact or is reviewing a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Interactive,
    ViewOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrityState {
    /// Set by the first answer edit; violations before engagement are ignored.
    pub armed: bool,
    /// Monotonic: once true, never resets within a session.
    pub failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// The session state machine. Exclusively owns the answer map, the status,
/// the integrity flags, and the question-fetch pipeline view.
#[derive(Debug)]
pub struct SessionState {
    assessment: Option<Assessment>,
    mode: SessionMode,
    answers: HashMap<String, String>,
    current_index: usize,
    status: SessionStatus,
    integrity: IntegrityState,
    reattempt_requested: bool,
    persist_resume: Option<SessionStatus>,
    history: Vec<ExchangeRecord>,
    latest_response: Option<String>,
    loading: bool,
    fetch_error: Option<String>,
    active_fetch: Option<FetchId>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            assessment: None,
            mode: SessionMode::Interactive,
            answers: HashMap::new(),
            current_index: 0,
            status: SessionStatus::NotStarted,
            integrity: IntegrityState::default(),
            reattempt_requested: false,
            persist_resume: None,
            history: Vec::new(),
            latest_response: None,
            loading: false,
            fetch_error: None,
            active_fetch: None,
        }
    }

    /// Initializes the session for `assessment`, seeding the answer map from
    /// prior answers and resetting status, index, and integrity state.
    pub fn load_assessment(
        &mut self,
        assessment: Assessment,
        mode: SessionMode,
    ) -> Result<(), SessionError> {
        let mut answers = HashMap::new();
        {
            let mut seen = HashSet::new();
            for question in &assessment.questions {
                if !seen.insert(question.id.as_str()) {
                    return Err(SessionError::DuplicateQuestion {
                        id: question.id.clone(),
                    });
                }
                if let Some(prior) = &question.prior_answer {
                    if !prior.trim().is_empty() {
                        answers.insert(question.id.clone(), prior.clone());
                    }
                }
            }
        }

        *self = Self {
            assessment: Some(assessment),
            mode,
            answers,
            ..Self::new()
        };
        Ok(())
    }

    #[must_use]
    pub fn assessment(&self) -> Option<&Assessment> {
        self.assessment.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn integrity(&self) -> IntegrityState {
        self.integrity
    }

    #[must_use]
    pub fn is_view_only(&self) -> bool {
        self.mode == SessionMode::ViewOnly
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.assessment
            .as_ref()
            .and_then(|assessment| assessment.questions.get(self.current_index))
    }

    /// Returns the stored answer for a question, if any.
    #[must_use]
    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    /// Inserts or overwrites an answer. The first successful call arms the
    /// integrity monitor and starts the session.
    pub fn set_answer(
        &mut self,
        question_id: &str,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        let assessment = self.assessment.as_ref().ok_or(SessionError::NotLoaded)?;

        if self.is_view_only() {
            return Err(SessionError::ViewOnly);
        }
        if self.status.is_terminal() {
            return Err(SessionError::Terminal {
                status: self.status,
            });
        }
        if !assessment
            .questions
            .iter()
            .any(|question| question.id == question_id)
        {
            return Err(SessionError::UnknownQuestion {
                id: question_id.to_string(),
            });
        }

        self.answers.insert(question_id.to_string(), value.into());
        self.integrity.armed = true;
        if self.status == SessionStatus::NotStarted {
            self.status = SessionStatus::InProgress;
        }
        Ok(())
    }

    /// Moves the current index by one, clamped to the question range.
    ///
    /// Silent no-op at the boundaries and in terminal states; returns whether
    /// the index moved.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        let Some(assessment) = self.assessment.as_ref() else {
            return false;
        };
        if self.status.is_terminal() || assessment.questions.is_empty() {
            return false;
        }

        let last = assessment.questions.len() - 1;
        let next = match direction {
            Direction::Previous => self.current_index.checked_sub(1),
            Direction::Next if self.current_index < last => Some(self.current_index + 1),
            Direction::Next => None,
        };

        match next {
            Some(index) => {
                self.current_index = index;
                true
            }
            None => false,
        }
    }

    fn answered_count(&self) -> usize {
        let Some(assessment) = self.assessment.as_ref() else {
            return 0;
        };
        assessment
            .questions
            .iter()
            .filter(|question| {
                self.answers
                    .get(&question.id)
                    .is_some_and(|answer| !answer.trim().is_empty())
            })
            .count()
    }

    /// Fraction of questions with a non-empty answer. Pure function of the
    /// answer map and the question count.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let total = self
            .assessment
            .as_ref()
            .map_or(0, |assessment| assessment.questions.len());
        if total == 0 {
            return 0.0;
        }
        self.answered_count() as f64 / total as f64
    }

    /// True iff every question has a non-empty answer.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self.assessment.as_ref() {
            Some(assessment) => self.answered_count() == assessment.questions.len(),
            None => false,
        }
    }

    /// Integrity-violation transition: idempotent, terminal, and refused only
    /// from `Completed`.
    pub fn mark_failed(&mut self) {
        if self.status == SessionStatus::Completed {
            return;
        }
        self.status = SessionStatus::Failed;
        self.integrity.failed = true;
        self.persist_resume = None;
    }

    /// Records a manual re-attempt request after an integrity failure.
    /// External approval is required; nothing is auto-approved here.
    pub fn request_reattempt(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Failed {
            return Err(SessionError::InvalidTransition {
                operation: "re-attempt request",
                status: self.status,
            });
        }
        self.reattempt_requested = true;
        Ok(())
    }

    #[must_use]
    pub fn reattempt_requested(&self) -> bool {
        self.reattempt_requested
    }

    /// Snapshot of the answers handed to the persistence collaborator,
    /// ordered by question position.
    pub fn snapshot(&self) -> Result<AnswerSnapshot, SessionError> {
        let assessment = self.assessment.as_ref().ok_or(SessionError::NotLoaded)?;

        let answers = assessment
            .questions
            .iter()
            .filter_map(|question| {
                self.answers
                    .get(&question.id)
                    .filter(|answer| !answer.trim().is_empty())
                    .map(|answer| (question.id.clone(), answer.clone()))
            })
            .collect();

        Ok(AnswerSnapshot {
            assessment_id: assessment.id.clone(),
            answers,
        })
    }

    pub fn begin_save(&mut self) -> Result<(), SessionError> {
        self.begin_persist("save", SessionStatus::Saving, false)
    }

    pub fn ack_save(&mut self) -> Result<(), SessionError> {
        self.finish_persist(SessionStatus::Saving, SessionStatus::InProgress)
    }

    /// Persistence error: the pre-request status is restored unchanged.
    pub fn fail_save(&mut self) -> Result<(), SessionError> {
        let resume = self.persist_resume.unwrap_or(SessionStatus::InProgress);
        self.finish_persist(SessionStatus::Saving, resume)
    }

    pub fn begin_submit(&mut self) -> Result<(), SessionError> {
        self.begin_persist("submit", SessionStatus::Submitting, true)
    }

    pub fn ack_submit(&mut self) -> Result<(), SessionError> {
        self.finish_persist(SessionStatus::Submitting, SessionStatus::Completed)
    }

    /// Persistence error: the pre-request status is restored unchanged.
    pub fn fail_submit(&mut self) -> Result<(), SessionError> {
        let resume = self.persist_resume.unwrap_or(SessionStatus::InProgress);
        self.finish_persist(SessionStatus::Submitting, resume)
    }

    fn begin_persist(
        &mut self,
        operation: &'static str,
        pending: SessionStatus,
        require_complete: bool,
    ) -> Result<(), SessionError> {
        let assessment = self.assessment.as_ref().ok_or(SessionError::NotLoaded)?;

        if self.is_view_only() {
            return Err(SessionError::ViewOnly);
        }
        if self.status.is_terminal() {
            return Err(SessionError::Terminal {
                status: self.status,
            });
        }
        if !matches!(
            self.status,
            SessionStatus::NotStarted | SessionStatus::InProgress
        ) {
            return Err(SessionError::InvalidTransition {
                operation,
                status: self.status,
            });
        }
        if require_complete && !self.is_complete() {
            return Err(SessionError::Incomplete {
                answered: self.answered_count(),
                total: assessment.questions.len(),
            });
        }

        self.persist_resume = Some(self.status);
        self.status = pending;
        Ok(())
    }

    fn finish_persist(
        &mut self,
        expected: SessionStatus,
        next: SessionStatus,
    ) -> Result<(), SessionError> {
        if self.status != expected {
            return Err(SessionError::InvalidTransition {
                operation: "persistence completion",
                status: self.status,
            });
        }
        self.status = next;
        self.persist_resume = None;
        Ok(())
    }

    /// Marks a question fetch as in flight. Each call supersedes any earlier
    /// fetch: only the newest fetch id's resolution will be applied.
    pub fn begin_fetch(&mut self, fetch_id: FetchId) -> Result<(), SessionError> {
        if self.assessment.is_none() {
            return Err(SessionError::NotLoaded);
        }
        if self.is_view_only() {
            return Err(SessionError::ViewOnly);
        }
        if self.status.is_terminal() {
            return Err(SessionError::Terminal {
                status: self.status,
            });
        }

        self.loading = true;
        self.fetch_error = None;
        self.active_fetch = Some(fetch_id);
        Ok(())
    }

    /// Applies a fetch resolution, replacing the dialogue history and latest
    /// response. Stale and post-terminal resolutions are dropped.
    pub fn resolve_fetch(
        &mut self,
        fetch_id: FetchId,
        history: Vec<ExchangeRecord>,
        response: String,
    ) {
        if !self.accepts_fetch(fetch_id) {
            return;
        }

        self.loading = false;
        self.history = history;
        self.latest_response = Some(response);
        self.active_fetch = None;
    }

    /// Applies a fetch failure. Stale and post-terminal failures are dropped.
    pub fn fail_fetch(&mut self, fetch_id: FetchId, reason: String) {
        if !self.accepts_fetch(fetch_id) {
            return;
        }

        self.loading = false;
        self.fetch_error = Some(reason);
        self.active_fetch = None;
    }

    fn accepts_fetch(&self, fetch_id: FetchId) -> bool {
        if self.status.is_terminal() {
            log::debug!("dropping fetch {fetch_id} resolution: session is {}", self.status);
            return false;
        }
        if self.active_fetch != Some(fetch_id) {
            log::debug!("dropping superseded fetch {fetch_id} resolution");
            return false;
        }
        true
    }

    #[must_use]
    pub fn history(&self) -> &[ExchangeRecord] {
        &self.history
    }

    #[must_use]
    pub fn latest_response(&self) -> Option<&str> {
        self.latest_response.as_deref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    /// Returns the dialogue pipeline to its initial state.
    pub fn reset_dialogue(&mut self) {
        self.history.clear();
        self.latest_response = None;
        self.loading = false;
        self.fetch_error = None;
        self.active_fetch = None;
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
