//! Core of a browser-style assessment platform front-end: the session state
//! machine, the question-fetch effect coordinator, and the focus-integrity
//! monitor, plus the presentation-facing controller that ties them together.
//!
//! Invariant: single mutation gate — all session mutation flows through
//! [`session::SessionState`]'s own operations; terminal states (`Failed`,
//! `Completed`) reject every later mutation.
//!
//! # Public API Overview
//! - Load an [`Assessment`] into a [`SessionState`] and drive it through an
//!   [`AssessmentController`].
//! - Fetch AI-generated questions through any [`question_channel::QuestionChannel`]
//!   via the [`FetchCoordinator`] (newest in-flight request wins).
//! - Enforce anti-cheating rules with the [`IntegrityMonitor`] and a host
//!   [`PresentationMode`] implementation.

pub mod assessment;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod integrity;
pub mod persistence;
pub mod session;

/// Assessment and question model plus deadline math.
pub use crate::assessment::{
    days_remaining, deadline_approaching, Assessment, Question, QuestionKind,
};

/// Presentation-facing coordinator.
pub use crate::controller::{AssessmentController, LOADING_PROMPT};

/// Question-fetch effect coordination.
pub use crate::coordinator::{FetchCoordinator, FetchEvent};

/// Flow errors surfaced to callers.
pub use crate::error::SessionError;

/// Focus/visibility integrity enforcement.
pub use crate::integrity::{FocusSignal, IntegrityMonitor, NoopPresentation, PresentationMode};

/// Save/submit collaborator contract and in-memory implementation.
pub use crate::persistence::{AnswerSnapshot, PersistenceBackend, RecordingBackend};

/// The session state machine.
pub use crate::session::{
    Direction, IntegrityState, SessionMode, SessionState, SessionStatus,
};
