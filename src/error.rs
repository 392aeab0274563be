use thiserror::Error;

use crate::session::SessionStatus;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no assessment is loaded")]
    NotLoaded,

    #[error("session is read-only")]
    ViewOnly,

    #[error("assessment contains a duplicate question id '{id}'")]
    DuplicateQuestion { id: String },

    #[error("unknown question id '{id}'")]
    UnknownQuestion { id: String },

    #[error("session is already {status} and accepts no further changes")]
    Terminal { status: SessionStatus },

    #[error("cannot start {operation} while {status}")]
    InvalidTransition {
        operation: &'static str,
        status: SessionStatus,
    },

    #[error("cannot submit: {answered} of {total} questions answered")]
    Incomplete { answered: usize, total: usize },

    #[error("an answer is required before continuing")]
    EmptyAnswer,

    #[error("submission requires explicit confirmation")]
    NotConfirmed,

    #[error("save/submit rejected: {reason}")]
    Persistence { reason: String },

    #[error("failed to dispatch question fetch: {reason}")]
    Dispatch { reason: String },
}
