//! Assessment and question model, immutable once loaded for a session.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Days remaining until a deadline is considered urgent.
pub const APPROACHING_THRESHOLD_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    Essay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    /// Present only for multiple-choice questions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Prior answer carried when resuming or viewing a session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_answer: Option<String>,
}

impl Question {
    #[must_use]
    pub fn multiple_choice(
        id: impl Into<String>,
        text: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind: QuestionKind::MultipleChoice,
            options,
            prior_answer: None,
        }
    }

    #[must_use]
    pub fn essay(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind: QuestionKind::Essay,
            options: Vec::new(),
            prior_answer: None,
        }
    }

    #[must_use]
    pub fn with_prior_answer(mut self, answer: impl Into<String>) -> Self {
        self.prior_answer = Some(answer.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub job_description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub questions: Vec<Question>,
}

impl Assessment {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        job_description: impl Into<String>,
        deadline: OffsetDateTime,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            job_description: job_description.into(),
            deadline,
            questions,
        }
    }
}

/// Whole days remaining until `deadline`, rounding any partial day up.
///
/// Zero or negative means the deadline has passed.
#[must_use]
pub fn days_remaining(deadline: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let seconds = (deadline - now).whole_seconds();
    let days = seconds.div_euclid(SECONDS_PER_DAY);
    if seconds.rem_euclid(SECONDS_PER_DAY) > 0 {
        days + 1
    } else {
        days
    }
}

/// True when the deadline is close enough to warrant an urgency cue but has
/// not yet passed.
#[must_use]
pub fn deadline_approaching(deadline: OffsetDateTime, now: OffsetDateTime) -> bool {
    let days = days_remaining(deadline, now);
    days > 0 && days <= APPROACHING_THRESHOLD_DAYS
}
