//! Deterministic mock implementation of the shared `question_channel`
//! contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and contract-level integration testing.

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use question_channel::{
    ExchangeRecord, QuestionChannel, QuestionRequest, QuestionResponse,
};

/// Closing text returned once the scripted questions are exhausted.
///
/// Deliberately carries no question tag so callers exercise their fallback
/// path.
pub const SCRIPT_EXHAUSTED_RESPONSE: &str =
    "Thank you, the assessment interview is complete.";

/// Scripted channel replaying a fixed list of question texts in order.
#[derive(Debug)]
pub struct MockChannel {
    questions: Vec<String>,
    latency: Option<Duration>,
    cursor: Mutex<usize>,
}

impl MockChannel {
    /// Creates a mock channel that serves `questions` one per fetch.
    #[must_use]
    pub fn new(questions: Vec<String>) -> Self {
        Self {
            questions,
            latency: None,
            cursor: Mutex::new(0),
        }
    }

    /// Adds a fixed per-fetch latency, used by request-overlap tests.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns how many fetches have been served so far.
    #[must_use]
    pub fn served(&self) -> usize {
        *lock_unpoisoned(&self.cursor)
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new(vec![
            "Describe a production incident you handled and what you changed afterwards."
                .to_string(),
            "How do you decide between optimizing for latency and for throughput?".to_string(),
            "Walk through how you would review a risky schema migration.".to_string(),
            "What trade-offs guide your choice of test granularity?".to_string(),
            "Tell us about a time you disagreed with a technical decision.".to_string(),
        ])
    }
}

impl QuestionChannel for MockChannel {
    fn fetch(&self, request: QuestionRequest) -> Result<QuestionResponse, String> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        let served = {
            let mut cursor = lock_unpoisoned(&self.cursor);
            let served = *cursor;
            *cursor += 1;
            served
        };

        let response = match self.questions.get(served) {
            Some(question) => format!("<question>{question}</question>"),
            None => SCRIPT_EXHAUSTED_RESPONSE.to_string(),
        };

        let mut ai_history = request.ai_history;
        ai_history.push(ExchangeRecord {
            input: request.current_user_message.content,
            output: response.clone(),
        });

        Ok(QuestionResponse {
            ai_history,
            response,
        })
    }
}

/// Channel that fails every fetch with a fixed reason, for failure-path tests.
#[derive(Debug, Clone)]
pub struct FailingChannel {
    reason: String,
}

impl FailingChannel {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl QuestionChannel for FailingChannel {
    fn fetch(&self, _request: QuestionRequest) -> Result<QuestionResponse, String> {
        Err(self.reason.clone())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use question_channel::{extract_question, question_or_fallback, FALLBACK_PROMPT};

    use super::*;

    fn fetch(channel: &impl QuestionChannel, content: &str) -> QuestionResponse {
        channel
            .fetch(QuestionRequest::new(content, Vec::new()))
            .expect("mock fetch should succeed")
    }

    #[test]
    fn scripted_questions_are_served_in_order_with_tags() {
        let channel = MockChannel::new(vec!["first".to_string(), "second".to_string()]);

        let first = fetch(&channel, "start");
        assert_eq!(extract_question(&first.response), Some("first"));

        let second = fetch(&channel, "answer one");
        assert_eq!(extract_question(&second.response), Some("second"));
        assert_eq!(channel.served(), 2);
    }

    #[test]
    fn history_is_appended_with_the_request_content() {
        let channel = MockChannel::new(vec!["only".to_string()]);

        let response = channel
            .fetch(QuestionRequest::new(
                "my answer",
                vec![ExchangeRecord {
                    input: "earlier".to_string(),
                    output: "earlier response".to_string(),
                }],
            ))
            .expect("mock fetch should succeed");

        assert_eq!(response.ai_history.len(), 2);
        assert_eq!(response.ai_history[1].input, "my answer");
        assert_eq!(response.ai_history[1].output, response.response);
    }

    #[test]
    fn exhausted_script_returns_untagged_completion_text() {
        let channel = MockChannel::new(vec!["only".to_string()]);
        let _ = fetch(&channel, "start");

        let done = fetch(&channel, "final answer");
        assert_eq!(done.response, SCRIPT_EXHAUSTED_RESPONSE);
        assert_eq!(question_or_fallback(&done.response), FALLBACK_PROMPT);
    }

    #[test]
    fn failing_channel_reports_fixed_reason() {
        let channel = FailingChannel::new("backend unavailable");
        let error = channel
            .fetch(QuestionRequest::new("answer", Vec::new()))
            .expect_err("failing channel must fail");

        assert_eq!(error, "backend unavailable");
    }
}
