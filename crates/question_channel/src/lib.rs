//! Minimal transport-agnostic contract for fetching the next assessment
//! question from a backend inference service.
//!
//! This crate intentionally defines only the shared wire types, the blocking
//! channel trait, and the strict response-tag parser. It excludes transport
//! details, session state, and scheduling concerns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for one in-flight question fetch.
pub type FetchId = u64;

/// Message kind discriminator carried on the wire as `type`.
///
/// The backend currently recognizes a single kind for candidate answers.
pub const USER_MESSAGE_KIND: i64 = 1;

/// Prompt shown when a response carries no recognizable question tag.
pub const FALLBACK_PROMPT: &str = "Please answer the following question:";

const QUESTION_OPEN_TAG: &str = "<question>";
const QUESTION_CLOSE_TAG: &str = "</question>";

/// Error produced while assembling a channel, before any fetch is attempted.
///
/// Transport crates fold their own configuration errors into this type so
/// callers of the contract see a single construction error regardless of
/// which backend they picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInitError {
    message: String,
}

impl ChannelInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable reason construction failed.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ChannelInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ChannelInitError {}

impl From<String> for ChannelInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ChannelInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// One completed request/response exchange in the running dialogue context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeRecord {
    pub input: String,
    pub output: String,
}

/// The candidate's latest message as the backend expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserMessage {
    #[serde(rename = "type")]
    pub kind: i64,
    pub content: String,
}

impl UserMessage {
    /// Wraps candidate answer text in the wire envelope.
    #[must_use]
    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            kind: USER_MESSAGE_KIND,
            content: content.into(),
        }
    }
}

/// Input required to fetch the next question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionRequest {
    pub current_user_message: UserMessage,
    pub ai_history: Vec<ExchangeRecord>,
}

impl QuestionRequest {
    /// Builds a request from the candidate's answer and the running history.
    #[must_use]
    pub fn new(content: impl Into<String>, ai_history: Vec<ExchangeRecord>) -> Self {
        Self {
            current_user_message: UserMessage::answer(content),
            ai_history,
        }
    }
}

/// Backend reply: the updated history plus the raw response text carrying an
/// embedded `<question>…</question>` segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionResponse {
    pub ai_history: Vec<ExchangeRecord>,
    pub response: String,
}

/// Channel interface for executing one question fetch.
///
/// `fetch` blocks the calling thread until the backend responds; callers that
/// need overlap run it on worker threads and keep only the newest resolution.
pub trait QuestionChannel: Send + Sync + 'static {
    fn fetch(&self, request: QuestionRequest) -> Result<QuestionResponse, String>;
}

/// Extracts the human-readable question between the first `<question>` tag
/// and the first `</question>` tag after it.
///
/// Returns `None` for malformed input (missing or out-of-order tags); never
/// panics.
#[must_use]
pub fn extract_question(response: &str) -> Option<&str> {
    let open = response.find(QUESTION_OPEN_TAG)?;
    let body_start = open + QUESTION_OPEN_TAG.len();
    let close = response[body_start..].find(QUESTION_CLOSE_TAG)?;
    Some(response[body_start..body_start + close].trim())
}

/// Like [`extract_question`], substituting [`FALLBACK_PROMPT`] when no
/// well-formed tag pair is present.
#[must_use]
pub fn question_or_fallback(response: &str) -> &str {
    match extract_question(response) {
        Some(question) if !question.is_empty() => question,
        _ => FALLBACK_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        extract_question, question_or_fallback, ChannelInitError, ExchangeRecord, QuestionRequest,
        QuestionResponse, FALLBACK_PROMPT,
    };

    #[test]
    fn request_serializes_with_literal_type_field() {
        let request = QuestionRequest::new(
            "my answer",
            vec![ExchangeRecord {
                input: "previous answer".to_string(),
                output: "previous question".to_string(),
            }],
        );

        let value = serde_json::to_value(&request).expect("request serializes");
        assert_eq!(
            value,
            json!({
                "current_user_message": { "type": 1, "content": "my answer" },
                "ai_history": [
                    { "input": "previous answer", "output": "previous question" }
                ]
            })
        );
    }

    #[test]
    fn response_round_trips_history_and_text() {
        let raw = json!({
            "ai_history": [{ "input": "a", "output": "b" }],
            "response": "<question>Next?</question>"
        });

        let response: QuestionResponse =
            serde_json::from_value(raw).expect("response deserializes");
        assert_eq!(response.ai_history.len(), 1);
        assert_eq!(response.response, "<question>Next?</question>");
    }

    #[test]
    fn extract_question_returns_trimmed_tag_interior() {
        let response = "preamble <question>\n  What is ownership?  \n</question> postamble";
        assert_eq!(extract_question(response), Some("What is ownership?"));
    }

    #[test]
    fn extract_question_uses_first_tag_pair() {
        let response = "<question>first</question><question>second</question>";
        assert_eq!(extract_question(response), Some("first"));
    }

    #[test]
    fn extract_question_rejects_malformed_input() {
        assert_eq!(extract_question(""), None);
        assert_eq!(extract_question("no tags at all"), None);
        assert_eq!(extract_question("<question>unclosed"), None);
        assert_eq!(extract_question("</question>closed first<question>"), None);
    }

    #[test]
    fn fallback_prompt_covers_missing_and_empty_questions() {
        assert_eq!(question_or_fallback("plain text"), FALLBACK_PROMPT);
        assert_eq!(
            question_or_fallback("<question>   </question>"),
            FALLBACK_PROMPT
        );
        assert_eq!(question_or_fallback("<question>ok</question>"), "ok");
    }

    #[test]
    fn init_error_preserves_message() {
        let error = ChannelInitError::new("missing base url");
        assert_eq!(error.message(), "missing base url");
        assert_eq!(error.to_string(), "missing base url");
    }
}
