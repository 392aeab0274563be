//! HTTP-backed implementation of the shared `question_channel` contract.
//!
//! This adapter translates the backend's `POST /api/v1/chat` request/response
//! exchange into the blocking `QuestionChannel` fetch expected by the
//! assessment core. Failures are surfaced to the caller; there is no
//! automatic retry.

mod client;
mod config;
mod error;

pub use client::HttpQuestionChannel;
pub use config::{ChannelConfig, DEFAULT_BASE_URL};
pub use error::HttpChannelError;
