//! Dialogue-loop behavior through the controller and coordinator: loading
//! prompt, tag extraction, fallback, and overlapping fetches.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use time::macros::datetime;

use assessment_core::controller::LOADING_PROMPT;
use assessment_core::{
    Assessment, AssessmentController, FetchCoordinator, Question, RecordingBackend, SessionMode,
    SessionState,
};
use question_channel::{QuestionChannel, FALLBACK_PROMPT};
use question_channel_mock::MockChannel;

fn harness(channel: Arc<dyn QuestionChannel>) -> AssessmentController {
    let assessment = Assessment::new(
        "a-1",
        "Full Stack Developer Assessment",
        "Senior Full Stack Developer",
        datetime!(2025-05-10 23:59:59 UTC),
        vec![Question::essay("q1", "Introduce yourself.")],
    );
    let mut state = SessionState::new();
    state
        .load_assessment(assessment, SessionMode::Interactive)
        .expect("assessment loads");
    let session = Arc::new(Mutex::new(state));
    let coordinator = FetchCoordinator::new(session, channel);
    AssessmentController::new(coordinator, Box::new(RecordingBackend::new()))
}

fn drain(controller: &AssessmentController) {
    while controller.poll_fetch_events() == 0 {
        thread::yield_now();
    }
}

#[test]
fn loading_prompt_is_shown_until_a_question_arrives() {
    let controller = harness(Arc::new(
        MockChannel::new(vec!["What motivates you?".to_string()])
            .with_latency(Duration::from_millis(20)),
    ));
    controller.answer_change("q1", "Hi.").expect("answer accepted");

    assert_eq!(controller.question_text(), LOADING_PROMPT);
    controller
        .request_next_question()
        .expect("fetch dispatched");
    assert_eq!(controller.question_text(), LOADING_PROMPT);

    drain(&controller);
    assert_eq!(controller.question_text(), "What motivates you?");
}

#[test]
fn untagged_responses_fall_back_to_the_generic_prompt() {
    // A single-question script: the second fetch exhausts it and returns
    // untagged completion text.
    let controller = harness(Arc::new(MockChannel::new(vec!["Only one.".to_string()])));
    controller.answer_change("q1", "Hi.").expect("answer accepted");

    controller.request_next_question().expect("fetch dispatched");
    drain(&controller);
    assert_eq!(controller.question_text(), "Only one.");

    controller.request_next_question().expect("fetch dispatched");
    drain(&controller);
    assert_eq!(controller.question_text(), FALLBACK_PROMPT);
}

#[test]
fn rapid_reasks_keep_only_the_newest_question() {
    let controller = harness(Arc::new(
        MockChannel::new(vec![
            "First question?".to_string(),
            "Second question?".to_string(),
        ])
        .with_latency(Duration::from_millis(30)),
    ));
    controller.answer_change("q1", "Hi.").expect("answer accepted");

    controller.request_next_question().expect("first dispatched");
    controller.request_next_question().expect("second dispatched");

    // Both outcomes must be drained before asserting; the stale one is
    // dropped on application.
    let mut drained = 0;
    while drained < 2 {
        drained += controller.poll_fetch_events();
        thread::yield_now();
    }

    // Whichever question the superseded fetch produced is gone; only the
    // newest fetch id's resolution was applied.
    let text = controller.question_text();
    assert_ne!(text, LOADING_PROMPT);
    let session = controller.session();
    let session = session.lock().expect("session lock");
    assert_eq!(session.history().len(), 1);
    assert!(!session.is_loading());
}

#[test]
fn channel_failures_surface_without_disturbing_answers() {
    let controller = harness(Arc::new(question_channel_mock::FailingChannel::new(
        "backend unavailable",
    )));
    controller.answer_change("q1", "Hi.").expect("answer accepted");

    controller.request_next_question().expect("fetch dispatched");
    drain(&controller);

    assert_eq!(
        controller.fetch_error().as_deref(),
        Some("backend unavailable")
    );
    assert_eq!(controller.progress(), 1.0);
}
