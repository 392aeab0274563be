//! Question-fetch effect coordinator.
//!
//! Runs each [`QuestionChannel`] call on its own worker thread and buffers the
//! outcome as a [`FetchEvent`]. Events are applied to the session only when
//! drained, so the host controls exactly when state changes become visible.
//! Supersession lives in [`SessionState`]: a newer fetch id invalidates every
//! older one, and stale events are dropped on application.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use question_channel::{ExchangeRecord, FetchId, QuestionChannel, QuestionRequest};

use crate::error::SessionError;
use crate::session::{lock_unpoisoned, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Resolved {
        fetch_id: FetchId,
        history: Vec<ExchangeRecord>,
        response: String,
    },
    Failed {
        fetch_id: FetchId,
        reason: String,
    },
}

pub struct FetchCoordinator {
    session: Arc<Mutex<SessionState>>,
    channel: Arc<dyn QuestionChannel>,
    pending_events: Arc<Mutex<VecDeque<FetchEvent>>>,
    next_fetch_id: AtomicU64,
    workers: Mutex<Vec<(FetchId, JoinHandle<()>)>>,
}

impl FetchCoordinator {
    /// Creates a coordinator that buffers fetch events before applying them
    /// to the session.
    ///
    /// Call [`FetchCoordinator::flush_pending_fetch_events`] from the host's
    /// update path to apply buffered outcomes.
    pub fn new(session: Arc<Mutex<SessionState>>, channel: Arc<dyn QuestionChannel>) -> Arc<Self> {
        Arc::new(Self {
            session,
            channel,
            pending_events: Arc::new(Mutex::new(VecDeque::new())),
            next_fetch_id: AtomicU64::new(1),
            workers: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn session(&self) -> Arc<Mutex<SessionState>> {
        Arc::clone(&self.session)
    }

    /// Dispatches a question fetch for the candidate's latest answer.
    ///
    /// The session's dialogue history is snapshotted under the same lock that
    /// marks the fetch in flight, so the request always carries the history
    /// the fetch superseded.
    pub fn request_question(
        self: &Arc<Self>,
        content: impl Into<String>,
    ) -> Result<FetchId, SessionError> {
        let content = content.into();
        let fetch_id = self.next_fetch_id.fetch_add(1, Ordering::SeqCst);

        let history = {
            let mut session = lock_unpoisoned(&self.session);
            session.begin_fetch(fetch_id)?;
            session.history().to_vec()
        };

        let request = QuestionRequest::new(content, history);
        match self.spawn_worker(fetch_id, request) {
            Ok(join_handle) => {
                self.reap_finished_workers();
                lock_unpoisoned(&self.workers).push((fetch_id, join_handle));
                Ok(fetch_id)
            }
            Err(reason) => {
                let mut session = lock_unpoisoned(&self.session);
                session.fail_fetch(fetch_id, reason.clone());
                Err(SessionError::Dispatch { reason })
            }
        }
    }

    fn spawn_worker(
        self: &Arc<Self>,
        fetch_id: FetchId,
        request: QuestionRequest,
    ) -> Result<JoinHandle<()>, String> {
        let coordinator = Arc::clone(self);
        thread::Builder::new()
            .name(format!("question-fetch-{fetch_id}"))
            .spawn(move || coordinator.fetch_worker(fetch_id, request))
            .map_err(|error| format!("failed to spawn fetch worker: {error}"))
    }

    fn fetch_worker(self: Arc<Self>, fetch_id: FetchId, request: QuestionRequest) {
        let channel = Arc::clone(&self.channel);
        let outcome = catch_unwind(AssertUnwindSafe(|| channel.fetch(request)));

        let event = match outcome {
            Ok(Ok(response)) => FetchEvent::Resolved {
                fetch_id,
                history: response.ai_history,
                response: response.response,
            },
            Ok(Err(reason)) => FetchEvent::Failed { fetch_id, reason },
            Err(_) => FetchEvent::Failed {
                fetch_id,
                reason: "question channel panicked".to_string(),
            },
        };

        lock_unpoisoned(&self.pending_events).push_back(event);
    }

    /// Applies buffered fetch outcomes to the session, newest-wins guarded.
    ///
    /// Returns the number of events drained (including dropped stale ones).
    pub fn flush_pending_fetch_events(&self) -> usize {
        let mut drained = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_fetch_event(event);
                    drained += 1;
                }
                None => break,
            }
        }

        self.reap_finished_workers();
        drained
    }

    fn apply_fetch_event(&self, event: FetchEvent) {
        let mut session = lock_unpoisoned(&self.session);
        match event {
            FetchEvent::Resolved {
                fetch_id,
                history,
                response,
            } => session.resolve_fetch(fetch_id, history, response),
            FetchEvent::Failed { fetch_id, reason } => session.fail_fetch(fetch_id, reason),
        }
    }

    fn reap_finished_workers(&self) {
        let finished: Vec<(FetchId, JoinHandle<()>)> = {
            let mut workers = lock_unpoisoned(&self.workers);
            let (done, live) = std::mem::take(&mut *workers)
                .into_iter()
                .partition(|(_, join_handle)| join_handle.is_finished());
            *workers = live;
            done
        };

        for (fetch_id, join_handle) in finished {
            if join_handle.join().is_err() {
                log::warn!("fetch worker {fetch_id} panicked");
            }
        }
    }

    /// Joins every outstanding worker, then applies whatever they produced.
    ///
    /// Used at teardown and in tests; after this call the event queue is
    /// empty and no worker threads remain.
    pub fn wait_idle(&self) -> usize {
        loop {
            let worker = {
                let mut workers = lock_unpoisoned(&self.workers);
                workers.pop()
            };

            match worker {
                Some((fetch_id, join_handle)) => {
                    if join_handle.join().is_err() {
                        log::warn!("fetch worker {fetch_id} panicked during join");
                    }
                }
                None => break,
            }
        }

        self.flush_pending_fetch_events()
    }
}

impl Drop for FetchCoordinator {
    fn drop(&mut self) {
        let workers = {
            let mut workers = lock_unpoisoned(&self.workers);
            std::mem::take(&mut *workers)
        };
        for (_, join_handle) in workers {
            let _ = join_handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use time::macros::datetime;

    use question_channel::{
        ExchangeRecord, QuestionChannel, QuestionRequest, QuestionResponse,
    };
    use question_channel_mock::{FailingChannel, MockChannel};

    use crate::assessment::{Assessment, Question};
    use crate::session::{SessionMode, SessionState};

    use super::FetchCoordinator;

    fn session() -> Arc<Mutex<SessionState>> {
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
        Arc::new(Mutex::new(state))
    }

    /// First fetch stalls until a later fetch has been dispatched, forcing
    /// the stale outcome to arrive after the newer one.
    struct StaggeredChannel {
        calls: Mutex<usize>,
    }

    impl StaggeredChannel {
        fn new() -> Self {
            Self {
                calls: Mutex::new(0),
            }
        }
    }

    impl QuestionChannel for StaggeredChannel {
        fn fetch(&self, request: QuestionRequest) -> Result<QuestionResponse, String> {
            let call = {
                let mut calls = self.calls.lock().expect("calls lock");
                *calls += 1;
                *calls
            };

            if call == 1 {
                thread::sleep(Duration::from_millis(150));
            }

            let question = format!("<question>question {call}</question>");
            Ok(QuestionResponse {
                ai_history: vec![ExchangeRecord {
                    input: request.current_user_message.content,
                    output: question.clone(),
                }],
                response: question,
            })
        }
    }

    #[test]
    fn resolved_fetch_updates_history_and_response() {
        let session = session();
        let coordinator = FetchCoordinator::new(Arc::clone(&session), Arc::new(MockChannel::default()));

        coordinator
            .request_question("my answer")
            .expect("fetch dispatched");
        coordinator.wait_idle();

        let state = session.lock().expect("session lock");
        assert!(!state.is_loading());
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.history()[0].input, "my answer");
        assert!(state
            .latest_response()
            .expect("response present")
            .contains("<question>"));
    }

    #[test]
    fn failed_fetch_surfaces_the_reason() {
        let session = session();
        let coordinator = FetchCoordinator::new(
            Arc::clone(&session),
            Arc::new(FailingChannel::new("backend unavailable")),
        );

        coordinator
            .request_question("my answer")
            .expect("fetch dispatched");
        coordinator.wait_idle();

        let state = session.lock().expect("session lock");
        assert!(!state.is_loading());
        assert_eq!(state.fetch_error(), Some("backend unavailable"));
    }

    #[test]
    fn newest_dispatch_wins_when_the_older_fetch_finishes_last() {
        let session = session();
        let coordinator =
            FetchCoordinator::new(Arc::clone(&session), Arc::new(StaggeredChannel::new()));

        coordinator
            .request_question("first answer")
            .expect("fetch dispatched");
        coordinator
            .request_question("revised answer")
            .expect("fetch dispatched");
        coordinator.wait_idle();

        let state = session.lock().expect("session lock");
        assert_eq!(
            state.latest_response(),
            Some("<question>question 2</question>")
        );
        assert_eq!(state.history()[0].input, "revised answer");
    }

    #[test]
    fn events_stay_buffered_until_flushed() {
        let session = session();
        let coordinator = FetchCoordinator::new(
            Arc::clone(&session),
            Arc::new(MockChannel::default().with_latency(Duration::from_millis(10))),
        );

        coordinator
            .request_question("my answer")
            .expect("fetch dispatched");

        {
            let state = session.lock().expect("session lock");
            assert!(state.is_loading());
            assert!(state.latest_response().is_none());
        }

        let drained = coordinator.wait_idle();
        assert_eq!(drained, 1);
        let state = session.lock().expect("session lock");
        assert!(state.latest_response().is_some());
    }

    #[test]
    fn dispatch_requires_an_interactive_session() {
        let session = {
            let assessment = Assessment::new(
                "a-1",
                "Review",
                "Reviewer",
                datetime!(2025-05-10 23:59:59 UTC),
                vec![Question::essay("q1", "Introduce yourself.")],
            );
            let mut state = SessionState::new();
            state
                .load_assessment(assessment, SessionMode::ViewOnly)
                .expect("assessment loads");
            Arc::new(Mutex::new(state))
        };
        let coordinator = FetchCoordinator::new(Arc::clone(&session), Arc::new(MockChannel::default()));

        assert!(coordinator.request_question("my answer").is_err());
        assert!(!session.lock().expect("session lock").is_loading());
    }
}
