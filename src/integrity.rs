//! Focus/visibility integrity enforcement.
//!
//! Translates host focus signals into the session's terminal failure
//! transition and manages the exclusive presentation mode (fullscreen or the
//! host's equivalent) around the attempt.

use std::sync::{Arc, Mutex};

use crate::session::{lock_unpoisoned, SessionState};

/// Host-reported evidence that the candidate left the assessment surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSignal {
    WindowBlurred,
    PageHidden,
}

/// Exclusive presentation surface the host can put the assessment into.
///
/// Acquisition failure is tolerated: hosts may deny fullscreen, and the
/// session continues without it.
pub trait PresentationMode: Send {
    fn acquire(&mut self) -> Result<(), String>;
    fn release(&mut self);
}

/// Presentation mode for hosts with no exclusive surface.
#[derive(Debug, Default)]
pub struct NoopPresentation;

impl PresentationMode for NoopPresentation {
    fn acquire(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn release(&mut self) {}
}

pub struct IntegrityMonitor {
    session: Arc<Mutex<SessionState>>,
    presentation: Box<dyn PresentationMode>,
    watching: bool,
    holding: bool,
}

impl IntegrityMonitor {
    #[must_use]
    pub fn new(session: Arc<Mutex<SessionState>>, presentation: Box<dyn PresentationMode>) -> Self {
        Self {
            session,
            presentation,
            watching: false,
            holding: false,
        }
    }

    /// Begins watching focus signals and acquires the presentation mode.
    ///
    /// View-only sessions are never watched. A presentation acquisition
    /// failure is logged and the monitor keeps watching without it.
    pub fn start(&mut self) {
        let view_only = {
            let session = lock_unpoisoned(&self.session);
            session.is_view_only()
        };
        if view_only {
            self.watching = false;
            return;
        }

        self.watching = true;
        match self.presentation.acquire() {
            Ok(()) => self.holding = true,
            Err(reason) => {
                log::warn!("presentation mode unavailable: {reason}");
            }
        }
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watching
    }

    /// Handles a focus signal.
    ///
    /// Fails the session only when the monitor is watching and the session
    /// has armed itself through a first answer edit; signals before
    /// engagement, after failure, or after completion are ignored. Returns
    /// whether this signal caused the failure.
    pub fn on_signal(&mut self, signal: FocusSignal) -> bool {
        if !self.watching {
            return false;
        }

        let failed_now = {
            let mut session = lock_unpoisoned(&self.session);
            let integrity = session.integrity();
            if !integrity.armed || integrity.failed {
                false
            } else {
                log::info!("integrity violation: {signal:?}");
                session.mark_failed();
                true
            }
        };

        if failed_now {
            self.release_presentation();
        }
        failed_now
    }

    /// Stops watching and releases the presentation mode exactly once.
    pub fn shutdown(&mut self) {
        self.watching = false;
        self.release_presentation();
    }

    fn release_presentation(&mut self) {
        if self.holding {
            self.presentation.release();
            self.holding = false;
        }
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        self.release_presentation();
    }
}
