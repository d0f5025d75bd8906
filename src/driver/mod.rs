//! Lifecycle state-machine driver.
//!
//! The SUT promotes through its session states on its own schedule; the
//! harness can only poll events and perform the per-state actions the
//! contract demands. This driver owns that loop: it advances the observed
//! state from polled events, issues the mandatory actions (a single `begin`
//! on the observed Ready transition, one frame cycle per iteration in the
//! frame states), and bounds the whole wait with a [`CountdownTimer`].
//!
//! Terminal states reached while waiting for a different target fail
//! immediately; looping on a session that is already stopping only hides the
//! failure until the timeout.

use crate::error::{CheckError, CheckResult};
use crate::types::{CountdownTimer, LifecycleState, ResultCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An event record polled from the SUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The session moved to a new lifecycle state.
    StateChanged(LifecycleState),
    /// Any event the driver does not act on (input, reference-space change).
    Other,
}

/// The SUT surface the driver consumes.
///
/// `poll_event` must be non-blocking: `(Success, None)` means no event is
/// available, which is not an error and simply continues the loop.
pub trait LifecycleSut {
    /// Polls one event, if any is pending.
    fn poll_event(&mut self) -> (ResultCode, Option<LifecycleEvent>);

    /// Acknowledges the Ready transition by beginning the session.
    fn begin(&mut self) -> ResultCode;

    /// Submits one frame cycle; required each iteration in the frame states
    /// for the SUT to ever promote past them.
    fn submit_frame_cycle(&mut self) -> ResultCode;
}

/// Record of one `run_to` drive, for diagnostics and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunToReport {
    /// State when the drive started.
    pub initial: LifecycleState,
    /// State when the drive ended.
    pub reached: LifecycleState,
    /// Poll calls issued.
    pub polls: u64,
    /// Events observed (of any kind).
    pub events_observed: u64,
    /// Frame cycles submitted.
    pub frames_submitted: u64,
    /// Whether the begin action fired during this drive.
    pub begin_issued: bool,
}

/// Drives a [`LifecycleSut`] toward target states.
///
/// The driver remembers the observed state and whether `begin` has been
/// issued across `run_to` calls, so a scenario can chain drives
/// (`run_to(Ready)`, then `run_to(Focused)`) without duplicate begins.
#[derive(Debug)]
pub struct LifecycleDriver<S> {
    sut: S,
    current: LifecycleState,
    begin_issued: bool,
}

impl<S: LifecycleSut> LifecycleDriver<S> {
    /// Creates a driver with no state observed yet.
    #[must_use]
    pub fn new(sut: S) -> Self {
        Self {
            sut,
            current: LifecycleState::Unknown,
            begin_issued: false,
        }
    }

    /// Returns the last observed state.
    #[must_use]
    pub fn current(&self) -> LifecycleState {
        self.current
    }

    /// Returns the wrapped SUT.
    pub fn sut_mut(&mut self) -> &mut S {
        &mut self.sut
    }

    /// Consumes the driver, returning the SUT.
    pub fn into_sut(self) -> S {
        self.sut
    }

    /// Polls events and performs mandatory actions until the SUT reaches
    /// `target`, a terminal state intervenes, or `timeout` expires.
    pub fn run_to(
        &mut self,
        target: LifecycleState,
        timeout: Duration,
    ) -> CheckResult<RunToReport> {
        let initial = self.current;
        let mut report = RunToReport {
            initial,
            reached: initial,
            polls: 0,
            events_observed: 0,
            frames_submitted: 0,
            begin_issued: false,
        };
        let timer = CountdownTimer::start(timeout);

        loop {
            // (a) Poll one event; no event available is not an error.
            let (code, event) = self.sut.poll_event();
            report.polls += 1;
            match code {
                ResultCode::Success => {}
                fatal if fatal.is_fatal() => {
                    return Err(CheckError::FatalSut {
                        code: fatal,
                        context: format!("polling events while driving to {target}"),
                    });
                }
                unexpected => {
                    return Err(CheckError::Protocol {
                        step: format!("event poll while driving to {target}"),
                        expected: ResultCode::Success,
                        actual: unexpected,
                        dump: format!("current state: {}", self.current),
                    });
                }
            }

            // (b) Update on an observed lifecycle change.
            let mut observed_transition = None;
            if let Some(event) = event {
                report.events_observed += 1;
                if let LifecycleEvent::StateChanged(state) = event {
                    tracing::debug!(from = %self.current, to = %state, "lifecycle transition");
                    self.current = state;
                    observed_transition = Some(state);
                }
            }
            report.reached = self.current;

            // (c) Success as soon as the target is observed.
            if self.current == target {
                report.begin_issued = self.begin_issued;
                return Ok(report);
            }

            // (d) A terminal state while waiting for something else fails
            // immediately rather than waiting out the timeout.
            if self.current.is_terminal() {
                return Err(CheckError::UnexpectedTerminal {
                    observed: self.current,
                    target,
                });
            }

            // (e) Mandatory per-state actions. Begin fires only on the
            // observed Ready transition, never on re-discovering Ready.
            if observed_transition == Some(LifecycleState::Ready) && !self.begin_issued {
                let code = self.sut.begin();
                self.expect_action(code, "begin")?;
                self.begin_issued = true;
                report.begin_issued = true;
            }
            if self.current.requires_frame_cycle() {
                let code = self.sut.submit_frame_cycle();
                self.expect_action(code, "frame cycle")?;
                report.frames_submitted += 1;
            }

            // (f) Bounded by the countdown.
            if timer.is_expired() {
                let last_observed = if self.current == initial {
                    format!("never transitioned from {initial}")
                } else {
                    format!("stalled at {} after starting from {initial}", self.current)
                };
                return Err(CheckError::Timeout {
                    waited: timer.elapsed(),
                    last_observed,
                });
            }
        }
    }

    fn expect_action(&self, code: ResultCode, action: &'static str) -> CheckResult<()> {
        if code.is_success() {
            return Ok(());
        }
        if code.is_fatal() {
            return Err(CheckError::FatalSut {
                code,
                context: format!("{action} in state {}", self.current),
            });
        }
        Err(CheckError::Protocol {
            step: format!("{action} in state {}", self.current),
            expected: ResultCode::Success,
            actual: code,
            dump: format!("current state: {}", self.current),
        })
    }
}
