//! Failure taxonomy for the harness.
//!
//! Four classes are kept distinct because they mean different things to a
//! test author:
//!
//! - **Protocol**: the SUT returned the wrong code for a call sequence.
//!   Always a hard failure, reported with a field-value dump of the request.
//! - **Timeout**: the bounded wait elapsed. May indicate a slow-but-conformant
//!   SUT or a genuine hang, so the elapsed duration and the last observed
//!   state are reported rather than a verdict.
//! - **CallOrder**: a handle was used out of its required
//!   acquire→wait→release order. Detected by the checker before the SUT is
//!   touched.
//! - **FatalSut**: the SUT's state is no longer trustworthy (handle
//!   invalidated, catastrophic failure); the current run aborts and is not
//!   retried.
//!
//! Harness usage errors (`Usage`) are programming mistakes in the calling
//! scenario, not SUT conformance failures, and say so in their message.

use crate::types::{LifecycleState, ResultCode};
use std::time::Duration;
use thiserror::Error;

/// A conformance check failure.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    /// The SUT returned the wrong result code for a call sequence.
    #[error("protocol violation at {step}: expected {expected}, got {actual}\n{dump}")]
    Protocol {
        /// Which battery step or operation observed the violation.
        step: String,
        /// The code the contract requires at this point.
        expected: ResultCode,
        /// The code the SUT actually returned.
        actual: ResultCode,
        /// Field-value rendering of the request/response at failure time.
        dump: String,
    },

    /// A bounded wait elapsed before the awaited condition held.
    #[error("timed out after {waited:?}; last observed: {last_observed}")]
    Timeout {
        /// How long the harness waited.
        waited: Duration,
        /// Last observed state or handle status, for distinguishing a slow
        /// SUT from a hung one.
        last_observed: String,
    },

    /// The driver observed a terminal state while waiting for a different
    /// target.
    #[error("entered terminal state {observed} while waiting for {target}")]
    UnexpectedTerminal {
        /// The terminal state the SUT entered.
        observed: LifecycleState,
        /// The state the caller was waiting for.
        target: LifecycleState,
    },

    /// A handle operation was issued out of its required order.
    #[error("call order invalid: {operation} on {subject} in state {state}")]
    CallOrder {
        /// The operation that was attempted.
        operation: &'static str,
        /// The handle or slot the operation targeted.
        subject: String,
        /// The lifecycle tag the entry was in.
        state: &'static str,
    },

    /// The endpoint reported zero results for every array set and the caller
    /// declared empty results invalid for this endpoint.
    #[error("endpoint returned no results: {detail}")]
    EmptyResults {
        /// Which endpoint and what was discovered.
        detail: String,
    },

    /// The SUT reported a fatal condition; the run aborts immediately.
    #[error("fatal SUT error {code} during {context}")]
    FatalSut {
        /// The fatal code the SUT returned.
        code: ResultCode,
        /// What the harness was doing when the SUT failed.
        context: String,
    },

    /// A programming error in the calling scenario.
    #[error("harness usage error: {0}")]
    Usage(String),
}

impl CheckError {
    /// Returns the result code this failure corresponds to at the SUT
    /// boundary, where one exists.
    #[must_use]
    pub fn classification(&self) -> Option<ResultCode> {
        match self {
            Self::Protocol { actual, .. } => Some(*actual),
            Self::Timeout { .. } => Some(ResultCode::TimeoutExpired),
            Self::CallOrder { .. } => Some(ResultCode::CallOrderInvalid),
            Self::FatalSut { code, .. } => Some(*code),
            Self::UnexpectedTerminal { .. } | Self::EmptyResults { .. } | Self::Usage(_) => None,
        }
    }

    /// Returns true for failures that abort the current run outright.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalSut { .. })
    }
}

/// Convenience alias used throughout the harness.
pub type CheckResult<T> = Result<T, CheckError>;
