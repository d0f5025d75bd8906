//! Result codes recognized at the SUT boundary.
//!
//! Every SUT call returns one of these codes. The harness treats anything
//! outside the explicitly expected set for a given battery step as a
//! conformance failure; codes in the fatal class abort the current run
//! because the SUT's state is no longer trustworthy.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A result code returned by a SUT call.
///
/// `Failure` is the generic bucket for anything the harness does not model
/// explicitly; it carries the raw value for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// The call completed as requested.
    Success,
    /// A resource handle was used out of its required order.
    CallOrderInvalid,
    /// A supplied capacity was smaller than the required count.
    SizeInsufficient,
    /// A bounded wait elapsed without the awaited condition.
    TimeoutExpired,
    /// The handle passed to the call is no longer valid.
    HandleInvalid,
    /// The SUT rejected the call during validation.
    ValidationFailure,
    /// Any other error, carrying the raw value reported by the SUT.
    Failure(i32),
}

impl ResultCode {
    /// Returns the code name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::CallOrderInvalid => "CALL_ORDER_INVALID",
            Self::SizeInsufficient => "SIZE_INSUFFICIENT",
            Self::TimeoutExpired => "TIMEOUT_EXPIRED",
            Self::HandleInvalid => "HANDLE_INVALID",
            Self::ValidationFailure => "VALIDATION_FAILURE",
            Self::Failure(_) => "FAILURE",
        }
    }

    /// Returns true if the call completed as requested.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if this code means the SUT's state can no longer be
    /// trusted and the current battery or driver run must abort.
    ///
    /// `TimeoutExpired`, `CallOrderInvalid`, and `SizeInsufficient` are
    /// recoverable protocol outcomes; everything else non-success is fatal.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::HandleInvalid | Self::ValidationFailure | Self::Failure(_)
        )
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure(raw) => write!(f, "FAILURE({raw})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Outcome of a bounded wait that is not a conformance failure either way.
///
/// A timed-out wait leaves the waited resource in its pre-wait state; the
/// caller may retry the same wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaitOutcome {
    /// The awaited condition was observed within the timeout.
    Ready,
    /// The timeout elapsed first; the wait may be retried.
    TimedOut,
}

impl WaitOutcome {
    /// Returns true if the awaited condition was observed.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}
