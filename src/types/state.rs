//! Lifecycle states the SUT progresses through during normal operation.
//!
//! States are ordered by reachability: a conformant SUT only ever moves
//! forward through `Idle → Ready → Synchronized → Visible → Focused` and may
//! drop into one of the terminal states at any point. The driver fails fast
//! when a terminal state is observed while waiting for a different target.

use core::fmt;
use serde::{Deserialize, Serialize};

/// One value in the ordered set of coarse-grained session/frame states.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum LifecycleState {
    /// No state has been observed yet.
    #[default]
    Unknown = 0,
    /// The session exists but is not running.
    Idle = 1,
    /// The SUT is ready for the session to begin.
    Ready = 2,
    /// The session runs frame cycles but produces no visible output.
    Synchronized = 3,
    /// Output is visible but not receiving input.
    Visible = 4,
    /// Output is visible and receiving input.
    Focused = 5,
    /// The session is shutting down.
    Stopping = 6,
    /// The underlying instance is about to be lost.
    LossPending = 7,
    /// The SUT is exiting.
    Exiting = 8,
}

impl LifecycleState {
    /// Returns the state name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Idle => "IDLE",
            Self::Ready => "READY",
            Self::Synchronized => "SYNCHRONIZED",
            Self::Visible => "VISIBLE",
            Self::Focused => "FOCUSED",
            Self::Stopping => "STOPPING",
            Self::LossPending => "LOSS_PENDING",
            Self::Exiting => "EXITING",
        }
    }

    /// Returns true if the driver must not keep polling once this state is
    /// observed while a different target is awaited.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopping | Self::LossPending | Self::Exiting)
    }

    /// Returns true if the SUT requires one frame cycle per driver iteration
    /// in this state to ever promote past it.
    #[must_use]
    pub const fn requires_frame_cycle(self) -> bool {
        matches!(self, Self::Synchronized | Self::Visible | Self::Focused)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
