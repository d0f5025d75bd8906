//! Handle-lifecycle protocol checker.
//!
//! Models a fixed pool of opaque resource handles whose contract is a strict
//! acquire→wait→release cycle, and validates both sides of it: the calling
//! scenario's ordering (checked before the SUT is touched, surfacing
//! [`CheckError::CallOrder`]) and the SUT's result codes for legal calls.
//!
//! # Invariants
//!
//! - Transitions are strictly `Free → Acquired → Waited → Free`; no step may
//!   be skipped.
//! - At most `pool_size` handles are simultaneously non-Free; a full pool
//!   rejects acquire rather than blocking.
//! - A timed-out wait leaves its handle Acquired; retrying the wait is legal.
//! - In static mode a slot goes through the cycle exactly once, ever:
//!   release retires it permanently.

use crate::error::{CheckError, CheckResult};
use crate::types::{ResultCode, SutHandle, WaitOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The SUT surface the checker consumes.
pub trait HandleSut {
    /// Acquires the next available handle. The hint names the pool slot the
    /// checker selected, for SUTs that expose indexed acquisition.
    fn acquire(&mut self, hint: Option<usize>) -> (ResultCode, SutHandle);

    /// Waits until the handle's resource is ready, bounded by `timeout`.
    fn wait(&mut self, handle: SutHandle, timeout: Duration) -> ResultCode;

    /// Releases a waited handle back to the SUT.
    fn release(&mut self, handle: SutHandle) -> ResultCode;
}

/// Allocation mode for the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolMode {
    /// Handles cycle acquire→wait→release indefinitely.
    Dynamic,
    /// Each slot may go through the cycle exactly once.
    Static,
}

/// Lifecycle tag of one pool entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryState {
    /// Available for acquisition.
    #[default]
    Free,
    /// Acquired, not yet waited.
    Acquired,
    /// Waited, ready for use, must be released.
    Waited,
    /// Permanently consumed (static mode only).
    Retired,
}

impl EntryState {
    /// Returns the tag name for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Acquired => "Acquired",
            Self::Waited => "Waited",
            Self::Retired => "Retired",
        }
    }
}

/// Diagnostic snapshot of one pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    /// Slot index in pool order.
    pub slot: usize,
    /// The handle currently bound to the slot, if any.
    pub handle: Option<SutHandle>,
    /// The slot's lifecycle tag.
    pub state: EntryState,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    handle: Option<SutHandle>,
    state: EntryState,
}

/// Order-validating checker over a [`HandleSut`] pool.
#[derive(Debug)]
pub struct HandleProtocolChecker<S> {
    sut: S,
    entries: Vec<Entry>,
    mode: PoolMode,
}

impl<S: HandleSut> HandleProtocolChecker<S> {
    /// Creates a checker over a pool of `pool_size` slots.
    pub fn new(sut: S, pool_size: usize, mode: PoolMode) -> CheckResult<Self> {
        if pool_size == 0 {
            return Err(CheckError::Usage("pool size must be nonzero".into()));
        }
        Ok(Self {
            sut,
            entries: vec![
                Entry {
                    handle: None,
                    state: EntryState::Free,
                };
                pool_size
            ],
            mode,
        })
    }

    /// Returns the pool size fixed at construction.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries currently Acquired or Waited.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.state, EntryState::Acquired | EntryState::Waited))
            .count()
    }

    /// Diagnostic snapshot of every slot, in pool order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.entries
            .iter()
            .enumerate()
            .map(|(slot, e)| EntrySnapshot {
                slot,
                handle: e.handle,
                state: e.state,
            })
            .collect()
    }

    /// Returns the wrapped SUT.
    pub fn sut_mut(&mut self) -> &mut S {
        &mut self.sut
    }

    /// Acquires the next Free slot in pool order.
    ///
    /// Fails with a call-order error when every slot is non-Free (the
    /// contract forbids blocking) or, in static mode, when the remaining
    /// Free slots were already retired.
    pub fn acquire(&mut self) -> CheckResult<SutHandle> {
        let slot = self
            .entries
            .iter()
            .position(|e| e.state == EntryState::Free)
            .ok_or_else(|| CheckError::CallOrder {
                operation: "acquire",
                subject: "pool".into(),
                state: "no Free entry",
            })?;
        self.acquire_slot(slot)
    }

    /// Acquires a specific pool slot.
    pub fn acquire_at(&mut self, slot: usize) -> CheckResult<SutHandle> {
        if slot >= self.entries.len() {
            return Err(CheckError::Usage(format!(
                "slot {slot} out of range for pool of {}",
                self.entries.len()
            )));
        }
        if self.entries[slot].state != EntryState::Free {
            return Err(CheckError::CallOrder {
                operation: "acquire",
                subject: format!("slot {slot}"),
                state: self.entries[slot].state.as_str(),
            });
        }
        self.acquire_slot(slot)
    }

    fn acquire_slot(&mut self, slot: usize) -> CheckResult<SutHandle> {
        let (code, handle) = self.sut.acquire(Some(slot));
        if !code.is_success() {
            return Err(self.sut_failure("acquire", slot, code));
        }
        if handle.is_null() {
            return Err(CheckError::Protocol {
                step: format!("acquire on slot {slot}"),
                expected: ResultCode::Success,
                actual: ResultCode::Success,
                dump: format!("SUT returned the null handle from a successful acquire\n{}", self.dump()),
            });
        }
        if self
            .entries
            .iter()
            .any(|e| e.handle == Some(handle) && e.state != EntryState::Free)
        {
            return Err(CheckError::Protocol {
                step: format!("acquire on slot {slot}"),
                expected: ResultCode::Success,
                actual: ResultCode::Success,
                dump: format!("SUT returned {handle} while it is already in flight\n{}", self.dump()),
            });
        }
        tracing::debug!(slot, %handle, "acquired");
        self.entries[slot].handle = Some(handle);
        self.entries[slot].state = EntryState::Acquired;
        Ok(handle)
    }

    /// Waits on an acquired handle, bounded by `timeout`.
    ///
    /// A SUT timeout is not a failure: the entry stays Acquired and the wait
    /// may be retried.
    pub fn wait(&mut self, handle: SutHandle, timeout: Duration) -> CheckResult<WaitOutcome> {
        let slot = self.slot_of(handle, "wait")?;
        if self.entries[slot].state != EntryState::Acquired {
            return Err(CheckError::CallOrder {
                operation: "wait",
                subject: handle.to_string(),
                state: self.entries[slot].state.as_str(),
            });
        }
        match self.sut.wait(handle, timeout) {
            ResultCode::Success => {
                tracing::debug!(slot, %handle, "waited");
                self.entries[slot].state = EntryState::Waited;
                Ok(WaitOutcome::Ready)
            }
            ResultCode::TimeoutExpired => {
                tracing::debug!(slot, %handle, "wait timed out; entry stays acquired");
                Ok(WaitOutcome::TimedOut)
            }
            code => Err(self.sut_failure("wait", slot, code)),
        }
    }

    /// Releases a waited handle.
    pub fn release(&mut self, handle: SutHandle) -> CheckResult<()> {
        let slot = self.slot_of(handle, "release")?;
        if self.entries[slot].state != EntryState::Waited {
            return Err(CheckError::CallOrder {
                operation: "release",
                subject: handle.to_string(),
                state: self.entries[slot].state.as_str(),
            });
        }
        let code = self.sut.release(handle);
        if !code.is_success() {
            return Err(self.sut_failure("release", slot, code));
        }
        match self.mode {
            PoolMode::Dynamic => {
                tracing::debug!(slot, %handle, "released");
                self.entries[slot].handle = None;
                self.entries[slot].state = EntryState::Free;
            }
            PoolMode::Static => {
                tracing::debug!(slot, %handle, "retired");
                self.entries[slot].state = EntryState::Retired;
            }
        }
        Ok(())
    }

    fn slot_of(&self, handle: SutHandle, operation: &'static str) -> CheckResult<usize> {
        self.entries
            .iter()
            .position(|e| e.handle == Some(handle))
            .ok_or_else(|| CheckError::CallOrder {
                operation,
                subject: handle.to_string(),
                state: "not in pool",
            })
    }

    fn sut_failure(&self, operation: &'static str, slot: usize, code: ResultCode) -> CheckError {
        if code.is_fatal() {
            CheckError::FatalSut {
                code,
                context: format!("{operation} on slot {slot}"),
            }
        } else {
            CheckError::Protocol {
                step: format!("{operation} on slot {slot}"),
                expected: ResultCode::Success,
                actual: code,
                dump: self.dump(),
            }
        }
    }

    fn dump(&self) -> String {
        self.snapshot()
            .iter()
            .map(|e| {
                format!(
                    "slot {}: {} {}",
                    e.slot,
                    e.state.as_str(),
                    e.handle.map_or_else(|| "-".to_owned(), |h| h.to_string()),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
