//! Scripted SUT doubles.
//!
//! Deterministic in-memory implementations of the SUT boundary traits, used
//! by the crate's own suites and reusable from downstream scenario tests.
//! Each double replays a programmed script and can inject one specific
//! misbehavior at a time, so a test proves the harness catches exactly the
//! break it intends to.

use crate::driver::{LifecycleEvent, LifecycleSut};
use crate::handlepool::HandleSut;
use crate::twocall::{ArrayFieldBinding, FieldArraySet, TwoCallSpec};
use crate::types::{LifecycleState, ResultCode, SutHandle};
use std::collections::VecDeque;
use std::time::Duration;

/// Replays a programmed tape of lifecycle transitions, one per poll.
#[derive(Debug, Default)]
pub struct ScriptedLifecycleSut {
    tape: VecDeque<LifecycleEvent>,
    poll_failure: Option<ResultCode>,
    begin_failure: Option<ResultCode>,
    begin_calls: u64,
    frame_calls: u64,
}

impl ScriptedLifecycleSut {
    /// Creates a tape that yields one `StateChanged` event per poll, in
    /// order, then reports no event available.
    #[must_use]
    pub fn with_transitions(states: &[LifecycleState]) -> Self {
        Self {
            tape: states
                .iter()
                .map(|&s| LifecycleEvent::StateChanged(s))
                .collect(),
            ..Self::default()
        }
    }

    /// Appends a transition to the tape.
    pub fn push_transition(&mut self, state: LifecycleState) {
        self.tape.push_back(LifecycleEvent::StateChanged(state));
    }

    /// Appends an event the driver should ignore.
    pub fn push_ignored_event(&mut self) {
        self.tape.push_back(LifecycleEvent::Other);
    }

    /// Makes every subsequent poll return `code` with no event.
    pub fn fail_polls_with(&mut self, code: ResultCode) {
        self.poll_failure = Some(code);
    }

    /// Makes the next begin call return `code`.
    pub fn fail_begin_with(&mut self, code: ResultCode) {
        self.begin_failure = Some(code);
    }

    /// Number of begin calls observed.
    #[must_use]
    pub fn begin_calls(&self) -> u64 {
        self.begin_calls
    }

    /// Number of frame cycles observed.
    #[must_use]
    pub fn frame_calls(&self) -> u64 {
        self.frame_calls
    }
}

impl LifecycleSut for ScriptedLifecycleSut {
    fn poll_event(&mut self) -> (ResultCode, Option<LifecycleEvent>) {
        if let Some(code) = self.poll_failure {
            return (code, None);
        }
        (ResultCode::Success, self.tape.pop_front())
    }

    fn begin(&mut self) -> ResultCode {
        self.begin_calls += 1;
        self.begin_failure.take().unwrap_or(ResultCode::Success)
    }

    fn submit_frame_cycle(&mut self) -> ResultCode {
        self.frame_calls += 1;
        ResultCode::Success
    }
}

/// Conformant handle pool with programmable wait outcomes and injectable
/// wrong codes.
///
/// Handles are served from a free list, so a released raw value may be handed
/// out again but a value in flight never is.
#[derive(Debug)]
pub struct ScriptedHandleSut {
    free: VecDeque<u64>,
    pending_timeouts: u32,
    wait_failure: Option<ResultCode>,
    acquire_failure: Option<ResultCode>,
    release_failure: Option<ResultCode>,
    null_on_acquire: bool,
    acquire_calls: u64,
    wait_calls: u64,
    release_calls: u64,
}

impl ScriptedHandleSut {
    /// Creates a pool double of the given size.
    #[must_use]
    pub fn new(pool_size: usize) -> Self {
        Self {
            free: (1..=pool_size as u64).collect(),
            pending_timeouts: 0,
            wait_failure: None,
            acquire_failure: None,
            release_failure: None,
            null_on_acquire: false,
            acquire_calls: 0,
            wait_calls: 0,
            release_calls: 0,
        }
    }

    /// Makes the next `n` waits time out before succeeding.
    pub fn time_out_next_waits(&mut self, n: u32) {
        self.pending_timeouts = n;
    }

    /// Makes the next wait return `code` once.
    pub fn fail_next_wait_with(&mut self, code: ResultCode) {
        self.wait_failure = Some(code);
    }

    /// Makes the next acquire return `code` once.
    pub fn fail_next_acquire_with(&mut self, code: ResultCode) {
        self.acquire_failure = Some(code);
    }

    /// Makes the next release return `code` once.
    pub fn fail_next_release_with(&mut self, code: ResultCode) {
        self.release_failure = Some(code);
    }

    /// Makes the next acquire report Success with the null handle.
    pub fn return_null_on_acquire(&mut self) {
        self.null_on_acquire = true;
    }

    /// Number of acquire calls observed.
    #[must_use]
    pub fn acquire_calls(&self) -> u64 {
        self.acquire_calls
    }

    /// Number of wait calls observed.
    #[must_use]
    pub fn wait_calls(&self) -> u64 {
        self.wait_calls
    }

    /// Number of release calls observed.
    #[must_use]
    pub fn release_calls(&self) -> u64 {
        self.release_calls
    }
}

impl HandleSut for ScriptedHandleSut {
    fn acquire(&mut self, _hint: Option<usize>) -> (ResultCode, SutHandle) {
        self.acquire_calls += 1;
        if let Some(code) = self.acquire_failure.take() {
            return (code, SutHandle::NULL);
        }
        if self.null_on_acquire {
            self.null_on_acquire = false;
            return (ResultCode::Success, SutHandle::NULL);
        }
        match self.free.pop_front() {
            Some(raw) => (ResultCode::Success, SutHandle::from_raw(raw)),
            None => (ResultCode::CallOrderInvalid, SutHandle::NULL),
        }
    }

    fn wait(&mut self, _handle: SutHandle, _timeout: Duration) -> ResultCode {
        self.wait_calls += 1;
        if let Some(code) = self.wait_failure.take() {
            return code;
        }
        if self.pending_timeouts > 0 {
            self.pending_timeouts -= 1;
            return ResultCode::TimeoutExpired;
        }
        ResultCode::Success
    }

    fn release(&mut self, handle: SutHandle) -> ResultCode {
        self.release_calls += 1;
        if let Some(code) = self.release_failure.take() {
            return code;
        }
        self.free.push_back(handle.as_raw());
        ResultCode::Success
    }
}

/// Which array set of [`VecEndpoint`] a misbehavior targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSet {
    /// The formats set.
    Formats,
    /// The modes set.
    Modes,
}

/// One deliberate contract break for [`VecEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMisbehavior {
    /// Report Success even when the targeted set's capacity is below its
    /// count.
    AcceptInsufficient(EndpointSet),
    /// Report a different count on every call after the first.
    CountDrift,
    /// Ignore zero-capacity precedence: report SizeInsufficient for another
    /// set's under-allocation even when the targeted set's capacity is zero.
    ZeroOverrideBroken,
    /// Reject the pure count query (all capacities zero).
    RejectCountQuery,
}

/// Request/response structure for the in-memory enumeration endpoint:
/// two independent array sets sharing nothing.
#[derive(Debug, Clone, Default)]
pub struct EnumerationRequest {
    /// Capacity input for the formats set.
    pub format_capacity: u32,
    /// Count output for the formats set.
    pub format_count: u32,
    /// Output array bound to the formats set.
    pub formats: Option<Vec<i64>>,
    /// Capacity input for the modes set.
    pub mode_capacity: u32,
    /// Count output for the modes set.
    pub mode_count: u32,
    /// Output array bound to the modes set.
    pub modes: Option<Vec<u32>>,
}

/// In-memory two-call endpoint over owned vectors.
///
/// Conformant unless exactly one [`EndpointMisbehavior`] is injected.
#[derive(Debug, Clone, Default)]
pub struct VecEndpoint {
    /// Elements served through the formats set.
    pub formats: Vec<i64>,
    /// Elements served through the modes set.
    pub modes: Vec<u32>,
    misbehavior: Option<EndpointMisbehavior>,
    calls: u64,
}

impl VecEndpoint {
    /// Creates a conformant endpoint over the given data.
    #[must_use]
    pub fn new(formats: Vec<i64>, modes: Vec<u32>) -> Self {
        Self {
            formats,
            modes,
            misbehavior: None,
            calls: 0,
        }
    }

    /// Injects one contract break.
    #[must_use]
    pub fn with_misbehavior(mut self, misbehavior: EndpointMisbehavior) -> Self {
        self.misbehavior = Some(misbehavior);
        self
    }

    /// Builds the two-set spec matching [`EnumerationRequest`].
    #[must_use]
    pub fn spec() -> TwoCallSpec<EnumerationRequest> {
        TwoCallSpec::new(EnumerationRequest::default())
            .with_set(
                FieldArraySet::new(
                    "formats",
                    |r: &EnumerationRequest| r.format_capacity,
                    |r: &mut EnumerationRequest, c| r.format_capacity = c,
                    |r: &EnumerationRequest| r.format_count,
                )
                .with_array(ArrayFieldBinding::new(
                    "formats",
                    |r: &mut EnumerationRequest, len| r.formats = Some(vec![-1; len]),
                    |r: &mut EnumerationRequest| r.formats = None,
                    |r: &EnumerationRequest| r.formats.as_ref().map_or(0, Vec::len),
                )),
            )
            .with_set(
                FieldArraySet::new(
                    "modes",
                    |r: &EnumerationRequest| r.mode_capacity,
                    |r: &mut EnumerationRequest, c| r.mode_capacity = c,
                    |r: &EnumerationRequest| r.mode_count,
                )
                .with_array(ArrayFieldBinding::new(
                    "modes",
                    |r: &mut EnumerationRequest, len| r.modes = Some(vec![u32::MAX; len]),
                    |r: &mut EnumerationRequest| r.modes = None,
                    |r: &EnumerationRequest| r.modes.as_ref().map_or(0, Vec::len),
                )),
            )
    }

    /// Serves one call of the two-call contract.
    pub fn call(&mut self, request: &mut EnumerationRequest) -> ResultCode {
        self.calls += 1;

        let mut format_count = self.formats.len() as u32;
        let mut mode_count = self.modes.len() as u32;
        if self.misbehavior == Some(EndpointMisbehavior::CountDrift) && self.calls > 1 {
            format_count = format_count.saturating_sub(1);
            mode_count = mode_count.saturating_sub(1);
        }
        request.format_count = format_count;
        request.mode_count = mode_count;

        let pure_query = request.format_capacity == 0 && request.mode_capacity == 0;
        if pure_query {
            if self.misbehavior == Some(EndpointMisbehavior::RejectCountQuery) {
                return ResultCode::ValidationFailure;
            }
            return ResultCode::Success;
        }

        // Zero capacity on either set takes precedence over insufficiency on
        // the other.
        let any_zero = request.format_capacity == 0 || request.mode_capacity == 0;
        let honor_zero_precedence =
            self.misbehavior != Some(EndpointMisbehavior::ZeroOverrideBroken);

        let formats_short = request.format_capacity > 0 && request.format_capacity < format_count;
        let modes_short = request.mode_capacity > 0 && request.mode_capacity < mode_count;
        let accept_formats_short =
            self.misbehavior == Some(EndpointMisbehavior::AcceptInsufficient(EndpointSet::Formats));
        let accept_modes_short =
            self.misbehavior == Some(EndpointMisbehavior::AcceptInsufficient(EndpointSet::Modes));

        if !(any_zero && honor_zero_precedence) {
            if (formats_short && !accept_formats_short) || (modes_short && !accept_modes_short) {
                return ResultCode::SizeInsufficient;
            }
        }

        if request.format_capacity >= format_count {
            if let Some(formats) = request.formats.as_mut() {
                for (i, slot) in formats
                    .iter_mut()
                    .take(format_count as usize)
                    .enumerate()
                {
                    *slot = i as i64 + 100;
                }
            }
        }
        if request.mode_capacity >= mode_count {
            if let Some(modes) = request.modes.as_mut() {
                for (i, slot) in modes.iter_mut().take(mode_count as usize).enumerate() {
                    *slot = i as u32 + 1;
                }
            }
        }
        ResultCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_tape_drains_in_order() {
        let mut sut = ScriptedLifecycleSut::with_transitions(&[
            LifecycleState::Idle,
            LifecycleState::Ready,
        ]);
        let (code, event) = sut.poll_event();
        assert_eq!(code, ResultCode::Success);
        assert_eq!(
            event,
            Some(LifecycleEvent::StateChanged(LifecycleState::Idle))
        );
        let (_, event) = sut.poll_event();
        assert_eq!(
            event,
            Some(LifecycleEvent::StateChanged(LifecycleState::Ready))
        );
        let (code, event) = sut.poll_event();
        assert_eq!(code, ResultCode::Success);
        assert_eq!(event, None);
    }

    #[test]
    fn handle_double_cycles_raw_values_within_pool() {
        let mut sut = ScriptedHandleSut::new(2);
        let (_, h1) = sut.acquire(None);
        let (_, h2) = sut.acquire(None);
        assert_ne!(h1, h2);
        assert!(!h1.is_null());
        assert!(!h2.is_null());
    }

    #[test]
    fn endpoint_pure_query_reports_counts() {
        let mut endpoint = VecEndpoint::new(vec![1, 2, 3], vec![7]);
        let mut request = EnumerationRequest::default();
        let code = endpoint.call(&mut request);
        assert_eq!(code, ResultCode::Success);
        assert_eq!(request.format_count, 3);
        assert_eq!(request.mode_count, 1);
    }

    #[test]
    fn endpoint_reports_insufficient_capacity() {
        let mut endpoint = VecEndpoint::new(vec![1, 2, 3], vec![7]);
        let mut request = EnumerationRequest {
            format_capacity: 2,
            formats: Some(vec![-1; 2]),
            mode_capacity: 1,
            modes: Some(vec![u32::MAX; 1]),
            ..EnumerationRequest::default()
        };
        assert_eq!(endpoint.call(&mut request), ResultCode::SizeInsufficient);
    }

    #[test]
    fn endpoint_zero_capacity_overrides_insufficiency() {
        let mut endpoint = VecEndpoint::new(vec![1, 2, 3], vec![7, 8]);
        let mut request = EnumerationRequest {
            format_capacity: 0,
            formats: None,
            mode_capacity: 1, // under-allocated
            modes: Some(vec![u32::MAX; 1]),
            ..EnumerationRequest::default()
        };
        assert_eq!(endpoint.call(&mut request), ResultCode::Success);
    }

    #[test]
    fn endpoint_fills_exactly_allocated_arrays() {
        let mut endpoint = VecEndpoint::new(vec![1, 2], vec![7]);
        let mut request = EnumerationRequest {
            format_capacity: 2,
            formats: Some(vec![-1; 2]),
            mode_capacity: 1,
            modes: Some(vec![u32::MAX; 1]),
            ..EnumerationRequest::default()
        };
        assert_eq!(endpoint.call(&mut request), ResultCode::Success);
        assert_eq!(request.formats.as_deref(), Some(&[100, 101][..]));
        assert_eq!(request.modes.as_deref(), Some(&[1][..]));
    }
}
