//! Sutlab: deterministic black-box conformance lab for stateful,
//! handle-based native APIs.
//!
//! # Overview
//!
//! Sutlab drives an externally supplied, opaque implementation (the System
//! Under Test) through sequences of calls and verifies that observable
//! behavior — return codes, output counts, state transitions, handle
//! ordering — matches the contract. The SUT is never inspected internally;
//! it is a versioned contract the harness validates from the outside.
//!
//! # Core Guarantees
//!
//! - **Nothing silently swallowed**: every non-success result a battery step
//!   does not explicitly expect surfaces as a typed failure
//! - **Bounded waits**: every blocking SUT call is bounded by an explicit
//!   caller-supplied duration; the harness never blocks indefinitely
//! - **Fail fast on terminals**: a terminal lifecycle state observed while
//!   waiting for a different target aborts immediately instead of waiting
//!   out the timeout
//! - **Distinct failure classes**: protocol violations, timeouts, call-order
//!   breaks, fatal SUT errors, and harness usage mistakes are never conflated
//!
//! # Module Structure
//!
//! - [`types`]: result codes, lifecycle states, handles, countdown timers
//! - [`error`](mod@error): the failure taxonomy
//! - [`flagset`]: power-set generation over named bit flags
//! - [`twocall`]: the two-call-idiom oracle and its battery engine
//! - [`driver`]: the lifecycle state-machine driver
//! - [`handlepool`]: the handle-lifecycle protocol checker
//! - [`script`]: scripted SUT doubles for deterministic scenario tests
//!
//! Each checker is exclusively owned and driven by one test scenario at a
//! time; no component spawns threads or shares state.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod driver;
pub mod error;
pub mod flagset;
pub mod handlepool;
pub mod script;
pub mod twocall;
pub mod types;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_logging;

// Re-exports for convenient access to core types
pub use driver::{LifecycleDriver, LifecycleEvent, LifecycleSut, RunToReport};
pub use error::{CheckError, CheckResult};
pub use flagset::{FlagCombination, FlagSetGenerator, NamedFlag};
pub use handlepool::{
    EntrySnapshot, EntryState, HandleProtocolChecker, HandleSut, PoolMode,
};
pub use twocall::{
    ArrayFieldBinding, ArraySetSpec, BatteryConfig, BatteryReport, BatteryStep, DiscoveredSet,
    FieldArraySet, StepReport, TwoCallSpec, Verdict,
};
pub use types::{CountdownTimer, LifecycleState, ResultCode, SutHandle, WaitOutcome};
