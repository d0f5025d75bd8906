//! Two-call-idiom oracle.
//!
//! Enumeration-style endpoints follow a common pattern: call once with zero
//! capacity to discover a required count, then call again with storage sized
//! to that count. This module validates any such endpoint, including
//! multi-array endpoints where several output arrays share one
//! capacity/count pair (an *array set*).
//!
//! # Invariants checked
//!
//! For discovered counts C₁..Cₙ across N independent array sets:
//!
//! - A pure count query (all capacities zero) returns `SUCCESS`.
//! - An exactly-sized call returns `SUCCESS` with stable counts.
//! - Reducing only set k's capacity to Cₖ−1 (Cₖ > 1) returns
//!   `SIZE_INSUFFICIENT`, for every k independently, so no set's check can
//!   mask another's bug.
//! - Setting set k's capacity to zero returns `SUCCESS` even when every
//!   other set is under-allocated: zero-capacity semantics take precedence
//!   over size-insufficiency on unrelated sets.
//!
//! The invocation closure must be idempotent for retried calls with the same
//! capacities and must leave output arrays untouched when it reports an
//! error. The engine validates return codes and counts only; array content
//! validity belongs to the calling scenario.

use crate::error::{CheckError, CheckResult};
use crate::types::ResultCode;
use core::fmt;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One capacity/count pair and the arrays bound to it, attached to a request
/// structure of type `Req`.
///
/// Implementations are runtime trait objects rather than compile-time field
/// tuples; the operation set is small and fixed, and a
/// [`TwoCallSpec`] is simply an ordered list of these.
pub trait ArraySetSpec<Req> {
    /// Diagnostic label for this set.
    fn label(&self) -> &'static str;

    /// Reads the capacity-input field.
    fn capacity(&self, request: &Req) -> u32;

    /// Writes the capacity-input field.
    fn set_capacity(&self, request: &mut Req, capacity: u32);

    /// Reads the count-output field.
    fn count(&self, request: &Req) -> u32;

    /// Resizes and binds every array in the set to `len` elements,
    /// pre-filled with the set's empty sentinel.
    ///
    /// All arrays sharing this capacity/count pair are resized identically.
    fn resize(&self, request: &mut Req, len: u32);

    /// Unbinds (nulls) every array in the set, as a zero-capacity call
    /// requires.
    fn detach(&self, request: &mut Req);

    /// Renders the set's fields for a failure dump: values, never addresses.
    fn describe(&self, request: &Req) -> String;
}

/// One array-typed field of a response structure.
///
/// Closure-backed so a scenario can bind any storage shape; the harness never
/// sees the element type.
pub struct ArrayFieldBinding<Req> {
    name: &'static str,
    resize: Box<dyn Fn(&mut Req, usize)>,
    detach: Box<dyn Fn(&mut Req)>,
    len: Box<dyn Fn(&Req) -> usize>,
}

impl<Req> ArrayFieldBinding<Req> {
    /// Creates a binding from its three accessors: resize-and-sentinel-fill,
    /// unbind, and current length.
    #[must_use]
    pub fn new(
        name: &'static str,
        resize: impl Fn(&mut Req, usize) + 'static,
        detach: impl Fn(&mut Req) + 'static,
        len: impl Fn(&Req) -> usize + 'static,
    ) -> Self {
        Self {
            name,
            resize: Box::new(resize),
            detach: Box::new(detach),
            len: Box::new(len),
        }
    }
}

impl<Req> fmt::Debug for ArrayFieldBinding<Req> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayFieldBinding")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Closure-backed [`ArraySetSpec`] implementation binding one capacity/count
/// pair to one or more array fields.
pub struct FieldArraySet<Req> {
    label: &'static str,
    get_capacity: Box<dyn Fn(&Req) -> u32>,
    put_capacity: Box<dyn Fn(&mut Req, u32)>,
    get_count: Box<dyn Fn(&Req) -> u32>,
    arrays: Vec<ArrayFieldBinding<Req>>,
}

impl<Req> FieldArraySet<Req> {
    /// Creates an array set from its capacity/count accessors.
    #[must_use]
    pub fn new(
        label: &'static str,
        get_capacity: impl Fn(&Req) -> u32 + 'static,
        put_capacity: impl Fn(&mut Req, u32) + 'static,
        get_count: impl Fn(&Req) -> u32 + 'static,
    ) -> Self {
        Self {
            label,
            get_capacity: Box::new(get_capacity),
            put_capacity: Box::new(put_capacity),
            get_count: Box::new(get_count),
            arrays: Vec::new(),
        }
    }

    /// Adds an array field sharing this set's capacity/count pair.
    #[must_use]
    pub fn with_array(mut self, array: ArrayFieldBinding<Req>) -> Self {
        self.arrays.push(array);
        self
    }
}

impl<Req> fmt::Debug for FieldArraySet<Req> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldArraySet")
            .field("label", &self.label)
            .field("arrays", &self.arrays)
            .finish_non_exhaustive()
    }
}

impl<Req> ArraySetSpec<Req> for FieldArraySet<Req> {
    fn label(&self) -> &'static str {
        self.label
    }

    fn capacity(&self, request: &Req) -> u32 {
        (self.get_capacity)(request)
    }

    fn set_capacity(&self, request: &mut Req, capacity: u32) {
        (self.put_capacity)(request, capacity);
    }

    fn count(&self, request: &Req) -> u32 {
        (self.get_count)(request)
    }

    fn resize(&self, request: &mut Req, len: u32) {
        for array in &self.arrays {
            (array.resize)(request, len as usize);
        }
    }

    fn detach(&self, request: &mut Req) {
        for array in &self.arrays {
            (array.detach)(request);
        }
    }

    fn describe(&self, request: &Req) -> String {
        let mut out = format!(
            "set {}: capacity={} count={}",
            self.label,
            (self.get_capacity)(request),
            (self.get_count)(request),
        );
        for array in &self.arrays {
            out.push_str(&format!(" {}[len={}]", array.name, (array.len)(request)));
        }
        out
    }
}

/// A default request instance plus the ordered list of array sets the
/// endpoint populates.
pub struct TwoCallSpec<Req> {
    request: Req,
    sets: SmallVec<[Box<dyn ArraySetSpec<Req>>; 4]>,
}

impl<Req> TwoCallSpec<Req> {
    /// Creates a spec around an empty/default request instance.
    #[must_use]
    pub fn new(request: Req) -> Self {
        Self {
            request,
            sets: SmallVec::new(),
        }
    }

    /// Adds an array set. At least one is required before running a battery.
    #[must_use]
    pub fn with_set(mut self, set: impl ArraySetSpec<Req> + 'static) -> Self {
        self.sets.push(Box::new(set));
        self
    }

    /// Number of array sets attached.
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Renders every set's fields for a failure dump.
    #[must_use]
    pub fn dump(&self) -> String {
        self.sets
            .iter()
            .map(|set| set.describe(&self.request))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Runs the full conformance battery against the invocation closure.
    ///
    /// Fails fast on the first violation; the returned report records every
    /// step executed up to that point on success, including warnings and
    /// inconclusive steps.
    pub fn run_battery<F>(&mut self, config: &BatteryConfig, mut call: F) -> CheckResult<BatteryReport>
    where
        F: FnMut(&mut Req) -> ResultCode,
    {
        if self.sets.is_empty() {
            return Err(CheckError::Usage(
                "TwoCallSpec requires at least one array set".into(),
            ));
        }

        let mut report = BatteryReport::default();

        // Step 1: count discovery with every capacity zero.
        for set in &self.sets {
            set.set_capacity(&mut self.request, 0);
            set.detach(&mut self.request);
        }
        let code = call(&mut self.request);
        tracing::debug!(step = %BatteryStep::CountDiscovery, %code, "battery call");
        self.expect(BatteryStep::CountDiscovery, ResultCode::Success, code)?;

        let counts: Vec<u32> = self
            .sets
            .iter()
            .map(|set| set.count(&self.request))
            .collect();
        for (set, &count) in self.sets.iter().zip(&counts) {
            report.discovered.push(DiscoveredSet {
                label: set.label().to_owned(),
                count,
            });
        }

        if counts.iter().all(|&c| c == 0) {
            if config.empty_counts_fatal {
                return Err(CheckError::EmptyResults {
                    detail: self.dump(),
                });
            }
            tracing::warn!("every discovered count is zero; battery cannot be exercised");
            report.push(
                BatteryStep::CountDiscovery,
                ResultCode::Success,
                Verdict::Warning,
                "all discovered counts are zero; remaining battery skipped",
            );
            return Ok(report);
        }
        report.push(
            BatteryStep::CountDiscovery,
            ResultCode::Success,
            Verdict::Passed,
            "",
        );

        // Step 2: exact allocation for every set.
        self.allocate_exact(&counts);
        let code = call(&mut self.request);
        tracing::debug!(step = %BatteryStep::ExactAllocation, %code, "battery call");
        self.expect(BatteryStep::ExactAllocation, ResultCode::Success, code)?;
        for (set, &count) in self.sets.iter().zip(&counts) {
            let now = set.count(&self.request);
            if now != count {
                return Err(CheckError::Protocol {
                    step: format!("{} ({})", BatteryStep::ExactAllocation, set.label()),
                    expected: ResultCode::Success,
                    actual: ResultCode::Success,
                    dump: format!(
                        "count drifted between calls: discovered {count}, now {now}\n{}",
                        self.dump()
                    ),
                });
            }
        }
        report.push(
            BatteryStep::ExactAllocation,
            ResultCode::Success,
            Verdict::Passed,
            "",
        );

        // Step 3: insufficient capacity, independently per set, others exact.
        for k in 0..self.sets.len() {
            let step = BatteryStep::InsufficientCapacity {
                set: self.sets[k].label().to_owned(),
            };
            if counts[k] <= 1 {
                report.push(
                    step,
                    ResultCode::Success,
                    Verdict::Inconclusive,
                    "discovered count <= 1; capacity cannot be reduced below the count",
                );
                continue;
            }
            self.sets[k].set_capacity(&mut self.request, counts[k] - 1);
            self.sets[k].resize(&mut self.request, counts[k] - 1);
            let code = call(&mut self.request);
            tracing::debug!(step = %step, %code, "battery call");
            self.expect(step.clone(), ResultCode::SizeInsufficient, code)?;
            // Restore before the next set is probed.
            self.sets[k].set_capacity(&mut self.request, counts[k]);
            self.sets[k].resize(&mut self.request, counts[k]);
            report.push(step, ResultCode::SizeInsufficient, Verdict::Passed, "");
        }

        // Step 4: a zero capacity on one set overrides insufficiency
        // elsewhere. Sub-case (a): all other sets exact. Sub-case (b): all
        // other sets under-allocated by one.
        for k in 0..self.sets.len() {
            if counts[k] == 0 {
                continue;
            }

            let step = BatteryStep::ZeroCapacityOthersExact {
                set: self.sets[k].label().to_owned(),
            };
            self.sets[k].set_capacity(&mut self.request, 0);
            self.sets[k].detach(&mut self.request);
            let code = call(&mut self.request);
            tracing::debug!(step = %step, %code, "battery call");
            self.expect(step.clone(), ResultCode::Success, code)?;
            report.push(step, ResultCode::Success, Verdict::Passed, "");

            let step = BatteryStep::ZeroCapacityOthersUnderAllocated {
                set: self.sets[k].label().to_owned(),
            };
            for j in 0..self.sets.len() {
                if j != k && counts[j] > 1 {
                    self.sets[j].set_capacity(&mut self.request, counts[j] - 1);
                    self.sets[j].resize(&mut self.request, counts[j] - 1);
                }
            }
            let code = call(&mut self.request);
            tracing::debug!(step = %step, %code, "battery call");
            self.expect(step.clone(), ResultCode::Success, code)?;
            report.push(step, ResultCode::Success, Verdict::Passed, "");

            // Restore everything to exact for the next set's probe.
            self.allocate_exact(&counts);
        }

        Ok(report)
    }

    fn allocate_exact(&mut self, counts: &[u32]) {
        for (set, &count) in self.sets.iter().zip(counts) {
            set.set_capacity(&mut self.request, count);
            set.resize(&mut self.request, count);
        }
    }

    fn expect(&self, step: BatteryStep, expected: ResultCode, actual: ResultCode) -> CheckResult<()> {
        if actual == expected {
            return Ok(());
        }
        if actual.is_fatal() {
            return Err(CheckError::FatalSut {
                code: actual,
                context: step.to_string(),
            });
        }
        Err(CheckError::Protocol {
            step: step.to_string(),
            expected,
            actual,
            dump: self.dump(),
        })
    }
}

impl<Req> fmt::Debug for TwoCallSpec<Req> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoCallSpec")
            .field("sets", &self.sets.iter().map(|s| s.label()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Battery execution knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatteryConfig {
    /// Treat all-zero discovered counts as a hard failure instead of a
    /// warning. Set for endpoints that must never be empty.
    pub empty_counts_fatal: bool,
}

impl BatteryConfig {
    /// Default configuration: empty results warn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares empty results invalid for this endpoint.
    #[must_use]
    pub const fn with_empty_counts_fatal(mut self) -> Self {
        self.empty_counts_fatal = true;
        self
    }
}

/// One step of the battery, named for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryStep {
    /// Pure count query with every capacity zero.
    CountDiscovery,
    /// Every set allocated to its discovered count.
    ExactAllocation,
    /// One set's capacity reduced below its count, others exact.
    InsufficientCapacity {
        /// Label of the probed set.
        set: String,
    },
    /// One set's capacity zeroed, others exact.
    ZeroCapacityOthersExact {
        /// Label of the zeroed set.
        set: String,
    },
    /// One set's capacity zeroed, others under-allocated by one.
    ZeroCapacityOthersUnderAllocated {
        /// Label of the zeroed set.
        set: String,
    },
}

impl fmt::Display for BatteryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountDiscovery => f.write_str("count discovery"),
            Self::ExactAllocation => f.write_str("exact allocation"),
            Self::InsufficientCapacity { set } => {
                write!(f, "insufficient capacity on {set}")
            }
            Self::ZeroCapacityOthersExact { set } => {
                write!(f, "zero capacity on {set}, others exact")
            }
            Self::ZeroCapacityOthersUnderAllocated { set } => {
                write!(f, "zero capacity on {set}, others under-allocated")
            }
        }
    }
}

/// Verdict for one executed (or deliberately skipped) battery step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The step ran and the SUT conformed.
    Passed,
    /// The step could not exercise the contract; not a failure.
    Warning,
    /// The step's precondition did not hold (count too small to probe);
    /// distinct from passed.
    Inconclusive,
    /// The step failed. Present only in reports assembled by callers that
    /// collect failures instead of aborting.
    Failed,
}

/// Discovered count for one array set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSet {
    /// The set's diagnostic label.
    pub label: String,
    /// The count reported by the discovery call.
    pub count: u32,
}

/// Record of one battery step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Which step ran.
    pub step: BatteryStep,
    /// The result code the step required (and observed, for passed steps).
    pub code: ResultCode,
    /// How the step concluded.
    pub verdict: Verdict,
    /// Free-form detail for warnings and inconclusive steps.
    pub detail: String,
}

/// Full record of a battery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryReport {
    /// Counts reported by the discovery call, in set order.
    pub discovered: Vec<DiscoveredSet>,
    /// Steps in execution order.
    pub steps: Vec<StepReport>,
}

impl BatteryReport {
    fn push(&mut self, step: BatteryStep, code: ResultCode, verdict: Verdict, detail: &str) {
        self.steps.push(StepReport {
            step,
            code,
            verdict,
            detail: detail.to_owned(),
        });
    }

    /// Returns true if any step concluded with a warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.steps.iter().any(|s| s.verdict == Verdict::Warning)
    }

    /// Returns true if any step was inconclusive.
    #[must_use]
    pub fn has_inconclusive(&self) -> bool {
        self.steps.iter().any(|s| s.verdict == Verdict::Inconclusive)
    }

    /// Number of steps that actually called the SUT.
    ///
    /// Inconclusive steps are recorded without a call; warnings (the all-zero
    /// early exit) share the discovery call already counted.
    #[must_use]
    pub fn calls_made(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.verdict == Verdict::Passed)
            .count()
    }
}
