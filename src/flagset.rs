//! Power-set enumeration over named bit flags.
//!
//! Many SUT entry points accept an OR'd set of flag bits. The generator
//! produces every subset of a list of named flags as a lazy, finite,
//! restartable sequence, so a scenario can run one battery per combination.
//!
//! Combination index `i` (0 ≤ i < 2^N) selects the subset whose members match
//! the binary representation of `i`; bit 0 of `i` corresponds to the first
//! named flag. With the empty combination included it is produced first.
//!
//! # Usage
//!
//! ```
//! use sutlab::flagset::{FlagSetGenerator, NamedFlag};
//!
//! const FLAGS: &[NamedFlag] = &[
//!     NamedFlag::new(0x1, "DISCARD"),
//!     NamedFlag::new(0x2, "PROTECTED"),
//! ];
//!
//! let mut r#gen = FlagSetGenerator::including_empty(FLAGS);
//! let mut seen = Vec::new();
//! while r#gen.advance() {
//!     seen.push(r#gen.current().bits());
//! }
//! assert_eq!(seen, vec![0x0, 0x1, 0x2, 0x3]);
//! ```

use core::fmt;

/// One named bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedFlag {
    bits: u64,
    name: &'static str,
}

impl NamedFlag {
    /// Creates a named flag.
    #[must_use]
    pub const fn new(bits: u64, name: &'static str) -> Self {
        Self { bits, name }
    }

    /// Returns the flag's bit value.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.bits
    }

    /// Returns the flag's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

/// One combined value from the power set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagCombination {
    bits: u64,
    description: String,
}

impl FlagCombination {
    /// Returns the OR of all member flags.
    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    /// Returns the human-readable description ("none" for the empty set).
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for FlagCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Restartable power-set generator over an ordered flag list.
///
/// Consumers call [`advance`](Self::advance) (false when exhausted) then
/// [`current`](Self::current) exactly once per iteration. For idiomatic
/// `for`-loop consumption use [`iter`](Self::iter), which preserves the same
/// ordering.
#[derive(Debug, Clone)]
pub struct FlagSetGenerator {
    flags: &'static [NamedFlag],
    include_empty: bool,
    /// Next combination index to produce; `total` when exhausted.
    next: u64,
    total: u64,
    current: Option<FlagCombination>,
}

impl FlagSetGenerator {
    /// Creates a generator that produces the empty (all-zero) combination
    /// first, then every non-empty subset.
    ///
    /// More than 63 flags would overflow the index space; callers pass small
    /// hand-written flag tables, so the constructor asserts rather than
    /// propagating an error.
    #[must_use]
    pub fn including_empty(flags: &'static [NamedFlag]) -> Self {
        Self::with_empty(flags, true)
    }

    /// Creates a generator that skips the all-zero combination.
    #[must_use]
    pub fn excluding_empty(flags: &'static [NamedFlag]) -> Self {
        Self::with_empty(flags, false)
    }

    fn with_empty(flags: &'static [NamedFlag], include_empty: bool) -> Self {
        assert!(
            flags.len() < 64,
            "harness usage error: flag table too large for power-set enumeration"
        );
        Self {
            flags,
            include_empty,
            next: u64::from(!include_empty),
            total: 1u64 << flags.len(),
            current: None,
        }
    }

    /// Advances to the next combination. Returns false once the sequence is
    /// exhausted, after which [`current`](Self::current) must not be called
    /// again.
    pub fn advance(&mut self) -> bool {
        if self.next >= self.total {
            self.current = None;
            return false;
        }
        self.current = Some(Self::combination(self.flags, self.next));
        self.next += 1;
        true
    }

    /// Returns the combination produced by the last successful
    /// [`advance`](Self::advance).
    ///
    /// # Panics
    ///
    /// Panics with a `harness usage error` diagnostic when called before a
    /// successful `advance()` or after exhaustion. That is a programming
    /// error in the calling scenario, not a SUT conformance failure.
    #[must_use]
    pub fn current(&self) -> &FlagCombination {
        self.current
            .as_ref()
            .expect("harness usage error: FlagSetGenerator::current() without a successful advance()")
    }

    /// Restarts the sequence from its first combination.
    pub fn reset(&mut self) {
        self.next = u64::from(!self.include_empty);
        self.current = None;
    }

    /// Returns the number of combinations the full sequence produces.
    #[must_use]
    pub const fn len(&self) -> u64 {
        if self.include_empty {
            self.total
        } else {
            self.total - 1
        }
    }

    /// Returns true if the sequence produces nothing (no flags, empty
    /// combination excluded).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a fresh iterator over the full sequence, independent of this
    /// generator's cursor.
    #[must_use]
    pub fn iter(&self) -> FlagSetIter {
        FlagSetIter {
            generator: Self::with_empty(self.flags, self.include_empty),
        }
    }

    fn combination(flags: &[NamedFlag], index: u64) -> FlagCombination {
        let mut bits = 0u64;
        let mut description = String::new();
        for (position, flag) in flags.iter().enumerate() {
            if index & (1u64 << position) != 0 {
                bits |= flag.bits;
                if !description.is_empty() {
                    description.push_str(" | ");
                }
                description.push_str(flag.name);
            }
        }
        if description.is_empty() {
            description.push_str("none");
        }
        FlagCombination { bits, description }
    }
}

/// Iterator adapter over a [`FlagSetGenerator`] sequence.
#[derive(Debug, Clone)]
pub struct FlagSetIter {
    generator: FlagSetGenerator,
}

impl Iterator for FlagSetIter {
    type Item = FlagCombination;

    fn next(&mut self) -> Option<Self::Item> {
        if self.generator.advance() {
            Some(self.generator.current().clone())
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.generator.total - self.generator.next) as usize;
        (remaining, Some(remaining))
    }
}

impl IntoIterator for &FlagSetGenerator {
    type Item = FlagCombination;
    type IntoIter = FlagSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
