//! Opaque resource handle type.
//!
//! The harness never inspects handle values; it only tracks identity. The
//! raw value is carried for diagnostics.

use core::fmt;
use serde::{Deserialize, Serialize};

/// An opaque handle to a SUT-owned resource.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SutHandle(u64);

impl SutHandle {
    /// The null handle. A SUT returning this from a successful acquire is a
    /// conformance failure.
    pub const NULL: Self = Self(0);

    /// Creates a handle from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Returns true if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for SutHandle {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SutHandle({:#x})", self.0)
    }
}

impl fmt::Display for SutHandle {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle() {
        assert!(SutHandle::NULL.is_null());
        assert!(!SutHandle::from_raw(1).is_null());
    }

    #[test]
    fn display_and_debug() {
        let h = SutHandle::from_raw(42);
        assert_eq!(format!("{h}"), "H42");
        assert_eq!(format!("{h:?}"), "SutHandle(0x2a)");
    }

    #[test]
    fn identity() {
        let a = SutHandle::from_raw(7);
        let b = SutHandle::from_raw(7);
        let c = SutHandle::from_raw(8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }

    #[test]
    fn serde_roundtrip() {
        let h = SutHandle::from_raw(123);
        let json = serde_json::to_string(&h).expect("serialize");
        let back: SutHandle = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(h, back);
    }
}
