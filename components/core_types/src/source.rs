//! Source positions of call sites.

use crate::MethodId;
use std::fmt;

/// A bytecode position inside a method.
///
/// Call sites, type profiles and intrinsic lookups are all keyed by the
/// method they appear in plus the bytecode index (bci) of the call.
///
/// # Examples
///
/// ```
/// use core_types::{MethodId, SourcePosition};
///
/// let pos = SourcePosition::new(MethodId(4), 12);
/// assert_eq!(pos.bci, 12);
/// assert_eq!(pos.to_string(), "m4@12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    /// Method containing the position
    pub method: MethodId,
    /// Bytecode index inside the method
    pub bci: u32,
}

impl SourcePosition {
    /// Create a new source position
    pub fn new(method: MethodId, bci: u32) -> Self {
        Self { method, bci }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.method, self.bci)
    }
}
