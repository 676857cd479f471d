//! Compilation error types.
//!
//! Declining to inline a call site is not an error. Everything in this module
//! describes a broken invariant that must abort the compilation of the
//! enclosing method instead of emitting possibly-incorrect code.

use crate::SourcePosition;
use thiserror::Error;

/// The kind of compilation failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An internal invariant of the compiler does not hold
    #[error("InvariantViolation")]
    InvariantViolation,
    /// A graph does not have the shape required by an operation
    #[error("MalformedGraph")]
    MalformedGraph,
    /// An exact receiver type is not a subtype of the target's holder
    #[error("InconsistentSubtype")]
    InconsistentSubtype,
    /// An unresolved method reached a stage that requires a resolved one
    #[error("UnresolvedTarget")]
    UnresolvedTarget,
    /// The graph-building collaborator could not produce a callee graph
    #[error("GraphBuildFailed")]
    GraphBuildFailed,
    /// Inlining options could not be parsed or are inconsistent
    #[error("InvalidOptions")]
    InvalidOptions,
}

/// A fatal compilation error.
///
/// # Examples
///
/// ```
/// use core_types::{CompilationError, ErrorKind};
///
/// let error = CompilationError::malformed("callee graph has two return nodes");
/// assert_eq!(error.kind, ErrorKind::MalformedGraph);
/// assert_eq!(error.to_string(), "MalformedGraph: callee graph has two return nodes");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct CompilationError {
    /// The kind of failure
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Call site the failure was detected at, if known
    pub position: Option<SourcePosition>,
}

/// Result alias used throughout the compiler.
pub type CompilationResult<T> = Result<T, CompilationError>;

impl CompilationError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    /// Broken internal invariant
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation, message)
    }

    /// Graph shape violation
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedGraph, message)
    }

    /// Exact type outside of the target's holder hierarchy
    pub fn inconsistent_subtype(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InconsistentSubtype, message)
    }

    /// Unresolved target where a resolved one is required
    pub fn unresolved(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnresolvedTarget, message)
    }

    /// Attach the call site the error was detected at
    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }
}
