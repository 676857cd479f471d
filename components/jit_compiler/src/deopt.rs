//! Deoptimization vocabulary
//!
//! Guards and deoptimize nodes inserted by the inliner carry a reason and an
//! action. The stub generators that later consume them decide how to
//! transfer control back to the interpreter; this module only names what
//! happens to the compiled code afterwards.

use std::fmt;

/// What the runtime does with the compiled code after a deoptimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeoptAction {
    /// Resume in the interpreter, keep the compiled code
    None,
    /// Keep the code but schedule a recompilation
    Recompile,
    /// Invalidate the code and collect fresh profiles before recompiling
    InvalidateReprofile,
    /// Invalidate the code and recompile with the current profiles
    InvalidateRecompile,
    /// Invalidate the code and never compile the method again
    InvalidateStopCompiling,
}

impl DeoptAction {
    /// Whether the compiled code is thrown away
    pub fn invalidates(self) -> bool {
        matches!(
            self,
            DeoptAction::InvalidateReprofile
                | DeoptAction::InvalidateRecompile
                | DeoptAction::InvalidateStopCompiling
        )
    }
}

/// Why a guard can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeoptReason {
    /// A profiled receiver type did not match
    TypeCheckedInliningViolated,
    /// An inlined call's receiver was null
    NullCheckException,
    /// A registered class-hierarchy assumption no longer holds
    AssumptionViolated,
    /// Execution reached a path the compiled code does not handle
    Unreached,
}

impl fmt::Display for DeoptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeoptAction::None => "none",
            DeoptAction::Recompile => "recompile",
            DeoptAction::InvalidateReprofile => "invalidate-reprofile",
            DeoptAction::InvalidateRecompile => "invalidate-recompile",
            DeoptAction::InvalidateStopCompiling => "invalidate-stop-compiling",
        };
        f.write_str(name)
    }
}
