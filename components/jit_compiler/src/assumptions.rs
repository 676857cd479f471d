//! Class-hierarchy assumptions recorded during a compilation
//!
//! Code that inlines the only implementation of a virtual method is valid
//! only while no overriding class is loaded. The runtime checks the recorded
//! assumptions when installing the code and invalidates it when one breaks.

use core_types::MethodId;
use parking_lot::Mutex;

/// A virtual target that currently dispatches to one concrete method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConcreteMethodAssumption {
    /// Target declared at the call site
    pub declared: MethodId,
    /// Implementation that was inlined
    pub concrete: MethodId,
}

/// Assumptions of one compilation.
///
/// The presence of this registry is what enables assumption-based inlining.
#[derive(Debug, Default)]
pub struct Assumptions {
    records: Mutex<Vec<ConcreteMethodAssumption>>,
}

impl Assumptions {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `declared` dispatches only to `concrete`.
    /// Duplicate records are kept once.
    pub fn record_concrete_method(&self, declared: MethodId, concrete: MethodId) {
        let record = ConcreteMethodAssumption { declared, concrete };
        let mut records = self.records.lock();
        if !records.contains(&record) {
            records.push(record);
        }
    }

    /// Recorded assumptions in recording order
    pub fn records(&self) -> Vec<ConcreteMethodAssumption> {
        self.records.lock().clone()
    }

    /// Number of recorded assumptions
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Whether loading an override of `method` breaks a recorded assumption
    pub fn depends_on(&self, method: MethodId) -> bool {
        self.records.lock().iter().any(|r| r.declared == method)
    }
}
