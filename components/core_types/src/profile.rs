//! Receiver type profiles for speculative inlining decisions
//!
//! This module is placed in core_types so both the runtime tables and the
//! compiler can share it without depending on each other.

use crate::TypeId;

/// Observed receiver types at one call site.
///
/// `types` and `probabilities` are parallel and sorted by descending
/// probability. `morphism` is the number of distinct receiver types seen.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeProfile {
    /// Observed receiver types, most frequent first
    pub types: Vec<TypeId>,
    /// Probability of each observed type
    pub probabilities: Vec<f64>,
    /// Number of distinct observed types
    pub morphism: usize,
}

impl TypeProfile {
    /// Create an empty profile
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            probabilities: Vec::new(),
            morphism: 0,
        }
    }

    /// Profile with a single observed type
    pub fn monomorphic(type_id: TypeId, probability: f64) -> Self {
        Self {
            types: vec![type_id],
            probabilities: vec![probability],
            morphism: 1,
        }
    }

    /// Build a profile from raw per-type observation counts.
    ///
    /// Types with a zero count are dropped. Ties keep their input order.
    pub fn from_counts(counts: &[(TypeId, u64)]) -> Self {
        let mut observed: Vec<(TypeId, u64)> =
            counts.iter().copied().filter(|(_, c)| *c > 0).collect();
        let total: u64 = observed.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return Self::new();
        }

        observed.sort_by(|a, b| b.1.cmp(&a.1));
        Self {
            morphism: observed.len(),
            types: observed.iter().map(|(t, _)| *t).collect(),
            probabilities: observed
                .iter()
                .map(|(_, c)| *c as f64 / total as f64)
                .collect(),
        }
    }

    /// Whether exactly one receiver type with non-zero probability was seen
    pub fn is_monomorphic(&self) -> bool {
        self.morphism == 1 && self.probabilities.first().is_some_and(|p| *p > 0.0)
    }

    /// The most frequent receiver type and its probability
    pub fn dominant(&self) -> Option<(TypeId, f64)> {
        Some((*self.types.first()?, *self.probabilities.first()?))
    }

    /// Whether any type was observed
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

impl Default for TypeProfile {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects receiver observations at a call site while the method runs in a
/// lower tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverProfiler {
    counts: Vec<(TypeId, u64)>,
}

impl ReceiverProfiler {
    /// Create an empty profiler
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call with the given receiver type
    pub fn record(&mut self, type_id: TypeId) {
        match self.counts.iter_mut().find(|(t, _)| *t == type_id) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((type_id, 1)),
        }
    }

    /// Total number of recorded calls
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    /// Snapshot the collected observations as a profile
    pub fn profile(&self) -> TypeProfile {
        TypeProfile::from_counts(&self.counts)
    }
}
