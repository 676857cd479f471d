//! Unit tests for receiver type profiles

use core_types::{ReceiverProfiler, TypeId, TypeProfile};

#[test]
fn test_profiler_snapshot_is_sorted() {
    let mut profiler = ReceiverProfiler::new();
    profiler.record(TypeId(1));
    profiler.record(TypeId(2));
    profiler.record(TypeId(2));
    profiler.record(TypeId(2));

    let profile = profiler.profile();
    assert_eq!(profile.types, vec![TypeId(2), TypeId(1)]);
    assert_eq!(profile.dominant(), Some((TypeId(2), 0.75)));
    assert_eq!(profile.morphism, 2);
}

#[test]
fn test_empty_profiler_has_no_dominant_type() {
    let profiler = ReceiverProfiler::new();
    assert_eq!(profiler.total(), 0);
    assert_eq!(profiler.profile().dominant(), None);
}

#[test]
fn test_default_profile_is_empty() {
    let profile = TypeProfile::default();
    assert!(profile.is_empty());
    assert!(!profile.is_monomorphic());
}
