//! Whole-graph inlining through the public API

use crate::support::*;
use core_types::{MethodDescriptor, MethodFlags, MethodId, ValueKind};
use jit_compiler::ir::{ConstantValue, NodeKind};
use jit_compiler::{
    DeclineReason, GraphCache, InMemoryRuntime, InliningContext, InliningOptions, InliningPhase,
};

#[test]
fn test_nested_static_calls_fully_inlined() {
    let runtime = InMemoryRuntime::new(shapes());
    let callees = Callees::new()
        .with(calling_twice(TWICE, ONE))
        .with(constant_method(ONE, ConstantValue::Int(1)));
    let options = InliningOptions::default();
    let ctx = InliningContext::new(&runtime, &callees, &options);
    let (mut graph, _) = calling(TWICE);

    let mut phase = InliningPhase::new();
    assert_eq!(phase.apply(&mut graph, &ctx).unwrap(), 3);
    assert!(graph.invokes().is_empty());
    assert!(graph.verify().is_ok());

    let ret = graph.next(graph.start()).unwrap();
    let sum = graph.node(ret).unwrap().inputs()[0];
    let node = graph.node(sum).unwrap();
    assert!(matches!(node.kind(), NodeKind::Arithmetic(_)));
    for &input in node.inputs() {
        assert_eq!(
            graph.node(input).unwrap().kind(),
            &NodeKind::Constant(ConstantValue::Int(1))
        );
    }
}

#[test]
fn test_cache_shares_callee_graphs() {
    let runtime = InMemoryRuntime::new(shapes());
    let callees = Callees::new()
        .with(calling_twice(TWICE, ONE))
        .with(constant_method(ONE, ConstantValue::Int(1)));
    let options = InliningOptions::default();
    let cache = GraphCache::new();
    let ctx = InliningContext::new(&runtime, &callees, &options).with_cache(&cache);
    let (mut graph, _) = calling(TWICE);

    InliningPhase::new().apply(&mut graph, &ctx).unwrap();
    assert_eq!(callees.builds(), 2);
    assert_eq!(cache.len(), 2);

    let (mut again, _) = calling(TWICE);
    InliningPhase::new().apply(&mut again, &ctx).unwrap();
    assert_eq!(callees.builds(), 2);
}

#[test]
fn test_count_limit_leaves_remaining_calls() {
    let runtime = InMemoryRuntime::new(shapes());
    let callees = Callees::new()
        .with(calling_twice(TWICE, ONE))
        .with(constant_method(ONE, ConstantValue::Int(1)));
    let options = InliningOptions {
        maximum_inline_count: 2,
        ..InliningOptions::default()
    };
    let ctx = InliningContext::new(&runtime, &callees, &options);
    let (mut graph, _) = calling(TWICE);

    assert_eq!(InliningPhase::new().apply(&mut graph, &ctx).unwrap(), 2);
    assert_eq!(graph.invokes().len(), 1);
    assert!(graph.verify().is_ok());
}

#[test]
fn test_native_target_declined() {
    const NATIVE: MethodId = MethodId(30);
    let mut universe = shapes();
    universe.add_method(
        MethodDescriptor::new(NATIVE, OBJECT, "nanoTime", "()J").with_flags(MethodFlags {
            native: true,
            static_: true,
            ..Default::default()
        }),
    );
    let runtime = InMemoryRuntime::new(universe);
    let callees = Callees::new();
    let options = InliningOptions::default();
    let ctx = InliningContext::new(&runtime, &callees, &options);
    let (mut graph, call) = calling(NATIVE);

    let mut phase = InliningPhase::new();
    assert_eq!(phase.apply(&mut graph, &ctx).unwrap(), 0);
    assert!(graph.contains(call));
    assert_eq!(phase.stats().declines(DeclineReason::NativeMethod), 1);
    assert_eq!(callees.builds(), 0);
}

#[test]
fn test_vetoed_target_declined() {
    let mut runtime = InMemoryRuntime::new(shapes());
    runtime.veto(ONE);
    let callees = Callees::new().with(constant_method(ONE, ConstantValue::Int(1)));
    let options = InliningOptions::default();
    let ctx = InliningContext::new(&runtime, &callees, &options);
    let (mut graph, _) = calling(ONE);

    let mut phase = InliningPhase::new();
    assert_eq!(phase.apply(&mut graph, &ctx).unwrap(), 0);
    assert_eq!(phase.stats().declines(DeclineReason::VetoedByRuntime), 1);
}

#[test]
fn test_intrinsic_replaces_call() {
    let mut runtime = InMemoryRuntime::new(shapes());
    runtime.register_intrinsic(ONE, constant_method(ONE, ConstantValue::Long(7)));
    let callees = Callees::new().with(constant_method(ONE, ConstantValue::Int(1)));
    let options = InliningOptions::default();
    let ctx = InliningContext::new(&runtime, &callees, &options);
    let (mut graph, _) = calling(ONE);

    let mut phase = InliningPhase::new();
    assert_eq!(phase.apply(&mut graph, &ctx).unwrap(), 1);
    assert_eq!(phase.stats().intrinsics, 1);
    assert_eq!(callees.builds(), 0);
    let ret = graph.next(graph.start()).unwrap();
    let value = graph.node(ret).unwrap().inputs()[0];
    assert_eq!(graph.node(value).unwrap().stamp().kind, ValueKind::Long);
}
