//! Full Pipeline Integration Tests
//!
//! Tests the complete flow: method bodies -> recursive compilation with
//! inlining -> shared graph cache -> verified caller graph.

use core_types::{
    MethodDescriptor, MethodFlags, MethodId, MethodRef, TypeDescriptor, TypeId, TypeRef,
    Universe, ValueKind,
};
use integration_tests::{init_tracing, Compiler, Program};
use jit_compiler::deopt::DeoptReason;
use jit_compiler::ir::{
    ArithmeticOp, Bci, CallTarget, ConstantValue, FrameStateData, InvokeKind, NodeKind, Stamp,
};
use jit_compiler::{
    ConcreteMethodAssumption, Graph, GraphBuilder, GraphCache, InMemoryRuntime, InliningOptions,
};

const OBJECT: TypeId = TypeId(0);
const SHAPE: TypeId = TypeId(1);
const CIRCLE: TypeId = TypeId(2);
const SQUARE: TypeId = TypeId(3);

const MAIN: MethodId = MethodId(1);
const SUM: MethodId = MethodId(2);
const ONE: MethodId = MethodId(3);
const TWO: MethodId = MethodId(4);
const COUNTDOWN: MethodId = MethodId(5);
const FAIL: MethodId = MethodId(6);
const SHAPE_AREA: MethodId = MethodId(10);
const CIRCLE_AREA: MethodId = MethodId(11);
const SQUARE_AREA: MethodId = MethodId(12);

fn universe() -> Universe {
    let mut universe = Universe::new();
    universe.add_type(TypeDescriptor::new(OBJECT, "Object", None));
    universe.add_type(TypeDescriptor::new(SHAPE, "Shape", Some(OBJECT)).abstract_());
    universe.add_type(TypeDescriptor::new(CIRCLE, "Circle", Some(SHAPE)));
    let static_ = MethodFlags {
        static_: true,
        ..Default::default()
    };
    for (id, name) in [
        (MAIN, "main"),
        (SUM, "sum"),
        (ONE, "one"),
        (TWO, "two"),
        (COUNTDOWN, "countdown"),
        (FAIL, "fail"),
    ] {
        universe.add_method(MethodDescriptor::new(id, OBJECT, name, "()I").with_flags(static_));
    }
    universe.add_method(
        MethodDescriptor::new(SHAPE_AREA, SHAPE, "area", "()D").with_flags(MethodFlags {
            abstract_: true,
            ..Default::default()
        }),
    );
    universe.add_method(MethodDescriptor::new(CIRCLE_AREA, CIRCLE, "area", "()D"));
    universe
}

fn static_call(target: MethodId) -> CallTarget {
    CallTarget::new(MethodRef::Resolved(target), InvokeKind::Static, ValueKind::Int)
}

/// `method() { return target(); }`
fn forwarding(method: MethodId, target: MethodId) -> Graph {
    let mut builder = GraphBuilder::new(method);
    let call = builder.invoke(static_call(target), 0, vec![]).unwrap();
    builder
        .attach_state(call, FrameStateData::new(method, Bci::At(3)).with_stack(vec![call]))
        .unwrap();
    builder.return_value(Some(call)).unwrap();
    builder.finish().unwrap()
}

/// `method() { return first() + second(); }`
fn adding(method: MethodId, first: MethodId, second: MethodId) -> Graph {
    let mut builder = GraphBuilder::new(method);
    let a = builder.invoke(static_call(first), 0, vec![]).unwrap();
    builder
        .attach_state(a, FrameStateData::new(method, Bci::At(3)).with_stack(vec![a]))
        .unwrap();
    let b = builder.invoke(static_call(second), 3, vec![]).unwrap();
    builder
        .attach_state(b, FrameStateData::new(method, Bci::At(6)).with_stack(vec![a, b]))
        .unwrap();
    let sum = builder.arithmetic(ArithmeticOp::Add, a, b);
    builder.return_value(Some(sum)).unwrap();
    builder.finish().unwrap()
}

/// `method() { if (..) return first(); else return second(); }`
fn choosing(method: MethodId, first: MethodId, second: MethodId) -> Graph {
    let mut builder = GraphBuilder::new(method);
    let condition = builder.constant(ConstantValue::Int(1));
    let (_, on_false) = builder.if_(condition).unwrap();
    let a = builder.invoke(static_call(first), 2, vec![]).unwrap();
    builder
        .attach_state(a, FrameStateData::new(method, Bci::At(5)).with_stack(vec![a]))
        .unwrap();
    builder.return_value(Some(a)).unwrap();
    builder.set_cursor(on_false);
    let b = builder.invoke(static_call(second), 8, vec![]).unwrap();
    builder
        .attach_state(b, FrameStateData::new(method, Bci::At(11)).with_stack(vec![b]))
        .unwrap();
    builder.return_value(Some(b)).unwrap();
    builder.finish().unwrap()
}

fn constant(method: MethodId, value: ConstantValue) -> Graph {
    let mut builder = GraphBuilder::new(method);
    let c = builder.constant(value);
    builder.return_value(Some(c)).unwrap();
    builder.finish().unwrap()
}

/// `MAIN(Shape s) { return s.area(); }`
fn area_of(method: MethodId) -> Graph {
    let mut builder = GraphBuilder::new(method);
    let shape = builder.parameter_with_stamp(0, Stamp::object(Some(TypeRef::Resolved(SHAPE))));
    let call = builder
        .invoke(
            CallTarget::new(
                MethodRef::Resolved(SHAPE_AREA),
                InvokeKind::Virtual,
                ValueKind::Double,
            ),
            4,
            vec![shape],
        )
        .unwrap();
    builder
        .attach_state(
            call,
            FrameStateData::new(method, Bci::At(7))
                .with_locals(vec![Some(shape)])
                .with_stack(vec![call]),
        )
        .unwrap();
    builder.return_value(Some(call)).unwrap();
    builder.finish().unwrap()
}

fn arithmetic_program() -> Program {
    Program::new()
        .define(forwarding(MAIN, SUM))
        .define(adding(SUM, ONE, TWO))
        .define(constant(ONE, ConstantValue::Int(1)))
        .define(constant(TWO, ConstantValue::Int(2)))
}

fn returned_value(graph: &Graph) -> NodeKind {
    let returns = graph.nodes_matching(|n| matches!(n.kind(), NodeKind::Return));
    assert_eq!(returns.len(), 1);
    let value = graph.node(returns[0]).unwrap().inputs()[0];
    graph.node(value).unwrap().kind().clone()
}

#[test]
fn test_full_pipeline_flattens_call_tree() {
    init_tracing();
    let runtime = InMemoryRuntime::new(universe());
    let program = arithmetic_program();
    let cache = GraphCache::new();
    let compiler = Compiler::new(&runtime, &program, &cache, InliningOptions::default());

    let graph = compiler.compile(MAIN).unwrap();
    assert!(graph.invokes().is_empty());
    assert_eq!(returned_value(&graph), NodeKind::Arithmetic(ArithmeticOp::Add));
    assert_eq!(cache.len(), 3);

    // callees are compiled before their callers
    let stats = compiler.stats();
    assert_eq!(stats.len(), 4);
    assert_eq!(stats[2].inlined, 2);
    assert_eq!(stats[3].inlined, 1);
}

#[test]
fn test_full_pipeline_respects_json_options() {
    init_tracing();
    let runtime = InMemoryRuntime::new(universe());
    let program = arithmetic_program();
    let cache = GraphCache::new();
    let options =
        InliningOptions::from_json(r#"{ "use_graph_cache": false, "maximum_inline_count": 0 }"#)
            .unwrap();
    let compiler = Compiler::new(&runtime, &program, &cache, options);

    let graph = compiler.compile(MAIN).unwrap();
    assert_eq!(graph.invokes().len(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_full_pipeline_bounds_recursion() {
    init_tracing();
    let runtime = InMemoryRuntime::new(universe());
    let program = Program::new().define(forwarding(COUNTDOWN, COUNTDOWN));
    let cache = GraphCache::new();
    let options = InliningOptions {
        maximum_inline_level: 2,
        ..InliningOptions::default()
    };
    let compiler = Compiler::new(&runtime, &program, &cache, options);

    let graph = compiler.compile(COUNTDOWN).unwrap();
    assert_eq!(graph.invokes().len(), 1);
    assert_eq!(compiler.stats()[0].inlined, 3);
}

#[test]
fn test_full_pipeline_virtual_call_under_assumption() {
    init_tracing();
    let runtime = InMemoryRuntime::new(universe());
    let program = Program::new()
        .define(area_of(MAIN))
        .define(constant(CIRCLE_AREA, ConstantValue::Double(2.0)));
    let cache = GraphCache::new();
    let compiler = Compiler::new(&runtime, &program, &cache, InliningOptions::default());

    let graph = compiler.compile(MAIN).unwrap();
    assert!(graph.invokes().is_empty());
    assert_eq!(
        compiler.assumptions().records(),
        vec![ConcreteMethodAssumption {
            declared: SHAPE_AREA,
            concrete: CIRCLE_AREA,
        }]
    );
    let null_checks = graph.nodes_matching(|n| {
        matches!(
            n.kind(),
            NodeKind::FixedGuard {
                reason: DeoptReason::NullCheckException,
                ..
            }
        )
    });
    assert_eq!(null_checks.len(), 1);
}

#[test]
fn test_full_pipeline_joins_branch_returns() {
    init_tracing();
    let runtime = InMemoryRuntime::new(universe());
    let program = Program::new()
        .define(forwarding(MAIN, SUM))
        .define(choosing(SUM, ONE, TWO))
        .define(constant(ONE, ConstantValue::Int(1)))
        .define(constant(TWO, ConstantValue::Int(2)));
    let cache = GraphCache::new();
    let compiler = Compiler::new(&runtime, &program, &cache, InliningOptions::default());

    let graph = compiler.compile(MAIN).unwrap();
    assert!(graph.invokes().is_empty());
    let merges = graph.nodes_matching(|n| matches!(n.kind(), NodeKind::Merge));
    assert_eq!(merges.len(), 1);
    let phis = graph.phis(merges[0]);
    assert_eq!(phis.len(), 1);
    let joined: Vec<NodeKind> = graph.node(phis[0]).unwrap().inputs()[1..]
        .iter()
        .map(|&value| graph.node(value).unwrap().kind().clone())
        .collect();
    assert_eq!(
        joined,
        vec![
            NodeKind::Constant(ConstantValue::Int(1)),
            NodeKind::Constant(ConstantValue::Int(2)),
        ]
    );
    assert_eq!(returned_value(&graph), NodeKind::Phi);
    assert!(graph.verify().is_ok());
}

#[test]
fn test_full_pipeline_virtual_call_with_profile() {
    init_tracing();
    let mut universe = universe();
    universe.add_type(TypeDescriptor::new(SQUARE, "Square", Some(SHAPE)));
    universe.add_method(MethodDescriptor::new(SQUARE_AREA, SQUARE, "area", "()D"));
    for _ in 0..98 {
        universe.record_receiver(MAIN, 4, CIRCLE);
    }
    let runtime = InMemoryRuntime::new(universe);
    let program = Program::new()
        .define(area_of(MAIN))
        .define(constant(CIRCLE_AREA, ConstantValue::Double(2.0)))
        .define(constant(SQUARE_AREA, ConstantValue::Double(4.0)));
    let cache = GraphCache::new();
    let compiler = Compiler::new(&runtime, &program, &cache, InliningOptions::default());

    let graph = compiler.compile(MAIN).unwrap();
    assert!(graph.invokes().is_empty());
    assert!(compiler.assumptions().is_empty());
    assert_eq!(compiler.stats().last().unwrap().type_guarded_inlines, 1);
    assert_eq!(returned_value(&graph), NodeKind::Constant(ConstantValue::Double(2.0)));
}

#[test]
fn test_full_pipeline_exception_reaches_handler() {
    init_tracing();
    let runtime = InMemoryRuntime::new(universe());

    // FAIL(e) { throw e; }
    let mut builder = GraphBuilder::new(FAIL);
    let thrown = builder.parameter(0, ValueKind::Object);
    builder.unwind(thrown).unwrap();
    let fail = builder.finish().unwrap();

    // MAIN(e) { try { return FAIL(e); } catch (x) { return x; } }
    let mut builder = GraphBuilder::new(MAIN);
    let argument = builder.parameter(0, ValueKind::Object);
    let (call, caught) = builder
        .invoke_with_exception(
            CallTarget::new(MethodRef::Resolved(FAIL), InvokeKind::Static, ValueKind::Object),
            0,
            vec![argument],
        )
        .unwrap();
    builder
        .attach_state(
            call,
            FrameStateData::new(MAIN, Bci::At(3))
                .with_locals(vec![Some(argument)])
                .with_stack(vec![call]),
        )
        .unwrap();
    builder.return_value(Some(call)).unwrap();
    builder.set_cursor(caught);
    builder.return_value(Some(caught)).unwrap();
    let main = builder.finish().unwrap();

    let program = Program::new().define(main).define(fail);
    let cache = GraphCache::new();
    let compiler = Compiler::new(&runtime, &program, &cache, InliningOptions::default());

    let graph = compiler.compile(MAIN).unwrap();
    assert!(graph.invokes().is_empty());
    let returns = graph.nodes_matching(|n| matches!(n.kind(), NodeKind::Return));
    assert_eq!(returns.len(), 1);
    assert_eq!(graph.node(returns[0]).unwrap().inputs(), &[argument]);
    assert!(graph
        .nodes_matching(|n| matches!(n.kind(), NodeKind::Unwind))
        .is_empty());
}
