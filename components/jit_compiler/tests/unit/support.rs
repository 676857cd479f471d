//! Shapes hierarchy and callbacks shared by the unit tests

use core_types::{
    CompilationError, CompilationResult, ErrorKind, MethodDescriptor, MethodFlags, MethodId,
    MethodRef, TypeDescriptor, TypeId, TypeRef, Universe, ValueKind,
};
use jit_compiler::ir::{
    Bci, CallTarget, ConstantValue, FrameStateData, InvokeKind, Stamp,
};
use jit_compiler::{Assumptions, Graph, GraphBuilder, InliningCallback, NodeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const CALLER: MethodId = MethodId(100);
pub const CALL_BCI: u32 = 3;

pub const OBJECT: TypeId = TypeId(0);
pub const SHAPE: TypeId = TypeId(1);
pub const CIRCLE: TypeId = TypeId(2);
pub const SQUARE: TypeId = TypeId(3);

pub const SHAPE_AREA: MethodId = MethodId(10);
pub const CIRCLE_AREA: MethodId = MethodId(11);
pub const SQUARE_AREA: MethodId = MethodId(12);
pub const TWICE: MethodId = MethodId(20);
pub const ONE: MethodId = MethodId(21);

/// `Shape` with one concrete subclass plus two static helpers
pub fn shapes() -> Universe {
    let mut universe = Universe::new();
    universe.add_type(TypeDescriptor::new(OBJECT, "Object", None));
    universe.add_type(TypeDescriptor::new(SHAPE, "Shape", Some(OBJECT)).abstract_());
    universe.add_type(TypeDescriptor::new(CIRCLE, "Circle", Some(SHAPE)));
    universe.add_method(
        MethodDescriptor::new(SHAPE_AREA, SHAPE, "area", "()D").with_flags(MethodFlags {
            abstract_: true,
            ..Default::default()
        }),
    );
    universe.add_method(MethodDescriptor::new(CIRCLE_AREA, CIRCLE, "area", "()D"));
    let static_flags = MethodFlags {
        static_: true,
        ..Default::default()
    };
    universe.add_method(
        MethodDescriptor::new(TWICE, OBJECT, "twice", "()I").with_flags(static_flags),
    );
    universe
        .add_method(MethodDescriptor::new(ONE, OBJECT, "one", "()I").with_flags(static_flags));
    universe
}

pub fn add_square(universe: &mut Universe) {
    universe.add_type(TypeDescriptor::new(SQUARE, "Square", Some(SHAPE)));
    universe.add_method(MethodDescriptor::new(SQUARE_AREA, SQUARE, "area", "()D"));
}

/// Serves prebuilt graphs; every candidate weighs 1.0 unless overridden
#[derive(Default)]
pub struct Callees {
    pub graphs: HashMap<MethodId, Arc<Graph>>,
    pub weights: HashMap<MethodId, f64>,
    pub builds: AtomicUsize,
    pub assumptions: Assumptions,
}

impl Callees {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, graph: Graph) -> Self {
        self.graphs.insert(graph.method(), Arc::new(graph));
        self
    }

    pub fn weighing(mut self, method: MethodId, weight: f64) -> Self {
        self.weights.insert(method, weight);
        self
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl InliningCallback for Callees {
    fn build_graph(&self, method: MethodId) -> CompilationResult<Arc<Graph>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.graphs.get(&method).cloned().ok_or_else(|| {
            CompilationError::new(ErrorKind::GraphBuildFailed, format!("no graph for {method}"))
        })
    }

    fn inlining_weight(&self, _: MethodId, candidate: MethodId, _: &Graph, _: NodeId) -> f64 {
        self.weights.get(&candidate).copied().unwrap_or(1.0)
    }

    fn record_concrete_method_assumption(&self, declared: MethodId, concrete: MethodId) {
        self.assumptions.record_concrete_method(declared, concrete);
    }
}

/// `method() { return <value>; }`
pub fn constant_method(method: MethodId, value: ConstantValue) -> Graph {
    let mut builder = GraphBuilder::new(method);
    let constant = builder.constant(value);
    builder.return_value(Some(constant)).unwrap();
    builder.finish().unwrap()
}

/// `method() { return target() + target(); }`
pub fn calling_twice(method: MethodId, target: MethodId) -> Graph {
    let call = CallTarget::new(MethodRef::Resolved(target), InvokeKind::Static, ValueKind::Int);
    let mut builder = GraphBuilder::new(method);
    let first = builder.invoke(call.clone(), 0, vec![]).unwrap();
    builder
        .attach_state(first, FrameStateData::new(method, Bci::At(3)).with_stack(vec![first]))
        .unwrap();
    let second = builder.invoke(call, 3, vec![]).unwrap();
    builder
        .attach_state(
            second,
            FrameStateData::new(method, Bci::At(6)).with_stack(vec![first, second]),
        )
        .unwrap();
    let sum = builder.arithmetic(jit_compiler::ir::ArithmeticOp::Add, first, second);
    builder.return_value(Some(sum)).unwrap();
    builder.finish().unwrap()
}

/// `CALLER(Shape s) { return s.area(); }`
pub fn area_of_shape() -> (Graph, NodeId) {
    let mut builder = GraphBuilder::new(CALLER);
    let receiver =
        builder.parameter_with_stamp(0, Stamp::object(Some(TypeRef::Resolved(SHAPE))));
    let call = builder
        .invoke(
            CallTarget::new(
                MethodRef::Resolved(SHAPE_AREA),
                InvokeKind::Virtual,
                ValueKind::Double,
            ),
            CALL_BCI,
            vec![receiver],
        )
        .unwrap();
    builder
        .attach_state(
            call,
            FrameStateData::new(CALLER, Bci::At(CALL_BCI + 3))
                .with_locals(vec![Some(receiver)])
                .with_stack(vec![call]),
        )
        .unwrap();
    builder.return_value(Some(call)).unwrap();
    (builder.finish().unwrap(), call)
}

/// `CALLER() { return target(); }`
pub fn calling(target: MethodId) -> (Graph, NodeId) {
    let mut builder = GraphBuilder::new(CALLER);
    let call = builder
        .invoke(
            CallTarget::new(MethodRef::Resolved(target), InvokeKind::Static, ValueKind::Int),
            CALL_BCI,
            vec![],
        )
        .unwrap();
    builder
        .attach_state(
            call,
            FrameStateData::new(CALLER, Bci::At(CALL_BCI + 3)).with_stack(vec![call]),
        )
        .unwrap();
    builder.return_value(Some(call)).unwrap();
    (builder.finish().unwrap(), call)
}
