//! Intermediate representation
//!
//! Sea-of-nodes style graph: fixed nodes form the control-flow skeleton,
//! floating nodes hang off them through data inputs, and frame-state nodes
//! record what deoptimization needs to rebuild interpreter frames.

mod builder;
mod frame_state;
mod graph;
mod node;

pub use builder::GraphBuilder;
pub use frame_state::{Bci, FrameStateData};
pub use graph::Graph;
pub use node::{
    ArithmeticOp, CallTarget, ConstantValue, InvokeData, InvokeKind, MonitorOp, Node, NodeId,
    NodeKind, Stamp,
};
