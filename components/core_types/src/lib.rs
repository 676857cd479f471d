//! Core descriptor, profiling and error types for the JIT compiler.
//!
//! This crate provides the runtime-facing data the inliner reasons about,
//! kept separate from the IR so runtime tables can be shared across
//! compilations without depending on the compiler.
//!
//! # Overview
//!
//! - [`MethodDescriptor`] / [`TypeDescriptor`] - Resolved runtime entities
//! - [`Universe`] - Class hierarchy and profiling tables
//! - [`TypeProfile`] - Observed receiver types at a call site
//! - [`SourcePosition`] - Method plus bytecode index
//! - [`CompilationError`] - Fatal compilation failures
//!
//! # Examples
//!
//! ```
//! use core_types::{TypeId, TypeProfile};
//!
//! let profile = TypeProfile::monomorphic(TypeId(2), 0.97);
//! assert!(profile.is_monomorphic());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod descriptor;
mod error;
mod profile;
mod source;
mod universe;

pub use descriptor::{
    MethodDescriptor, MethodFlags, MethodId, MethodRef, TypeDescriptor, TypeId, TypeRef,
    ValueKind,
};
pub use error::{CompilationError, CompilationResult, ErrorKind};
pub use profile::{ReceiverProfiler, TypeProfile};
pub use source::SourcePosition;
pub use universe::Universe;
