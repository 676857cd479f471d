//! Method and type descriptors.
//!
//! Descriptors are the compiler's view of the runtime's resolved entities.
//! They are plain data; hierarchy queries live in [`crate::Universe`].

use std::fmt;

/// Identifier of a method known to the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);

/// Identifier of a type known to the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Machine-level kind of a value flowing through the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// No value (void calls, control nodes)
    Void,
    /// 32-bit integer (also booleans, chars, bytes, shorts)
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Object reference
    Object,
}

impl ValueKind {
    /// Whether this kind produces a value
    pub fn is_void(self) -> bool {
        self == ValueKind::Void
    }
}

/// A method reference as it appears at a call site.
///
/// The target of a call may not have been resolved yet when the graph was
/// built, in which case only its symbolic name is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodRef {
    /// A method the runtime has resolved
    Resolved(MethodId),
    /// A symbolic reference that has not been resolved
    Unresolved(String),
}

impl MethodRef {
    /// The resolved method, if any
    pub fn resolved(&self) -> Option<MethodId> {
        match self {
            MethodRef::Resolved(id) => Some(*id),
            MethodRef::Unresolved(_) => None,
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodRef::Resolved(id) => write!(f, "{id}"),
            MethodRef::Unresolved(name) => write!(f, "<unresolved {name}>"),
        }
    }
}

/// A type reference as carried by a value's stamp
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A type the runtime has resolved
    Resolved(TypeId),
    /// A symbolic reference that has not been resolved
    Unresolved(String),
}

impl TypeRef {
    /// The resolved type, if any
    pub fn resolved(&self) -> Option<TypeId> {
        match self {
            TypeRef::Resolved(id) => Some(*id),
            TypeRef::Unresolved(_) => None,
        }
    }
}

/// Access flags of a method relevant to inlining
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodFlags {
    /// Implemented outside of managed code
    pub native: bool,
    /// Declared without a body
    pub abstract_: bool,
    /// Invoked without a receiver
    pub static_: bool,
    /// Cannot be overridden
    pub final_: bool,
    /// Not visible to subclasses
    pub private: bool,
}

/// A resolved method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    /// Unique identifier
    pub id: MethodId,
    /// Declaring type
    pub holder: TypeId,
    /// Simple name, used together with `signature` for override matching
    pub name: String,
    /// Parameter/return descriptor, e.g. `(II)I`
    pub signature: String,
    /// Access flags
    pub flags: MethodFlags,
    /// Size of the method's bytecode
    pub code_size: usize,
    /// Number of local variable slots
    pub max_locals: usize,
    /// Maximum operand stack depth
    pub max_stack: usize,
}

impl MethodDescriptor {
    /// Create a descriptor for a concrete, non-final instance method
    pub fn new(id: MethodId, holder: TypeId, name: &str, signature: &str) -> Self {
        Self {
            id,
            holder,
            name: name.to_string(),
            signature: signature.to_string(),
            flags: MethodFlags::default(),
            code_size: 0,
            max_locals: 0,
            max_stack: 0,
        }
    }

    /// Set the access flags
    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the bytecode size
    pub fn with_code_size(mut self, code_size: usize) -> Self {
        self.code_size = code_size;
        self
    }

    /// Whether `other` has the same name and signature
    pub fn overrides_slot_of(&self, other: &MethodDescriptor) -> bool {
        self.name == other.name && self.signature == other.signature
    }
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Unique identifier
    pub id: TypeId,
    /// Fully qualified name
    pub name: String,
    /// Direct superclass, `None` for the root type
    pub superclass: Option<TypeId>,
    /// Cannot be subclassed
    pub is_final: bool,
    /// Cannot be instantiated (abstract class or interface)
    pub is_abstract: bool,
    /// Static initializer has run
    pub is_initialized: bool,
}

impl TypeDescriptor {
    /// Create an initialized, non-final, concrete type
    pub fn new(id: TypeId, name: &str, superclass: Option<TypeId>) -> Self {
        Self {
            id,
            name: name.to_string(),
            superclass,
            is_final: false,
            is_abstract: false,
            is_initialized: true,
        }
    }

    /// Mark the type final
    pub fn final_(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Mark the type abstract
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark the type as not yet initialized
    pub fn uninitialized(mut self) -> Self {
        self.is_initialized = false;
        self
    }
}
