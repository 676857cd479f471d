//! In-memory resolution and profiling tables.
//!
//! The `Universe` holds every type and method descriptor the runtime has
//! resolved, together with the receiver profiles collected by lower tiers.
//! It answers the class-hierarchy questions the inliner asks: subtyping,
//! virtual dispatch resolution and unique-implementation lookups.
//!
//! # Examples
//!
//! ```
//! use core_types::{MethodDescriptor, MethodId, TypeDescriptor, TypeId, Universe};
//!
//! let mut universe = Universe::new();
//! universe.add_type(TypeDescriptor::new(TypeId(1), "Shape", None).abstract_());
//! universe.add_type(TypeDescriptor::new(TypeId(2), "Circle", Some(TypeId(1))));
//! universe.add_method(MethodDescriptor::new(MethodId(1), TypeId(1), "area", "()D"));
//! universe.add_method(MethodDescriptor::new(MethodId(2), TypeId(2), "area", "()D"));
//!
//! assert!(universe.is_subtype_of(TypeId(2), TypeId(1)));
//! assert_eq!(universe.resolve_method_impl(TypeId(2), MethodId(1)), Some(MethodId(2)));
//! assert_eq!(universe.unique_concrete_method(TypeId(1), MethodId(1)), Some(MethodId(2)));
//! ```

use crate::{MethodDescriptor, MethodId, ReceiverProfiler, TypeDescriptor, TypeId, TypeProfile};
use std::collections::{BTreeMap, HashMap};

/// Resolution and profiling tables of a running program.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    types: BTreeMap<TypeId, TypeDescriptor>,
    methods: BTreeMap<MethodId, MethodDescriptor>,
    profiles: HashMap<(MethodId, u32), TypeProfile>,
    profilers: HashMap<(MethodId, u32), ReceiverProfiler>,
}

impl Universe {
    /// Create an empty universe
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, replacing any previous descriptor with the same id
    pub fn add_type(&mut self, descriptor: TypeDescriptor) -> TypeId {
        let id = descriptor.id;
        self.types.insert(id, descriptor);
        id
    }

    /// Register a method, replacing any previous descriptor with the same id
    pub fn add_method(&mut self, descriptor: MethodDescriptor) -> MethodId {
        let id = descriptor.id;
        self.methods.insert(id, descriptor);
        id
    }

    /// Store the receiver profile observed at `method@bci`
    pub fn set_type_profile(&mut self, method: MethodId, bci: u32, profile: TypeProfile) {
        self.profiles.insert((method, bci), profile);
    }

    /// Count one call at `method@bci` with the given receiver type and
    /// refresh the stored profile of that site
    pub fn record_receiver(&mut self, method: MethodId, bci: u32, receiver: TypeId) {
        let profiler = self.profilers.entry((method, bci)).or_default();
        profiler.record(receiver);
        self.profiles.insert((method, bci), profiler.profile());
    }

    /// Look up a type
    pub fn type_descriptor(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(&id)
    }

    /// Look up a method
    pub fn method(&self, id: MethodId) -> Option<&MethodDescriptor> {
        self.methods.get(&id)
    }

    /// Mutable access to a type, e.g. to mark it initialized
    pub fn type_descriptor_mut(&mut self, id: TypeId) -> Option<&mut TypeDescriptor> {
        self.types.get_mut(&id)
    }

    /// Receiver profile at `method@bci`
    pub fn type_profile(&self, method: MethodId, bci: u32) -> Option<&TypeProfile> {
        self.profiles.get(&(method, bci))
    }

    /// Whether `sub` equals `sup` or transitively extends it
    pub fn is_subtype_of(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            current = self.types.get(&id).and_then(|t| t.superclass);
        }
        false
    }

    /// All known subtypes of `holder`, including itself, in id order since
    /// types are kept in a `BTreeMap`
    pub fn subtypes(&self, holder: TypeId) -> Vec<TypeId> {
        self.types
            .keys()
            .copied()
            .filter(|&id| self.is_subtype_of(id, holder))
            .collect()
    }

    /// Resolve virtual dispatch of `method` on a receiver of exact type
    /// `receiver`.
    ///
    /// Returns `None` if the receiver is not a subtype of the method's holder
    /// or no implementation is found on the superclass chain.
    pub fn resolve_method_impl(&self, receiver: TypeId, method: MethodId) -> Option<MethodId> {
        let declared = self.methods.get(&method)?;
        if !self.is_subtype_of(receiver, declared.holder) {
            return None;
        }
        if declared.flags.static_ || declared.flags.private {
            return Some(method);
        }

        let mut current = Some(receiver);
        while let Some(type_id) = current {
            let found = self.methods.values().find(|m| {
                m.holder == type_id && !m.flags.static_ && m.overrides_slot_of(declared)
            });
            if let Some(m) = found {
                return Some(m.id);
            }
            current = self.types.get(&type_id).and_then(|t| t.superclass);
        }
        None
    }

    /// The single concrete implementation `method` dispatches to for any
    /// instantiable subtype of `holder`, if there is exactly one.
    pub fn unique_concrete_method(&self, holder: TypeId, method: MethodId) -> Option<MethodId> {
        let declared = self.methods.get(&method)?;
        if declared.flags.static_ || declared.flags.private {
            return (!declared.flags.abstract_).then_some(method);
        }

        let mut unique = None;
        for subtype in self.subtypes(holder) {
            let instantiable = self.types.get(&subtype).is_some_and(|t| !t.is_abstract);
            if !instantiable {
                continue;
            }
            let implementation = self.resolve_method_impl(subtype, method)?;
            match unique {
                None => unique = Some(implementation),
                Some(existing) if existing == implementation => {}
                Some(_) => return None,
            }
        }

        unique.filter(|m| self.methods.get(m).is_some_and(|d| !d.flags.abstract_))
    }

    /// Whether calls to `method` can never dispatch anywhere else
    pub fn can_be_statically_bound(&self, method: MethodId) -> bool {
        let Some(descriptor) = self.methods.get(&method) else {
            return false;
        };
        let flags = descriptor.flags;
        flags.static_
            || flags.private
            || flags.final_
            || self
                .types
                .get(&descriptor.holder)
                .is_some_and(|holder| holder.is_final)
    }

    /// Human-readable method name for diagnostics, e.g.
    /// `Circle.area()D (12 bytes)`
    pub fn method_name(&self, method: MethodId) -> String {
        match self.methods.get(&method) {
            Some(m) => {
                let holder = self
                    .types
                    .get(&m.holder)
                    .map_or_else(|| m.holder.to_string(), |t| t.name.clone());
                format!("{}.{}{} ({} bytes)", holder, m.name, m.signature, m.code_size)
            }
            None => method.to_string(),
        }
    }
}
