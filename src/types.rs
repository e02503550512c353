//! Descriptors: `Copy` handles to leaked (`'static`) metadata rows.
//!
//! Identity is pointer identity. Metadata never moves after an assembly
//! is loaded, so two descriptors are the same entity exactly when they
//! point at the same row.

use crate::registry::metadata::{
    AssemblyDef, NativeEvent, NativeMethod, NativeProperty, NativeType, Visibility,
};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::ptr;

#[derive(Clone, Copy)]
pub struct AssemblyS(&'static AssemblyDef);

impl AssemblyS {
    pub fn new(def: &'static AssemblyDef) -> Self {
        Self(def)
    }

    pub fn definition(&self) -> &'static AssemblyDef {
        self.0
    }

    pub fn name(&self) -> &'static str {
        &self.0.name
    }
}

impl Debug for AssemblyS {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

impl PartialEq for AssemblyS {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.0, other.0)
    }
}

impl Eq for AssemblyS {}

impl Hash for AssemblyS {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0 as *const AssemblyDef).hash(state);
    }
}

#[derive(Clone, Copy)]
pub struct TypeDescription {
    pub assembly: AssemblyS,
    pub definition: &'static NativeType,
}

impl TypeDescription {
    pub fn type_name(&self) -> String {
        self.definition.full_name()
    }

    pub fn is_public(&self) -> bool {
        self.definition.visibility == Visibility::Public
    }

    pub fn method_description(&self, method: &'static NativeMethod) -> MethodDescription {
        MethodDescription {
            parent: *self,
            method,
        }
    }
}

impl Debug for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.definition.full_name())
    }
}

impl PartialEq for TypeDescription {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.definition, other.definition)
    }
}

impl Eq for TypeDescription {}

impl Hash for TypeDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.definition as *const NativeType).hash(state);
    }
}

#[derive(Clone, Copy)]
pub struct MethodDescription {
    pub parent: TypeDescription,
    pub method: &'static NativeMethod,
}

impl MethodDescription {
    pub fn assembly(&self) -> AssemblyS {
        self.parent.assembly
    }
}

impl Debug for MethodDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.parent.type_name(), self.method.name)
    }
}

impl PartialEq for MethodDescription {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.method, other.method)
    }
}

impl Eq for MethodDescription {}

impl Hash for MethodDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.method as *const NativeMethod).hash(state);
    }
}

#[derive(Clone, Copy)]
pub struct PropertyDescription {
    pub parent: TypeDescription,
    pub property: &'static NativeProperty,
}

impl PropertyDescription {
    pub fn getter(&self) -> Option<MethodDescription> {
        self.property
            .getter
            .map(|i| self.parent.method_description(self.parent.definition.method(i)))
    }

    pub fn setter(&self) -> Option<MethodDescription> {
        self.property
            .setter
            .map(|i| self.parent.method_description(self.parent.definition.method(i)))
    }

    /// A property participates in schema enumeration if any accessor is
    /// public or internal.
    pub fn is_schema_visible(&self) -> bool {
        self.getter()
            .into_iter()
            .chain(self.setter())
            .any(|m| m.method.visibility.is_schema_visible())
    }
}

impl Debug for PropertyDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.parent.type_name(), self.property.name)
    }
}

impl PartialEq for PropertyDescription {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.property, other.property)
    }
}

impl Eq for PropertyDescription {}

impl Hash for PropertyDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.property as *const NativeProperty).hash(state);
    }
}

#[derive(Clone, Copy)]
pub struct EventDescription {
    pub parent: TypeDescription,
    pub event: &'static NativeEvent,
}

impl EventDescription {
    pub fn adder(&self) -> MethodDescription {
        self.parent
            .method_description(self.parent.definition.method(self.event.adder))
    }

    pub fn is_schema_visible(&self) -> bool {
        self.adder().method.visibility.is_schema_visible()
    }
}

impl Debug for EventDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.parent.type_name(), self.event.name)
    }
}

impl PartialEq for EventDescription {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.event, other.event)
    }
}

impl Eq for EventDescription {}

impl Hash for EventDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.event as *const NativeEvent).hash(state);
    }
}
