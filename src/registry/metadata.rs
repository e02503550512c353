//! The native metadata model.
//!
//! This is the reflection facility the schema layer consumes: plain data
//! records describing assemblies, types, and members, declared through
//! the builder API in [`crate::registry::builder`]. Methods optionally
//! carry a runtime body so the invokers can construct and mutate real
//! instances; metadata-only declarations are equally valid and simply
//! cannot be invoked.

use crate::value::{NativeFn, Value};
use std::fmt::{Debug, Formatter};

pub const CTOR_NAME: &str = ".ctor";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Internal,
    Protected,
    Private,
}

impl Visibility {
    /// Visible to the schema layer's member enumeration.
    pub fn is_schema_visible(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Internal)
    }
}

/// A symbolic reference to a type, resolved against the declaring
/// assembly and then the core assembly. Generic instantiations carry
/// their arguments; the base name keeps the CLR-style arity suffix
/// (e.g. `System.Collections.Generic.IDictionary`2`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub assembly: Option<String>,
    pub full_name: String,
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    pub fn named(full_name: impl Into<String>) -> Self {
        Self {
            assembly: None,
            full_name: full_name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(full_name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            assembly: None,
            full_name: full_name.into(),
            args,
        }
    }

    pub fn in_assembly(mut self, assembly: impl Into<String>) -> Self {
        self.assembly = Some(assembly.into());
        self
    }
}

impl Debug for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name)?;
        if !self.args.is_empty() {
            write!(f, "[")?;
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{a:?}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    ValueType,
    /// A fixed-shape array of the element type.
    Array(TypeRef),
}

/// Declarative attributes a type can carry, distilled from the custom
/// attributes the original metadata format encodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeAttribute {
    ContentProperty(String),
    RuntimeNameProperty(String),
    XmlLangProperty(String),
    DictionaryKeyProperty(String),
    UidProperty(String),
    TypeConverter(String),
    ValueSerializer(String),
    DeferredLoader(String),
    MarkupExtension,
    NameScope,
    WhitespaceSignificantCollection,
    Ambient,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SerializationVisibility {
    Visible,
    Hidden,
    Content,
}

#[derive(Clone, Debug)]
pub enum MemberAttribute {
    TypeConverter(String),
    ValueSerializer(String),
    DeferredLoader(String),
    DefaultValue(Value),
    ConstructorArgument(String),
    DependsOn(String),
    DesignerSerializationVisibility(SerializationVisibility),
    Ambient,
}

pub struct NativeMethod {
    pub name: String,
    pub is_static: bool,
    pub visibility: Visibility,
    /// Declared parameters, excluding the receiver.
    pub parameters: Vec<TypeRef>,
    /// `None` means void.
    pub return_type: Option<TypeRef>,
    pub body: Option<NativeFn>,
    /// Compiler-generated accessor methods (`get_X`, `set_X`, `add_X`).
    pub special_name: bool,
}

impl Debug for NativeMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMethod")
            .field("name", &self.name)
            .field("is_static", &self.is_static)
            .field("visibility", &self.visibility)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct NativeProperty {
    pub name: String,
    pub property_type: TypeRef,
    /// Indices into the owning type's method table.
    pub getter: Option<usize>,
    pub setter: Option<usize>,
    pub is_static: bool,
    pub attributes: Vec<MemberAttribute>,
}

#[derive(Debug)]
pub struct NativeEvent {
    pub name: String,
    pub handler_type: TypeRef,
    /// Index of the `add_X` method in the owning type's method table.
    pub adder: usize,
    pub is_static: bool,
    pub attributes: Vec<MemberAttribute>,
}

#[derive(Debug)]
pub struct NativeType {
    pub namespace: String,
    pub name: String,
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub extends: Option<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub properties: Vec<NativeProperty>,
    pub events: Vec<NativeEvent>,
    pub methods: Vec<NativeMethod>,
    pub attributes: Vec<TypeAttribute>,
}

impl NativeType {
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a NativeMethod> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &NativeMethod> {
        self.methods_named(CTOR_NAME)
    }

    pub fn method(&self, index: usize) -> &NativeMethod {
        &self.methods[index]
    }
}

#[derive(Debug)]
pub struct AssemblyDef {
    pub name: String,
    /// Assemblies granted access to this assembly's internal members.
    pub friends: Vec<String>,
    pub types: Vec<NativeType>,
}
