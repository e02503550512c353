//! Fluent registration of native metadata.
//!
//! Hosts (and tests) declare the types the schema layer reflects over
//! through these builders. Property and event declarations expand into
//! the accessor methods the member reflector expects (`get_X`/`set_X`/
//! `add_X` with the special-name bit), the same shape compilers emit
//! for accessor methods.

use crate::registry::metadata::{
    AssemblyDef, MemberAttribute, NativeEvent, NativeMethod, NativeProperty, NativeType,
    TypeAttribute, TypeKind, TypeRef, Visibility, CTOR_NAME,
};
use crate::value::NativeFn;

pub struct AssemblyBuilder {
    name: String,
    friends: Vec<String>,
    types: Vec<NativeType>,
}

impl AssemblyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            friends: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Grant another assembly access to this assembly's internals.
    pub fn friend(mut self, assembly: impl Into<String>) -> Self {
        self.friends.push(assembly.into());
        self
    }

    pub fn ty(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        f: impl FnOnce(TypeBuilder) -> TypeBuilder,
    ) -> Self {
        self.types.push(f(TypeBuilder::new(namespace, name)).finish());
        self
    }

    pub fn build(self) -> AssemblyDef {
        AssemblyDef {
            name: self.name,
            friends: self.friends,
            types: self.types,
        }
    }
}

pub struct TypeBuilder {
    inner: NativeType,
}

impl TypeBuilder {
    fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            inner: NativeType {
                namespace: namespace.into(),
                name: name.into(),
                kind: TypeKind::Class,
                visibility: Visibility::Public,
                extends: None,
                implements: Vec::new(),
                properties: Vec::new(),
                events: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
            },
        }
    }

    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.inner.kind = kind;
        self
    }

    pub fn interface(self) -> Self {
        self.kind(TypeKind::Interface)
    }

    pub fn value_type(self) -> Self {
        self.kind(TypeKind::ValueType)
    }

    pub fn array_of(self, element: TypeRef) -> Self {
        self.kind(TypeKind::Array(element))
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.inner.visibility = visibility;
        self
    }

    pub fn internal(self) -> Self {
        self.visibility(Visibility::Internal)
    }

    pub fn extends(mut self, base: TypeRef) -> Self {
        self.inner.extends = Some(base);
        self
    }

    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.inner.implements.push(interface);
        self
    }

    pub fn attribute(mut self, attribute: TypeAttribute) -> Self {
        self.inner.attributes.push(attribute);
        self
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        property_type: TypeRef,
        f: impl FnOnce(PropertyBuilder) -> PropertyBuilder,
    ) -> Self {
        let built = f(PropertyBuilder::new(name, property_type));
        built.finish(&mut self.inner);
        self
    }

    pub fn event(mut self, name: impl Into<String>, handler_type: TypeRef) -> Self {
        let name = name.into();
        let adder = self.push_method(NativeMethod {
            name: format!("add_{name}"),
            is_static: false,
            visibility: Visibility::Public,
            parameters: vec![handler_type.clone()],
            return_type: None,
            body: None,
            special_name: true,
        });
        self.inner.events.push(NativeEvent {
            name,
            handler_type,
            adder,
            is_static: false,
            attributes: Vec::new(),
        });
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl FnOnce(MethodBuilder) -> MethodBuilder,
    ) -> Self {
        let built = f(MethodBuilder::new(name)).finish();
        self.push_method(built);
        self
    }

    pub fn constructor(self, parameters: Vec<TypeRef>, body: Option<NativeFn>) -> Self {
        self.method(CTOR_NAME, |m| {
            let mut m = m.special_name();
            for p in parameters {
                m = m.param(p);
            }
            match body {
                Some(b) => m.body(b),
                None => m,
            }
        })
    }

    fn push_method(&mut self, method: NativeMethod) -> usize {
        self.inner.methods.push(method);
        self.inner.methods.len() - 1
    }

    fn finish(self) -> NativeType {
        self.inner
    }
}

pub struct MethodBuilder {
    inner: NativeMethod,
}

impl MethodBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            inner: NativeMethod {
                name: name.into(),
                is_static: false,
                visibility: Visibility::Public,
                parameters: Vec::new(),
                return_type: None,
                body: None,
                special_name: false,
            },
        }
    }

    pub fn param(mut self, ty: TypeRef) -> Self {
        self.inner.parameters.push(ty);
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.inner.return_type = Some(ty);
        self
    }

    pub fn static_member(mut self) -> Self {
        self.inner.is_static = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.inner.visibility = visibility;
        self
    }

    pub fn body(mut self, body: NativeFn) -> Self {
        self.inner.body = Some(body);
        self
    }

    pub fn special_name(mut self) -> Self {
        self.inner.special_name = true;
        self
    }

    fn finish(self) -> NativeMethod {
        self.inner
    }
}

pub struct PropertyBuilder {
    name: String,
    property_type: TypeRef,
    is_static: bool,
    attributes: Vec<MemberAttribute>,
    getter: Option<(Visibility, Option<NativeFn>)>,
    setter: Option<(Visibility, Option<NativeFn>)>,
}

impl PropertyBuilder {
    fn new(name: impl Into<String>, property_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            property_type,
            is_static: false,
            attributes: Vec::new(),
            getter: None,
            setter: None,
        }
    }

    /// Declare a public getter without a runtime body.
    pub fn readable(self) -> Self {
        self.getter(Visibility::Public, None)
    }

    pub fn readable_with(self, body: NativeFn) -> Self {
        self.getter(Visibility::Public, Some(body))
    }

    pub fn getter(mut self, visibility: Visibility, body: Option<NativeFn>) -> Self {
        self.getter = Some((visibility, body));
        self
    }

    /// Declare a public setter without a runtime body.
    pub fn writable(self) -> Self {
        self.setter(Visibility::Public, None)
    }

    pub fn writable_with(self, body: NativeFn) -> Self {
        self.setter(Visibility::Public, Some(body))
    }

    pub fn setter(mut self, visibility: Visibility, body: Option<NativeFn>) -> Self {
        self.setter = Some((visibility, body));
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn attribute(mut self, attribute: MemberAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    fn finish(self, ty: &mut NativeType) {
        let getter = self.getter.map(|(visibility, body)| {
            ty.methods.push(NativeMethod {
                name: format!("get_{}", self.name),
                is_static: self.is_static,
                visibility,
                parameters: Vec::new(),
                return_type: Some(self.property_type.clone()),
                body,
                special_name: true,
            });
            ty.methods.len() - 1
        });
        let setter = self.setter.map(|(visibility, body)| {
            ty.methods.push(NativeMethod {
                name: format!("set_{}", self.name),
                is_static: self.is_static,
                visibility,
                parameters: vec![self.property_type.clone()],
                return_type: None,
                body,
                special_name: true,
            });
            ty.methods.len() - 1
        });
        ty.properties.push(NativeProperty {
            name: self.name,
            property_type: self.property_type,
            getter,
            setter,
            is_static: self.is_static,
            attributes: self.attributes,
        });
    }
}
