//! Invokers: the bridge from resolved schema handles to live instances.
//!
//! These are deliberately thin. Resolution work happens in the
//! reflectors; an invoker just checks the operation is supported,
//! fetches the cached method handle, and calls its registered body
//! directly (the original's sandboxed invocation indirection is an
//! intentionally dropped legacy security boundary).

use crate::error::{InvokeError, XamlError};
use crate::schema::collection::{CollectionKind, GET_ENUMERATOR};
use crate::schema::context::XamlSchemaContext;
use crate::schema::member::XamlMember;
use crate::schema::xaml_type::XamlType;
use crate::types::MethodDescription;
use crate::value::Value;

/// Constructs instances of a schema type and drives its collection
/// surface.
#[derive(Clone)]
pub struct XamlTypeInvoker {
    ty: XamlType,
}

impl XamlTypeInvoker {
    pub fn new(ty: XamlType) -> Self {
        Self { ty }
    }

    pub fn xaml_type(&self) -> &XamlType {
        &self.ty
    }

    /// Construct an instance through the visible constructor matching
    /// the argument count.
    pub fn create_instance(&self, args: &[Value]) -> Result<Value, XamlError> {
        let desc = self
            .ty
            .description()
            .ok_or_else(|| InvokeError::UnknownType(self.ty.name().to_string()))?;
        let ctor = desc
            .definition
            .constructors()
            .find(|c| c.parameters.len() == args.len() && c.visibility.is_schema_visible())
            .ok_or_else(|| InvokeError::NoSuchConstructor {
                type_name: desc.type_name(),
                arity: args.len(),
            })?;
        let body = ctor.body.as_ref().ok_or_else(|| {
            InvokeError::NoRuntimeBody(format!("{}::{}", desc.type_name(), ctor.name))
        })?;
        Ok(body(args)?)
    }

    pub fn add_to_collection(
        &self,
        ctx: &XamlSchemaContext,
        instance: &Value,
        item: Value,
    ) -> Result<(), XamlError> {
        let add = self.insertion_method(ctx, CollectionKind::Collection)?;
        self.invoke_method(add, &[instance.clone(), item])?;
        Ok(())
    }

    pub fn add_to_dictionary(
        &self,
        ctx: &XamlSchemaContext,
        instance: &Value,
        key: Value,
        value: Value,
    ) -> Result<(), XamlError> {
        let add = self.insertion_method(ctx, CollectionKind::Dictionary)?;
        self.invoke_method(add, &[instance.clone(), key, value])?;
        Ok(())
    }

    fn insertion_method(
        &self,
        ctx: &XamlSchemaContext,
        kind: CollectionKind,
    ) -> Result<MethodDescription, XamlError> {
        let not_that_kind = || -> XamlError {
            let type_name = self.ty.name().to_string();
            match kind {
                CollectionKind::Dictionary => InvokeError::NotADictionary { type_name }.into(),
                _ => InvokeError::NotACollection { type_name }.into(),
            }
        };
        if self.ty.description().is_none() {
            return Err(InvokeError::UnknownType(self.ty.name().to_string()).into());
        }
        if self.ty.collection_kind(ctx) != kind {
            return Err(not_that_kind());
        }
        self.ty
            .add_method(ctx, kind)?
            .ok_or_else(not_that_kind)
    }

    /// Snapshot of the items in a collection instance, through the
    /// type's enumerator body.
    pub fn get_items(
        &self,
        ctx: &XamlSchemaContext,
        instance: &Value,
    ) -> Result<Vec<Value>, XamlError> {
        let desc = self
            .ty
            .description()
            .ok_or_else(|| InvokeError::UnknownType(self.ty.name().to_string()))?;
        if self.ty.collection_kind(ctx) == CollectionKind::None {
            return Err(InvokeError::NotACollection {
                type_name: desc.type_name(),
            }
            .into());
        }
        let body = desc
            .definition
            .methods_named(GET_ENUMERATOR)
            .filter(|m| !m.is_static && m.parameters.is_empty())
            .find_map(|m| m.body.as_ref())
            .ok_or_else(|| {
                InvokeError::NoRuntimeBody(format!("{}::{GET_ENUMERATOR}", desc.type_name()))
            })?;
        let result = body(&[instance.clone()])?;
        match result {
            Value::Object(o) => o
                .with(|items: &Vec<Value>| items.clone())
                .ok_or_else(|| {
                    InvokeError::BadArgument {
                        method: format!("{}::{GET_ENUMERATOR}", desc.type_name()),
                        index: 0,
                    }
                    .into()
                }),
            _ => Err(InvokeError::BadArgument {
                method: format!("{}::{GET_ENUMERATOR}", desc.type_name()),
                index: 0,
            }
            .into()),
        }
    }

    fn invoke_method(
        &self,
        method: MethodDescription,
        args: &[Value],
    ) -> Result<Value, XamlError> {
        let body = method.method.body.as_ref().ok_or_else(|| {
            InvokeError::NoRuntimeBody(format!(
                "{}::{}",
                method.parent.type_name(),
                method.method.name
            ))
        })?;
        Ok(body(args)?)
    }
}

/// Reads and writes one member on instances.
#[derive(Clone)]
pub struct XamlMemberInvoker {
    member: XamlMember,
}

impl XamlMemberInvoker {
    pub fn new(member: XamlMember) -> Self {
        Self { member }
    }

    pub fn member(&self) -> &XamlMember {
        &self.member
    }

    fn check_invokable(&self) -> Result<(), InvokeError> {
        if self.member.is_unknown() {
            return Err(InvokeError::UnknownMember(self.member.name().to_string()));
        }
        if self.member.is_directive() || self.member.is_implicit() {
            // synthetic members have no accessors; the markup processor
            // supplies their values directly
            return Err(InvokeError::NotInvokable(self.member.name().to_string()));
        }
        Ok(())
    }

    pub fn get_value(&self, instance: &Value) -> Result<Value, XamlError> {
        self.check_invokable()?;
        let getter = self
            .member
            .getter()
            .ok_or_else(|| InvokeError::WriteOnly(self.member.name().to_string()))?;
        let body = getter.method.body.as_ref().ok_or_else(|| {
            InvokeError::NoRuntimeBody(format!("{:?}", getter))
        })?;
        Ok(body(&[instance.clone()])?)
    }

    /// Write a member. For events the setter handle is the add-handler
    /// method, so assignment attaches a handler. Attached accessors are
    /// static and receive the target as their first argument, which is
    /// the same calling convention instance accessors use here.
    pub fn set_value(&self, instance: &Value, value: Value) -> Result<(), XamlError> {
        self.check_invokable()?;
        let setter = self
            .member
            .setter()
            .ok_or_else(|| InvokeError::ReadOnly(self.member.name().to_string()))?;
        let body = setter.method.body.as_ref().ok_or_else(|| {
            InvokeError::NoRuntimeBody(format!("{:?}", setter))
        })?;
        body(&[instance.clone(), value])?;
        Ok(())
    }
}
