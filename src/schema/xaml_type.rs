//! The public type façade over the reflector cache.

use crate::error::SchemaError;
use crate::registry::corlib;
use crate::schema::collection::CollectionKind;
use crate::schema::context::XamlSchemaContext;
use crate::schema::directive::Directive;
use crate::schema::member::XamlMember;
use crate::schema::type_reflector::TypeReflector;
use crate::types::{MethodDescription, TypeDescription};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A type as the markup layer sees it: either a resolved native type or
/// the frozen unknown sentinel under a markup-supplied name. Cheap to
/// clone; all schema facts live in the shared reflector.
#[derive(Clone)]
pub struct XamlType {
    name: Arc<str>,
    reflector: Arc<TypeReflector>,
}

impl XamlType {
    pub(crate) fn from_parts(name: impl AsRef<str>, reflector: Arc<TypeReflector>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            reflector,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<TypeDescription> {
        self.reflector.description()
    }

    pub fn is_unknown(&self) -> bool {
        self.reflector.is_unknown()
    }

    pub fn base_type(&self, ctx: &XamlSchemaContext) -> Option<XamlType> {
        self.reflector
            .lookup_base_type(ctx.registry())
            .map(|td| ctx.xaml_type_for(td))
    }

    pub fn collection_kind(&self, ctx: &XamlSchemaContext) -> CollectionKind {
        self.reflector.lookup_collection_kind(ctx.registry())
    }

    /// The element type repeated markup children must satisfy. Falls
    /// back to `Object` when the metadata does not pin one down.
    pub fn item_type(&self, ctx: &XamlSchemaContext) -> Option<XamlType> {
        match self.collection_kind(ctx) {
            CollectionKind::None => None,
            _ => {
                let item = self
                    .reflector
                    .lookup_item_type(ctx.registry())
                    .unwrap_or_else(corlib::object);
                Some(ctx.xaml_type_from_ref(self.description().map(|d| d.assembly), &item))
            }
        }
    }

    pub fn key_type(&self, ctx: &XamlSchemaContext) -> Option<XamlType> {
        match self.collection_kind(ctx) {
            CollectionKind::Dictionary => {
                let key = self
                    .reflector
                    .lookup_key_type(ctx.registry())
                    .unwrap_or_else(corlib::object);
                Some(ctx.xaml_type_from_ref(self.description().map(|d| d.assembly), &key))
            }
            _ => None,
        }
    }

    pub fn add_method(
        &self,
        ctx: &XamlSchemaContext,
        kind: CollectionKind,
    ) -> Result<Option<MethodDescription>, SchemaError> {
        self.reflector.lookup_add_method(ctx.registry(), kind)
    }

    /// Resolve a member name through the full protocol: native instance
    /// property, instance event, attached property, attached event,
    /// language directive, implicit pseudo-member, and finally the
    /// unknown sentinel. There is no fallthrough past the first match;
    /// unknown is terminal and carries the diagnostic when resolution
    /// failed with a schema error.
    pub fn get_member(&self, ctx: &XamlSchemaContext, name: &str) -> XamlMember {
        match self.reflector.lookup_member(ctx.registry(), name) {
            Ok(Some(member)) => member,
            Ok(None) => match ctx.lookup_directive_member(name) {
                Some(directive) => directive,
                None => ctx.unknown_member(name, self.description(), None),
            },
            Err(reason) => ctx.unknown_member(name, self.description(), Some(reason)),
        }
    }

    /// Every visible member, most-derived declarations winning over
    /// same-named base declarations.
    pub fn get_all_members(&self, ctx: &XamlSchemaContext) -> Vec<XamlMember> {
        self.reflector.lookup_all_members(ctx.registry())
    }

    pub fn get_attachable_member(&self, name: &str) -> Result<Option<XamlMember>, SchemaError> {
        if let Some(property) = self.reflector.lookup_attachable_property(name)? {
            return Ok(Some(property));
        }
        self.reflector.lookup_attachable_event(name)
    }

    /// The member the type's content-property attribute names, if any.
    pub fn content_property(
        &self,
        ctx: &XamlSchemaContext,
    ) -> Result<Option<XamlMember>, SchemaError> {
        match self.reflector.lookup_content_property()? {
            None => Ok(None),
            Some(name) => Ok(Some(self.get_member(ctx, &name))),
        }
    }

    /// The concrete member a language directive aliases on this type.
    pub fn get_aliased_property(
        &self,
        ctx: &XamlSchemaContext,
        directive: &Directive,
    ) -> Result<Option<XamlMember>, SchemaError> {
        self.reflector
            .lookup_aliased_property(ctx.registry(), directive)
    }

    /// Ordered parameter types for positional construction at `arity`.
    pub fn positional_parameters(
        &self,
        ctx: &XamlSchemaContext,
        arity: usize,
    ) -> Option<Vec<XamlType>> {
        let params = self.reflector.lookup_positional_parameters(arity)?;
        let scope = self.description().map(|d| d.assembly);
        Some(
            params
                .iter()
                .map(|p| ctx.xaml_type_from_ref(scope, p))
                .collect(),
        )
    }

    pub fn type_converter(&self) -> Result<Option<String>, SchemaError> {
        self.reflector.lookup_type_converter()
    }

    pub fn value_serializer(&self) -> Result<Option<String>, SchemaError> {
        self.reflector.lookup_value_serializer()
    }

    pub fn deferred_loader(&self) -> Result<Option<String>, SchemaError> {
        self.reflector.lookup_deferred_loader()
    }

    pub fn is_public(&self) -> bool {
        self.reflector.is_public()
    }

    pub fn is_constructible(&self) -> bool {
        self.reflector.is_constructible()
    }

    pub fn is_nullable(&self) -> bool {
        self.reflector.is_nullable()
    }

    pub fn is_markup_extension(&self, ctx: &XamlSchemaContext) -> bool {
        self.reflector.is_markup_extension(ctx.registry())
    }

    pub fn is_name_scope(&self) -> bool {
        self.reflector.is_name_scope()
    }

    pub fn is_whitespace_significant(&self) -> bool {
        self.reflector.is_whitespace_significant()
    }

    pub fn is_ambient(&self) -> bool {
        self.reflector.is_ambient()
    }

    pub fn invoker(&self) -> crate::invoke::XamlTypeInvoker {
        crate::invoke::XamlTypeInvoker::new(self.clone())
    }
}

impl Debug for XamlType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            write!(f, "unknown:{}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl PartialEq for XamlType {
    fn eq(&self, other: &Self) -> bool {
        match (self.description(), other.description()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.name == other.name,
            _ => false,
        }
    }
}

impl Eq for XamlType {}
