//! The member model: one closed variant type over every kind of member
//! markup can address, plus the `XamlMember` façade wrapping a variant
//! together with its lazy reflector.
//!
//! Resolution produces exactly one variant per name (see
//! `XamlType::get_member`); unknown is terminal and carries the
//! diagnostic from the failed resolution attempt, if there was one.

use crate::error::{SchemaError, XamlError};
use crate::registry::corlib;
use crate::registry::metadata::{
    MemberAttribute, SerializationVisibility, TypeRef, Visibility,
};
use crate::schema::directive::{AllowedLocation, Directive, ImplicitKind};
use crate::schema::member_reflector::{flags, MemberReflector};
use enum_dispatch::enum_dispatch;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::types::{EventDescription, MethodDescription, PropertyDescription, TypeDescription};
use crate::value::Value;

#[enum_dispatch]
pub trait MemberFacts {
    fn kind_name(&self) -> &'static str;
    fn is_event(&self) -> bool;
    fn is_attachable(&self) -> bool;
    fn is_directive(&self) -> bool;
    fn is_implicit(&self) -> bool;
    fn is_unknown(&self) -> bool;
}

/// A native instance property, backed by a getter/setter pair.
#[derive(Clone, Copy, Debug)]
pub struct InstanceProperty {
    pub property: PropertyDescription,
}

impl MemberFacts for InstanceProperty {
    fn kind_name(&self) -> &'static str {
        "property"
    }
    fn is_event(&self) -> bool {
        false
    }
    fn is_attachable(&self) -> bool {
        false
    }
    fn is_directive(&self) -> bool {
        false
    }
    fn is_implicit(&self) -> bool {
        false
    }
    fn is_unknown(&self) -> bool {
        false
    }
}

/// A property implemented by static `GetX`/`SetX` accessors taking the
/// target instance as their first parameter.
#[derive(Clone, Copy, Debug)]
pub struct AttachedProperty {
    pub getter: Option<MethodDescription>,
    pub setter: Option<MethodDescription>,
}

impl MemberFacts for AttachedProperty {
    fn kind_name(&self) -> &'static str {
        "attached property"
    }
    fn is_event(&self) -> bool {
        false
    }
    fn is_attachable(&self) -> bool {
        true
    }
    fn is_directive(&self) -> bool {
        false
    }
    fn is_implicit(&self) -> bool {
        false
    }
    fn is_unknown(&self) -> bool {
        false
    }
}

/// A native instance event, wrapping its add-handler method.
#[derive(Clone, Copy, Debug)]
pub struct InstanceEvent {
    pub event: EventDescription,
}

impl MemberFacts for InstanceEvent {
    fn kind_name(&self) -> &'static str {
        "event"
    }
    fn is_event(&self) -> bool {
        true
    }
    fn is_attachable(&self) -> bool {
        false
    }
    fn is_directive(&self) -> bool {
        false
    }
    fn is_implicit(&self) -> bool {
        false
    }
    fn is_unknown(&self) -> bool {
        false
    }
}

/// An event implemented by a static `AddXHandler(target, handler)`
/// method.
#[derive(Clone, Copy, Debug)]
pub struct AttachedEvent {
    pub adder: MethodDescription,
}

impl MemberFacts for AttachedEvent {
    fn kind_name(&self) -> &'static str {
        "attached event"
    }
    fn is_event(&self) -> bool {
        true
    }
    fn is_attachable(&self) -> bool {
        true
    }
    fn is_directive(&self) -> bool {
        false
    }
    fn is_implicit(&self) -> bool {
        false
    }
    fn is_unknown(&self) -> bool {
        false
    }
}

/// A language directive: synthetic, not backed by any native member.
#[derive(Clone, Debug)]
pub struct DirectiveMember {
    pub directive: Directive,
    pub value_type: TypeRef,
    pub location: AllowedLocation,
}

impl MemberFacts for DirectiveMember {
    fn kind_name(&self) -> &'static str {
        "directive"
    }
    fn is_event(&self) -> bool {
        false
    }
    fn is_attachable(&self) -> bool {
        false
    }
    fn is_directive(&self) -> bool {
        true
    }
    fn is_implicit(&self) -> bool {
        false
    }
    fn is_unknown(&self) -> bool {
        false
    }
}

/// A synthetic pseudo-member the markup format needs but the native
/// type does not declare.
#[derive(Clone, Copy, Debug)]
pub struct ImplicitMember {
    pub kind: ImplicitKind,
}

impl MemberFacts for ImplicitMember {
    fn kind_name(&self) -> &'static str {
        "implicit member"
    }
    fn is_event(&self) -> bool {
        false
    }
    fn is_attachable(&self) -> bool {
        false
    }
    fn is_directive(&self) -> bool {
        false
    }
    fn is_implicit(&self) -> bool {
        true
    }
    fn is_unknown(&self) -> bool {
        false
    }
}

/// Terminal resolution failure. Carries the schema error that explains
/// why resolution failed, when one exists.
#[derive(Clone, Debug)]
pub struct UnknownMember {
    pub reason: Option<SchemaError>,
}

impl MemberFacts for UnknownMember {
    fn kind_name(&self) -> &'static str {
        "unknown member"
    }
    fn is_event(&self) -> bool {
        false
    }
    fn is_attachable(&self) -> bool {
        false
    }
    fn is_directive(&self) -> bool {
        false
    }
    fn is_implicit(&self) -> bool {
        false
    }
    fn is_unknown(&self) -> bool {
        true
    }
}

#[enum_dispatch(MemberFacts)]
#[derive(Clone, Debug)]
pub enum MemberVariant {
    InstanceProperty,
    AttachedProperty,
    InstanceEvent,
    AttachedEvent,
    DirectiveMember,
    ImplicitMember,
    UnknownMember,
}

/// A member of the schema: name, declaring type, variant, and the lazy
/// reflector holding every derived fact.
#[derive(Clone)]
pub struct XamlMember {
    name: Arc<str>,
    declaring_type: Option<TypeDescription>,
    variant: MemberVariant,
    reflector: Arc<MemberReflector>,
}

impl XamlMember {
    pub(crate) fn new(
        name: impl AsRef<str>,
        declaring_type: Option<TypeDescription>,
        variant: MemberVariant,
        reflector: Arc<MemberReflector>,
    ) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            declaring_type,
            variant,
            reflector,
        }
    }

    pub(crate) fn instance_property(declaring: TypeDescription, property: PropertyDescription) -> Self {
        Self::new(
            &property.property.name,
            Some(declaring),
            MemberVariant::from(InstanceProperty { property }),
            Arc::new(MemberReflector::new()),
        )
    }

    pub(crate) fn instance_event(declaring: TypeDescription, event: EventDescription) -> Self {
        Self::new(
            &event.event.name,
            Some(declaring),
            MemberVariant::from(InstanceEvent { event }),
            Arc::new(MemberReflector::new()),
        )
    }

    pub(crate) fn attached_property(
        name: &str,
        declaring: TypeDescription,
        getter: Option<MethodDescription>,
        setter: Option<MethodDescription>,
    ) -> Self {
        Self::new(
            name,
            Some(declaring),
            MemberVariant::from(AttachedProperty { getter, setter }),
            Arc::new(MemberReflector::new()),
        )
    }

    pub(crate) fn attached_event(
        name: &str,
        declaring: TypeDescription,
        adder: MethodDescription,
    ) -> Self {
        Self::new(
            name,
            Some(declaring),
            MemberVariant::from(AttachedEvent { adder }),
            Arc::new(MemberReflector::new()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> Option<TypeDescription> {
        self.declaring_type
    }

    pub fn variant(&self) -> &MemberVariant {
        &self.variant
    }

    pub fn is_unknown(&self) -> bool {
        self.variant.is_unknown()
    }

    pub fn is_event(&self) -> bool {
        self.reflector
            .flags
            .get_or_compute(flags::IS_EVENT, || self.variant.is_event())
    }

    pub fn is_directive(&self) -> bool {
        self.reflector
            .flags
            .get_or_compute(flags::IS_DIRECTIVE, || self.variant.is_directive())
    }

    pub fn is_implicit(&self) -> bool {
        self.reflector
            .flags
            .get_or_compute(flags::IS_IMPLICIT, || self.variant.is_implicit())
    }

    pub fn is_attachable(&self) -> bool {
        self.reflector
            .flags
            .get_or_compute(flags::IS_ATTACHABLE, || self.variant.is_attachable())
    }

    pub fn is_static(&self) -> bool {
        self.reflector.flags.get_or_compute(flags::IS_STATIC, || {
            match &self.variant {
                MemberVariant::InstanceProperty(p) => p.property.property.is_static,
                MemberVariant::InstanceEvent(e) => e.event.event.is_static,
                // attached accessors are static methods, but the member
                // itself applies per-instance
                _ => false,
            }
        })
    }

    /// The unresolvable-member reason, when resolution recorded one.
    pub fn unknown_reason(&self) -> Option<&SchemaError> {
        match &self.variant {
            MemberVariant::UnknownMember(u) => u.reason.as_ref(),
            _ => None,
        }
    }

    /// The getter accessor, settled on first demand. Racing computations
    /// are deterministic, so the first store wins harmlessly.
    pub fn getter(&self) -> Option<MethodDescription> {
        if let Some(settled) = self.reflector.getter.get() {
            return settled.value().copied();
        }
        let computed = match &self.variant {
            MemberVariant::InstanceProperty(p) => p.property.getter(),
            MemberVariant::AttachedProperty(a) => a.getter,
            _ => None,
        };
        self.reflector
            .getter
            .set_if_unset(computed.into())
            .value()
            .copied()
    }

    /// The setter accessor. For events this is the add-handler method:
    /// assigning to an event in markup attaches a handler.
    pub fn setter(&self) -> Option<MethodDescription> {
        if let Some(settled) = self.reflector.setter.get() {
            return settled.value().copied();
        }
        let computed = match &self.variant {
            MemberVariant::InstanceProperty(p) => p.property.setter(),
            MemberVariant::AttachedProperty(a) => a.setter,
            MemberVariant::InstanceEvent(e) => Some(e.event.adder()),
            MemberVariant::AttachedEvent(e) => Some(e.adder),
            _ => None,
        };
        self.reflector
            .setter
            .set_if_unset(computed.into())
            .value()
            .copied()
    }

    pub fn is_read_only(&self) -> bool {
        self.reflector.flags.get_or_compute(flags::IS_READ_ONLY, || {
            !self.is_unknown() && self.getter().is_some() && self.setter().is_none()
        })
    }

    pub fn is_write_only(&self) -> bool {
        self.reflector
            .flags
            .get_or_compute(flags::IS_WRITE_ONLY, || {
                !self.is_unknown() && self.getter().is_none() && self.setter().is_some()
            })
    }

    pub fn is_read_public(&self) -> bool {
        self.reflector
            .flags
            .get_or_compute(flags::IS_READ_PUBLIC, || {
                self.getter()
                    .map(|g| g.method.visibility == Visibility::Public)
                    .unwrap_or(false)
            })
    }

    pub fn is_write_public(&self) -> bool {
        self.reflector
            .flags
            .get_or_compute(flags::IS_WRITE_PUBLIC, || {
                self.setter()
                    .map(|s| s.method.visibility == Visibility::Public)
                    .unwrap_or(false)
            })
    }

    pub fn is_ambient(&self) -> bool {
        self.reflector.flags.get_or_compute(flags::IS_AMBIENT, || {
            self.attributes()
                .iter()
                .any(|a| matches!(a, MemberAttribute::Ambient))
        })
    }

    /// The symbolic type of the member's value.
    pub fn value_type_ref(&self) -> TypeRef {
        match &self.variant {
            MemberVariant::InstanceProperty(p) => p.property.property.property_type.clone(),
            MemberVariant::AttachedProperty(a) => a
                .getter
                .and_then(|g| g.method.return_type.clone())
                .or_else(|| a.setter.and_then(|s| s.method.parameters.get(1).cloned()))
                .unwrap_or_else(corlib::object),
            MemberVariant::InstanceEvent(e) => e.event.event.handler_type.clone(),
            MemberVariant::AttachedEvent(e) => e
                .adder
                .method
                .parameters
                .get(1)
                .cloned()
                .unwrap_or_else(corlib::object),
            MemberVariant::DirectiveMember(d) => d.value_type.clone(),
            MemberVariant::ImplicitMember(i) => match i.kind {
                ImplicitKind::Initialization => corlib::string(),
                _ => corlib::object(),
            },
            MemberVariant::UnknownMember(_) => corlib::object(),
        }
    }

    /// For attached members: the type instances must have for the
    /// member to apply, taken from the accessor's first parameter.
    pub fn target_type_ref(&self) -> Option<TypeRef> {
        if let Some(settled) = self.reflector.target_type.get() {
            return settled.value().cloned();
        }
        let computed = match &self.variant {
            MemberVariant::AttachedProperty(a) => a
                .getter
                .or(a.setter)
                .and_then(|m| m.method.parameters.first().cloned()),
            MemberVariant::AttachedEvent(e) => e.adder.method.parameters.first().cloned(),
            _ => None,
        };
        self.reflector
            .target_type
            .set_if_unset(computed.into())
            .value()
            .cloned()
    }

    pub fn allowed_location(&self) -> AllowedLocation {
        match &self.variant {
            MemberVariant::DirectiveMember(d) => d.location,
            MemberVariant::ImplicitMember(_) => AllowedLocation::MemberElement,
            _ => AllowedLocation::Any,
        }
    }

    fn attributes(&self) -> &'static [MemberAttribute] {
        match &self.variant {
            MemberVariant::InstanceProperty(p) => &p.property.property.attributes,
            MemberVariant::InstanceEvent(e) => &e.event.event.attributes,
            _ => &[],
        }
    }

    fn string_attribute(
        &self,
        slot: &LazySlotString,
        pick: impl Fn(&MemberAttribute) -> Option<&String>,
    ) -> Option<String> {
        if let Some(settled) = slot.get() {
            return settled.value().cloned();
        }
        let computed = self.attributes().iter().find_map(|a| pick(a).cloned());
        slot.set_if_unset(computed.into()).value().cloned()
    }

    pub fn type_converter(&self) -> Option<String> {
        self.string_attribute(&self.reflector.type_converter, |a| match a {
            MemberAttribute::TypeConverter(n) => Some(n),
            _ => None,
        })
    }

    pub fn value_serializer(&self) -> Option<String> {
        self.string_attribute(&self.reflector.value_serializer, |a| match a {
            MemberAttribute::ValueSerializer(n) => Some(n),
            _ => None,
        })
    }

    pub fn deferring_loader(&self) -> Option<String> {
        self.string_attribute(&self.reflector.deferring_loader, |a| match a {
            MemberAttribute::DeferredLoader(n) => Some(n),
            _ => None,
        })
    }

    pub fn constructor_argument(&self) -> Option<String> {
        self.string_attribute(&self.reflector.constructor_argument, |a| match a {
            MemberAttribute::ConstructorArgument(n) => Some(n),
            _ => None,
        })
    }

    /// `None` means no default value is recorded; `Some(Value::Null)`
    /// means the recorded default is null.
    pub fn default_value(&self) -> Option<Value> {
        if let Some(settled) = self.reflector.default_value.get() {
            return settled.value().cloned();
        }
        let computed = self.attributes().iter().find_map(|a| match a {
            MemberAttribute::DefaultValue(v) => Some(v.clone()),
            _ => None,
        });
        self.reflector
            .default_value
            .set_if_unset(computed.into())
            .value()
            .cloned()
    }

    pub fn has_default_value(&self) -> bool {
        self.default_value().is_some()
    }

    pub fn serialization_visibility(&self) -> SerializationVisibility {
        *self.reflector.serialization_visibility.get_or_init(|| {
            self.attributes()
                .iter()
                .find_map(|a| match a {
                    MemberAttribute::DesignerSerializationVisibility(v) => Some(*v),
                    _ => None,
                })
                .unwrap_or(SerializationVisibility::Visible)
        })
    }

    /// Names of the properties this member depends on, as declared.
    pub fn depends_on_names(&self) -> &[String] {
        self.reflector.depends_on.get_or_init(|| {
            self.attributes()
                .iter()
                .filter_map(|a| match a {
                    MemberAttribute::DependsOn(n) => Some(n.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn invoker(&self) -> crate::invoke::XamlMemberInvoker {
        crate::invoke::XamlMemberInvoker::new(self.clone())
    }

    /// Validate the depends-on declarations against the declaring type.
    pub fn check_depends_on(
        &self,
        resolve: impl Fn(&str) -> bool,
    ) -> Result<(), XamlError> {
        for target in self.depends_on_names() {
            if !resolve(target) {
                return Err(SchemaError::UnknownDependsOn {
                    type_name: self
                        .declaring_type
                        .map(|t| t.type_name())
                        .unwrap_or_default(),
                    member_name: self.name.to_string(),
                    target: target.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

type LazySlotString = crate::utils::LazySlot<String>;

impl Debug for XamlMember {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.declaring_type {
            Some(t) => write!(f, "{}.{} ({})", t.type_name(), self.name, self.variant.kind_name()),
            None => write!(f, "{} ({})", self.name, self.variant.kind_name()),
        }
    }
}

impl PartialEq for XamlMember {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.declaring_type == other.declaring_type
            && self.variant.kind_name() == other.variant.kind_name()
    }
}

impl Eq for XamlMember {}
