//! The schema context: root owner of every per-type and per-member
//! cache for one markup-processing session.
//!
//! All state that the original design kept in global statics lives
//! here instead; callers construct one context over a registry and pass
//! it by reference.

use crate::error::{ResolveError, SchemaError};
use crate::registry::corlib;
use crate::registry::NativeRegistry;
use crate::schema::directive::{AllowedLocation, Directive, ImplicitKind};
use crate::schema::member::{DirectiveMember, ImplicitMember, MemberVariant, UnknownMember, XamlMember};
use crate::schema::member_reflector::MemberReflector;
use crate::schema::namespace::XamlNamespace;
use crate::schema::type_reflector::TypeReflector;
use crate::schema::xaml_type::XamlType;
use crate::types::{AssemblyS, TypeDescription};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

pub struct XamlSchemaContext {
    registry: Arc<NativeRegistry>,
    reflectors: DashMap<TypeDescription, Arc<TypeReflector>>,
    namespaces: DashMap<String, Arc<XamlNamespace>>,
    directives: HashMap<&'static str, XamlMember>,
    unknown_type_reflector: Arc<TypeReflector>,
    unknown_member_reflector: Arc<MemberReflector>,
}

impl XamlSchemaContext {
    pub fn new(registry: Arc<NativeRegistry>) -> Self {
        let mut directives = HashMap::new();
        for (name, directive, value_type, location) in [
            ("Key", Directive::Key, corlib::object(), AllowedLocation::Any),
            (
                "Name",
                Directive::Name,
                corlib::string(),
                AllowedLocation::Attribute,
            ),
            (
                "Uid",
                Directive::Uid,
                corlib::string(),
                AllowedLocation::Attribute,
            ),
            (
                "Lang",
                Directive::Lang,
                corlib::string(),
                AllowedLocation::Attribute,
            ),
        ] {
            directives.insert(
                name,
                XamlMember::new(
                    name,
                    None,
                    MemberVariant::from(DirectiveMember {
                        directive,
                        value_type,
                        location,
                    }),
                    Arc::new(MemberReflector::new()),
                ),
            );
        }
        for kind in ImplicitKind::ALL {
            directives.insert(
                kind.markup_name(),
                XamlMember::new(
                    kind.markup_name(),
                    None,
                    MemberVariant::from(ImplicitMember { kind }),
                    Arc::new(MemberReflector::new()),
                ),
            );
        }

        Self {
            registry,
            reflectors: DashMap::new(),
            namespaces: DashMap::new(),
            directives,
            unknown_type_reflector: Arc::new(TypeReflector::unknown()),
            unknown_member_reflector: Arc::new(MemberReflector::unknown()),
        }
    }

    pub fn registry(&self) -> &NativeRegistry {
        &self.registry
    }

    /// The schema type for a resolved descriptor. Reflectors are
    /// created on first query and shared for the context's lifetime.
    pub fn xaml_type_for(&self, td: TypeDescription) -> XamlType {
        let reflector = self
            .reflectors
            .entry(td)
            .or_insert_with(|| Arc::new(TypeReflector::new(td)))
            .value()
            .clone();
        XamlType::from_parts(td.type_name(), reflector)
    }

    /// Resolve a symbolic reference, degrading to the unknown sentinel
    /// rather than failing: callers need not null-check.
    pub fn xaml_type_from_ref(
        &self,
        scope: Option<AssemblyS>,
        r: &crate::registry::metadata::TypeRef,
    ) -> XamlType {
        let scope = scope.unwrap_or_else(|| self.registry.core());
        match self.registry.resolve(scope, r) {
            Ok(td) => self.xaml_type_for(td),
            Err(_) => self.unknown_type(&r.full_name),
        }
    }

    pub fn core_xaml_type(&self, full_name: &str) -> Result<XamlType, ResolveError> {
        Ok(self.xaml_type_for(self.registry.core_type(full_name)?))
    }

    /// A frozen unknown-type sentinel under the markup-supplied name.
    /// All unknown types share one pre-settled reflector, so the "type
    /// not found" path never computes or locks.
    pub fn unknown_type(&self, name: &str) -> XamlType {
        XamlType::from_parts(name, self.unknown_type_reflector.clone())
    }

    /// The terminal unknown-member sentinel, sharing the frozen member
    /// reflector. `reason` carries the schema error that made
    /// resolution fail, when there was one.
    pub fn unknown_member(
        &self,
        name: &str,
        declaring: Option<TypeDescription>,
        reason: Option<SchemaError>,
    ) -> XamlMember {
        XamlMember::new(
            name,
            declaring,
            MemberVariant::from(UnknownMember { reason }),
            self.unknown_member_reflector.clone(),
        )
    }

    /// A registered language directive or implicit pseudo-member.
    /// Distinct from the unknown sentinel: an unregistered directive
    /// name is a hard not-found.
    pub fn get_xaml_directive(&self, name: &str) -> Result<XamlMember, ResolveError> {
        self.directives
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::DirectiveNotFound(name.to_string()))
    }

    pub(crate) fn lookup_directive_member(&self, name: &str) -> Option<XamlMember> {
        self.directives.get(name).cloned()
    }

    /// Map a namespace URI onto an (assembly, native namespace) pair.
    /// A URI may accumulate several candidates; lookups scan them in
    /// registration order.
    pub fn register_namespace(
        &self,
        uri: &str,
        assembly: &str,
        native_namespace: &str,
    ) -> Result<(), ResolveError> {
        let asm = self.registry.assembly(assembly)?;
        let ns = self
            .namespaces
            .entry(uri.to_string())
            .or_insert_with(|| Arc::new(XamlNamespace::new(uri)))
            .value()
            .clone();
        ns.add_candidate(asm, native_namespace.to_string());
        tracing::debug!(uri, assembly, native_namespace, "registered namespace");
        Ok(())
    }

    pub fn get_namespace(&self, uri: &str) -> Result<Arc<XamlNamespace>, ResolveError> {
        self.namespaces
            .get(uri)
            .map(|ns| ns.value().clone())
            .ok_or_else(|| ResolveError::NamespaceNotFound(uri.to_string()))
    }

    pub fn namespace_uris(&self) -> Vec<String> {
        self.namespaces.iter().map(|e| e.key().clone()).collect()
    }

    /// Resolve a markup (URI, name) pair. An unregistered URI is an
    /// error; a registered URI with no such type yields the unknown
    /// sentinel.
    pub fn get_xaml_type(&self, uri: &str, name: &str) -> Result<XamlType, ResolveError> {
        let ns = self.get_namespace(uri)?;
        Ok(ns
            .get_type(self, name)
            .unwrap_or_else(|| self.unknown_type(name)))
    }

    pub fn reflector_count(&self) -> usize {
        self.reflectors.len()
    }
}
