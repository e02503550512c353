//! The native registry: this crate's stand-in for the hosting runtime's
//! reflection facility.
//!
//! Loaded assemblies are leaked to `'static` so descriptors can be
//! `Copy` handles with pointer identity. Resolution of symbolic
//! [`TypeRef`]s is cached per registry; metadata is immutable once
//! loaded, so cached results never need invalidation.

use crate::error::ResolveError;
use crate::registry::metadata::{AssemblyDef, TypeKind, TypeRef};
use crate::types::{AssemblyS, TypeDescription};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod builder;
pub mod corlib;
pub mod metadata;

pub struct NativeRegistry {
    by_name: DashMap<String, AssemblyS>,
    load_order: RwLock<Vec<AssemblyS>>,
    core: AssemblyS,
    core_cache: DashMap<String, TypeDescription>,
    type_cache: DashMap<(AssemblyS, TypeRef), TypeDescription>,
    pub type_cache_hits: AtomicU64,
    pub type_cache_misses: AtomicU64,
}

impl NativeRegistry {
    pub fn new() -> Self {
        let leaked: &'static AssemblyDef = Box::leak(Box::new(corlib::core_assembly()));
        let core = AssemblyS::new(leaked);
        let registry = Self {
            by_name: DashMap::new(),
            load_order: RwLock::new(Vec::new()),
            core,
            core_cache: DashMap::new(),
            type_cache: DashMap::new(),
            type_cache_hits: AtomicU64::new(0),
            type_cache_misses: AtomicU64::new(0),
        };
        registry.by_name.insert(leaked.name.clone(), core);
        registry.load_order.write().push(core);
        registry
    }

    pub fn core(&self) -> AssemblyS {
        self.core
    }

    /// Register an assembly, leaking its metadata for the life of the
    /// process. Descriptors into it stay valid forever.
    pub fn load(&self, def: AssemblyDef) -> AssemblyS {
        let leaked: &'static AssemblyDef = Box::leak(Box::new(def));
        let asm = AssemblyS::new(leaked);
        tracing::debug!(
            assembly = leaked.name.as_str(),
            types = leaked.types.len(),
            "loaded assembly"
        );
        self.by_name.insert(leaked.name.clone(), asm);
        self.load_order.write().push(asm);
        asm
    }

    pub fn assembly(&self, name: &str) -> Result<AssemblyS, ResolveError> {
        self.by_name
            .get(name)
            .map(|a| *a)
            .ok_or_else(|| ResolveError::AssemblyNotFound(name.to_string()))
    }

    pub fn assemblies(&self) -> Vec<AssemblyS> {
        self.load_order.read().clone()
    }

    pub fn type_cache_size(&self) -> usize {
        self.type_cache.len()
    }

    pub fn find_in_assembly(&self, asm: AssemblyS, full_name: &str) -> Option<TypeDescription> {
        asm.definition()
            .types
            .iter()
            .find(|t| t.full_name() == full_name)
            .map(|definition| TypeDescription {
                assembly: asm,
                definition,
            })
    }

    pub fn core_type(&self, full_name: &str) -> Result<TypeDescription, ResolveError> {
        if let Some(cached) = self.core_cache.get(full_name) {
            return Ok(*cached);
        }
        let result = self
            .find_in_assembly(self.core, full_name)
            .ok_or_else(|| ResolveError::TypeNotFound(full_name.to_string()))?;
        self.core_cache.insert(full_name.to_string(), result);
        Ok(result)
    }

    /// Resolve a symbolic reference against `scope`: an explicit
    /// assembly wins, then the scope assembly, then the core assembly.
    pub fn resolve(&self, scope: AssemblyS, r: &TypeRef) -> Result<TypeDescription, ResolveError> {
        let key = (scope, r.clone());
        if let Some(cached) = self.type_cache.get(&key) {
            self.type_cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(*cached);
        }
        self.type_cache_misses.fetch_add(1, Ordering::Relaxed);

        let result = match &r.assembly {
            Some(name) => {
                let asm = self.assembly(name)?;
                self.find_in_assembly(asm, &r.full_name)
            }
            None => self
                .find_in_assembly(scope, &r.full_name)
                .or_else(|| self.find_in_assembly(self.core, &r.full_name)),
        }
        .ok_or_else(|| ResolveError::TypeNotFound(r.full_name.clone()))?;

        self.type_cache.insert(key, result);
        Ok(result)
    }

    /// Walk a type and its base classes, most-derived first. The walk
    /// ends silently if a base reference does not resolve.
    pub fn ancestors(&self, child: TypeDescription) -> impl Iterator<Item = TypeDescription> + '_ {
        AncestorsImpl {
            registry: self,
            child: Some(child),
        }
    }

    /// Whether `child` is `ancestor` or inherits from it.
    pub fn is_subclass_of(&self, child: TypeDescription, ancestor: TypeDescription) -> bool {
        self.ancestors(child).any(|a| a == ancestor)
    }

    /// Whether internals of `declaring` are usable from `accessor`.
    pub fn is_internal_visible(&self, declaring: AssemblyS, accessor: AssemblyS) -> bool {
        declaring == accessor
            || declaring
                .definition()
                .friends
                .iter()
                .any(|f| f == accessor.name())
    }

    /// All interface references a type satisfies: declared on the type,
    /// inherited from base classes, and extended by other interfaces.
    /// References keep their generic arguments; duplicates (same base,
    /// same arguments) appear once. Unresolvable references stay in the
    /// result but are not expanded.
    pub fn interface_closure(&self, td: TypeDescription) -> Vec<TypeRef> {
        let mut seen: HashSet<TypeRef> = HashSet::new();
        let mut out = Vec::new();
        let mut queue: Vec<(AssemblyS, TypeRef)> = Vec::new();

        for t in self.ancestors(td) {
            if matches!(t.definition.kind, TypeKind::Interface) {
                // the walk can start at an interface; include it
                queue.push((t.assembly, TypeRef::named(t.type_name())));
            }
            for i in &t.definition.implements {
                queue.push((t.assembly, i.clone()));
            }
        }

        while let Some((scope, iface)) = queue.pop() {
            if !seen.insert(iface.clone()) {
                continue;
            }
            if let Ok(resolved) = self.resolve(scope, &iface) {
                for extended in &resolved.definition.implements {
                    queue.push((resolved.assembly, extended.clone()));
                }
            }
            out.push(iface);
        }
        out
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct AncestorsImpl<'a> {
    registry: &'a NativeRegistry,
    child: Option<TypeDescription>,
}

impl<'a> Iterator for AncestorsImpl<'a> {
    type Item = TypeDescription;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.child?;
        self.child = match &child.definition.extends {
            None => None,
            Some(base) => match self.registry.resolve(child.assembly, base) {
                Ok(parent) => Some(parent),
                Err(e) => {
                    tracing::warn!(
                        ty = %child.type_name(),
                        error = %e,
                        "base type did not resolve; ending ancestor walk"
                    );
                    None
                }
            },
        };
        Some(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builder::AssemblyBuilder;
    use crate::registry::corlib;

    #[test]
    fn core_types_resolve() {
        let registry = NativeRegistry::new();
        let object = registry.core_type(corlib::OBJECT).unwrap();
        assert_eq!(object.type_name(), "System.Object");
        // cached second lookup returns the same descriptor
        assert_eq!(registry.core_type(corlib::OBJECT).unwrap(), object);
    }

    #[test]
    fn resolution_prefers_scope_assembly_then_core() {
        let registry = NativeRegistry::new();
        let asm = registry.load(
            AssemblyBuilder::new("App")
                .ty("App", "Thing", |t| t.extends(corlib::object()))
                .build(),
        );
        let local = registry.resolve(asm, &TypeRef::named("App.Thing")).unwrap();
        assert_eq!(local.assembly, asm);
        let core = registry.resolve(asm, &corlib::object()).unwrap();
        assert_eq!(core.assembly, registry.core());
    }

    #[test]
    fn ancestors_walk_most_derived_first() {
        let registry = NativeRegistry::new();
        let asm = registry.load(
            AssemblyBuilder::new("App")
                .ty("App", "Base", |t| t.extends(corlib::object()))
                .ty("App", "Derived", |t| t.extends(TypeRef::named("App.Base")))
                .build(),
        );
        let derived = registry.resolve(asm, &TypeRef::named("App.Derived")).unwrap();
        let names: Vec<_> = registry.ancestors(derived).map(|t| t.type_name()).collect();
        assert_eq!(names, ["App.Derived", "App.Base", "System.Object"]);
    }

    #[test]
    fn explicit_assembly_references_resolve() {
        let registry = NativeRegistry::new();
        registry.load(
            AssemblyBuilder::new("Lib")
                .ty("Lib", "Widget", |t| t.extends(corlib::object()))
                .build(),
        );
        let app = registry.load(AssemblyBuilder::new("App").build());

        let r = TypeRef::named("Lib.Widget").in_assembly("Lib");
        assert_eq!(registry.resolve(app, &r).unwrap().type_name(), "Lib.Widget");

        let ghost = TypeRef::named("Lib.Widget").in_assembly("Ghost");
        assert!(matches!(
            registry.resolve(app, &ghost),
            Err(ResolveError::AssemblyNotFound(_))
        ));
    }

    #[test]
    fn friend_assembly_visibility() {
        let registry = NativeRegistry::new();
        let lib = registry.load(AssemblyBuilder::new("Lib").friend("App").build());
        let app = registry.load(AssemblyBuilder::new("App").build());
        let other = registry.load(AssemblyBuilder::new("Other").build());
        assert!(registry.is_internal_visible(lib, lib));
        assert!(registry.is_internal_visible(lib, app));
        assert!(!registry.is_internal_visible(lib, other));
    }
}
