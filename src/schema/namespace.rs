//! Namespace-URI resolution.
//!
//! A `XamlNamespace` maps markup type names to native types across the
//! candidate (assembly, native namespace) pairs registered for one URI.
//! Lookups are cached per namespace, misses included; enumerating the
//! namespace completes the cache, purging the negative entries.

use crate::schema::context::XamlSchemaContext;
use crate::schema::xaml_type::XamlType;
use crate::types::AssemblyS;
use crate::utils::ThreadSafeDictionary;
use parking_lot::RwLock;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub struct XamlNamespace {
    uri: Arc<str>,
    candidates: RwLock<Vec<(AssemblyS, String)>>,
    types: ThreadSafeDictionary<String, XamlType>,
}

impl XamlNamespace {
    pub(crate) fn new(uri: &str) -> Self {
        Self {
            uri: Arc::from(uri),
            candidates: RwLock::new(Vec::new()),
            types: ThreadSafeDictionary::new(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub(crate) fn add_candidate(&self, assembly: AssemblyS, native_namespace: String) {
        self.candidates.write().push((assembly, native_namespace));
        // past misses may now resolve
        self.types.purge_negatives();
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.read().len()
    }

    /// Resolve a markup type name against the candidates, in
    /// registration order. Public types only; the first hit wins and is
    /// cached, as is a miss.
    pub fn get_type(&self, ctx: &XamlSchemaContext, name: &str) -> Option<XamlType> {
        if let Some(cached) = self.types.try_get(&name.to_string()) {
            return cached;
        }

        let candidates = self.candidates.read().clone();
        let mut found = None;
        for (assembly, native_namespace) in candidates {
            let full_name = if native_namespace.is_empty() {
                name.to_string()
            } else {
                format!("{native_namespace}.{name}")
            };
            if let Some(td) = ctx.registry().find_in_assembly(assembly, &full_name) {
                if td.is_public() {
                    found = Some(ctx.xaml_type_for(td));
                    break;
                }
            }
        }
        self.types.try_add(name.to_string(), found)
    }

    /// Enumerate every public type the candidates expose and complete
    /// the cache (a one-way transition that drops negative entries).
    pub fn get_all_types(&self, ctx: &XamlSchemaContext) -> Vec<XamlType> {
        let candidates = self.candidates.read().clone();
        for (assembly, native_namespace) in candidates {
            for definition in &assembly.definition().types {
                if definition.namespace != native_namespace {
                    continue;
                }
                let td = crate::types::TypeDescription {
                    assembly,
                    definition,
                };
                if !td.is_public() {
                    continue;
                }
                self.types
                    .try_add(definition.name.clone(), Some(ctx.xaml_type_for(td)));
            }
        }
        self.types.mark_complete();
        tracing::debug!(uri = %self.uri, types = self.types.len(), "enumerated namespace");
        self.types.values()
    }

    pub fn is_complete(&self) -> bool {
        self.types.is_complete()
    }
}

impl Debug for XamlNamespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "XamlNamespace({})", self.uri)
    }
}
