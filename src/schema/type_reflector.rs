//! Per-type lazy schema cache.
//!
//! One reflector exists per distinct native type queried through a
//! schema context (plus one frozen instance standing in for every
//! unknown type). All fields settle lazily, write-once; racing
//! recomputation is harmless and failed computations leave their field
//! unset so the next caller retries.

use crate::error::SchemaError;
use crate::registry::corlib::MARKUP_EXTENSION;
use crate::registry::metadata::{
    NativeMethod, TypeAttribute, TypeKind, TypeRef, Visibility, CTOR_NAME,
};
use crate::registry::NativeRegistry;
use crate::schema::collection::{self, CollectionFacts, CollectionKind};
use crate::schema::directive::Directive;
use crate::schema::member::XamlMember;
use crate::types::{EventDescription, MethodDescription, PropertyDescription, TypeDescription};
use crate::utils::{FlagCache, LazySlot, ThreadSafeDictionary};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::OnceLock;

/// Packed boolean facts about a type.
pub mod flags {
    pub const IS_PUBLIC: u16 = 1 << 0;
    pub const IS_CONSTRUCTIBLE: u16 = 1 << 1;
    pub const IS_NULLABLE: u16 = 1 << 2;
    pub const IS_MARKUP_EXTENSION: u16 = 1 << 3;
    pub const IS_NAME_SCOPE: u16 = 1 << 4;
    pub const IS_WHITESPACE_SIGNIFICANT: u16 = 1 << 5;
    pub const IS_AMBIENT: u16 = 1 << 6;
    pub const IS_UNKNOWN: u16 = 1 << 7;
}

pub struct TypeReflector {
    desc: Option<TypeDescription>,
    base_type: OnceLock<Option<TypeDescription>>,
    collection: OnceLock<CollectionFacts>,
    /// `Absent` = settled, no add method. Unset = not computed yet (or
    /// the last computation failed and must be retried).
    collection_add: LazySlot<MethodDescription>,
    dictionary_add: LazySlot<MethodDescription>,
    content_property: LazySlot<String>,
    type_converter: LazySlot<String>,
    value_serializer: LazySlot<String>,
    deferred_loader: LazySlot<String>,
    aliased_key: LazySlot<XamlMember>,
    aliased_name: LazySlot<XamlMember>,
    aliased_uid: LazySlot<XamlMember>,
    aliased_lang: LazySlot<XamlMember>,
    aliased_other: DashMap<Directive, Option<XamlMember>>,
    positional_parameters: DashMap<usize, Arc<[TypeRef]>>,
    members: ThreadSafeDictionary<String, XamlMember>,
    attachable_members: ThreadSafeDictionary<String, XamlMember>,
    flags: FlagCache,
}

impl TypeReflector {
    pub fn new(desc: TypeDescription) -> Self {
        Self::build(Some(desc))
    }

    /// The frozen reflector shared by all unknown types: every field is
    /// pre-settled so unknown types never compute or lock.
    pub fn unknown() -> Self {
        let r = Self::build(None);
        let _ = r.base_type.set(None);
        let _ = r.collection.set(CollectionFacts {
            kind: CollectionKind::None,
            item_type: None,
            key_type: None,
        });
        r.collection_add.set_absent_if_unset();
        r.dictionary_add.set_absent_if_unset();
        r.content_property.set_absent_if_unset();
        r.type_converter.set_absent_if_unset();
        r.value_serializer.set_absent_if_unset();
        r.deferred_loader.set_absent_if_unset();
        r.aliased_key.set_absent_if_unset();
        r.aliased_name.set_absent_if_unset();
        r.aliased_uid.set_absent_if_unset();
        r.aliased_lang.set_absent_if_unset();
        r.members.mark_complete();
        r.attachable_members.mark_complete();
        r.flags.set(flags::IS_UNKNOWN, true);
        for mask in [
            flags::IS_PUBLIC,
            flags::IS_CONSTRUCTIBLE,
            flags::IS_MARKUP_EXTENSION,
            flags::IS_NAME_SCOPE,
            flags::IS_WHITESPACE_SIGNIFICANT,
            flags::IS_AMBIENT,
        ] {
            r.flags.set(mask, false);
        }
        r.flags.set(flags::IS_NULLABLE, true);
        r
    }

    fn build(desc: Option<TypeDescription>) -> Self {
        Self {
            desc,
            base_type: OnceLock::new(),
            collection: OnceLock::new(),
            collection_add: LazySlot::new(),
            dictionary_add: LazySlot::new(),
            content_property: LazySlot::new(),
            type_converter: LazySlot::new(),
            value_serializer: LazySlot::new(),
            deferred_loader: LazySlot::new(),
            aliased_key: LazySlot::new(),
            aliased_name: LazySlot::new(),
            aliased_uid: LazySlot::new(),
            aliased_lang: LazySlot::new(),
            aliased_other: DashMap::new(),
            positional_parameters: DashMap::new(),
            members: ThreadSafeDictionary::new(),
            attachable_members: ThreadSafeDictionary::new(),
            flags: FlagCache::new(),
        }
    }

    pub fn description(&self) -> Option<TypeDescription> {
        self.desc
    }

    pub fn is_unknown(&self) -> bool {
        self.flags
            .get_or_compute(flags::IS_UNKNOWN, || self.desc.is_none())
    }

    fn type_name(&self) -> String {
        match self.desc {
            Some(d) => d.type_name(),
            None => "<unknown>".to_string(),
        }
    }

    pub fn lookup_base_type(&self, registry: &NativeRegistry) -> Option<TypeDescription> {
        *self.base_type.get_or_init(|| {
            let desc = self.desc?;
            desc.definition
                .extends
                .as_ref()
                .and_then(|base| registry.resolve(desc.assembly, base).ok())
        })
    }

    fn facts(&self, registry: &NativeRegistry) -> &CollectionFacts {
        self.collection.get_or_init(|| match self.desc {
            Some(desc) => collection::classify(registry, desc),
            None => CollectionFacts {
                kind: CollectionKind::None,
                item_type: None,
                key_type: None,
            },
        })
    }

    pub fn lookup_collection_kind(&self, registry: &NativeRegistry) -> CollectionKind {
        self.facts(registry).kind
    }

    pub fn lookup_item_type(&self, registry: &NativeRegistry) -> Option<TypeRef> {
        self.facts(registry).item_type.clone()
    }

    pub fn lookup_key_type(&self, registry: &NativeRegistry) -> Option<TypeRef> {
        self.facts(registry).key_type.clone()
    }

    /// The unique insertion method for `kind`, cached on success.
    /// Ambiguity errors propagate without settling the slot, so a later
    /// caller recomputes.
    pub fn lookup_add_method(
        &self,
        registry: &NativeRegistry,
        kind: CollectionKind,
    ) -> Result<Option<MethodDescription>, SchemaError> {
        let slot = match kind {
            CollectionKind::Collection => &self.collection_add,
            CollectionKind::Dictionary => &self.dictionary_add,
            _ => return Ok(None),
        };
        if let Some(settled) = slot.get() {
            return Ok(settled.value().copied());
        }
        let desc = match self.desc {
            Some(d) => d,
            None => return Ok(None),
        };
        let result = collection::lookup_add_method(desc, self.facts(registry), kind)?;
        Ok(slot.set_if_unset(result.into()).value().copied())
    }

    fn singular_type_attribute(
        &self,
        slot: &LazySlot<String>,
        attribute: &'static str,
        pick: impl Fn(&TypeAttribute) -> Option<&String>,
    ) -> Result<Option<String>, SchemaError> {
        if let Some(settled) = slot.get() {
            return Ok(settled.value().cloned());
        }
        let desc = match self.desc {
            Some(d) => d,
            None => return Ok(None),
        };
        let found: Vec<&String> = desc
            .definition
            .attributes
            .iter()
            .filter_map(|a| pick(a))
            .collect();
        if found.len() > 1 {
            return Err(SchemaError::DuplicateAttribute {
                type_name: desc.type_name(),
                attribute,
            });
        }
        let computed = found.first().map(|s| (*s).clone());
        Ok(slot.set_if_unset(computed.into()).value().cloned())
    }

    /// The name of the content property, if the type declares one.
    pub fn lookup_content_property(&self) -> Result<Option<String>, SchemaError> {
        self.singular_type_attribute(&self.content_property, "ContentProperty", |a: &TypeAttribute| match a {
            TypeAttribute::ContentProperty(n) => Some(n),
            _ => None,
        })
    }

    pub fn lookup_type_converter(&self) -> Result<Option<String>, SchemaError> {
        self.singular_type_attribute(&self.type_converter, "TypeConverter", |a: &TypeAttribute| match a {
            TypeAttribute::TypeConverter(n) => Some(n),
            _ => None,
        })
    }

    pub fn lookup_value_serializer(&self) -> Result<Option<String>, SchemaError> {
        self.singular_type_attribute(&self.value_serializer, "ValueSerializer", |a: &TypeAttribute| match a {
            TypeAttribute::ValueSerializer(n) => Some(n),
            _ => None,
        })
    }

    pub fn lookup_deferred_loader(&self) -> Result<Option<String>, SchemaError> {
        self.singular_type_attribute(&self.deferred_loader, "DeferredLoader", |a: &TypeAttribute| match a {
            TypeAttribute::DeferredLoader(n) => Some(n),
            _ => None,
        })
    }

    pub fn is_public(&self) -> bool {
        self.flags.get_or_compute(flags::IS_PUBLIC, || {
            self.desc.map(|d| d.is_public()).unwrap_or(false)
        })
    }

    /// Constructible from markup: a visible parameterless constructor.
    pub fn is_constructible(&self) -> bool {
        self.flags.get_or_compute(flags::IS_CONSTRUCTIBLE, || {
            self.desc
                .map(|d| {
                    d.definition.constructors().any(|c| {
                        c.parameters.is_empty() && c.visibility.is_schema_visible()
                    })
                })
                .unwrap_or(false)
        })
    }

    pub fn is_nullable(&self) -> bool {
        self.flags.get_or_compute(flags::IS_NULLABLE, || {
            self.desc
                .map(|d| !matches!(d.definition.kind, TypeKind::ValueType))
                .unwrap_or(true)
        })
    }

    pub fn is_markup_extension(&self, registry: &NativeRegistry) -> bool {
        self.flags.get_or_compute(flags::IS_MARKUP_EXTENSION, || {
            let desc = match self.desc {
                Some(d) => d,
                None => return false,
            };
            desc.definition
                .attributes
                .iter()
                .any(|a| matches!(a, TypeAttribute::MarkupExtension))
                || registry
                    .ancestors(desc)
                    .any(|a| a.type_name() == MARKUP_EXTENSION)
        })
    }

    pub fn is_name_scope(&self) -> bool {
        self.has_marker(flags::IS_NAME_SCOPE, |a| {
            matches!(a, TypeAttribute::NameScope)
        })
    }

    pub fn is_whitespace_significant(&self) -> bool {
        self.has_marker(flags::IS_WHITESPACE_SIGNIFICANT, |a| {
            matches!(a, TypeAttribute::WhitespaceSignificantCollection)
        })
    }

    pub fn is_ambient(&self) -> bool {
        self.has_marker(flags::IS_AMBIENT, |a| matches!(a, TypeAttribute::Ambient))
    }

    fn has_marker(&self, mask: u16, pred: impl Fn(&TypeAttribute) -> bool) -> bool {
        self.flags.get_or_compute(mask, || {
            self.desc
                .map(|d| d.definition.attributes.iter().any(|a| pred(a)))
                .unwrap_or(false)
        })
    }

    /// The cached positional-parameter list for a constructor arity.
    pub fn try_get_positional_parameters(&self, arity: usize) -> Option<Arc<[TypeRef]>> {
        self.positional_parameters
            .get(&arity)
            .map(|p| p.value().clone())
    }

    /// Record a computed list; the first writer wins.
    pub fn try_add_positional_parameters(
        &self,
        arity: usize,
        parameters: Arc<[TypeRef]>,
    ) -> Arc<[TypeRef]> {
        self.positional_parameters
            .entry(arity)
            .or_insert(parameters)
            .value()
            .clone()
    }

    /// Parameter types usable for positional construction at `arity`.
    pub fn lookup_positional_parameters(&self, arity: usize) -> Option<Arc<[TypeRef]>> {
        if let Some(cached) = self.try_get_positional_parameters(arity) {
            return Some(cached);
        }
        let desc = self.desc?;
        let ctor = desc
            .definition
            .constructors()
            .find(|c| c.parameters.len() == arity && c.visibility.is_schema_visible())?;
        let params: Arc<[TypeRef]> = ctor.parameters.clone().into();
        Some(self.try_add_positional_parameters(arity, params))
    }

    fn aliased_slot(&self, directive: &Directive) -> Option<&LazySlot<XamlMember>> {
        match directive {
            Directive::Key => Some(&self.aliased_key),
            Directive::Name => Some(&self.aliased_name),
            Directive::Uid => Some(&self.aliased_uid),
            Directive::Lang => Some(&self.aliased_lang),
            Directive::Other(_) => None,
        }
    }

    /// Cached alias lookup: outer `None` = not computed yet.
    pub fn try_get_aliased_property(&self, directive: &Directive) -> Option<Option<XamlMember>> {
        match self.aliased_slot(directive) {
            Some(slot) => slot.get().map(|p| p.value().cloned()),
            None => self
                .aliased_other
                .get(directive)
                .map(|entry| entry.value().clone()),
        }
    }

    /// Record an alias result; the first writer wins.
    pub fn try_add_aliased_property(
        &self,
        directive: Directive,
        member: Option<XamlMember>,
    ) -> Option<XamlMember> {
        match self.aliased_slot(&directive) {
            Some(slot) => slot.set_if_unset(member.into()).value().cloned(),
            None => self
                .aliased_other
                .entry(directive)
                .or_insert(member)
                .value()
                .clone(),
        }
    }

    /// The attribute carrying the aliased property name for a directive.
    fn alias_attribute(directive: &Directive) -> Option<(&'static str, fn(&TypeAttribute) -> Option<&String>)> {
        match directive {
            Directive::Key => Some(("DictionaryKeyProperty", |a: &TypeAttribute| match a {
                TypeAttribute::DictionaryKeyProperty(n) => Some(n),
                _ => None,
            })),
            Directive::Name => Some(("RuntimeNameProperty", |a: &TypeAttribute| match a {
                TypeAttribute::RuntimeNameProperty(n) => Some(n),
                _ => None,
            })),
            Directive::Uid => Some(("UidProperty", |a: &TypeAttribute| match a {
                TypeAttribute::UidProperty(n) => Some(n),
                _ => None,
            })),
            Directive::Lang => Some(("XmlLangProperty", |a: &TypeAttribute| match a {
                TypeAttribute::XmlLangProperty(n) => Some(n),
                _ => None,
            })),
            Directive::Other(_) => None,
        }
    }

    /// Resolve the concrete member a directive aliases on this type.
    /// The declaring attribute is searched most-derived-first; naming a
    /// nonexistent property is a schema error.
    pub fn lookup_aliased_property(
        &self,
        registry: &NativeRegistry,
        directive: &Directive,
    ) -> Result<Option<XamlMember>, SchemaError> {
        if let Some(cached) = self.try_get_aliased_property(directive) {
            return Ok(cached);
        }
        let desc = match self.desc {
            Some(d) => d,
            None => return Ok(None),
        };
        let (attribute, pick) = match Self::alias_attribute(directive) {
            Some(found) => found,
            None => return Ok(self.try_add_aliased_property(directive.clone(), None)),
        };

        let mut alias_name: Option<(TypeDescription, String)> = None;
        for ancestor in registry.ancestors(desc) {
            let found: Vec<&String> = ancestor
                .definition
                .attributes
                .iter()
                .filter_map(pick)
                .collect();
            if found.len() > 1 {
                return Err(SchemaError::DuplicateAttribute {
                    type_name: ancestor.type_name(),
                    attribute,
                });
            }
            if let Some(name) = found.first() {
                alias_name = Some((ancestor, (*name).clone()));
                break;
            }
        }

        let member = match alias_name {
            None => None,
            Some((attributed, property)) => match self.find_instance_member(registry, &property) {
                Some(member) => Some(member),
                None => {
                    return Err(SchemaError::UnknownAliasedProperty {
                        type_name: attributed.type_name(),
                        property,
                        attribute,
                    })
                }
            },
        };
        Ok(self.try_add_aliased_property(directive.clone(), member))
    }

    /// Steps 1-4 of member resolution: instance property, instance
    /// event, attached property, attached event. Later steps (directive,
    /// implicit, unknown) belong to the schema context.
    pub fn lookup_member(
        &self,
        registry: &NativeRegistry,
        name: &str,
    ) -> Result<Option<XamlMember>, SchemaError> {
        if let Some(cached) = self.members.try_get(&name.to_string()) {
            return Ok(cached);
        }
        if self.desc.is_none() {
            return Ok(None);
        }

        let resolved = match self.find_instance_member(registry, name) {
            Some(member) => Some(member),
            None => self.resolve_attachable(name)?,
        };
        Ok(self.members.try_add(name.to_string(), resolved))
    }

    /// Most-derived-first scan for a visible instance property or event.
    /// Non-visible declarations neither match nor hide a visible base
    /// declaration.
    fn find_instance_member(&self, registry: &NativeRegistry, name: &str) -> Option<XamlMember> {
        let desc = self.desc?;
        for ancestor in registry.ancestors(desc) {
            for property in &ancestor.definition.properties {
                if property.name == name && !property.is_static {
                    let pd = PropertyDescription {
                        parent: ancestor,
                        property,
                    };
                    if pd.is_schema_visible() {
                        return Some(XamlMember::instance_property(desc, pd));
                    }
                }
            }
            for event in &ancestor.definition.events {
                if event.name == name && !event.is_static {
                    let ed = EventDescription {
                        parent: ancestor,
                        event,
                    };
                    if ed.is_schema_visible() {
                        return Some(XamlMember::instance_event(desc, ed));
                    }
                }
            }
        }
        None
    }

    fn resolve_attachable(&self, name: &str) -> Result<Option<XamlMember>, SchemaError> {
        if let Some(property) = self.lookup_attachable_property(name)? {
            return Ok(Some(property));
        }
        self.lookup_attachable_event(name)
    }

    /// Static-method-pattern discovery of an attachable property
    /// `name`: `Get{name}(target)` and/or `Set{name}(target, value)`.
    pub fn lookup_attachable_property(&self, name: &str) -> Result<Option<XamlMember>, SchemaError> {
        if let Some(cached) = self.attachable_members.try_get(&name.to_string()) {
            return Ok(cached);
        }
        let desc = match self.desc {
            Some(d) => d,
            None => return Ok(None),
        };

        let getter_name = format!("Get{name}");
        let setter_name = format!("Set{name}");
        let getters = accessor_candidates(desc, &getter_name, |m| {
            m.parameters.len() == 1 && m.return_type.is_some()
        });
        let setters = accessor_candidates(desc, &setter_name, |m| m.parameters.len() == 2);

        let resolved = match pick_attachable_accessors(&getters, &setters) {
            Some((getter, setter)) => Some(XamlMember::attached_property(
                name,
                desc,
                getter.map(|g| desc.method_description(g)),
                setter.map(|s| desc.method_description(s)),
            )),
            None => {
                // no well-formed accessor; a malformed candidate with
                // the right name is a metadata error, not a miss
                if let Some(malformed) = first_malformed(desc, &getter_name, &setter_name) {
                    return Err(SchemaError::InvalidAttachedAccessor {
                        type_name: desc.type_name(),
                        method_name: malformed.name.clone(),
                    });
                }
                None
            }
        };
        Ok(self
            .attachable_members
            .try_add(name.to_string(), resolved))
    }

    /// Static-method-pattern discovery of an attachable event `name`:
    /// `Add{name}Handler(target, handler)`.
    pub fn lookup_attachable_event(&self, name: &str) -> Result<Option<XamlMember>, SchemaError> {
        let desc = match self.desc {
            Some(d) => d,
            None => return Ok(None),
        };
        let adder_name = format!("Add{name}Handler");
        let adders = accessor_candidates(desc, &adder_name, |m| m.parameters.len() == 2);
        if let Some(adder) = adders.first().copied() {
            return Ok(Some(XamlMember::attached_event(
                name,
                desc,
                desc.method_description(adder),
            )));
        }
        let malformed_exists = desc
            .definition
            .methods
            .iter()
            .any(|m| m.name == adder_name && m.is_static && m.parameters.len() != 2);
        if malformed_exists {
            return Err(SchemaError::InvalidAttachedAccessor {
                type_name: desc.type_name(),
                method_name: adder_name,
            });
        }
        Ok(None)
    }

    /// Enumerate every member of the type: already-cached members are
    /// reused, newly discovered ones are added, and the most-derived
    /// visible declaration wins per name. Completes the member cache.
    pub fn lookup_all_members(&self, registry: &NativeRegistry) -> Vec<XamlMember> {
        let desc = match self.desc {
            Some(d) => d,
            None => return Vec::new(),
        };
        if self.members.is_complete() {
            return self.members.values();
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();
        for ancestor in registry.ancestors(desc) {
            for property in &ancestor.definition.properties {
                if property.is_static || seen.contains(property.name.as_str()) {
                    continue;
                }
                let pd = PropertyDescription {
                    parent: ancestor,
                    property,
                };
                if !pd.is_schema_visible() {
                    continue;
                }
                seen.insert(&property.name);
                let member = self.members.try_add(
                    property.name.clone(),
                    Some(XamlMember::instance_property(desc, pd)),
                );
                result.extend(member);
            }
            for event in &ancestor.definition.events {
                if event.is_static || seen.contains(event.name.as_str()) {
                    continue;
                }
                let ed = EventDescription {
                    parent: ancestor,
                    event,
                };
                if !ed.is_schema_visible() {
                    continue;
                }
                seen.insert(&event.name);
                let member = self
                    .members
                    .try_add(event.name.clone(), Some(XamlMember::instance_event(desc, ed)));
                result.extend(member);
            }
        }
        self.members.mark_complete();
        tracing::debug!(
            ty = %self.type_name(),
            members = result.len(),
            "enumerated schema members"
        );
        result
    }
}

/// Static accessor candidates with a given name and shape, ordered
/// public-first and then by declaration order. The ordering is the
/// documented tie-break: among equally visible candidates the first
/// declared wins.
fn accessor_candidates(
    desc: TypeDescription,
    name: &str,
    well_formed: impl Fn(&NativeMethod) -> bool,
) -> Vec<&'static NativeMethod> {
    let type_is_public = desc.is_public();
    let mut candidates: Vec<&'static NativeMethod> = desc
        .definition
        .methods
        .iter()
        .filter(|m| m.name == name && m.is_static && well_formed(m))
        .filter(|m| m.visibility.is_schema_visible() || !type_is_public)
        .collect();
    candidates.sort_by_key(|m| m.visibility != Visibility::Public);
    candidates
}

/// Pair accessors: the first getter/setter combination whose value
/// types agree wins; a lone getter beats a type-mismatched pairing; a
/// lone well-formed setter is usable on its own.
fn pick_attachable_accessors<'m>(
    getters: &[&'m NativeMethod],
    setters: &[&'m NativeMethod],
) -> Option<(Option<&'m NativeMethod>, Option<&'m NativeMethod>)> {
    for getter in getters.iter().copied() {
        for setter in setters.iter().copied() {
            if getter.return_type.as_ref() == setter.parameters.get(1) {
                return Some((Some(getter), Some(setter)));
            }
        }
    }
    if let Some(getter) = getters.first().copied() {
        return Some((Some(getter), None));
    }
    if let Some(setter) = setters.first().copied() {
        return Some((None, Some(setter)));
    }
    None
}

fn first_malformed(
    desc: TypeDescription,
    getter_name: &str,
    setter_name: &str,
) -> Option<&'static NativeMethod> {
    desc.definition
        .methods
        .iter()
        .filter(|m| m.is_static && m.name != CTOR_NAME)
        .find(|m| {
            (m.name == setter_name && m.parameters.len() != 2)
                || (m.name == getter_name
                    && (m.parameters.len() != 1 || m.return_type.is_none()))
        })
}
