//! Collection-kind inference.
//!
//! Classifies a native type as array, dictionary, collection, or none,
//! and locates the unique element-insertion method. Classification is a
//! pure function of the metadata; the outcomes are mutually exclusive
//! and dictionary always beats collection.

use crate::error::SchemaError;
use crate::registry::corlib::{
    ICOLLECTION_T, IDICTIONARY, IDICTIONARY_T, IENUMERABLE, IENUMERABLE_T, IENUMERATOR,
    IENUMERATOR_T, ILIST, ILIST_T, OBJECT,
};
use crate::registry::metadata::{NativeMethod, TypeKind, TypeRef};
use crate::registry::NativeRegistry;
use crate::types::{MethodDescription, TypeDescription};
use std::collections::HashSet;

pub const ADD_METHOD: &str = "Add";
pub const GET_ENUMERATOR: &str = "GetEnumerator";
const MOVE_NEXT: &str = "MoveNext";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    None,
    Array,
    Collection,
    Dictionary,
}

/// Outcome of classification. `item_type`/`key_type` are `None` when the
/// metadata does not determine them uniquely (ambiguous generic
/// instantiations); add-method lookup then requires an `Object`-typed
/// overload to succeed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionFacts {
    pub kind: CollectionKind,
    pub item_type: Option<TypeRef>,
    pub key_type: Option<TypeRef>,
}

impl CollectionFacts {
    fn none() -> Self {
        Self {
            kind: CollectionKind::None,
            item_type: None,
            key_type: None,
        }
    }
}

pub fn classify(registry: &NativeRegistry, td: TypeDescription) -> CollectionFacts {
    if let TypeKind::Array(element) = &td.definition.kind {
        return CollectionFacts {
            kind: CollectionKind::Array,
            item_type: Some(element.clone()),
            key_type: None,
        };
    }

    let interfaces = registry.interface_closure(td);
    if !is_enumerable(registry, td, &interfaces) {
        return CollectionFacts::none();
    }

    if interfaces
        .iter()
        .any(|i| i.full_name == IDICTIONARY || i.full_name == IDICTIONARY_T)
    {
        let (key_type, item_type) = dictionary_types(&interfaces);
        return CollectionFacts {
            kind: CollectionKind::Dictionary,
            item_type,
            key_type,
        };
    }

    if interfaces
        .iter()
        .any(|i| i.full_name == ILIST || i.full_name == ILIST_T || i.full_name == ICOLLECTION_T)
    {
        return CollectionFacts {
            kind: CollectionKind::Collection,
            item_type: collection_item_type(&interfaces),
            key_type: None,
        };
    }

    // No collection protocol; fall back to the Add-method shape.
    let two_arg: Vec<_> = eligible_adds(td, 2).collect();
    if !two_arg.is_empty() {
        let (key_type, item_type) = if two_arg.len() == 1 {
            (
                Some(two_arg[0].parameters[0].clone()),
                Some(two_arg[0].parameters[1].clone()),
            )
        } else {
            (None, None)
        };
        return CollectionFacts {
            kind: CollectionKind::Dictionary,
            item_type,
            key_type,
        };
    }

    let one_arg: Vec<_> = eligible_adds(td, 1).collect();
    if !one_arg.is_empty() {
        let item_type = if one_arg.len() == 1 {
            Some(one_arg[0].parameters[0].clone())
        } else {
            None
        };
        return CollectionFacts {
            kind: CollectionKind::Collection,
            item_type,
            key_type: None,
        };
    }

    CollectionFacts::none()
}

/// Locate the unique insertion method for the requested kind.
///
/// `Ok(None)` means the type is not of that kind, or declares no
/// insertion method of its own. Multiple overloads succeed only when
/// the declared item/key types (or an `Object`-typed fallback) pick a
/// unique one; otherwise the ambiguity is an error rather than a guess.
pub fn lookup_add_method(
    td: TypeDescription,
    facts: &CollectionFacts,
    kind: CollectionKind,
) -> Result<Option<MethodDescription>, SchemaError> {
    if facts.kind != kind {
        return Ok(None);
    }
    let arity = match kind {
        CollectionKind::Collection => 1,
        CollectionKind::Dictionary => 2,
        _ => return Ok(None),
    };

    let candidates: Vec<&'static NativeMethod> = eligible_adds(td, arity).collect();
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(Some(td.method_description(candidates[0]))),
        n => {
            let expected: Option<Vec<&TypeRef>> = match kind {
                CollectionKind::Collection => facts.item_type.as_ref().map(|i| vec![i]),
                CollectionKind::Dictionary => match (&facts.key_type, &facts.item_type) {
                    (Some(k), Some(i)) => Some(vec![k, i]),
                    _ => None,
                },
                _ => None,
            };

            if let Some(expected) = expected {
                let matches: Vec<&'static NativeMethod> = candidates
                    .iter()
                    .copied()
                    .filter(|m| m.parameters.iter().zip(&expected).all(|(p, e)| p == *e))
                    .collect();
                if matches.len() == 1 {
                    return Ok(Some(td.method_description(matches[0])));
                }
            }

            // an all-Object overload resolves otherwise-ambiguous shapes
            let object_overloads: Vec<&'static NativeMethod> = candidates
                .iter()
                .copied()
                .filter(|m| m.parameters.iter().all(|p| p.full_name == OBJECT))
                .collect();
            if object_overloads.len() == 1 {
                return Ok(Some(td.method_description(object_overloads[0])));
            }

            Err(SchemaError::AmbiguousAddMethod {
                type_name: td.type_name(),
                detail: format!("{n} {arity}-parameter Add overloads and no unique match"),
            })
        }
    }
}

/// The sequence protocol: a well-known enumerable interface, or a
/// zero-argument `GetEnumerator` returning an enumerator-compatible
/// type.
fn is_enumerable(
    registry: &NativeRegistry,
    td: TypeDescription,
    interfaces: &[TypeRef],
) -> bool {
    if interfaces
        .iter()
        .any(|i| i.full_name == IENUMERABLE || i.full_name == IENUMERABLE_T)
    {
        return true;
    }
    td.definition
        .methods_named(GET_ENUMERATOR)
        .filter(|m| !m.is_static && m.parameters.is_empty())
        .filter_map(|m| m.return_type.as_ref())
        .any(|ret| is_enumerator_compatible(registry, td, ret))
}

fn is_enumerator_compatible(
    registry: &NativeRegistry,
    scope: TypeDescription,
    ret: &TypeRef,
) -> bool {
    if ret.full_name == IENUMERATOR || ret.full_name == IENUMERATOR_T {
        return true;
    }
    match registry.resolve(scope.assembly, ret) {
        Ok(ret_td) => {
            ret_td
                .definition
                .methods_named(MOVE_NEXT)
                .any(|m| !m.is_static && m.parameters.is_empty())
                || registry
                    .interface_closure(ret_td)
                    .iter()
                    .any(|i| i.full_name == IENUMERATOR || i.full_name == IENUMERATOR_T)
        }
        Err(_) => false,
    }
}

/// Key/item types from the dictionary interfaces: unique generic
/// instantiation wins, multiple distinct instantiations yield unknown,
/// non-generic only means `Object`.
fn dictionary_types(interfaces: &[TypeRef]) -> (Option<TypeRef>, Option<TypeRef>) {
    let generic: HashSet<&TypeRef> = interfaces
        .iter()
        .filter(|i| i.full_name == IDICTIONARY_T && i.args.len() == 2)
        .collect();
    let mut instantiations = generic.into_iter();
    match (instantiations.next(), instantiations.next()) {
        (None, _) => (Some(TypeRef::named(OBJECT)), Some(TypeRef::named(OBJECT))),
        (Some(only), None) => (Some(only.args[0].clone()), Some(only.args[1].clone())),
        _ => (None, None),
    }
}

fn collection_item_type(interfaces: &[TypeRef]) -> Option<TypeRef> {
    let generic: HashSet<&TypeRef> = interfaces
        .iter()
        .filter(|i| (i.full_name == ICOLLECTION_T || i.full_name == ILIST_T) && i.args.len() == 1)
        .collect();
    let mut instantiations = generic.into_iter();
    match (instantiations.next(), instantiations.next()) {
        (None, _) => Some(TypeRef::named(OBJECT)),
        (Some(only), None) => Some(only.args[0].clone()),
        _ => None,
    }
}

/// `Add` overloads usable for insertion. Public and internal methods
/// are always eligible; a non-public declaring type may back a public
/// collection surface, so its private methods are eligible too.
fn eligible_adds(
    td: TypeDescription,
    arity: usize,
) -> impl Iterator<Item = &'static NativeMethod> {
    let type_is_public = td.is_public();
    td.definition
        .methods_named(ADD_METHOD)
        .filter(move |m| {
            !m.is_static
                && m.parameters.len() == arity
                && (m.visibility.is_schema_visible() || !type_is_public)
        })
}
