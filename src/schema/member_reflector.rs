//! Per-member lazy schema cache.
//!
//! One reflector exists per (declaring type, member name) pair. Every
//! field follows the write-once-then-frozen discipline: computed on
//! first demand, settled forever, recomputed harmlessly under races
//! because the inputs are immutable metadata. A failed computation
//! leaves its field unset, so later callers retry instead of observing
//! a poisoned cache.

use crate::registry::metadata::SerializationVisibility;
use crate::registry::metadata::TypeRef;
use crate::registry::NativeRegistry;
use crate::types::{AssemblyS, MethodDescription, TypeDescription};
use crate::utils::{FlagCache, LazySlot};
use crate::value::Value;
use std::sync::OnceLock;

/// Packed boolean facts about a member.
pub mod flags {
    pub const IS_EVENT: u16 = 1 << 0;
    pub const IS_DIRECTIVE: u16 = 1 << 1;
    pub const IS_IMPLICIT: u16 = 1 << 2;
    pub const IS_ATTACHABLE: u16 = 1 << 3;
    pub const IS_STATIC: u16 = 1 << 4;
    pub const IS_READ_ONLY: u16 = 1 << 5;
    pub const IS_WRITE_ONLY: u16 = 1 << 6;
    pub const IS_AMBIENT: u16 = 1 << 7;
    pub const IS_UNKNOWN: u16 = 1 << 8;
    pub const IS_READ_PUBLIC: u16 = 1 << 9;
    pub const IS_WRITE_PUBLIC: u16 = 1 << 10;
}

#[derive(Default)]
pub struct MemberReflector {
    pub(crate) getter: LazySlot<MethodDescription>,
    pub(crate) setter: LazySlot<MethodDescription>,
    /// For attached members: the type the member applies to, computed
    /// from the accessor's first parameter.
    pub(crate) target_type: LazySlot<TypeRef>,
    pub(crate) type_converter: LazySlot<String>,
    pub(crate) value_serializer: LazySlot<String>,
    pub(crate) deferring_loader: LazySlot<String>,
    pub(crate) constructor_argument: LazySlot<String>,
    /// `Absent` means "no default value recorded", which is distinct
    /// from a recorded default of null.
    pub(crate) default_value: LazySlot<Value>,
    pub(crate) serialization_visibility: OnceLock<SerializationVisibility>,
    pub(crate) depends_on: OnceLock<Vec<String>>,
    pub(crate) flags: FlagCache,
}

impl MemberReflector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared frozen reflector for unknown members. Every field is
    /// pre-settled so the hot "member not found" path never computes or
    /// locks anything.
    pub fn unknown() -> Self {
        let r = Self::new();
        r.getter.set_absent_if_unset();
        r.setter.set_absent_if_unset();
        r.target_type.set_absent_if_unset();
        r.type_converter.set_absent_if_unset();
        r.value_serializer.set_absent_if_unset();
        r.deferring_loader.set_absent_if_unset();
        r.constructor_argument.set_absent_if_unset();
        r.default_value.set_absent_if_unset();
        let _ = r
            .serialization_visibility
            .set(SerializationVisibility::Visible);
        let _ = r.depends_on.set(Vec::new());
        r.flags.set(flags::IS_UNKNOWN, true);
        for mask in [
            flags::IS_EVENT,
            flags::IS_DIRECTIVE,
            flags::IS_IMPLICIT,
            flags::IS_ATTACHABLE,
            flags::IS_STATIC,
            flags::IS_READ_ONLY,
            flags::IS_WRITE_ONLY,
            flags::IS_AMBIENT,
            flags::IS_READ_PUBLIC,
            flags::IS_WRITE_PUBLIC,
        ] {
            r.flags.set(mask, false);
        }
        r
    }

    /// Whether a non-public accessor declared in `method`'s assembly is
    /// usable from code in `accessor` (same assembly, or a registered
    /// friend). Failures degrade to "not visible"; they never raise.
    pub fn is_internal_visible_to(
        registry: &NativeRegistry,
        method: MethodDescription,
        accessor: AssemblyS,
    ) -> bool {
        registry.is_internal_visible(method.assembly(), accessor)
    }

    /// Whether a protected accessor is usable from `accessing`: only
    /// from the declaring type itself or one of its subclasses.
    pub fn is_protected_visible_to(
        registry: &NativeRegistry,
        method: MethodDescription,
        accessing: TypeDescription,
    ) -> bool {
        registry.is_subclass_of(accessing, method.parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reflector_is_fully_settled() {
        let r = MemberReflector::unknown();
        assert!(r.getter.is_absent());
        assert!(r.setter.is_absent());
        assert!(r.default_value.is_absent());
        assert_eq!(r.flags.get(flags::IS_UNKNOWN), Some(true));
        assert_eq!(r.flags.get(flags::IS_EVENT), Some(false));
        assert_eq!(r.flags.get(flags::IS_READ_ONLY), Some(false));
        assert!(r.depends_on.get().is_some());
    }

    #[test]
    fn default_value_absence_is_not_null() {
        let r = MemberReflector::new();
        assert!(!r.default_value.is_set());
        r.default_value.set_value_if_unset(Value::Null);
        assert!(r.default_value.is_set());
        assert!(!r.default_value.is_absent());
        assert_eq!(r.default_value.value(), Some(&Value::Null));
    }
}
