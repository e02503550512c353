//! The built-in core assembly.
//!
//! Collection classification and directive typing key off well-known
//! core types, so the registry always carries one assembly with the
//! `System.*` baseline: `Object`, the primitives, and the sequence /
//! list / dictionary / enumerator interfaces.

use crate::registry::builder::AssemblyBuilder;
use crate::registry::metadata::{AssemblyDef, TypeRef};
use crate::value::Value;
use std::sync::Arc;

pub const CORE_ASSEMBLY: &str = "corlib";

pub const OBJECT: &str = "System.Object";
pub const STRING: &str = "System.String";
pub const BOOLEAN: &str = "System.Boolean";
pub const INT32: &str = "System.Int32";
pub const INT64: &str = "System.Int64";
pub const DOUBLE: &str = "System.Double";

pub const IENUMERABLE: &str = "System.Collections.IEnumerable";
pub const IENUMERATOR: &str = "System.Collections.IEnumerator";
pub const ILIST: &str = "System.Collections.IList";
pub const IDICTIONARY: &str = "System.Collections.IDictionary";
pub const IENUMERABLE_T: &str = "System.Collections.Generic.IEnumerable`1";
pub const IENUMERATOR_T: &str = "System.Collections.Generic.IEnumerator`1";
pub const ICOLLECTION_T: &str = "System.Collections.Generic.ICollection`1";
pub const ILIST_T: &str = "System.Collections.Generic.IList`1";
pub const IDICTIONARY_T: &str = "System.Collections.Generic.IDictionary`2";

pub const MARKUP_EXTENSION: &str = "System.Windows.Markup.MarkupExtension";

pub fn object() -> TypeRef {
    TypeRef::named(OBJECT)
}

pub fn string() -> TypeRef {
    TypeRef::named(STRING)
}

pub fn boolean() -> TypeRef {
    TypeRef::named(BOOLEAN)
}

pub fn int32() -> TypeRef {
    TypeRef::named(INT32)
}

pub fn int64() -> TypeRef {
    TypeRef::named(INT64)
}

pub fn double() -> TypeRef {
    TypeRef::named(DOUBLE)
}

fn split(full_name: &str) -> (&str, &str) {
    match full_name.rfind('.') {
        Some(idx) => (&full_name[..idx], &full_name[idx + 1..]),
        None => ("", full_name),
    }
}

pub fn core_assembly() -> AssemblyDef {
    let mut builder = AssemblyBuilder::new(CORE_ASSEMBLY).ty("System", "Object", |t| {
        t.constructor(vec![], Some(Arc::new(|_args| Ok(Value::object(())))))
            .method("ToString", |m| m.returns(string()))
    });

    for value_type in [BOOLEAN, INT32, INT64, DOUBLE] {
        let (ns, name) = split(value_type);
        builder = builder.ty(ns, name, |t| t.value_type().extends(object()));
    }
    builder = builder.ty("System", "String", |t| t.extends(object()));

    builder = builder
        .ty("System.Collections", "IEnumerator", |t| {
            t.interface()
                .method("MoveNext", |m| m.returns(boolean()))
                .property("Current", object(), |p| p.readable())
        })
        .ty("System.Collections", "IEnumerable", |t| {
            t.interface()
                .method("GetEnumerator", |m| m.returns(TypeRef::named(IENUMERATOR)))
        })
        .ty("System.Collections", "IList", |t| {
            t.interface()
                .implements(TypeRef::named(IENUMERABLE))
                .method("Add", |m| m.param(object()).returns(int32()))
        })
        .ty("System.Collections", "IDictionary", |t| {
            t.interface()
                .implements(TypeRef::named(IENUMERABLE))
                .method("Add", |m| m.param(object()).param(object()))
        })
        .ty("System.Collections.Generic", "IEnumerator`1", |t| {
            t.interface().implements(TypeRef::named(IENUMERATOR))
        })
        .ty("System.Collections.Generic", "IEnumerable`1", |t| {
            t.interface().implements(TypeRef::named(IENUMERABLE))
        })
        .ty("System.Collections.Generic", "ICollection`1", |t| {
            t.interface().implements(TypeRef::named(IENUMERABLE))
        })
        .ty("System.Collections.Generic", "IList`1", |t| {
            t.interface().implements(TypeRef::named(IENUMERABLE))
        })
        .ty("System.Collections.Generic", "IDictionary`2", |t| {
            t.interface().implements(TypeRef::named(IENUMERABLE))
        })
        .ty("System.Windows.Markup", "MarkupExtension", |t| {
            t.extends(object())
                .method("ProvideValue", |m| m.returns(object()))
        });

    builder.build()
}
