//! Concurrent first-resolution stress tests.
//!
//! Every lazily-cached schema fact is a pure function of immutable
//! metadata, so N threads racing to compute it must all observe the
//! same answer, and the caches must settle exactly once without
//! deadlocking or tearing.

use std::sync::Arc;
use xaml_schema::registry::builder::AssemblyBuilder;
use xaml_schema::registry::corlib;
use xaml_schema::registry::metadata::{AssemblyDef, TypeRef};
use xaml_schema::schema::CollectionKind;
use xaml_schema::{NativeRegistry, XamlSchemaContext};

const THREADS: usize = 16;
const ROUNDS: usize = 50;

fn stress_assembly() -> AssemblyDef {
    AssemblyBuilder::new("Stress")
        .ty("Stress", "Widget", |t| {
            t.extends(corlib::object())
                .implements(TypeRef::named(corlib::IENUMERABLE))
                .constructor(vec![], None)
                .property("Count", corlib::int32(), |p| p.readable().writable())
                .property("Name", corlib::string(), |p| p.readable().writable())
                .method("Add", |m| m.param(corlib::string()).param(corlib::int32()))
                .method("GetTag", |m| {
                    m.static_member().param(corlib::object()).returns(corlib::string())
                })
                .method("SetTag", |m| {
                    m.static_member().param(corlib::object()).param(corlib::string())
                })
        })
        .build()
}

fn fresh_context() -> XamlSchemaContext {
    let registry = Arc::new(NativeRegistry::new());
    registry.load(stress_assembly());
    let ctx = XamlSchemaContext::new(registry);
    ctx.register_namespace("urn:stress", "Stress", "Stress")
        .unwrap();
    ctx
}

#[test]
fn concurrent_first_classification_converges() {
    for _ in 0..ROUNDS {
        let ctx = fresh_context();
        let kinds = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let ctx = &ctx;
                    scope.spawn(move || {
                        let ty = ctx.get_xaml_type("urn:stress", "Widget").unwrap();
                        ty.collection_kind(ctx)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        assert!(kinds.iter().all(|k| *k == CollectionKind::Dictionary));
    }
}

#[test]
fn concurrent_member_resolution_converges() {
    let ctx = fresh_context();
    let ty = ctx.get_xaml_type("urn:stress", "Widget").unwrap();

    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            let ctx = &ctx;
            let ty = ty.clone();
            scope.spawn(move || {
                for _ in 0..ROUNDS {
                    let count = ty.get_member(ctx, "Count");
                    assert!(!count.is_unknown());
                    assert!(count.getter().is_some());

                    let missing = ty.get_member(ctx, "Missing");
                    assert!(missing.is_unknown());

                    let tag = ty.get_attachable_member("Tag").unwrap().unwrap();
                    assert!(tag.getter().is_some());
                    assert!(tag.setter().is_some());

                    let members = ty.get_all_members(ctx);
                    assert_eq!(members.len(), 2);
                }
            });
        }
    });
}

#[test]
fn concurrent_namespace_resolution_returns_one_reflector() {
    let ctx = fresh_context();

    let types = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let ctx = &ctx;
                scope.spawn(move || ctx.get_xaml_type("urn:stress", "Widget").unwrap())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    // one descriptor, one reflector: all results compare equal and the
    // context holds a single reflector for the type
    for ty in &types {
        assert_eq!(ty, &types[0]);
    }
    assert_eq!(ctx.reflector_count(), 1);
}
