//! Schema resolution end to end: classification, member resolution,
//! attachable discovery, directives, and the invokers, all against
//! builder-registered fixture types.

use std::sync::Arc;
use xaml_schema::error::{InvokeError, ResolveError, SchemaError, XamlError};
use xaml_schema::registry::builder::AssemblyBuilder;
use xaml_schema::registry::corlib;
use xaml_schema::registry::metadata::{
    AssemblyDef, MemberAttribute, TypeAttribute, TypeRef, Visibility,
};
use xaml_schema::schema::{CollectionKind, Directive, MemberFacts, MemberVariant};
use xaml_schema::value::Value;
use xaml_schema::{NativeRegistry, XamlSchemaContext, XamlType};

#[derive(Default)]
struct WidgetData {
    count: i32,
    tag: Option<String>,
    entries: Vec<Value>,
}

fn with_widget<R>(
    args: &[Value],
    f: impl FnOnce(&mut WidgetData) -> R,
) -> Result<R, InvokeError> {
    args.first()
        .and_then(Value::as_object)
        .and_then(|o| o.with_mut(f))
        .ok_or(InvokeError::BadArgument {
            method: "Widget".into(),
            index: 0,
        })
}

fn widget_type() -> impl FnOnce(
    xaml_schema::registry::builder::TypeBuilder,
) -> xaml_schema::registry::builder::TypeBuilder {
    |t| {
        t.extends(corlib::object())
            .implements(TypeRef::named(corlib::IENUMERABLE))
            .constructor(
                vec![],
                Some(Arc::new(|_args: &[Value]| {
                    Ok(Value::object(WidgetData::default()))
                })),
            )
            .property("Count", corlib::int32(), |p| {
                p.readable_with(Arc::new(|args: &[Value]| {
                    with_widget(args, |w| Value::Int32(w.count))
                }))
                .writable_with(Arc::new(|args: &[Value]| {
                    let value = args.get(1).and_then(Value::as_i32).ok_or(
                        InvokeError::BadArgument {
                            method: "Widget::set_Count".into(),
                            index: 1,
                        },
                    )?;
                    with_widget(args, |w| w.count = value)?;
                    Ok(Value::Null)
                }))
            })
            .method("Add", |m| {
                m.param(corlib::string())
                    .param(corlib::int32())
                    .body(Arc::new(|args: &[Value]| {
                        let value = args.get(2).cloned().ok_or(InvokeError::BadArgument {
                            method: "Widget::Add".into(),
                            index: 2,
                        })?;
                        with_widget(args, |w| w.entries.push(value))?;
                        Ok(Value::Null)
                    }))
            })
            .method("GetEnumerator", |m| {
                m.returns(TypeRef::named(corlib::IENUMERATOR))
                    .body(Arc::new(|args: &[Value]| {
                        let snapshot = with_widget(args, |w| w.entries.clone())?;
                        Ok(Value::object(snapshot))
                    }))
            })
            .method("GetTag", |m| {
                m.static_member()
                    .param(corlib::object())
                    .returns(corlib::string())
                    .body(Arc::new(|args: &[Value]| {
                        with_widget(args, |w| match &w.tag {
                            Some(tag) => Value::string(tag),
                            None => Value::Null,
                        })
                    }))
            })
            .method("SetTag", |m| {
                m.static_member()
                    .param(corlib::object())
                    .param(corlib::string())
                    .body(Arc::new(|args: &[Value]| {
                        let tag = args
                            .get(1)
                            .and_then(|v| v.as_str().map(str::to_string))
                            .ok_or(InvokeError::BadArgument {
                                method: "Widget::SetTag".into(),
                                index: 1,
                            })?;
                        with_widget(args, |w| w.tag = Some(tag))?;
                        Ok(Value::Null)
                    }))
            })
    }
}

fn fixture_assembly() -> AssemblyDef {
    AssemblyBuilder::new("TestLib")
        .ty("Test", "Widget", widget_type())
        // implements both protocols; dictionary must win
        .ty("Test", "Hybrid", |t| {
            t.extends(corlib::object())
                .implements(TypeRef::named(corlib::IDICTIONARY))
                .implements(TypeRef::named(corlib::ILIST))
                .method("Add", |m| m.param(corlib::object()).param(corlib::object()))
        })
        // enumerable through the GetEnumerator method pattern, with two
        // one-parameter Add overloads and no list interface
        .ty("Test", "Bag", |t| {
            t.extends(corlib::object())
                .method("GetEnumerator", |m| m.returns(TypeRef::named(corlib::IENUMERATOR)))
                .method("Add", |m| m.param(corlib::int32()))
                .method("Add", |m| m.param(corlib::string()))
        })
        .ty("Test", "Base", |t| {
            t.extends(corlib::object())
                .property("Foo", corlib::string(), |p| p.readable().writable())
        })
        // private redeclaration must neither appear nor hide the base's
        .ty("Test", "Shadowed", |t| {
            t.extends(TypeRef::named("Test.Base")).property(
                "Foo",
                corlib::int32(),
                |p| {
                    p.getter(Visibility::Private, None)
                        .setter(Visibility::Private, None)
                },
            )
        })
        // visible redeclaration wins over the base's
        .ty("Test", "Override", |t| {
            t.extends(TypeRef::named("Test.Base"))
                .property("Foo", corlib::int32(), |p| p.readable().writable())
        })
        .ty("Test", "Gizmo", |t| {
            t.extends(corlib::object())
                .method("GetFoo", |m| {
                    m.static_member().param(corlib::object()).returns(corlib::int32())
                })
                .method("SetFoo", |m| {
                    m.static_member().param(corlib::object()).param(corlib::int32())
                })
                .method("GetBar", |m| {
                    m.static_member().param(corlib::object()).returns(corlib::string())
                })
        })
        // overload pairing: the type-matched setter must win
        .ty("Test", "PairPick", |t| {
            t.extends(corlib::object())
                .method("GetSize", |m| {
                    m.static_member().param(corlib::object()).returns(corlib::int32())
                })
                .method("SetSize", |m| {
                    m.static_member().param(corlib::object()).param(corlib::string())
                })
                .method("SetSize", |m| {
                    m.static_member().param(corlib::object()).param(corlib::int32())
                })
        })
        .ty("Test", "Malformed", |t| {
            t.extends(corlib::object())
                .method("SetOops", |m| m.static_member().param(corlib::object()))
        })
        .ty("Test", "Tagged", |t| {
            t.extends(corlib::object())
                .property("Label", corlib::string(), |p| {
                    p.readable()
                        .writable()
                        .attribute(MemberAttribute::DefaultValue(Value::Null))
                })
                .property("Hint", corlib::string(), |p| p.readable().writable())
                .property("Linked", corlib::string(), |p| {
                    p.readable()
                        .writable()
                        .attribute(MemberAttribute::DependsOn("Hint".into()))
                })
                .property("Broken", corlib::string(), |p| {
                    p.readable()
                        .writable()
                        .attribute(MemberAttribute::DependsOn("Nope".into()))
                })
        })
        .ty("Test", "NamedThing", |t| {
            t.extends(corlib::object())
                .attribute(TypeAttribute::RuntimeNameProperty("Name".into()))
                .attribute(TypeAttribute::ContentProperty("Body".into()))
                .property("Name", corlib::string(), |p| p.readable().writable())
                .property("Body", corlib::string(), |p| p.readable().writable())
        })
        .ty("Test", "BadAlias", |t| {
            t.extends(corlib::object())
                .attribute(TypeAttribute::RuntimeNameProperty("Missing".into()))
        })
        .ty("Test", "TwoContent", |t| {
            t.extends(corlib::object())
                .attribute(TypeAttribute::ContentProperty("A".into()))
                .attribute(TypeAttribute::ContentProperty("B".into()))
        })
        .ty("Test", "Ctors", |t| {
            t.extends(corlib::object())
                .constructor(vec![], None)
                .constructor(vec![corlib::string(), corlib::int32()], None)
        })
        .build()
}

fn harness() -> XamlSchemaContext {
    let registry = Arc::new(NativeRegistry::new());
    registry.load(fixture_assembly());
    let ctx = XamlSchemaContext::new(registry);
    ctx.register_namespace("urn:test", "TestLib", "Test").unwrap();
    ctx
}

fn get(ctx: &XamlSchemaContext, name: &str) -> XamlType {
    let ty = ctx.get_xaml_type("urn:test", name).unwrap();
    assert!(!ty.is_unknown(), "fixture type {name} should resolve");
    ty
}

#[test]
fn collection_kind_is_idempotent() {
    let ctx = harness();
    let widget = get(&ctx, "Widget");
    let first = widget.collection_kind(&ctx);
    for _ in 0..8 {
        assert_eq!(widget.collection_kind(&ctx), first);
    }
}

#[test]
fn dictionary_beats_collection() {
    let ctx = harness();
    let hybrid = get(&ctx, "Hybrid");
    assert_eq!(hybrid.collection_kind(&ctx), CollectionKind::Dictionary);
}

#[test]
fn ambiguous_add_overloads_error_without_poisoning() {
    let ctx = harness();
    let bag = get(&ctx, "Bag");
    assert_eq!(bag.collection_kind(&ctx), CollectionKind::Collection);

    let err = bag
        .add_method(&ctx, CollectionKind::Collection)
        .unwrap_err();
    assert!(matches!(err, SchemaError::AmbiguousAddMethod { .. }));
    let message = err.to_string();
    assert!(message.contains("Test.Bag"), "error names the type: {message}");

    // the failure is not cached; a second caller sees the same error
    let again = bag.add_method(&ctx, CollectionKind::Collection).unwrap_err();
    assert_eq!(err, again);
}

#[test]
fn private_redeclaration_does_not_shadow_or_duplicate() {
    let ctx = harness();
    let shadowed = get(&ctx, "Shadowed");
    let members = shadowed.get_all_members(&ctx);
    let foos: Vec<_> = members.iter().filter(|m| m.name() == "Foo").collect();
    assert_eq!(foos.len(), 1, "exactly one Foo, not two, not zero");
    match foos[0].variant() {
        MemberVariant::InstanceProperty(p) => {
            assert_eq!(p.property.parent.type_name(), "Test.Base");
            assert_eq!(p.property.property.property_type, corlib::string());
        }
        other => panic!("expected an instance property, got {}", other.kind_name()),
    }
}

#[test]
fn visible_redeclaration_wins() {
    let ctx = harness();
    let overridden = get(&ctx, "Override");
    let member = overridden.get_member(&ctx, "Foo");
    match member.variant() {
        MemberVariant::InstanceProperty(p) => {
            assert_eq!(p.property.parent.type_name(), "Test.Override");
            assert_eq!(p.property.property.property_type, corlib::int32());
        }
        other => panic!("expected an instance property, got {}", other.kind_name()),
    }
}

#[test]
fn default_value_distinguishes_null_from_absent() {
    let ctx = harness();
    let tagged = get(&ctx, "Tagged");

    let label = tagged.get_member(&ctx, "Label");
    assert!(label.has_default_value());
    assert_eq!(label.default_value(), Some(Value::Null));

    let hint = tagged.get_member(&ctx, "Hint");
    assert!(!hint.has_default_value());
    assert_eq!(hint.default_value(), None);
}

#[test]
fn attachable_property_pairing() {
    let ctx = harness();
    let gizmo = get(&ctx, "Gizmo");

    let foo = gizmo
        .get_attachable_member("Foo")
        .unwrap()
        .expect("Foo should resolve as attachable");
    assert!(foo.is_attachable());
    assert!(foo.getter().is_some());
    assert!(foo.setter().is_some());
    assert_eq!(foo.value_type_ref(), corlib::int32());
    assert_eq!(foo.target_type_ref(), Some(corlib::object()));

    let bar = gizmo
        .get_attachable_member("Bar")
        .unwrap()
        .expect("Bar should resolve as attachable");
    assert!(bar.getter().is_some());
    assert!(bar.setter().is_none());
    assert!(bar.is_read_only());
}

#[test]
fn attachable_pairing_prefers_type_matched_setter() {
    let ctx = harness();
    let ty = get(&ctx, "PairPick");
    let size = ty
        .get_attachable_member("Size")
        .unwrap()
        .expect("Size should resolve");
    let setter = size.setter().expect("paired setter");
    assert_eq!(setter.method.parameters[1], corlib::int32());
}

#[test]
fn malformed_attachable_accessor_is_a_schema_error() {
    let ctx = harness();
    let ty = get(&ctx, "Malformed");
    let err = ty.get_attachable_member("Oops").unwrap_err();
    match &err {
        SchemaError::InvalidAttachedAccessor {
            type_name,
            method_name,
        } => {
            assert_eq!(type_name, "Test.Malformed");
            assert_eq!(method_name, "SetOops");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // through the resolution protocol the failure becomes the terminal
    // unknown member carrying the diagnostic
    let member = ty.get_member(&ctx, "Oops");
    assert!(member.is_unknown());
    assert_eq!(member.unknown_reason(), Some(&err));
}

#[test]
fn unknown_member_is_terminal_and_not_invokable() {
    let ctx = harness();
    let widget = get(&ctx, "Widget");
    let member = widget.get_member(&ctx, "DoesNotExist");
    assert!(member.is_unknown());
    assert!(member.getter().is_none());
    assert!(member.setter().is_none());

    let instance = widget.invoker().create_instance(&[]).unwrap();
    let invoker = member.invoker();
    match invoker.get_value(&instance).unwrap_err() {
        XamlError::Invoke(InvokeError::UnknownMember(name)) => {
            assert_eq!(name, "DoesNotExist")
        }
        other => panic!("unexpected error {other:?}"),
    }
    match invoker.set_value(&instance, Value::Int32(1)).unwrap_err() {
        XamlError::Invoke(InvokeError::UnknownMember(_)) => {}
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn widget_end_to_end() {
    let ctx = harness();
    let widget = get(&ctx, "Widget");

    // two-parameter Add with no dictionary interface: dictionary kind
    assert_eq!(widget.collection_kind(&ctx), CollectionKind::Dictionary);
    let add = widget
        .add_method(&ctx, CollectionKind::Dictionary)
        .unwrap()
        .expect("unique Add(string, int)");
    assert_eq!(add.method.name, "Add");
    assert_eq!(widget.key_type(&ctx).unwrap().name(), "System.String");
    assert_eq!(widget.item_type(&ctx).unwrap().name(), "System.Int32");

    let tag = widget
        .get_attachable_member("Tag")
        .unwrap()
        .expect("attachable Tag");
    assert!(tag.getter().is_some());
    assert!(tag.setter().is_some());

    let count = widget.get_member(&ctx, "Count");
    assert!(!count.is_unknown());
    assert!(count.getter().is_some());
    assert!(count.setter().is_some());
    assert!(!count.is_read_only());
    assert!(!count.is_write_only());
}

#[test]
fn invokers_drive_instances() {
    let ctx = harness();
    let widget = get(&ctx, "Widget");
    let invoker = widget.invoker();

    let instance = invoker.create_instance(&[]).unwrap();

    let count = widget.get_member(&ctx, "Count").invoker();
    assert_eq!(count.get_value(&instance).unwrap(), Value::Int32(0));
    count.set_value(&instance, Value::Int32(7)).unwrap();
    assert_eq!(count.get_value(&instance).unwrap(), Value::Int32(7));

    // attached accessors take the target as their first argument
    let tag = widget
        .get_attachable_member("Tag")
        .unwrap()
        .unwrap()
        .invoker();
    assert_eq!(tag.get_value(&instance).unwrap(), Value::Null);
    tag.set_value(&instance, Value::string("chrome")).unwrap();
    assert_eq!(tag.get_value(&instance).unwrap(), Value::string("chrome"));

    invoker
        .add_to_dictionary(&ctx, &instance, Value::string("a"), Value::Int32(1))
        .unwrap();
    invoker
        .add_to_dictionary(&ctx, &instance, Value::string("b"), Value::Int32(2))
        .unwrap();
    let items = invoker.get_items(&ctx, &instance).unwrap();
    assert_eq!(items, vec![Value::Int32(1), Value::Int32(2)]);

    // wrong-kind insertion is an unsupported operation
    match invoker
        .add_to_collection(&ctx, &instance, Value::Int32(3))
        .unwrap_err()
    {
        XamlError::Invoke(InvokeError::NotACollection { type_name }) => {
            assert_eq!(type_name, "Test.Widget")
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unknown_type_sentinel_and_invocation() {
    let ctx = harness();
    let ty = ctx.get_xaml_type("urn:test", "Nonexistent").unwrap();
    assert!(ty.is_unknown());
    assert_eq!(ty.collection_kind(&ctx), CollectionKind::None);
    assert!(!ty.is_constructible());

    match ty.invoker().create_instance(&[]).unwrap_err() {
        XamlError::Invoke(InvokeError::UnknownType(name)) => assert_eq!(name, "Nonexistent"),
        other => panic!("unexpected error {other:?}"),
    }

    // an unregistered URI is a hard not-found, unlike an unknown type
    match ctx.get_xaml_type("urn:unregistered", "Widget").unwrap_err() {
        ResolveError::NamespaceNotFound(uri) => assert_eq!(uri, "urn:unregistered"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn directives_resolve_and_alias() {
    let ctx = harness();

    let key = ctx.get_xaml_directive("Key").unwrap();
    assert!(key.is_directive());
    assert!(!key.is_unknown());
    match ctx.get_xaml_directive("Bogus").unwrap_err() {
        ResolveError::DirectiveNotFound(name) => assert_eq!(name, "Bogus"),
        other => panic!("unexpected error {other:?}"),
    }

    let named = get(&ctx, "NamedThing");
    let alias = named
        .get_aliased_property(&ctx, &Directive::Name)
        .unwrap()
        .expect("RuntimeNameProperty names Name");
    assert_eq!(alias.name(), "Name");

    // no alias attribute at all
    let widget = get(&ctx, "Widget");
    assert!(widget
        .get_aliased_property(&ctx, &Directive::Uid)
        .unwrap()
        .is_none());

    // alias naming a nonexistent property is a schema error
    let bad = get(&ctx, "BadAlias");
    match bad.get_aliased_property(&ctx, &Directive::Name).unwrap_err() {
        SchemaError::UnknownAliasedProperty { property, .. } => assert_eq!(property, "Missing"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn content_property_and_duplicates() {
    let ctx = harness();
    let named = get(&ctx, "NamedThing");
    let content = named.content_property(&ctx).unwrap().expect("Body");
    assert_eq!(content.name(), "Body");

    let two = get(&ctx, "TwoContent");
    match two.content_property(&ctx).unwrap_err() {
        SchemaError::DuplicateAttribute { attribute, .. } => {
            assert_eq!(attribute, "ContentProperty")
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn positional_parameters_per_arity() {
    let ctx = harness();
    let ctors = get(&ctx, "Ctors");

    let two = ctors.positional_parameters(&ctx, 2).expect("(string, int)");
    assert_eq!(two.len(), 2);
    assert_eq!(two[0].name(), "System.String");
    assert_eq!(two[1].name(), "System.Int32");

    assert!(ctors.positional_parameters(&ctx, 0).is_some());
    assert!(ctors.positional_parameters(&ctx, 3).is_none());
}

#[test]
fn events_resolve_and_write_like_members() {
    let registry = Arc::new(NativeRegistry::new());
    registry.load(
        AssemblyBuilder::new("Evt")
            .ty("Evt", "Button", |t| {
                t.extends(corlib::object())
                    .event("Click", TypeRef::named("Evt.Handler"))
            })
            .ty("Evt", "Handler", |t| t.extends(corlib::object()))
            .build(),
    );
    let ctx = XamlSchemaContext::new(registry);
    ctx.register_namespace("urn:evt", "Evt", "Evt").unwrap();

    let button = ctx.get_xaml_type("urn:evt", "Button").unwrap();
    let click = button.get_member(&ctx, "Click");
    assert!(click.is_event());
    assert!(!click.is_attachable());
    // markup assignment goes through the add-handler method
    assert!(click.getter().is_none());
    let setter = click.setter().expect("adder doubles as setter");
    assert_eq!(setter.method.name, "add_Click");
}

#[test]
fn depends_on_declarations_validate_against_the_declaring_type() {
    let ctx = harness();
    let tagged = get(&ctx, "Tagged");

    let linked = tagged.get_member(&ctx, "Linked");
    assert_eq!(linked.depends_on_names(), ["Hint".to_string()].as_slice());
    linked
        .check_depends_on(|name| !tagged.get_member(&ctx, name).is_unknown())
        .unwrap();

    let broken = tagged.get_member(&ctx, "Broken");
    match broken
        .check_depends_on(|name| !tagged.get_member(&ctx, name).is_unknown())
        .unwrap_err()
    {
        XamlError::Schema(SchemaError::UnknownDependsOn { target, .. }) => {
            assert_eq!(target, "Nope")
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn accessor_visibility_helpers() {
    use xaml_schema::schema::member_reflector::MemberReflector;
    use xaml_schema::types::PropertyDescription;

    let registry = Arc::new(NativeRegistry::new());
    registry.load(
        AssemblyBuilder::new("LibA")
            .friend("LibB")
            .ty("A", "Holder", |t| {
                t.extends(corlib::object()).property("Secret", corlib::int32(), |p| {
                    p.getter(Visibility::Internal, None)
                        .setter(Visibility::Internal, None)
                })
            })
            .ty("A", "Guarded", |t| {
                t.extends(corlib::object()).property("Inherited", corlib::int32(), |p| {
                    p.getter(Visibility::Protected, None)
                })
            })
            .ty("A", "Sub", |t| t.extends(TypeRef::named("A.Guarded")))
            .build(),
    );
    let lib_b = registry.load(AssemblyBuilder::new("LibB").build());
    let lib_c = registry.load(AssemblyBuilder::new("LibC").build());

    let ctx = XamlSchemaContext::new(registry.clone());
    ctx.register_namespace("urn:a", "LibA", "A").unwrap();

    // internal members are only usable from the declaring assembly and
    // its registered friends
    let holder = ctx.get_xaml_type("urn:a", "Holder").unwrap();
    let getter = holder.get_member(&ctx, "Secret").getter().unwrap();
    assert!(MemberReflector::is_internal_visible_to(
        &registry,
        getter,
        getter.assembly()
    ));
    assert!(MemberReflector::is_internal_visible_to(&registry, getter, lib_b));
    assert!(!MemberReflector::is_internal_visible_to(&registry, getter, lib_c));

    // protected members are only usable from the declaring type or a
    // subclass of it
    let guarded = ctx.get_xaml_type("urn:a", "Guarded").unwrap().description().unwrap();
    let property = PropertyDescription {
        parent: guarded,
        property: &guarded.definition.properties[0],
    };
    let getter = property.getter().unwrap();
    let sub = ctx.get_xaml_type("urn:a", "Sub").unwrap().description().unwrap();
    assert!(MemberReflector::is_protected_visible_to(&registry, getter, guarded));
    assert!(MemberReflector::is_protected_visible_to(&registry, getter, sub));
    assert!(!MemberReflector::is_protected_visible_to(
        &registry,
        getter,
        holder.description().unwrap()
    ));
}

#[test]
fn namespace_completion_purges_misses() {
    let ctx = harness();
    let ns = ctx.get_namespace("urn:test").unwrap();

    assert!(ns.get_type(&ctx, "NotThere").is_none());
    assert!(!ns.is_complete());

    let all = ns.get_all_types(&ctx);
    assert!(ns.is_complete());
    assert!(all.iter().any(|t| t.name() == "Test.Widget"));
    // the miss set is closed after completion
    assert!(ns.get_type(&ctx, "NotThere").is_none());
}
