//! # xaml-schema
//!
//! A reflection-backed XAML type schema: the metadata-resolution
//! substrate a markup processor consults to map native types,
//! properties, and events onto a uniform schema model.
//!
//! ## Core pieces
//!
//! - **[`registry::NativeRegistry`]**: the native metadata registry —
//!   the reflection facility the schema layer consumes.
//! - **[`schema::XamlSchemaContext`]**: root owner of every per-type
//!   and per-member cache for one markup-processing session.
//! - **[`schema::XamlType`] / [`schema::XamlMember`]**: the schema
//!   façades, backed by lazy thread-safe reflectors.
//! - **[`invoke`]**: invokers that construct instances and read/write
//!   members through registered runtime bodies.
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

pub mod error;
pub mod invoke;
pub mod registry;
pub mod schema;
pub mod types;
pub mod utils;
pub mod value;

pub use error::{InvokeError, ResolveError, SchemaError, XamlError};
pub use registry::NativeRegistry;
pub use schema::{CollectionKind, XamlMember, XamlSchemaContext, XamlType};

use registry::builder::AssemblyBuilder;
use registry::corlib;
use registry::metadata::{TypeAttribute, TypeRef};
use schema::MemberFacts;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Dump the resolved schema of the registered namespaces"
)]
pub struct Args {
    /// Namespace URI to dump (defaults to every registered URI)
    #[arg(short, long, value_name = "URI")]
    pub namespace: Option<String>,
    /// Show member detail for each type
    #[arg(short, long)]
    pub verbose: bool,
}

/// A small sample assembly the CLI dumps when run standalone.
fn sample_assembly() -> registry::metadata::AssemblyDef {
    AssemblyBuilder::new("Samples.Gallery")
        .ty("Samples.Gallery", "Label", |t| {
            t.extends(corlib::object())
                .attribute(TypeAttribute::ContentProperty("Text".into()))
                .attribute(TypeAttribute::RuntimeNameProperty("Name".into()))
                .constructor(vec![], None)
                .property("Text", corlib::string(), |p| p.readable().writable())
                .property("Name", corlib::string(), |p| p.readable().writable())
                .event("Click", TypeRef::named("Samples.Gallery.ClickHandler"))
        })
        .ty("Samples.Gallery", "ClickHandler", |t| t.extends(corlib::object()))
        .ty("Samples.Gallery", "Panel", |t| {
            t.extends(corlib::object())
                .attribute(TypeAttribute::ContentProperty("Children".into()))
                .constructor(vec![], None)
                .property("Children", TypeRef::named("Samples.Gallery.ChildCollection"), |p| {
                    p.readable()
                })
                .method("GetDock", |m| {
                    m.static_member().param(corlib::object()).returns(corlib::string())
                })
                .method("SetDock", |m| {
                    m.static_member().param(corlib::object()).param(corlib::string())
                })
        })
        .ty("Samples.Gallery", "ChildCollection", |t| {
            t.extends(corlib::object())
                .implements(TypeRef::generic(
                    corlib::ICOLLECTION_T,
                    vec![corlib::object()],
                ))
                .constructor(vec![], None)
                .method("Add", |m| m.param(corlib::object()))
                .method("GetEnumerator", |m| m.returns(TypeRef::named(corlib::IENUMERATOR)))
        })
        .ty("Samples.Gallery", "ResourceTable", |t| {
            t.extends(corlib::object())
                .implements(TypeRef::named(corlib::IDICTIONARY))
                .constructor(vec![], None)
                .method("Add", |m| m.param(corlib::string()).param(corlib::object()))
                .method("GetEnumerator", |m| m.returns(TypeRef::named(corlib::IENUMERATOR)))
        })
        .build()
}

fn dump_type(ctx: &XamlSchemaContext, ty: &XamlType, verbose: bool) {
    let kind = ty.collection_kind(ctx);
    println!(
        "  {} (collection: {:?}, constructible: {}, nullable: {})",
        ty.name(),
        kind,
        ty.is_constructible(),
        ty.is_nullable(),
    );
    if !verbose {
        return;
    }
    if let Ok(Some(content)) = ty.content_property(ctx) {
        println!("    content property: {}", content.name());
    }
    if let Some(item) = ty.item_type(ctx) {
        println!("    item type: {}", item.name());
    }
    for member in ty.get_all_members(ctx) {
        let access = match (member.getter().is_some(), member.setter().is_some()) {
            (true, true) => "read/write",
            (true, false) => "read-only",
            (false, true) => "write-only",
            (false, false) => "inaccessible",
        };
        println!(
            "    {} ({}, {access})",
            member.name(),
            member.variant().kind_name(),
        );
    }
}

pub fn run_cli() -> ExitCode {
    let args = Args::parse();

    let registry = Arc::new(NativeRegistry::new());
    registry.load(sample_assembly());
    let ctx = XamlSchemaContext::new(registry);

    let mappings = [
        ("clr-namespace:System", corlib::CORE_ASSEMBLY, "System"),
        (
            "clr-namespace:Samples.Gallery",
            "Samples.Gallery",
            "Samples.Gallery",
        ),
    ];
    for (uri, assembly, native_namespace) in mappings {
        if let Err(e) = ctx.register_namespace(uri, assembly, native_namespace) {
            eprintln!("error registering namespace {uri}: {e}");
            return ExitCode::from(1);
        }
    }

    let uris = match &args.namespace {
        Some(uri) => vec![uri.clone()],
        None => {
            let mut uris = ctx.namespace_uris();
            uris.sort();
            uris
        }
    };

    for uri in uris {
        let ns = match ctx.get_namespace(&uri) {
            Ok(ns) => ns,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(1);
            }
        };
        println!("{uri}");
        let mut types = ns.get_all_types(&ctx);
        types.sort_by(|a, b| a.name().cmp(b.name()));
        for ty in &types {
            dump_type(&ctx, ty, args.verbose);
        }
    }

    ExitCode::SUCCESS
}
