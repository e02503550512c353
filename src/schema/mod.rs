//! The schema model: reflectors, the type/member façades, namespace
//! resolution, and the owning context.

pub mod collection;
pub mod context;
pub mod directive;
pub mod member;
pub mod member_reflector;
pub mod namespace;
pub mod type_reflector;
pub mod xaml_type;

pub use collection::CollectionKind;
pub use context::XamlSchemaContext;
pub use directive::{AllowedLocation, Directive, ImplicitKind};
pub use member::{MemberFacts, MemberVariant, XamlMember};
pub use namespace::XamlNamespace;
pub use xaml_type::XamlType;
