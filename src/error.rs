use thiserror::Error;

/// Malformed metadata relative to the schema's expectations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("no single Add overload on {type_name} matches the item type: {detail}")]
    AmbiguousAddMethod { type_name: String, detail: String },

    #[error("attachable accessor {type_name}.{method_name} has the wrong number of parameters")]
    InvalidAttachedAccessor {
        type_name: String,
        method_name: String,
    },

    #[error("{type_name} carries more than one {attribute} attribute")]
    DuplicateAttribute {
        type_name: String,
        attribute: &'static str,
    },

    #[error("{type_name}.{member_name} depends on unknown property {target}")]
    UnknownDependsOn {
        type_name: String,
        member_name: String,
        target: String,
    },

    #[error("{type_name} names nonexistent property {property} as its {attribute}")]
    UnknownAliasedProperty {
        type_name: String,
        property: String,
        attribute: &'static str,
    },
}

/// An operation that the target type or member does not support.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvokeError {
    #[error("cannot construct unknown type {0}")]
    UnknownType(String),

    #[error("cannot read or write unknown member {0}")]
    UnknownMember(String),

    #[error("member {0} is write-only")]
    WriteOnly(String),

    #[error("member {0} is read-only")]
    ReadOnly(String),

    #[error("member {0} is not backed by invokable accessors")]
    NotInvokable(String),

    #[error("{type_name} is not a collection")]
    NotACollection { type_name: String },

    #[error("{type_name} is not a dictionary")]
    NotADictionary { type_name: String },

    #[error("no runtime body registered for {0}")]
    NoRuntimeBody(String),

    #[error("no {arity}-argument constructor on {type_name}")]
    NoSuchConstructor { type_name: String, arity: usize },

    #[error("{method}: argument {index} has the wrong shape")]
    BadArgument { method: String, index: usize },
}

/// A name that is simply not registered, as opposed to one that resolved
/// to the unknown sentinel.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("assembly not registered: {0}")]
    AssemblyNotFound(String),

    #[error("type not found: {0}")]
    TypeNotFound(String),

    #[error("namespace not known to the schema context: {0}")]
    NamespaceNotFound(String),

    #[error("directive not registered: {0}")]
    DirectiveNotFound(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum XamlError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("invocation failed: {0}")]
    Invoke(#[from] InvokeError),

    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}
