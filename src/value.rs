//! Dynamic values for invoker calls.
//!
//! The schema layer itself is metadata-only; values only appear when the
//! invokers construct or mutate instances on behalf of a markup
//! processor. Heap instances are type-erased behind [`ObjectRef`] and
//! downcast by the registered method bodies.

use crate::error::InvokeError;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Shared handle to a heap instance. Identity is pointer identity.
#[derive(Clone)]
pub struct ObjectRef(pub Arc<RwLock<Box<dyn Any + Send + Sync>>>);

impl ObjectRef {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(RwLock::new(Box::new(value))))
    }

    /// Run `f` against the instance downcast to `T`, if it is a `T`.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.0.read();
        guard.downcast_ref::<T>().map(f)
    }

    /// Run `f` against the instance downcast to `&mut T`, if it is a `T`.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.0.write();
        guard.downcast_mut::<T>().map(f)
    }
}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectRef({:p})", Arc::as_ptr(&self.0))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ObjectRef {}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(Arc<str>),
    Object(ObjectRef),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(ObjectRef::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(i) => Some(*i),
            _ => None,
        }
    }

}

/// A registered runtime body. Instance methods receive the instance as
/// `args[0]`; static attachable accessors receive the target there
/// instead. Constructors receive only their declared parameters.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, InvokeError> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_identity_is_pointer_identity() {
        let a = Value::object(3u32);
        let b = a.clone();
        let c = Value::object(3u32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn downcast_roundtrip() {
        let o = ObjectRef::new(vec![1u8, 2, 3]);
        assert_eq!(o.with(|v: &Vec<u8>| v.len()), Some(3));
        o.with_mut(|v: &mut Vec<u8>| v.push(4));
        assert_eq!(o.with(|v: &Vec<u8>| v.len()), Some(4));
        assert_eq!(o.with(|_: &String| ()), None);
    }
}
