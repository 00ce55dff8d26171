//! Cache keys: which function was called, and with what.

use std::{
    any::{type_name, TypeId},
    borrow::Cow,
    fmt,
    hash::{Hash, Hasher},
    mem::size_of,
};

use serde::Serialize;

use crate::error::{Error, Result};

/// Identity of a memoized function.
///
/// `Typed` identities come from the concrete type of the callable. Every `fn`
/// item and every closure expression has a type of its own, so two functions
/// with identical bodies still get distinct identities, while a closure
/// rebuilt on each call from the same expression keeps the same one.
#[derive(Clone, Debug)]
pub enum FnId {
    Named(Cow<'static, str>),
    Typed { id: TypeId, name: &'static str },
}

impl FnId {
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        FnId::Named(name.into())
    }

    /// Identity of the callable type `F`.
    ///
    /// Only zero-sized callables qualify: `fn` items and closures capturing
    /// nothing, whose type alone says which function runs. A capturing
    /// closure, a function pointer or a trait object carries state the type
    /// does not describe, so two values of it may behave differently and are
    /// refused.
    pub fn of<F: 'static>() -> Result<Self> {
        let name = type_name::<F>();
        if size_of::<F>() != 0 {
            return Err(Error::UnstableIdentity(name));
        }

        Ok(FnId::Typed {
            id: TypeId::of::<F>(),
            name,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            FnId::Named(name) => &**name,
            FnId::Typed { name, .. } => *name,
        }
    }
}

impl PartialEq for FnId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FnId::Named(a), FnId::Named(b)) => a == b,
            (FnId::Typed { id: a, .. }, FnId::Typed { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for FnId {}

impl Hash for FnId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            FnId::Named(name) => {
                state.write_u8(0);
                name.hash(state);
            }
            FnId::Typed { id, .. } => {
                state.write_u8(1);
                id.hash(state);
            }
        }
    }
}

impl fmt::Display for FnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&'static str> for FnId {
    fn from(name: &'static str) -> Self {
        FnId::named(name)
    }
}

impl From<String> for FnId {
    fn from(name: String) -> Self {
        FnId::named(name)
    }
}

/// A function identity plus its arguments, MessagePack-encoded in call order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    function: FnId,
    args: Vec<u8>,
}

impl CacheKey {
    pub fn new<A: Serialize + ?Sized>(function: FnId, args: &A) -> Result<Self> {
        match rmp_serde::to_vec(args) {
            Ok(args) => Ok(Self { function, args }),
            Err(source) => Err(Error::Unrepresentable {
                function: function.name().to_owned(),
                source,
            }),
        }
    }

    pub fn function(&self) -> &FnId {
        &self.function
    }
}
