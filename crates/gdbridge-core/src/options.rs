//! Lazy, typed access to host option tables.
//!
//! An [`OptionTable`] is only a scope plus a reference to the running invocation. Every query
//! resolves the owning graph, vertex or edge in the live host data first, then reads the key;
//! nothing is cached, so values set by the host between two queries are observed.

use crate::digraph::{EdgeId, VertexId};
use crate::error::{Error, Result};
use crate::invocation::Invocation;
use gdbridge_host::{OpaqueHandle, TableRef, Value, ValueKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Graph,
    Vertex(VertexId),
    Edge(EdgeId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Graph => f.write_str("graph"),
            Scope::Vertex(v) => write!(f, "vertex {}", v.index()),
            Scope::Edge(e) => write!(f, "edge {}", e.index()),
        }
    }
}

#[derive(Clone, Copy)]
pub struct OptionTable<'i> {
    invocation: &'i Invocation<'i>,
    scope: Scope,
}

impl fmt::Debug for OptionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionTable")
            .field("scope", &self.scope)
            .finish()
    }
}

impl<'i> OptionTable<'i> {
    pub(crate) fn new(invocation: &'i Invocation<'i>, scope: Scope) -> Self {
        Self { invocation, scope }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    fn table(&self) -> Result<TableRef> {
        let owner = match self.scope {
            Scope::Graph => self.invocation.args().graph,
            Scope::Vertex(v) => self.invocation.vertex_table(v.index())?,
            Scope::Edge(e) => self.invocation.edge_table(e.index())?,
        };
        self.invocation
            .host()
            .get_table(owner, "options")?
            .ok_or_else(|| Error::MissingField {
                owner: self.scope.to_string(),
                field: "options".to_string(),
            })
    }

    /// The raw host value stored under `key` (`Nil` when unset).
    pub fn get(&self, key: &str) -> Result<Value> {
        Ok(self.invocation.host().get_field(self.table()?, key)?)
    }

    fn kind(&self, key: &str) -> Result<ValueKind> {
        Ok(self.get(key)?.kind())
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.kind(key)? != ValueKind::Nil)
    }

    pub fn is_number(&self, key: &str) -> Result<bool> {
        Ok(self.kind(key)? == ValueKind::Number)
    }

    pub fn is_string(&self, key: &str) -> Result<bool> {
        Ok(self.kind(key)? == ValueKind::String)
    }

    pub fn is_boolean(&self, key: &str) -> Result<bool> {
        Ok(self.kind(key)? == ValueKind::Boolean)
    }

    pub fn is_opaque(&self, key: &str) -> Result<bool> {
        Ok(self.kind(key)? == ValueKind::Opaque)
    }

    /// Reads `key`, which must be set to a value of kind `T::KIND`.
    pub fn require<T: FromOption>(&self, key: &str) -> Result<T> {
        self.value(key)?.ok_or_else(|| Error::TypeMismatch {
            key: key.to_string(),
            expected: T::KIND,
            found: ValueKind::Nil,
        })
    }

    pub fn as_number(&self, key: &str) -> Result<f64> {
        self.require(key)
    }

    pub fn as_string(&self, key: &str) -> Result<String> {
        self.require(key)
    }

    pub fn as_boolean(&self, key: &str) -> Result<bool> {
        self.require(key)
    }

    pub fn as_opaque(&self, key: &str) -> Result<OpaqueHandle> {
        self.require(key)
    }

    /// Reads `key` as `T`: `None` when unset, `TypeMismatch` when set to another kind.
    pub fn value<T: FromOption>(&self, key: &str) -> Result<Option<T>> {
        let value = self.get(key)?;
        if value.is_nil() {
            return Ok(None);
        }
        T::from_option(&value).map(Some).ok_or_else(|| Error::TypeMismatch {
            key: key.to_string(),
            expected: T::KIND,
            found: value.kind(),
        })
    }

    pub fn number(&self, key: &str) -> Result<Option<f64>> {
        self.value(key)
    }

    pub fn string(&self, key: &str) -> Result<Option<String>> {
        self.value(key)
    }

    pub fn boolean(&self, key: &str) -> Result<Option<bool>> {
        self.value(key)
    }

    pub fn opaque(&self, key: &str) -> Result<Option<OpaqueHandle>> {
        self.value(key)
    }

    /// Whether `key` is set to a value convertible to `T`.
    pub fn is<T: FromOption>(&self, key: &str) -> Result<bool> {
        Ok(T::from_option(&self.get(key)?).is_some())
    }
}

/// Conversion of a host option value to a native type.
pub trait FromOption: Sized {
    const KIND: ValueKind;

    fn from_option(value: &Value) -> Option<Self>;
}

impl FromOption for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn from_option(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromOption for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_option(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromOption for OpaqueHandle {
    const KIND: ValueKind = ValueKind::Opaque;

    fn from_option(value: &Value) -> Option<Self> {
        value.as_opaque()
    }
}

macro_rules! numeric_from_option {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromOption for $t {
                const KIND: ValueKind = ValueKind::Number;

                fn from_option(value: &Value) -> Option<Self> {
                    // `as` saturates for out-of-range floats and maps NaN to zero.
                    value.as_number().map(|n| n as $t)
                }
            }
        )*
    };
}

numeric_from_option!(f64, f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
