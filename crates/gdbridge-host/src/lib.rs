#![forbid(unsafe_code)]

//! Host value contract for the gdbridge graph-drawing bridge.
//!
//! Native layout code never talks to a scripting runtime directly. Everything goes through the
//! [`Host`] trait, which captures the four capabilities the bridge needs:
//! - read named fields of host tables,
//! - write fields back (and create fresh tables),
//! - call host callables (and expose native callables to the host),
//! - pass opaque native handles through the host untouched.
//!
//! [`MemoryHost`] is an in-process implementation with table semantics close to Lua's. It is what
//! the test-suites run against, and it is usable by embedders that have no scripting runtime.

pub mod error;
pub mod memory;
pub mod model;
pub mod value;

use std::rc::Rc;

pub use error::{Error, Result};
pub use memory::MemoryHost;
pub use value::{FunctionRef, Key, OpaqueHandle, TableRef, Value, ValueKind};

/// A native function callable from the host.
pub type NativeFunction = Rc<dyn Fn(&dyn Host, &[Value]) -> Result<Vec<Value>>>;

pub trait Host {
    /// Reads `table[key]`, following `__index` metatable fallbacks.
    fn get(&self, table: TableRef, key: &Key) -> Result<Value>;

    /// Writes `table[key] = value` without consulting metatables. Writing `nil` removes the key.
    fn set(&self, table: TableRef, key: Key, value: Value) -> Result<()>;

    /// Length of the array part (the border of the `1..n` integer keys).
    fn raw_len(&self, table: TableRef) -> Result<usize>;

    fn create_table(&self) -> Result<TableRef>;

    fn set_metatable(&self, table: TableRef, metatable: Option<TableRef>) -> Result<()>;

    fn call(&self, function: &Value, args: &[Value]) -> Result<Vec<Value>>;

    fn create_function(&self, function: NativeFunction) -> Result<Value>;

    /// Resolves a module by name, the way the host's `require` would.
    fn require(&self, module: &str) -> Result<Value>;

    fn wrap_opaque(&self, handle: OpaqueHandle) -> Value {
        Value::Opaque(handle)
    }

    /// Stops or restarts the host's garbage collector. Hosts without one ignore this.
    fn set_collector_running(&self, _running: bool) {}

    fn get_field(&self, table: TableRef, name: &str) -> Result<Value> {
        self.get(table, &Key::String(name.to_string()))
    }

    fn get_index(&self, table: TableRef, index: usize) -> Result<Value> {
        self.get(table, &Key::Index(index as i64))
    }

    fn set_field(&self, table: TableRef, name: &str, value: Value) -> Result<()> {
        self.set(table, Key::String(name.to_string()), value)
    }

    /// Reads `table[name]` and requires it to be a table.
    fn get_table(&self, table: TableRef, name: &str) -> Result<Option<TableRef>> {
        match self.get_field(table, name)? {
            Value::Nil => Ok(None),
            Value::Table(t) => Ok(Some(t)),
            other => Err(Error::NotATable {
                found: other.kind(),
            }),
        }
    }

    /// Calls `object:method(args...)` and returns the first result (or `nil`).
    fn call_method(&self, object: TableRef, method: &str, args: &[Value]) -> Result<Value> {
        let function = self.get_field(object, method)?;
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(Value::Table(object));
        full.extend_from_slice(args);
        Ok(self.call(&function, &full)?.into_iter().next().unwrap_or_default())
    }

    /// Calls `function(args...)` and returns the first result (or `nil`).
    fn call_one(&self, function: &Value, args: &[Value]) -> Result<Value> {
        Ok(self.call(function, args)?.into_iter().next().unwrap_or_default())
    }
}

/// The four tables the host passes to a native algorithm: the graph (carrying the graph-level
/// options), the syntactic vertex and edge arrays (each also mapping its elements back to their
/// positions) and the algorithm object holding the derived digraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunArgs {
    pub graph: TableRef,
    pub vertices: TableRef,
    pub edges: TableRef,
    pub algorithm: TableRef,
}

impl RunArgs {
    pub fn from_values(args: &[Value]) -> Result<Self> {
        let table = |position: usize| {
            args.get(position)
                .and_then(Value::as_table)
                .ok_or_else(|| Error::BadArgument {
                    function: "algorithm".to_string(),
                    position: position + 1,
                    message: "table expected".to_string(),
                })
        };
        Ok(Self {
            graph: table(0)?,
            vertices: table(1)?,
            edges: table(2)?,
            algorithm: table(3)?,
        })
    }

    pub fn as_values(&self) -> [Value; 4] {
        [
            Value::Table(self.graph),
            Value::Table(self.vertices),
            Value::Table(self.edges),
            Value::Table(self.algorithm),
        ]
    }
}

/// Scoped collector pause; the collector restarts when the guard is dropped.
pub struct CollectorPause<'h> {
    host: &'h dyn Host,
}

impl<'h> CollectorPause<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        host.set_collector_running(false);
        Self { host }
    }
}

impl Drop for CollectorPause<'_> {
    fn drop(&mut self) {
        self.host.set_collector_running(true);
    }
}
