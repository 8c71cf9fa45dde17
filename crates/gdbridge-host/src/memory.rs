//! An in-process table host.
//!
//! Semantics follow the subset of Lua the bridge relies on: tables are identity objects with
//! insertion-ordered entries, `nil` assignment removes a key, `raw_len` is the border of the
//! integer keys and `get` falls back through `__index` tables.

use crate::error::{Error, Result};
use crate::value::{FunctionRef, Key, TableRef, Value};
use crate::{Host, NativeFunction};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::cell::RefCell;

const MAX_INDEX_CHAIN: usize = 64;

#[derive(Default)]
struct TableData {
    entries: IndexMap<Key, Value, FxBuildHasher>,
    metatable: Option<TableRef>,
}

struct State {
    tables: Vec<TableData>,
    functions: Vec<NativeFunction>,
    modules: FxHashMap<String, Value>,
    collector_running: bool,
    collector_pauses: usize,
}

impl State {
    fn table(&self, t: TableRef) -> Result<&TableData> {
        self.tables
            .get(t.0 as usize)
            .ok_or(Error::UnknownTable { id: t.0 })
    }

    fn table_mut(&mut self, t: TableRef) -> Result<&mut TableData> {
        self.tables
            .get_mut(t.0 as usize)
            .ok_or(Error::UnknownTable { id: t.0 })
    }
}

pub struct MemoryHost {
    state: RefCell<State>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                tables: Vec::new(),
                functions: Vec::new(),
                modules: FxHashMap::default(),
                collector_running: true,
                collector_pauses: 0,
            }),
        }
    }

    /// Makes `value` available through [`Host::require`].
    pub fn register_module(&self, name: impl Into<String>, value: Value) {
        self.state.borrow_mut().modules.insert(name.into(), value);
    }

    /// Convenience wrapper around [`Host::create_function`] for closures.
    pub fn function<F>(&self, f: F) -> Value
    where
        F: Fn(&dyn Host, &[Value]) -> Result<Vec<Value>> + 'static,
    {
        let mut state = self.state.borrow_mut();
        let id = state.functions.len() as u64;
        state.functions.push(std::rc::Rc::new(f));
        Value::Function(FunctionRef(id))
    }

    /// Creates a table holding `values` at positions `1..=n`.
    pub fn array<I>(&self, values: I) -> TableRef
    where
        I: IntoIterator<Item = Value>,
    {
        let mut state = self.state.borrow_mut();
        let id = TableRef(state.tables.len() as u64);
        let mut data = TableData::default();
        for (i, v) in values.into_iter().enumerate() {
            if !v.is_nil() {
                data.entries.insert(Key::Index(i as i64 + 1), v);
            }
        }
        state.tables.push(data);
        id
    }

    /// Creates a table from string-keyed fields.
    pub fn record<'a, I>(&self, fields: I) -> TableRef
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut state = self.state.borrow_mut();
        let id = TableRef(state.tables.len() as u64);
        let mut data = TableData::default();
        for (k, v) in fields {
            if !v.is_nil() {
                data.entries.insert(Key::String(k.to_string()), v);
            }
        }
        state.tables.push(data);
        id
    }

    pub fn metatable(&self, table: TableRef) -> Result<Option<TableRef>> {
        Ok(self.state.borrow().table(table)?.metatable)
    }

    /// All entries of `table` in insertion order.
    pub fn entries(&self, table: TableRef) -> Result<Vec<(Key, Value)>> {
        let state = self.state.borrow();
        Ok(state
            .table(table)?
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// The array part of `table` (`table[1..=raw_len]`).
    pub fn array_values(&self, table: TableRef) -> Result<Vec<Value>> {
        let n = self.raw_len(table)?;
        let state = self.state.borrow();
        let data = state.table(table)?;
        Ok((1..=n)
            .map(|i| {
                data.entries
                    .get(&Key::Index(i as i64))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }

    pub fn table_count(&self) -> usize {
        self.state.borrow().tables.len()
    }

    pub fn collector_running(&self) -> bool {
        self.state.borrow().collector_running
    }

    /// How many times the collector has been stopped.
    pub fn collector_pauses(&self) -> usize {
        self.state.borrow().collector_pauses
    }
}

impl Host for MemoryHost {
    fn get(&self, table: TableRef, key: &Key) -> Result<Value> {
        let state = self.state.borrow();
        let index_key = Key::String("__index".to_string());
        let mut current = table;
        for _ in 0..MAX_INDEX_CHAIN {
            let data = state.table(current)?;
            if let Some(v) = data.entries.get(key) {
                return Ok(v.clone());
            }
            let Some(meta) = data.metatable else {
                return Ok(Value::Nil);
            };
            match state.table(meta)?.entries.get(&index_key) {
                Some(Value::Table(next)) => current = *next,
                _ => return Ok(Value::Nil),
            }
        }
        tracing::warn!(table = table.0, %key, "__index chain too long, treating as nil");
        Ok(Value::Nil)
    }

    fn set(&self, table: TableRef, key: Key, value: Value) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let data = state.table_mut(table)?;
        if value.is_nil() {
            data.entries.shift_remove(&key);
        } else {
            data.entries.insert(key, value);
        }
        Ok(())
    }

    fn raw_len(&self, table: TableRef) -> Result<usize> {
        let state = self.state.borrow();
        let data = state.table(table)?;
        let mut n = 0usize;
        while data.entries.contains_key(&Key::Index(n as i64 + 1)) {
            n += 1;
        }
        Ok(n)
    }

    fn create_table(&self) -> Result<TableRef> {
        let mut state = self.state.borrow_mut();
        let id = TableRef(state.tables.len() as u64);
        state.tables.push(TableData::default());
        Ok(id)
    }

    fn set_metatable(&self, table: TableRef, metatable: Option<TableRef>) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(meta) = metatable {
            state.table(meta)?;
        }
        state.table_mut(table)?.metatable = metatable;
        Ok(())
    }

    fn call(&self, function: &Value, args: &[Value]) -> Result<Vec<Value>> {
        let Value::Function(f) = function else {
            return Err(Error::NotCallable {
                found: function.kind(),
            });
        };
        // The borrow must end before the call: native functions re-enter the host.
        let native = {
            let state = self.state.borrow();
            state
                .functions
                .get(f.0 as usize)
                .cloned()
                .ok_or(Error::UnknownFunction { id: f.0 })?
        };
        native(self, args)
    }

    fn create_function(&self, function: NativeFunction) -> Result<Value> {
        let mut state = self.state.borrow_mut();
        let id = state.functions.len() as u64;
        state.functions.push(function);
        Ok(Value::Function(FunctionRef(id)))
    }

    fn require(&self, module: &str) -> Result<Value> {
        self.state
            .borrow()
            .modules
            .get(module)
            .cloned()
            .ok_or_else(|| Error::UnknownModule {
                name: module.to_string(),
            })
    }

    fn set_collector_running(&self, running: bool) {
        let mut state = self.state.borrow_mut();
        if !running && state.collector_running {
            state.collector_pauses += 1;
        }
        state.collector_running = running;
    }
}
