//! Per-invocation state shared by the syntactic digraph, option tables and derived views.

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use gdbridge_host::{Host, Key, RunArgs, TableRef, Value};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Maps host vertex identity to its 1-based position in one host digraph's vertex array.
pub type BackIndex = FxHashMap<TableRef, usize>;

/// Everything that lives exactly as long as one algorithm run.
///
/// Derived digraph views and option tables borrow the invocation rather than the syntactic
/// digraph, so an algorithm can keep them around while mutating vertices and edges.
pub struct Invocation<'h> {
    host: &'h dyn Host,
    config: &'h BridgeConfig,
    args: RunArgs,
    digraph_class: TableRef,
    back_index: RefCell<FxHashMap<TableRef, Rc<BackIndex>>>,
    back_index_builds: Cell<usize>,
}

impl<'h> Invocation<'h> {
    /// Resolves the host classes the run needs and binds the four run tables.
    pub fn new(host: &'h dyn Host, config: &'h BridgeConfig, args: RunArgs) -> Result<Self> {
        let digraph_class = module_table(host, &config.modules.digraph)?;
        Ok(Self {
            host,
            config,
            args,
            digraph_class,
            back_index: RefCell::new(FxHashMap::default()),
            back_index_builds: Cell::new(0),
        })
    }

    pub fn host(&self) -> &'h dyn Host {
        self.host
    }

    pub fn config(&self) -> &'h BridgeConfig {
        self.config
    }

    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    pub(crate) fn digraph_class(&self) -> TableRef {
        self.digraph_class
    }

    /// The host table of syntactic vertex `index` (0-based).
    pub(crate) fn vertex_table(&self, index: usize) -> Result<TableRef> {
        self.element_table(self.args.vertices, index, "vertex")
    }

    /// The host table of syntactic edge `index` (0-based).
    pub(crate) fn edge_table(&self, index: usize) -> Result<TableRef> {
        self.element_table(self.args.edges, index, "edge")
    }

    fn element_table(&self, array: TableRef, index: usize, what: &str) -> Result<TableRef> {
        match self.host.get_index(array, index + 1)? {
            Value::Table(t) => Ok(t),
            _ => Err(Error::UnresolvedScope {
                scope: format!("{what} {index}"),
            }),
        }
    }

    /// 0-based position of a host vertex in the syntactic vertex array, using the host's own
    /// identity index (`vertices[vertex] = position`).
    pub(crate) fn syntactic_position(&self, vertex: &Value) -> Result<Option<usize>> {
        let Value::Table(t) = vertex else {
            return Ok(None);
        };
        match self.host.get(self.args.vertices, &Key::Table(*t))? {
            Value::Number(n) if n >= 1.0 && n.fract() == 0.0 => Ok(Some(n as usize - 1)),
            _ => Ok(None),
        }
    }

    /// Back-index of `digraph`, built on first request and shared by every later request for
    /// the same host digraph object during this invocation.
    pub fn back_index(&self, digraph: TableRef) -> Result<Rc<BackIndex>> {
        if let Some(index) = self.back_index.borrow().get(&digraph) {
            return Ok(Rc::clone(index));
        }

        let mut index = BackIndex::default();
        if let Some(vertices) = self.host.get_table(digraph, "vertices")? {
            let n = self.host.raw_len(vertices)?;
            index.reserve(n);
            for i in 1..=n {
                if let Value::Table(v) = self.host.get_index(vertices, i)? {
                    index.insert(v, i);
                }
            }
        }
        tracing::debug!(digraph = digraph.0, vertices = index.len(), "built back-index");

        let index = Rc::new(index);
        self.back_index
            .borrow_mut()
            .insert(digraph, Rc::clone(&index));
        self.back_index_builds.set(self.back_index_builds.get() + 1);
        Ok(index)
    }

    /// How many back-indices have been built so far in this invocation.
    pub fn back_index_builds(&self) -> usize {
        self.back_index_builds.get()
    }
}

/// Resolves a host module that must be a table (a class).
pub(crate) fn module_table(host: &dyn Host, name: &str) -> Result<TableRef> {
    match host.require(name)? {
        Value::Table(t) => Ok(t),
        other => Err(Error::Host(gdbridge_host::Error::NotATable {
            found: other.kind(),
        })),
    }
}
