//! Read-only views on the digraphs the host derives before running an algorithm (the
//! underlying undirected graph, spanning trees, ...).
//!
//! Derived digraphs may contain vertices the user never wrote, so a view addresses vertices by
//! their 1-based position in the derived digraph's own vertex array. Translating host vertex
//! identities to positions goes through the invocation's back-index, which is built once per
//! host digraph object.

use crate::digraph::{EdgeId, SyntacticDigraph, VertexId};
use crate::error::{Error, Result};
use crate::invocation::Invocation;
use gdbridge_host::{Key, TableRef, Value};

/// An arc between two vertices of a view, as 1-based positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Arc {
    pub tail: usize,
    pub head: usize,
}

impl Arc {
    pub fn new(tail: usize, head: usize) -> Self {
        Self { tail, head }
    }
}

pub struct Digraph<'i> {
    invocation: &'i Invocation<'i>,
    name: String,
    table: TableRef,
}

impl std::fmt::Debug for Digraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digraph")
            .field("name", &self.name)
            .field("table", &self.table)
            .finish()
    }
}

impl<'i> Digraph<'i> {
    /// Opens the digraph stored under `name` in the algorithm object of the current run.
    pub fn open(graph: &SyntacticDigraph<'i>, name: &str) -> Result<Self> {
        Self::open_in(graph.invocation(), name)
    }

    pub fn open_in(invocation: &'i Invocation<'i>, name: &str) -> Result<Self> {
        let host = invocation.host();
        match host.get_field(invocation.args().algorithm, name)? {
            Value::Table(table) => Ok(Self {
                invocation,
                name: name.to_string(),
                table,
            }),
            _ => Err(Error::DigraphNotFound {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn vertices_table(&self) -> Result<TableRef> {
        self.invocation
            .host()
            .get_table(self.table, "vertices")?
            .ok_or_else(|| Error::MissingField {
                owner: format!("digraph {}", self.name),
                field: "vertices".to_string(),
            })
    }

    pub fn vertex_count(&self) -> Result<usize> {
        Ok(self.invocation.host().raw_len(self.vertices_table()?)?)
    }

    /// Host vertex object at 1-based position `index`.
    fn vertex_value(&self, index: usize) -> Result<Value> {
        let vertices = self.vertices_table()?;
        let host = self.invocation.host();
        let count = host.raw_len(vertices)?;
        if index == 0 || index > count {
            return Err(Error::VertexOutOfRange {
                name: self.name.clone(),
                index,
                count,
            });
        }
        Ok(host.get_index(vertices, index)?)
    }

    /// Converts a host array of arc objects to position pairs.
    fn arcs_from(&self, array: TableRef) -> Result<Vec<Arc>> {
        let host = self.invocation.host();
        let back_index = self.invocation.back_index(self.table)?;
        let position = |arc: TableRef, field: &str| -> Result<usize> {
            let found = match host.get_field(arc, field)? {
                Value::Table(v) => back_index.get(&v).copied(),
                _ => None,
            };
            found.ok_or_else(|| Error::UnknownArcEndpoint {
                name: self.name.clone(),
            })
        };

        let n = host.raw_len(array)?;
        let mut arcs = Vec::with_capacity(n);
        for i in 1..=n {
            if let Value::Table(a) = host.get_index(array, i)? {
                arcs.push(Arc::new(position(a, "tail")?, position(a, "head")?));
            }
        }
        Ok(arcs)
    }

    /// Every arc of the digraph.
    pub fn arcs(&self) -> Result<Vec<Arc>> {
        match self.invocation.host().get_table(self.table, "arcs")? {
            Some(array) => self.arcs_from(array),
            None => Ok(Vec::new()),
        }
    }

    /// Calls `Digraph.<method>(digraph, args...)` on the host digraph class.
    fn class_call(&self, method: &str, digraph: TableRef, args: &[Value]) -> Result<Value> {
        let host = self.invocation.host();
        let function = host.get_field(self.invocation.digraph_class(), method)?;
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(Value::Table(digraph));
        full.extend_from_slice(args);
        Ok(host.call_one(&function, &full)?)
    }

    /// Whether the host considers `tail -> head` an arc of this digraph.
    pub fn is_arc(&self, tail: usize, head: usize) -> Result<bool> {
        let args = [self.vertex_value(tail)?, self.vertex_value(head)?];
        Ok(!self.class_call("arc", self.table, &args)?.is_nil())
    }

    fn adjacent(&self, method: &str, v: usize) -> Result<Vec<Arc>> {
        let args = [self.vertex_value(v)?];
        match self.class_call(method, self.table, &args)? {
            Value::Table(array) => self.arcs_from(array),
            _ => Ok(Vec::new()),
        }
    }

    pub fn incoming(&self, v: usize) -> Result<Vec<Arc>> {
        self.adjacent("incoming", v)
    }

    pub fn outgoing(&self, v: usize) -> Result<Vec<Arc>> {
        self.adjacent("outgoing", v)
    }

    /// The syntactic vertex at position `index`, or `None` for vertices that only exist in the
    /// derived digraph.
    pub fn syntactic_vertex(&self, index: usize) -> Result<Option<VertexId>> {
        let v = self.vertex_value(index)?;
        let Some(p) = self.invocation.syntactic_position(&v)? else {
            return Ok(None);
        };
        let count = self.invocation.host().raw_len(self.invocation.args().vertices)?;
        if p >= count {
            return Err(Error::UnresolvedScope {
                scope: format!("vertex {p}"),
            });
        }
        Ok(Some(VertexId::new(p)))
    }

    /// The authored edges behind the arc `tail -> head`: none when there is no such arc, usually
    /// one, more when several edges collapsed onto the same arc.
    pub fn syntactic_edges(&self, tail: usize, head: usize) -> Result<Vec<EdgeId>> {
        let host = self.invocation.host();
        let ends = [self.vertex_value(tail)?, self.vertex_value(head)?];

        let Value::Table(arc) = self.class_call("arc", self.table, &ends)? else {
            return Ok(Vec::new());
        };
        let Some(syntactic) = host.get_table(arc, "syntactic_digraph")? else {
            return Ok(Vec::new());
        };
        let Value::Table(syntactic_arc) = self.class_call("arc", syntactic, &ends)? else {
            return Ok(Vec::new());
        };
        let Some(list) = host.get_table(syntactic_arc, "syntactic_edges")? else {
            return Ok(Vec::new());
        };

        let edges = self.invocation.args().edges;
        let edge_count = host.raw_len(edges)?;
        let n = host.raw_len(list)?;
        let mut out = Vec::with_capacity(n);
        for i in 1..=n {
            let Value::Table(e) = host.get_index(list, i)? else {
                return Err(Error::SyntacticEdgeNotFound);
            };
            match host.get(edges, &Key::Table(e))? {
                Value::Number(p) if p >= 1.0 && p.fract() == 0.0 && p as usize <= edge_count => {
                    out.push(EdgeId::new(p as usize - 1))
                }
                _ => return Err(Error::SyntacticEdgeNotFound),
            }
        }
        Ok(out)
    }
}

impl Drop for Digraph<'_> {
    fn drop(&mut self) {
        tracing::trace!(name = %self.name, "released digraph view");
    }
}
