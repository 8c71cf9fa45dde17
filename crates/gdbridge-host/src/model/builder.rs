use super::Model;
use crate::error::{Error, Result};
use crate::memory::MemoryHost;
use crate::value::{Key, TableRef, Value};
use crate::{Host, RunArgs};

/// Position of a vertex in the builder (and in the final vertex array, 0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexHandle(pub usize);

/// A vertex of a derived digraph: either a syntactic vertex or a synthetic one (a dummy node in a
/// spanning tree, a contracted cluster, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedVertex {
    Syntactic(VertexHandle),
    Dummy(String),
}

struct PendingDigraph {
    name: String,
    vertices: Vec<DerivedVertex>,
    arcs: Vec<(usize, usize)>,
}

/// Assembles a host graph the way the graph-drawing layer hands it to algorithms.
pub struct GraphBuilder<'h> {
    host: &'h MemoryHost,
    model: Model,
    graph_options: TableRef,
    vertices: Vec<TableRef>,
    edges: Vec<(TableRef, VertexHandle, VertexHandle, String)>,
    digraphs: Vec<PendingDigraph>,
}

impl<'h> GraphBuilder<'h> {
    pub fn new(host: &'h MemoryHost, model: &Model) -> Self {
        Self {
            host,
            model: *model,
            graph_options: host.record([]),
            vertices: Vec::new(),
            edges: Vec::new(),
            digraphs: Vec::new(),
        }
    }

    pub fn host(&self) -> &'h MemoryHost {
        self.host
    }

    fn coordinate(&self, x: f64, y: f64) -> Result<Value> {
        let new = self.host.get_field(self.model.coordinate_class, "new")?;
        self.host.call_one(&new, &[Value::Number(x), Value::Number(y)])
    }

    pub fn vertex(&mut self, name: &str, pos: (f64, f64)) -> Result<VertexHandle> {
        let pos = self.coordinate(pos.0, pos.1)?;
        let center = self.coordinate(0.0, 0.0)?;
        let anchors = self.host.record([("center", center)]);
        let path = self.host.create_table()?;
        self.host
            .set_metatable(path, Some(self.model.path_class))?;
        let v = self.host.record([
            ("name", Value::from(name)),
            ("shape", Value::from("rectangle")),
            ("kind", Value::from("node")),
            ("pos", pos),
            ("options", Value::Table(self.host.record([]))),
            ("anchors", Value::Table(anchors)),
            ("path", Value::Table(path)),
        ]);
        let meta = self.host.record([("__index", Value::Table(self.model.vertex_class))]);
        self.host.set_metatable(v, Some(meta))?;
        self.vertices.push(v);
        Ok(VertexHandle(self.vertices.len() - 1))
    }

    pub fn vertex_table(&self, v: VertexHandle) -> TableRef {
        self.vertices[v.0]
    }

    pub fn vertex_field(&mut self, v: VertexHandle, field: &str, value: Value) -> Result<&mut Self> {
        self.host.set_field(self.vertices[v.0], field, value)?;
        Ok(self)
    }

    pub fn vertex_option(&mut self, v: VertexHandle, key: &str, value: Value) -> Result<&mut Self> {
        let options = self.host.get_table(self.vertices[v.0], "options")?;
        if let Some(options) = options {
            self.host.set_field(options, key, value)?;
        }
        Ok(self)
    }

    pub fn anchor(&mut self, v: VertexHandle, name: &str, offset: (f64, f64)) -> Result<&mut Self> {
        let c = self.coordinate(offset.0, offset.1)?;
        if let Some(anchors) = self.host.get_table(self.vertices[v.0], "anchors")? {
            self.host.set_field(anchors, name, c)?;
        }
        Ok(self)
    }

    pub fn hull(&mut self, v: VertexHandle, points: &[(f64, f64)]) -> Result<&mut Self> {
        let mut values = Vec::with_capacity(points.len());
        for &(x, y) in points {
            values.push(self.coordinate(x, y)?);
        }
        let hull = self.host.array(values);
        self.host.set_field(self.vertices[v.0], "hull", Value::Table(hull))?;
        Ok(self)
    }

    /// Replaces the vertex outline path. Entries are either command strings or coordinates.
    pub fn vertex_path(&mut self, v: VertexHandle, entries: &[super::PathEntry]) -> Result<&mut Self> {
        let path = self.host.create_table()?;
        self.host.set_metatable(path, Some(self.model.path_class))?;
        for (i, e) in entries.iter().enumerate() {
            let value = match e {
                super::PathEntry::Command(s) => Value::from(s.as_str()),
                super::PathEntry::Point(x, y) => self.coordinate(*x, *y)?,
            };
            self.host.set(path, (i + 1).into(), value)?;
        }
        self.host.set_field(self.vertices[v.0], "path", Value::Table(path))?;
        Ok(self)
    }

    pub fn edge(&mut self, tail: VertexHandle, head: VertexHandle, direction: &str) -> Result<usize> {
        let e = self.host.record([
            ("tail", Value::Table(self.vertices[tail.0])),
            ("head", Value::Table(self.vertices[head.0])),
            ("direction", Value::from(direction)),
            ("options", Value::Table(self.host.record([]))),
        ]);
        self.edges.push((e, tail, head, direction.to_string()));
        Ok(self.edges.len() - 1)
    }

    pub fn edge_table(&self, e: usize) -> TableRef {
        self.edges[e].0
    }

    pub fn edge_option(&mut self, e: usize, key: &str, value: Value) -> Result<&mut Self> {
        if let Some(options) = self.host.get_table(self.edges[e].0, "options")? {
            self.host.set_field(options, key, value)?;
        }
        Ok(self)
    }

    pub fn graph_option(&mut self, key: &str, value: Value) -> Result<&mut Self> {
        self.host.set_field(self.graph_options, key, value)?;
        Ok(self)
    }

    /// Adds a derived digraph stored under `name` in the algorithm object. Arcs are given as
    /// 0-based positions into `vertices`.
    pub fn digraph(
        &mut self,
        name: &str,
        vertices: Vec<DerivedVertex>,
        arcs: Vec<(usize, usize)>,
    ) -> &mut Self {
        self.digraphs.push(PendingDigraph {
            name: name.to_string(),
            vertices,
            arcs,
        });
        self
    }

    /// Builds the graph, vertex and edge tables plus the algorithm object holding `digraph`
    /// (syntactic arcs), `ugraph` (both directions of every edge) and every digraph added with
    /// [`GraphBuilder::digraph`].
    pub fn finish(self) -> Result<RunArgs> {
        let host = self.host;

        let vertices = host.array(self.vertices.iter().map(|v| Value::Table(*v)));
        for (i, v) in self.vertices.iter().enumerate() {
            host.set(vertices, Key::Table(*v), Value::Number((i + 1) as f64))?;
        }
        let edges = host.array(self.edges.iter().map(|e| Value::Table(e.0)));
        for (i, e) in self.edges.iter().enumerate() {
            host.set(edges, Key::Table(e.0), Value::Number((i + 1) as f64))?;
        }

        let graph = host.record([("options", Value::Table(self.graph_options))]);

        // Syntactic digraph: one arc per ordered vertex pair, collecting the edges it stems from.
        let mut syntactic_arcs: Vec<((usize, usize), Vec<TableRef>)> = Vec::new();
        let mut undirected_arcs: Vec<(usize, usize)> = Vec::new();
        for (e, tail, head, direction) in &self.edges {
            let (t, h) = (tail.0, head.0);
            let pairs: &[(usize, usize)] = match direction.as_str() {
                "->" => &[(t, h)],
                "<-" => &[(h, t)],
                "--" | "<->" => &[(t, h), (h, t)],
                _ => &[],
            };
            for &pair in pairs {
                match syntactic_arcs.iter_mut().find(|(p, _)| *p == pair) {
                    Some((_, list)) => list.push(*e),
                    None => syntactic_arcs.push((pair, vec![*e])),
                }
            }
            if direction != "-!-" {
                for pair in [(t, h), (h, t)] {
                    if !undirected_arcs.contains(&pair) {
                        undirected_arcs.push(pair);
                    }
                }
            }
        }

        let digraph = host.create_table()?;
        let digraph_vertices = host.array(self.vertices.iter().map(|v| Value::Table(*v)));
        host.set_field(digraph, "vertices", Value::Table(digraph_vertices))?;
        let mut arc_values = Vec::with_capacity(syntactic_arcs.len());
        for ((t, h), list) in &syntactic_arcs {
            let syntactic_edges = host.array(list.iter().map(|e| Value::Table(*e)));
            arc_values.push(Value::Table(host.record([
                ("tail", Value::Table(self.vertices[*t])),
                ("head", Value::Table(self.vertices[*h])),
                ("syntactic_digraph", Value::Table(digraph)),
                ("syntactic_edges", Value::Table(syntactic_edges)),
            ])));
        }
        host.set_field(digraph, "arcs", Value::Table(host.array(arc_values)))?;

        let ugraph = self.derived_table(
            digraph,
            &self
                .vertices
                .iter()
                .map(|v| Value::Table(*v))
                .collect::<Vec<_>>(),
            &undirected_arcs,
        )?;

        let algorithm = host.record([
            ("digraph", Value::Table(digraph)),
            ("ugraph", Value::Table(ugraph)),
        ]);

        for pending in &self.digraphs {
            let mut members = Vec::with_capacity(pending.vertices.len());
            for dv in &pending.vertices {
                members.push(match dv {
                    DerivedVertex::Syntactic(h) => Value::Table(self.vertices[h.0]),
                    DerivedVertex::Dummy(name) => Value::Table(host.record([
                        ("name", Value::from(name.as_str())),
                        ("kind", Value::from("dummy")),
                    ])),
                });
            }
            let t = self.derived_table(digraph, &members, &pending.arcs)?;
            host.set_field(algorithm, &pending.name, Value::Table(t))?;
        }

        Ok(RunArgs {
            graph,
            vertices,
            edges,
            algorithm,
        })
    }

    fn derived_table(
        &self,
        syntactic: TableRef,
        members: &[Value],
        arcs: &[(usize, usize)],
    ) -> Result<TableRef> {
        let host = self.host;
        let t = host.create_table()?;
        host.set_field(t, "vertices", Value::Table(host.array(members.iter().cloned())))?;
        let mut arc_values = Vec::with_capacity(arcs.len());
        let member = |i: usize| {
            members.get(i).cloned().ok_or_else(|| Error::Fixture {
                message: format!("arc endpoint {i} is out of range ({} vertices)", members.len()),
            })
        };
        for &(a, b) in arcs {
            arc_values.push(Value::Table(host.record([
                ("tail", member(a)?),
                ("head", member(b)?),
                ("syntactic_digraph", Value::Table(syntactic)),
            ])));
        }
        host.set_field(t, "arcs", Value::Table(host.array(arc_values)))?;
        Ok(t)
    }
}
