//! The syntactic digraph: vertices and edges exactly as authored, materialized natively for
//! the duration of one algorithm run.
//!
//! Vertices and edges live in two arrays owned by [`SyntacticDigraph`] and are addressed by
//! [`VertexId`] / [`EdgeId`]. Construction reads everything it needs from the host once;
//! [`SyntacticDigraph::synchronize`] writes positions and edge paths back and consumes the
//! digraph, so results can only be written once.

use crate::error::{Error, Result};
use crate::invocation::Invocation;
use crate::options::{OptionTable, Scope};
use crate::path::{BoundingBox, Coordinate, Path, PathEncoder};
use gdbridge_host::{Host, TableRef, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(usize);

impl VertexId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// 0-based position in the syntactic vertex array.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(usize);

impl EdgeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// 0-based position in the syntactic edge array.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Vertex<'i> {
    id: VertexId,
    pub name: String,
    pub shape: String,
    pub kind: String,
    /// Position of the vertex; written back on synchronization.
    pub pos: Coordinate,
    path: Path,
    hull: Vec<Coordinate>,
    hull_center: Option<Coordinate>,
    options: OptionTable<'i>,
    incoming: Vec<EdgeId>,
    outgoing: Vec<EdgeId>,
}

impl<'i> Vertex<'i> {
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Outline of the vertex relative to its position.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hull(&self) -> &[Coordinate] {
        &self.hull
    }

    pub fn hull_center(&self) -> Option<Coordinate> {
        self.hull_center
    }

    pub fn options(&self) -> OptionTable<'i> {
        self.options
    }

    /// Syntactic edges whose head is this vertex.
    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    /// Syntactic edges whose tail is this vertex.
    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    /// Extent of the hull, or of the outline path when there is no hull.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        if self.hull.is_empty() {
            BoundingBox::from_points(self.path.coordinates())
        } else {
            BoundingBox::from_points(self.hull.iter().copied())
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge<'i> {
    id: EdgeId,
    tail: VertexId,
    head: VertexId,
    direction: String,
    /// Drawing path; starts unset and is written back on synchronization.
    pub path: Path,
    options: OptionTable<'i>,
}

impl<'i> Edge<'i> {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn tail(&self) -> VertexId {
        self.tail
    }

    pub fn head(&self) -> VertexId {
        self.head
    }

    /// Direction marker as authored (`->`, `<-`, `--`, `<->`, `-!-`).
    pub fn direction(&self) -> &str {
        &self.direction
    }

    pub fn options(&self) -> OptionTable<'i> {
        self.options
    }
}

pub struct SyntacticDigraph<'i> {
    invocation: &'i Invocation<'i>,
    options: OptionTable<'i>,
    vertices: Vec<Vertex<'i>>,
    edges: Vec<Edge<'i>>,
}

impl std::fmt::Debug for SyntacticDigraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntacticDigraph")
            .field("vertices", &self.vertices)
            .field("edges", &self.edges)
            .finish()
    }
}

fn string_field(host: &dyn Host, table: TableRef, field: &str) -> Result<String> {
    Ok(match host.get_field(table, field)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn coordinate_array(host: &dyn Host, table: TableRef, owner: &str) -> Result<Vec<Coordinate>> {
    let n = host.raw_len(table)?;
    let mut out = Vec::with_capacity(n);
    for i in 1..=n {
        match host.get_index(table, i)? {
            Value::Table(c) => out.push(Coordinate::from_host(host, c)?),
            other => {
                return Err(Error::MissingField {
                    owner: owner.to_string(),
                    field: format!("coordinate {i} (found {})", other.kind()),
                });
            }
        }
    }
    Ok(out)
}

impl<'i> SyntacticDigraph<'i> {
    /// Reads vertices and edges of the invocation's syntactic graph from the host.
    pub fn construct(invocation: &'i Invocation<'i>) -> Result<Self> {
        let host = invocation.host();
        let args = invocation.args();

        let vertex_count = host.raw_len(args.vertices)?;
        let mut vertices = Vec::with_capacity(vertex_count);
        for i in 0..vertex_count {
            let t = invocation.vertex_table(i)?;
            let owner = || format!("vertex {i}");
            let id = VertexId(i);

            let pos = match host.get_table(t, "pos")? {
                Some(c) => Coordinate::from_host(host, c)?,
                None => {
                    return Err(Error::MissingField {
                        owner: owner(),
                        field: "pos".to_string(),
                    });
                }
            };
            let path = match host.get_table(t, "path")? {
                Some(p) => Path::from_host(host, p)?,
                None => Path::new(),
            };
            let hull = match host.get_table(t, "hull")? {
                Some(h) => coordinate_array(host, h, &owner())?,
                None => Vec::new(),
            };
            let hull_center = match host.get_table(t, "hull_center")? {
                Some(c) => Some(Coordinate::from_host(host, c)?),
                None => None,
            };

            vertices.push(Vertex {
                id,
                name: string_field(host, t, "name")?,
                shape: string_field(host, t, "shape")?,
                kind: string_field(host, t, "kind")?,
                pos,
                path,
                hull,
                hull_center,
                options: OptionTable::new(invocation, Scope::Vertex(id)),
                incoming: Vec::new(),
                outgoing: Vec::new(),
            });
        }

        let edge_count = host.raw_len(args.edges)?;
        let mut edges = Vec::with_capacity(edge_count);
        for j in 0..edge_count {
            let t = invocation.edge_table(j)?;
            let id = EdgeId(j);
            let endpoint = |field: &'static str| -> Result<VertexId> {
                match invocation.syntactic_position(&host.get_field(t, field)?)? {
                    Some(p) if p < vertex_count => Ok(VertexId(p)),
                    _ => Err(Error::UnresolvedVertex {
                        edge: j,
                        endpoint: field,
                    }),
                }
            };
            let tail = endpoint("tail")?;
            let head = endpoint("head")?;

            vertices[tail.0].outgoing.push(id);
            vertices[head.0].incoming.push(id);
            edges.push(Edge {
                id,
                tail,
                head,
                direction: string_field(host, t, "direction")?,
                path: Path::unset(),
                options: OptionTable::new(invocation, Scope::Edge(id)),
            });
        }

        tracing::debug!(
            vertices = vertices.len(),
            edges = edges.len(),
            "constructed syntactic digraph"
        );

        Ok(Self {
            invocation,
            options: OptionTable::new(invocation, Scope::Graph),
            vertices,
            edges,
        })
    }

    pub fn invocation(&self) -> &'i Invocation<'i> {
        self.invocation
    }

    /// Graph-level options.
    pub fn options(&self) -> OptionTable<'i> {
        self.options
    }

    pub fn vertices(&self) -> &[Vertex<'i>] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex<'i>] {
        &mut self.vertices
    }

    pub fn edges(&self) -> &[Edge<'i>] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [Edge<'i>] {
        &mut self.edges
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex<'i> {
        &self.vertices[id.0]
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex<'i> {
        &mut self.vertices[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge<'i> {
        &self.edges[id.0]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge<'i> {
        &mut self.edges[id.0]
    }

    pub fn vertex_ids(&self) -> impl ExactSizeIterator<Item = VertexId> + use<'i> {
        (0..self.vertices.len()).map(VertexId)
    }

    pub fn edge_ids(&self) -> impl ExactSizeIterator<Item = EdgeId> + use<'i> {
        (0..self.edges.len()).map(EdgeId)
    }

    /// Offset of the named anchor of `v` relative to its position, as computed by the host.
    /// `None` when the host knows no such anchor.
    pub fn vertex_anchor(&self, v: VertexId, anchor: &str) -> Result<Option<Coordinate>> {
        let host = self.invocation.host();
        let t = self.invocation.vertex_table(v.0)?;
        match host.call_method(t, "anchor", &[Value::from(anchor)])? {
            Value::Table(c) => Ok(Some(Coordinate::from_host(host, c)?)),
            _ => Ok(None),
        }
    }

    /// Absolute position of the anchor of `v` named by its `anchor_key` option.
    fn anchored_position(&self, v: VertexId, anchor_key: &str) -> Result<Coordinate> {
        let vertex = &self.vertices[v.0];
        let anchor = vertex.options.string(anchor_key)?.unwrap_or_default();
        let offset = match self.vertex_anchor(v, &anchor)? {
            Some(offset) => offset,
            None => {
                tracing::warn!(vertex = %vertex.name, anchor = %anchor, "anchor not found, using the origin");
                Coordinate::ORIGIN
            }
        };
        Ok(vertex.pos + offset)
    }

    /// Appends a move to the tail anchor of the tail vertex of `e`.
    pub fn append_move_to_tail_anchor(&mut self, e: EdgeId) -> Result<()> {
        let key = &self.invocation.config().tail_anchor_key;
        let c = self.anchored_position(self.edges[e.0].tail, key)?;
        self.edges[e.0].path.append_move(c.x, c.y);
        Ok(())
    }

    /// Appends a line to the head anchor of the head vertex of `e`.
    pub fn append_line_to_head_anchor(&mut self, e: EdgeId) -> Result<()> {
        let key = &self.invocation.config().head_anchor_key;
        let c = self.anchored_position(self.edges[e.0].head, key)?;
        self.edges[e.0].path.append_line(c.x, c.y);
        Ok(())
    }

    /// Writes vertex positions and edge paths back to the host.
    ///
    /// Edge paths that are still unset become a straight line from the tail anchor to the head
    /// anchor, computed from the final vertex positions.
    pub fn synchronize(mut self) -> Result<()> {
        let host = self.invocation.host();

        for v in &self.vertices {
            let t = self.invocation.vertex_table(v.id.0)?;
            let pos = host.get_table(t, "pos")?.ok_or_else(|| Error::MissingField {
                owner: format!("vertex {}", v.id.0),
                field: "pos".to_string(),
            })?;
            host.set_field(pos, "x", Value::Number(v.pos.x))?;
            host.set_field(pos, "y", Value::Number(v.pos.y))?;
        }

        let encoder = PathEncoder::new(host, self.invocation.config())?;
        let mut synthesized = 0usize;
        for j in 0..self.edges.len() {
            let e = EdgeId(j);
            if self.edges[j].path.is_unset() {
                self.append_move_to_tail_anchor(e)?;
                self.append_line_to_head_anchor(e)?;
                synthesized += 1;
            }
            let table = encoder.encode(&self.edges[j].path)?;
            let t = self.invocation.edge_table(j)?;
            host.set_field(t, "path", Value::Table(table))?;
        }

        tracing::debug!(
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            synthesized,
            "synchronized syntactic digraph"
        );
        Ok(())
    }
}
