//! JSON-described host graphs.
//!
//! ```json
//! {
//!   "options": { "radius": 10 },
//!   "vertices": [ { "name": "a", "pos": [0, 0] }, { "name": "b" } ],
//!   "edges": [ { "tail": "a", "head": "b", "direction": "->" } ],
//!   "digraphs": [ { "name": "spanning_tree", "vertices": ["a", "b", "x"], "arcs": [["a", "x"]] } ]
//! }
//! ```
//!
//! Derived digraph vertices that do not name a syntactic vertex become dummy vertices.

use super::builder::{DerivedVertex, GraphBuilder, VertexHandle};
use super::Model;
use crate::error::{Error, Result};
use crate::memory::MemoryHost;
use crate::value::Value;
use crate::RunArgs;
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphFixture {
    #[serde(default)]
    pub options: IndexMap<String, serde_json::Value>,
    pub vertices: Vec<VertexFixture>,
    #[serde(default)]
    pub edges: Vec<EdgeFixture>,
    #[serde(default)]
    pub digraphs: Vec<DigraphFixture>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VertexFixture {
    pub name: String,
    #[serde(default)]
    pub pos: [f64; 2],
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub options: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub anchors: IndexMap<String, [f64; 2]>,
    #[serde(default)]
    pub hull: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeFixture {
    pub tail: String,
    pub head: String,
    #[serde(default = "default_direction")]
    pub direction: String,
    #[serde(default)]
    pub options: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DigraphFixture {
    pub name: String,
    pub vertices: Vec<String>,
    #[serde(default)]
    pub arcs: Vec<[String; 2]>,
}

fn default_direction() -> String {
    "->".to_string()
}

fn host_value(key: &str, value: &serde_json::Value) -> Result<Value> {
    Ok(match value {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        _ => {
            return Err(Error::Fixture {
                message: format!("option '{key}' must be a scalar"),
            });
        }
    })
}

impl GraphFixture {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Fixture {
            message: e.to_string(),
        })
    }

    pub fn build(&self, host: &MemoryHost, model: &Model) -> Result<RunArgs> {
        let mut b = GraphBuilder::new(host, model);
        let mut by_name: IndexMap<&str, VertexHandle> = IndexMap::new();

        for (key, value) in &self.options {
            b.graph_option(key, host_value(key, value)?)?;
        }

        for v in &self.vertices {
            let h = b.vertex(&v.name, (v.pos[0], v.pos[1]))?;
            if let Some(shape) = &v.shape {
                b.vertex_field(h, "shape", Value::from(shape.as_str()))?;
            }
            if let Some(kind) = &v.kind {
                b.vertex_field(h, "kind", Value::from(kind.as_str()))?;
            }
            for (key, value) in &v.options {
                b.vertex_option(h, key, host_value(key, value)?)?;
            }
            for (name, [x, y]) in &v.anchors {
                b.anchor(h, name, (*x, *y))?;
            }
            if !v.hull.is_empty() {
                let points: Vec<(f64, f64)> = v.hull.iter().map(|[x, y]| (*x, *y)).collect();
                b.hull(h, &points)?;
            }
            if by_name.insert(v.name.as_str(), h).is_some() {
                return Err(Error::Fixture {
                    message: format!("duplicate vertex '{}'", v.name),
                });
            }
        }

        let lookup = |name: &str| {
            by_name.get(name).copied().ok_or_else(|| Error::Fixture {
                message: format!("unknown vertex '{name}'"),
            })
        };

        for e in &self.edges {
            let idx = b.edge(lookup(&e.tail)?, lookup(&e.head)?, &e.direction)?;
            for (key, value) in &e.options {
                b.edge_option(idx, key, host_value(key, value)?)?;
            }
        }

        for d in &self.digraphs {
            let vertices: Vec<DerivedVertex> = d
                .vertices
                .iter()
                .map(|name| match by_name.get(name.as_str()) {
                    Some(h) => DerivedVertex::Syntactic(*h),
                    None => DerivedVertex::Dummy(name.clone()),
                })
                .collect();
            let position = |name: &str| {
                d.vertices
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| Error::Fixture {
                        message: format!("arc endpoint '{name}' is not a vertex of '{}'", d.name),
                    })
            };
            let mut arcs = Vec::with_capacity(d.arcs.len());
            for [t, h] in &d.arcs {
                arcs.push((position(t)?, position(h)?));
            }
            b.digraph(&d.name, vertices, arcs);
        }

        b.finish()
    }
}
