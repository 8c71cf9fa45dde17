//! Host-side graph-drawing model for [`MemoryHost`].
//!
//! The bridge expects the host to provide a handful of modules: a `Coordinate` class with a `new`
//! constructor, a `Path` class used as metatable for edge paths, a `Digraph` class answering
//! `arc` / `incoming` / `outgoing`, and an interface module whose `declare` function receives key
//! declarations. [`Model::install`] registers minimal versions of all of them so that native code
//! can be exercised without a scripting runtime.

mod builder;
mod fixture;

pub use builder::{DerivedVertex, GraphBuilder, VertexHandle};
pub use fixture::{DigraphFixture, EdgeFixture, GraphFixture, VertexFixture};

use crate::error::{Error, Result};
use crate::memory::MemoryHost;
use crate::value::{TableRef, Value};
use crate::{Host, RunArgs};

pub const INTERFACE_MODULE: &str = "pgf.gd.interface.InterfaceToAlgorithms";
pub const COORDINATE_MODULE: &str = "pgf.gd.model.Coordinate";
pub const PATH_MODULE: &str = "pgf.gd.model.Path";
pub const DIGRAPH_MODULE: &str = "pgf.gd.model.Digraph";

/// Name of the declaration field carrying the native dispatcher.
pub const DISPATCHER_FIELD: &str = "algorithm_written_in_c";

#[derive(Debug, Clone, Copy)]
pub struct Model {
    pub coordinate_class: TableRef,
    pub path_class: TableRef,
    pub digraph_class: TableRef,
    pub vertex_class: TableRef,
    /// Every table passed to `declare`, in call order.
    pub catalog: TableRef,
}

impl Model {
    pub fn install(host: &MemoryHost) -> Result<Model> {
        let coordinate_class = host.record([]);
        let coordinate_meta = host.record([("__index", Value::Table(coordinate_class))]);
        let new_coordinate = host.function(move |h, args| {
            let x = number_arg(args, 0, "Coordinate.new")?;
            let y = number_arg(args, 1, "Coordinate.new")?;
            let c = h.create_table()?;
            h.set_field(c, "x", Value::Number(x))?;
            h.set_field(c, "y", Value::Number(y))?;
            h.set_metatable(c, Some(coordinate_meta))?;
            Ok(vec![Value::Table(c)])
        });
        host.set_field(coordinate_class, "new", new_coordinate)?;

        let path_class = host.record([]);
        host.set_field(path_class, "__index", Value::Table(path_class))?;

        let digraph_class = host.record([
            ("arc", host.function(digraph_arc)),
            ("incoming", host.function(|h, args| digraph_adjacent(h, args, "head"))),
            ("outgoing", host.function(|h, args| digraph_adjacent(h, args, "tail"))),
        ]);

        let vertex_class = host.record([("anchor", host.function(vertex_anchor))]);
        host.set_field(vertex_class, "__index", Value::Table(vertex_class))?;

        let catalog = host.array([]);
        let declare = host.function(move |h, args| {
            let Some(Value::Table(decl)) = args.first() else {
                return Err(Error::BadArgument {
                    function: "declare".to_string(),
                    position: 1,
                    message: "table expected".to_string(),
                });
            };
            let n = h.raw_len(catalog)?;
            h.set(catalog, (n + 1).into(), Value::Table(*decl))?;
            Ok(Vec::new())
        });
        let interface = host.record([("declare", declare)]);

        host.register_module(INTERFACE_MODULE, Value::Table(interface));
        host.register_module(COORDINATE_MODULE, Value::Table(coordinate_class));
        host.register_module(PATH_MODULE, Value::Table(path_class));
        host.register_module(DIGRAPH_MODULE, Value::Table(digraph_class));

        Ok(Model {
            coordinate_class,
            path_class,
            digraph_class,
            vertex_class,
            catalog,
        })
    }

    /// The most recent declaration of `key`, if any.
    pub fn declaration(&self, host: &MemoryHost, key: &str) -> Result<Option<TableRef>> {
        let mut found = None;
        for entry in host.array_values(self.catalog)? {
            let Value::Table(t) = entry else { continue };
            if host.get_field(t, "key")?.as_str() == Some(key) {
                found = Some(t);
            }
        }
        Ok(found)
    }

    /// Runs the native algorithm declared under `key` the way the host's layout pipeline would.
    pub fn run_algorithm(&self, host: &MemoryHost, key: &str, args: &RunArgs) -> Result<()> {
        let decl = self.declaration(host, key)?.ok_or_else(|| Error::BadArgument {
            function: "run_algorithm".to_string(),
            position: 1,
            message: format!("no declaration for key '{key}'"),
        })?;
        let dispatcher = host.get_field(decl, DISPATCHER_FIELD)?;
        host.call(&dispatcher, &args.as_values())?;
        Ok(())
    }
}

/// Decodes a host path array into plain values, replacing coordinate objects by `(x, y)`.
pub fn path_entries(host: &dyn Host, path: TableRef) -> Result<Vec<PathEntry>> {
    let n = host.raw_len(path)?;
    let mut out = Vec::with_capacity(n);
    for i in 1..=n {
        match host.get_index(path, i)? {
            Value::String(s) => out.push(PathEntry::Command(s)),
            Value::Table(c) => {
                let x = host.get_field(c, "x")?.as_number().unwrap_or(0.0);
                let y = host.get_field(c, "y")?.as_number().unwrap_or(0.0);
                out.push(PathEntry::Point(x, y));
            }
            other => {
                return Err(Error::BadArgument {
                    function: "path_entries".to_string(),
                    position: i,
                    message: format!("unexpected {} in path", other.kind()),
                });
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathEntry {
    Command(String),
    Point(f64, f64),
}

fn number_arg(args: &[Value], position: usize, function: &str) -> Result<f64> {
    args.get(position)
        .and_then(Value::as_number)
        .ok_or_else(|| Error::BadArgument {
            function: function.to_string(),
            position: position + 1,
            message: "number expected".to_string(),
        })
}

fn table_arg(args: &[Value], position: usize, function: &str) -> Result<TableRef> {
    args.get(position)
        .and_then(Value::as_table)
        .ok_or_else(|| Error::BadArgument {
            function: function.to_string(),
            position: position + 1,
            message: "table expected".to_string(),
        })
}

fn arcs_of(h: &dyn Host, digraph: TableRef) -> Result<Vec<TableRef>> {
    let Some(arcs) = h.get_table(digraph, "arcs")? else {
        return Ok(Vec::new());
    };
    let n = h.raw_len(arcs)?;
    let mut out = Vec::with_capacity(n);
    for i in 1..=n {
        if let Value::Table(a) = h.get_index(arcs, i)? {
            out.push(a);
        }
    }
    Ok(out)
}

fn digraph_arc(h: &dyn Host, args: &[Value]) -> Result<Vec<Value>> {
    let g = table_arg(args, 0, "Digraph.arc")?;
    let tail = args.get(1).cloned().unwrap_or_default();
    let head = args.get(2).cloned().unwrap_or_default();
    for a in arcs_of(h, g)? {
        if h.get_field(a, "tail")? == tail && h.get_field(a, "head")? == head {
            return Ok(vec![Value::Table(a)]);
        }
    }
    Ok(vec![Value::Nil])
}

fn digraph_adjacent(h: &dyn Host, args: &[Value], endpoint: &str) -> Result<Vec<Value>> {
    let g = table_arg(args, 0, "Digraph.adjacent")?;
    let v = args.get(1).cloned().unwrap_or_default();
    let out = h.create_table()?;
    let mut n = 0usize;
    for a in arcs_of(h, g)? {
        if h.get_field(a, endpoint)? == v {
            n += 1;
            h.set(out, n.into(), Value::Table(a))?;
        }
    }
    Ok(vec![Value::Table(out)])
}

fn vertex_anchor(h: &dyn Host, args: &[Value]) -> Result<Vec<Value>> {
    let v = table_arg(args, 0, "Vertex.anchor")?;
    let name = match args.get(1).and_then(Value::as_str) {
        None | Some("") => "center",
        Some(name) => name,
    };
    let Some(anchors) = h.get_table(v, "anchors")? else {
        return Ok(vec![Value::Nil]);
    };
    Ok(vec![h.get_field(anchors, name)?])
}
