#![forbid(unsafe_code)]

//! Marshalling between a table-based graph-drawing host and native layout algorithms.
//!
//! A run goes through [`Dispatcher`]: the host's graph is read into a [`SyntacticDigraph`], the
//! declared [`Algorithm`] moves vertices and routes edges, and [`SyntacticDigraph::synchronize`]
//! writes positions and paths back. Options are read lazily through [`OptionTable`]; digraphs the
//! host derived for the run (spanning trees, the underlying undirected graph, ...) are queried
//! through [`Digraph`] views. Keys and algorithms are made known to the host with
//! [`Script::declare`].

pub mod bridged;
pub mod config;
pub mod declare;
pub mod derived;
pub mod digraph;
pub mod dispatch;
pub mod error;
pub mod invocation;
pub mod modules;
pub mod options;
pub mod path;
pub mod runner;

pub use bridged::{Bridged, BridgedEdge, BridgedGraph, BridgedLayout, BridgedNode};
pub use config::{BridgeConfig, ModuleNames};
pub use declare::{Alias, Declarations, Documentation, Key, KeyType, Script, Setting};
pub use derived::{Arc, Digraph};
pub use digraph::{Edge, EdgeId, SyntacticDigraph, Vertex, VertexId};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use invocation::{BackIndex, Invocation};
pub use modules::{DefaultFactory, Factory, FnFactory, ModuleRegistry};
pub use options::{FromOption, OptionTable, Scope};
pub use path::{BoundingBox, Coordinate, Path, PathEncoder, Segment};
pub use runner::{Algorithm, AlgorithmFn, FunctionRunner, RunParameters, Runner};
