//! The hello world of graph drawing: vertices on a circle, ignoring sizes and edges.
//!
//! The layout is declared twice, once as a plain function and once as a [`Runner`], so both
//! ways of binding an algorithm to a key can be seen side by side.
//!
//! ```
//! use gdbridge::demo::{self, LAYOUT_KEY};
//! use gdbridge::host::model::{GraphFixture, Model};
//! use gdbridge::host::MemoryHost;
//! use gdbridge::Script;
//!
//! let host = MemoryHost::new();
//! let model = Model::install(&host)?;
//! demo::declare(&Script::new(&host))?;
//!
//! let args = GraphFixture::from_json(serde_json::json!({
//!     "options": { "fast simple demo radius": 10 },
//!     "vertices": [ { "name": "a" }, { "name": "b" } ]
//! }))?
//! .build(&host, &model)?;
//! model.run_algorithm(&host, LAYOUT_KEY, &args)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use gdbridge_core::{
    Algorithm, Declarations, Key, KeyType, Result, RunParameters, Runner, Script,
    SyntacticDigraph,
};
use std::f64::consts::TAU;

pub const LAYOUT_KEY: &str = "fast simple demo layout";
pub const RADIUS_KEY: &str = "fast simple demo radius";
pub const RUNNER_LAYOUT_KEY: &str = "fast simple demo layout c++";
pub const RUNNER_RADIUS_KEY: &str = "fast simple demo radius c++";

/// Puts vertex `i` of `n` at angle `i * 2π / n` on a circle of the given radius around the origin.
pub fn place_on_circle(graph: &mut SyntacticDigraph<'_>, radius: f64) {
    let angle = TAU / graph.vertices().len() as f64;
    for (i, v) in graph.vertices_mut().iter_mut().enumerate() {
        let alpha = angle * i as f64;
        v.pos = (alpha.cos() * radius, alpha.sin() * radius).into();
    }
}

fn circle_layout(graph: &mut SyntacticDigraph<'_>) -> Result<()> {
    let radius = graph.options().number(RADIUS_KEY)?.unwrap_or_default();
    tracing::debug!(radius, vertices = graph.vertices().len(), "simple demo layout");
    place_on_circle(graph, radius);
    Ok(())
}

/// The function-callback flavour.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleDemo;

impl Declarations for SimpleDemo {
    fn declare(&self, script: &Script<'_>) -> Result<()> {
        script.declare(
            Key::new(LAYOUT_KEY)
                .summary("The native version of the hello world of graph drawing.")
                .documentation(
                    "Arranges the nodes of a graph in a circle, without paying heed to the \
                     sizes of the nodes or to the edges. Its main purpose is to show how native \
                     code accesses the host representation of graphs.",
                )
                .precondition("connected")
                .algorithm(Algorithm::function(circle_layout)),
        )?;
        script.declare(
            Key::new(RADIUS_KEY)
                .summary("A radius value for the hello world of graph drawing")
                .value_type(KeyType::Length)
                .initial("1cm"),
        )
    }
}

/// The runner flavour.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastLayout;

impl Runner for FastLayout {
    fn run(&mut self, params: &mut RunParameters<'_, '_>) -> Result<()> {
        let radius: f64 = params.option(RUNNER_RADIUS_KEY)?.unwrap_or_default();
        place_on_circle(params.graph_mut(), radius);
        Ok(())
    }
}

impl Declarations for FastLayout {
    fn declare(&self, script: &Script<'_>) -> Result<()> {
        script.declare(
            Key::new(RUNNER_LAYOUT_KEY)
                .summary("The runner version of the hello world of graph drawing")
                .precondition("connected")
                .precondition("tree")
                .algorithm(Algorithm::runner(*self)),
        )?;
        script.declare(
            Key::new(RUNNER_RADIUS_KEY)
                .summary("A radius value for the hello world of graph drawing")
                .value_type(KeyType::Length)
                .initial("1cm"),
        )
    }
}

/// Declares both demo layouts and their radius keys.
pub fn declare(script: &Script<'_>) -> Result<()> {
    script.declare_all(&SimpleDemo)?;
    script.declare_all(&FastLayout)
}
