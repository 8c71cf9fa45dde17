//! A plain node/edge representation for layout libraries that keep their own graph structure.
//!
//! [`Bridged`] runs a [`BridgedLayout`] through the runner lifecycle: `bridge` copies the
//! syntactic digraph into a [`BridgedGraph`], `run` lets the layout place nodes and route edges,
//! `unbridge` copies node centres back into vertex positions and turns bend points into edge
//! paths.

use crate::digraph::{EdgeId, SyntacticDigraph};
use crate::error::Result;
use crate::path::Coordinate;
use crate::runner::{RunParameters, Runner};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BridgedNode {
    /// Centre of the node.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgedEdge {
    pub source: usize,
    pub target: usize,
    /// Absolute bend points between source and target.
    pub bends: Vec<Coordinate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgedGraph {
    pub nodes: Vec<BridgedNode>,
    pub edges: Vec<BridgedEdge>,
}

impl BridgedGraph {
    /// One node per vertex (sized by the vertex extent), one edge per syntactic edge, in order.
    pub fn from_digraph(graph: &SyntacticDigraph<'_>) -> Self {
        let nodes = graph
            .vertices()
            .iter()
            .map(|v| {
                let (width, height) = v
                    .bounding_box()
                    .map(|bb| (bb.width(), bb.height()))
                    .unwrap_or_default();
                BridgedNode {
                    x: v.pos.x,
                    y: v.pos.y,
                    width,
                    height,
                }
            })
            .collect();
        let edges = graph
            .edges()
            .iter()
            .map(|e| BridgedEdge {
                source: e.tail().index(),
                target: e.head().index(),
                bends: Vec::new(),
            })
            .collect();
        Self { nodes, edges }
    }

    /// Copies node centres to vertex positions. Edges with bends get the path
    /// tail anchor, bends, head anchor; the others keep their current path.
    pub fn write_back(&self, graph: &mut SyntacticDigraph<'_>) -> Result<()> {
        for (v, node) in graph.vertices_mut().iter_mut().zip(&self.nodes) {
            v.pos = Coordinate::new(node.x, node.y);
        }
        for (j, edge) in self.edges.iter().enumerate().take(graph.edges().len()) {
            let bends = normalize_bends(&edge.bends);
            if bends.is_empty() {
                continue;
            }
            let id = EdgeId::new(j);
            graph.edge_mut(id).path.clear();
            graph.append_move_to_tail_anchor(id)?;
            for b in bends {
                graph.edge_mut(id).path.append_line(b.x, b.y);
            }
            graph.append_line_to_head_anchor(id)?;
        }
        Ok(())
    }
}

/// Sine of the largest angle at which three bend points still count as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Drops repeated points and points lying on the straight line through their neighbours.
fn normalize_bends(bends: &[Coordinate]) -> Vec<Coordinate> {
    let mut unique: Vec<Coordinate> = Vec::with_capacity(bends.len());
    for &b in bends {
        if unique.last() != Some(&b) {
            unique.push(b);
        }
    }
    if unique.len() < 3 {
        return unique;
    }
    let mut out = Vec::with_capacity(unique.len());
    out.push(unique[0]);
    for w in unique.windows(3) {
        let (a, b, c) = (w[0], w[1], w[2]);
        let (ab, ac) = (b - a, c - a);
        let cross = ab.x * ac.y - ab.y * ac.x;
        let tolerance = COLLINEAR_TOLERANCE * ab.x.hypot(ab.y) * ac.x.hypot(ac.y);
        if cross.abs() > tolerance {
            out.push(b);
        }
    }
    if let Some(&last) = unique.last() {
        out.push(last);
    }
    out
}

/// A layout algorithm working on a [`BridgedGraph`].
pub trait BridgedLayout {
    /// Reads options before the layout runs.
    fn configure(&mut self, _params: &RunParameters<'_, '_>) -> Result<()> {
        Ok(())
    }

    fn call(&mut self, graph: &mut BridgedGraph) -> Result<()>;
}

/// Adapts a [`BridgedLayout`] to the runner lifecycle.
#[derive(Debug, Default)]
pub struct Bridged<L> {
    layout: L,
    graph: BridgedGraph,
}

impl<L: BridgedLayout> Bridged<L> {
    pub fn new(layout: L) -> Self {
        Self {
            layout,
            graph: BridgedGraph::default(),
        }
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }
}

impl<L: BridgedLayout> Runner for Bridged<L> {
    fn bridge(&mut self, params: &mut RunParameters<'_, '_>) -> Result<()> {
        self.graph = BridgedGraph::from_digraph(params.graph());
        Ok(())
    }

    fn run(&mut self, params: &mut RunParameters<'_, '_>) -> Result<()> {
        self.layout.configure(params)?;
        self.layout.call(&mut self.graph)
    }

    fn unbridge(&mut self, params: &mut RunParameters<'_, '_>) -> Result<()> {
        self.graph.write_back(params.graph_mut())?;
        self.graph = BridgedGraph::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coordinate {
        Coordinate::new(x, y)
    }

    #[test]
    fn bends_drop_duplicates_and_collinear_points() {
        let bends = [c(0.0, 0.0), c(0.0, 0.0), c(1.0, 1.0), c(2.0, 2.0), c(2.0, 5.0)];
        assert_eq!(
            normalize_bends(&bends),
            vec![c(0.0, 0.0), c(2.0, 2.0), c(2.0, 5.0)]
        );
    }

    #[test]
    fn collinearity_does_not_depend_on_magnitude() {
        let nearly_straight = [c(0.0, 0.0), c(1000.0, 1000.0 + 1e-8), c(2000.0, 2000.0)];
        assert_eq!(
            normalize_bends(&nearly_straight),
            vec![c(0.0, 0.0), c(2000.0, 2000.0)]
        );
        let corner = [c(0.0, 0.0), c(1000.0, 0.0), c(1000.0, 1000.0)];
        assert_eq!(normalize_bends(&corner), corner.to_vec());
        let small_corner = [c(0.0, 0.0), c(1e-6, 0.0), c(1e-6, 1e-6)];
        assert_eq!(normalize_bends(&small_corner), small_corner.to_vec());
    }

    #[test]
    fn short_bend_lists_survive() {
        assert!(normalize_bends(&[]).is_empty());
        assert_eq!(normalize_bends(&[c(1.0, 2.0), c(1.0, 2.0)]), vec![c(1.0, 2.0)]);
    }
}
