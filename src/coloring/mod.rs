//! Randomized 3-coloring heuristic
//!
//! Each proposal assigns every vertex one of three colors uniformly at
//! random and collects the edges whose endpoints got the same color.
//! Removing those edges leaves a properly 3-colored graph, so the list is a
//! candidate solution. Fewer edges is better; none means the graph is
//! 3-colorable.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::graph::{Edge, Graph};
use crate::solution::CandidateSolution;

/// Number of colors.
pub const COLORS: u8 = 3;

/// Source of candidate solutions for a generator.
pub trait CandidateSource {
    /// Produce the next proposal. Must terminate.
    fn propose(&mut self) -> Proposal;
}

/// One proposal: the edges that would have to be removed.
///
/// Unlike [`CandidateSolution`] this is unbounded; the generator decides
/// whether it is small enough to publish.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Proposal {
    pub removed_edges: Vec<Edge>,
}

impl Proposal {
    pub fn new(removed_edges: Vec<Edge>) -> Self {
        Self { removed_edges }
    }

    pub fn edge_count(&self) -> usize {
        self.removed_edges.len()
    }

    /// The publishable form, or `None` if it exceeds the slot bound.
    pub fn to_candidate(&self) -> Option<CandidateSolution> {
        CandidateSolution::from_edges(&self.removed_edges).ok()
    }
}

/// Uniform random coloring over `{0, 1, 2}`.
pub struct RandomColoring {
    graph: Graph,
    colors: Vec<u8>,
    rng: ChaCha8Rng,
}

impl RandomColoring {
    /// Seeded from the OS.
    pub fn new(graph: Graph) -> Self {
        Self::with_rng(graph, ChaCha8Rng::from_os_rng())
    }

    /// Reproducible sequence of proposals.
    pub fn with_seed(graph: Graph, seed: u64) -> Self {
        Self::with_rng(graph, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_seed_option(graph: Graph, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(graph, seed),
            None => Self::new(graph),
        }
    }

    fn with_rng(graph: Graph, rng: ChaCha8Rng) -> Self {
        let colors = vec![0; graph.vertex_count()];
        Self { graph, colors, rng }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The coloring behind the most recent proposal, indexed by dense
    /// vertex index (see [`Graph::dense_edges`]).
    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    fn randomize_colors(&mut self) {
        for color in self.colors.iter_mut() {
            *color = self.rng.random_range(0..COLORS);
        }
    }
}

/// Edges of `graph` whose endpoints share a color under `colors`.
///
/// `colors` is indexed by dense vertex index; the returned edges carry the
/// original identifiers.
pub fn conflicting_edges(graph: &Graph, colors: &[u8]) -> Vec<Edge> {
    graph
        .edges()
        .iter()
        .zip(graph.dense_edges())
        .filter(|(_, &(a, b))| colors[a] == colors[b])
        .map(|(edge, _)| *edge)
        .collect()
}

impl CandidateSource for RandomColoring {
    fn propose(&mut self) -> Proposal {
        self.randomize_colors();
        Proposal::new(conflicting_edges(&self.graph, &self.colors))
    }
}
