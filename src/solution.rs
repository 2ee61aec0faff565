//! Candidate solutions exchanged through the shared buffer

use std::fmt;

use crate::graph::Edge;

/// Largest number of removed edges a published candidate may carry.
pub const MAX_SOLUTION_EDGES: usize = 12;

/// A candidate had more removed edges than a buffer slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub edge_count: usize,
}

impl fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "candidate has {} edges, limit is {}",
            self.edge_count, MAX_SOLUTION_EDGES
        )
    }
}

impl std::error::Error for CapacityExceeded {}

/// The edges that must be removed so the rest of the graph is properly
/// 3-colored under some coloring.
///
/// This is the payload of one buffer slot, so it has a fixed layout and the
/// all-zero bit pattern is a valid (empty) value.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CandidateSolution {
    edge_count: u32,
    edges: [Edge; MAX_SOLUTION_EDGES],
}

impl CandidateSolution {
    /// The empty solution: the graph is 3-colorable as given.
    pub const fn empty() -> Self {
        Self {
            edge_count: 0,
            edges: [Edge::new(0, 0); MAX_SOLUTION_EDGES],
        }
    }

    /// Copy `edges` into a fixed-capacity solution, refusing oversized ones.
    pub fn from_edges(edges: &[Edge]) -> Result<Self, CapacityExceeded> {
        if edges.len() > MAX_SOLUTION_EDGES {
            return Err(CapacityExceeded {
                edge_count: edges.len(),
            });
        }
        let mut solution = Self::empty();
        solution.edges[..edges.len()].copy_from_slice(edges);
        solution.edge_count = edges.len() as u32;
        Ok(solution)
    }

    /// Number of removed edges, never above `MAX_SOLUTION_EDGES`.
    pub fn len(&self) -> usize {
        (self.edge_count as usize).min(MAX_SOLUTION_EDGES)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges[..self.len()]
    }
}

impl Default for CandidateSolution {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CandidateSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateSolution")
            .field("edge_count", &self.edge_count)
            .field("edges", &self.edges())
            .finish()
    }
}

impl fmt::Display for CandidateSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, edge) in self.edges().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", edge)?;
        }
        Ok(())
    }
}
