//! Graph input for the generator
//!
//! Edges arrive on the command line as `source-destination` descriptors,
//! e.g. `0-1 1-2 2-0`. Vertex identifiers are arbitrary non-negative
//! integers. Each distinct identifier gets a dense index in order of first
//! appearance, so per-vertex tables are sized by the vertices actually used.

use std::collections::HashMap;
use std::fmt;

use crate::error::ParseError;

/// An edge between two vertices
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Edge {
    pub source: u32,
    pub destination: u32,
}

impl Edge {
    pub const fn new(source: u32, destination: u32) -> Self {
        Self {
            source,
            destination,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.destination)
    }
}

/// Parse a vertex identifier: plain decimal digits only, no sign.
fn parse_vertex(s: &str) -> Result<u32, String> {
    if s.is_empty() {
        return Err("missing vertex identifier".to_string());
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not a non-negative integer", s));
    }
    s.parse::<u32>()
        .map_err(|_| format!("vertex identifier '{}' is too large", s))
}

/// Parse a single `source-destination` descriptor.
///
/// `position` is the 1-based argument index, used only for the error message.
pub fn parse_edge(input: &str, position: usize) -> Result<Edge, ParseError> {
    let invalid = |reason: String| ParseError::InvalidEdge {
        position,
        input: input.to_string(),
        reason,
    };

    let (source, destination) = input
        .split_once('-')
        .ok_or_else(|| invalid("expected 'source-destination'".to_string()))?;

    let source = parse_vertex(source).map_err(&invalid)?;
    let destination = parse_vertex(destination).map_err(&invalid)?;

    Ok(Edge::new(source, destination))
}

/// An undirected graph given as an edge list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    edges: Vec<Edge>,
    /// Endpoints of `edges[i]` as dense vertex indices
    dense_edges: Vec<(usize, usize)>,
    vertex_count: usize,
}

impl Graph {
    /// Build a graph from edges. At least one edge is required.
    pub fn from_edges(edges: Vec<Edge>) -> Result<Self, ParseError> {
        if edges.is_empty() {
            return Err(ParseError::NoEdges);
        }

        let mut index: HashMap<u32, usize> = HashMap::with_capacity(edges.len() * 2);
        let mut dense = |id: u32| {
            let next = index.len();
            *index.entry(id).or_insert(next)
        };
        let dense_edges = edges
            .iter()
            .map(|e| (dense(e.source), dense(e.destination)))
            .collect();

        Ok(Self {
            edges,
            dense_edges,
            vertex_count: index.len(),
        })
    }

    /// Parse every descriptor in `args`; the first malformed one is an error.
    pub fn parse<I, S>(args: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let edges = args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| parse_edge(arg.as_ref(), i + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_edges(edges)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge endpoints as indices in `0..vertex_count()`, parallel to [`Graph::edges`].
    pub fn dense_edges(&self) -> &[(usize, usize)] {
        &self.dense_edges
    }

    /// Number of distinct vertex identifiers.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}
