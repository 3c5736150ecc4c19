//! Discovery of equation dependencies and their ordering.
//!
//! [`DependencyExtractor`] fills in which variables each equation reads at the current
//! and previous timestep. [`DependencyGraph`] turns those sets into a graph, rejects
//! same-timestep cycles and yields the evaluation order.

mod extract;
mod graph;

pub use extract::DependencyExtractor;
pub use graph::{DGraph, DependencyGraph, EdgeKind, GraphNode};
