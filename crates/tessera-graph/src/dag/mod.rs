//! Directed dependency graph.
//!
//! Edges point from dependent to dependency ("consumer depends on
//! producer"). In the rendering each vertex is followed by the vertices it
//! depends on; walking a finished graph in reverse topological order visits
//! producers first.
//!
//! # Structure
//!
//! - [`VertexId`] - stable handle of a vertex, never reused within a graph
//! - [`GraphVertex`] - what a vertex payload must provide (its rendered name)
//! - [`Graph`] - vertices plus down (dependency) and up (dependent) edge sets
//!
//! # Determinism
//!
//! Vertices and edges are kept in insertion order with `indexmap`. Rendering
//! sorts by vertex name, so output never depends on construction order.

mod graph;


pub use graph::{Graph, GraphVertex, VertexId};
