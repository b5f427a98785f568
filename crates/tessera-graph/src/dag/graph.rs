//! Graph container, reachability, cycle detection and reduction.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::error::{GraphError, Result};

/// Stable handle of a vertex within one [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub(crate) u32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A vertex payload.
pub trait GraphVertex {
    /// Human-readable, stable name used for rendering and diagnostics.
    fn name(&self) -> String;
}

type EdgeSets = IndexMap<VertexId, IndexSet<VertexId>>;

/// Directed graph of `V` vertices.
///
/// An edge `a -> b` means "a depends on b". Duplicate edges collapse.
#[derive(Debug, Clone)]
pub struct Graph<V> {
    vertices: IndexMap<VertexId, V>,
    /// Dependencies of each vertex
    down: EdgeSets,
    /// Dependents of each vertex
    up: EdgeSets,
    next_id: u32,
}

impl<V> Default for Graph<V> {
    fn default() -> Self {
        Self {
            vertices: IndexMap::new(),
            down: IndexMap::new(),
            up: IndexMap::new(),
            next_id: 0,
        }
    }
}

impl<V: GraphVertex> Graph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its id.
    pub fn add(&mut self, vertex: V) -> VertexId {
        let id = VertexId(self.next_id);
        self.next_id += 1;
        self.vertices.insert(id, vertex);
        self.down.insert(id, IndexSet::new());
        self.up.insert(id, IndexSet::new());
        id
    }

    /// Remove a vertex and every edge touching it.
    pub fn remove(&mut self, id: VertexId) -> Result<V> {
        let vertex = self
            .vertices
            .shift_remove(&id)
            .ok_or(GraphError::UnknownVertex(id))?;
        for dep in self.down.shift_remove(&id).unwrap_or_default() {
            if let Some(dependents) = self.up.get_mut(&dep) {
                dependents.shift_remove(&id);
            }
        }
        for dependent in self.up.shift_remove(&id).unwrap_or_default() {
            if let Some(deps) = self.down.get_mut(&dependent) {
                deps.shift_remove(&id);
            }
        }
        Ok(vertex)
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&V> {
        self.vertices.get(&id)
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut V> {
        self.vertices.get_mut(&id)
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &V)> {
        self.vertices.iter().map(|(id, v)| (*id, v))
    }

    /// Snapshot of all ids, for loops that mutate the graph.
    pub fn ids(&self) -> Vec<VertexId> {
        self.vertices.keys().copied().collect()
    }

    /// First vertex matching `pred`, in insertion order.
    pub fn find(&self, pred: impl Fn(&V) -> bool) -> Option<VertexId> {
        self.vertices
            .iter()
            .find(|(_, v)| pred(v))
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.down.values().map(IndexSet::len).sum()
    }

    fn check(&self, id: VertexId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownVertex(id))
        }
    }

    /// Add `from -> to`.
    ///
    /// Returns false if the edge already existed. Acyclicity is not checked
    /// here; use [`Graph::would_cycle`] first where it matters.
    pub fn connect(&mut self, from: VertexId, to: VertexId) -> Result<bool> {
        self.check(from)?;
        self.check(to)?;
        let added = self.down.entry(from).or_default().insert(to);
        self.up.entry(to).or_default().insert(from);
        Ok(added)
    }

    /// Remove `from -> to`, returning whether it existed.
    pub fn disconnect(&mut self, from: VertexId, to: VertexId) -> bool {
        let removed = self
            .down
            .get_mut(&from)
            .is_some_and(|deps| deps.shift_remove(&to));
        if let Some(dependents) = self.up.get_mut(&to) {
            dependents.shift_remove(&from);
        }
        removed
    }

    pub fn has_edge(&self, from: VertexId, to: VertexId) -> bool {
        self.down.get(&from).is_some_and(|deps| deps.contains(&to))
    }

    /// Direct dependencies of `id`.
    pub fn down_edges(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.down.get(&id).into_iter().flat_map(|s| s.iter().copied())
    }

    /// Direct dependents of `id`.
    pub fn up_edges(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.up.get(&id).into_iter().flat_map(|s| s.iter().copied())
    }

    /// Everything `id` transitively depends on.
    pub fn descendants(&self, id: VertexId) -> IndexSet<VertexId> {
        reachable(id, &self.down)
    }

    /// Everything that transitively depends on `id`.
    pub fn ancestors(&self, id: VertexId) -> IndexSet<VertexId> {
        reachable(id, &self.up)
    }

    /// Whether adding `from -> to` would close a cycle.
    pub fn would_cycle(&self, from: VertexId, to: VertexId) -> bool {
        from == to || self.descendants(to).contains(&from)
    }

    /// Every cycle in the graph.
    ///
    /// Each cycle is a strongly connected component of more than one vertex,
    /// or a single vertex with an edge to itself. Members are sorted by id.
    pub fn cycles(&self) -> Vec<Vec<VertexId>> {
        let mut scc = Tarjan::new(&self.down);
        for id in self.vertices.keys() {
            if !scc.indices.contains_key(id) {
                scc.visit(*id);
            }
        }
        scc.components
            .into_iter()
            .filter(|c| c.len() > 1 || self.has_edge(c[0], c[0]))
            .map(|mut c| {
                c.sort();
                c
            })
            .collect()
    }

    /// Remove every edge `a -> c` for which a longer path `a -> b -> ... -> c`
    /// exists. Reachability is unchanged.
    ///
    /// Only meaningful on an acyclic graph.
    pub fn transitive_reduction(&mut self) -> usize {
        let mut redundant = Vec::new();
        for (id, deps) in &self.down {
            for dep in deps {
                for reached in reachable(*dep, &self.down) {
                    if reached != *dep && deps.contains(&reached) {
                        redundant.push((*id, reached));
                    }
                }
            }
        }
        let mut removed = 0;
        for (from, to) in redundant {
            if self.disconnect(from, to) {
                removed += 1;
            }
        }
        removed
    }

    /// Vertex names with their sorted dependency names, sorted by name.
    pub fn rendering(&self) -> Vec<(String, Vec<String>)> {
        let mut out: Vec<(String, Vec<String>)> = self
            .vertices
            .iter()
            .map(|(id, v)| {
                let mut deps: Vec<String> = self
                    .down_edges(*id)
                    .filter_map(|d| self.vertex(d).map(GraphVertex::name))
                    .collect();
                deps.sort();
                (v.name(), deps)
            })
            .collect();
        out.sort();
        out
    }

    /// Deterministic text form: each vertex on its own line followed by its
    /// dependencies indented by two spaces.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for (name, deps) in self.rendering() {
            lines.push(name);
            lines.extend(deps.into_iter().map(|d| format!("  {d}")));
        }
        lines.join("\n")
    }
}

fn reachable(start: VertexId, edges: &EdgeSets) -> IndexSet<VertexId> {
    let mut seen = IndexSet::new();
    let mut stack: Vec<VertexId> = edges
        .get(&start)
        .map(|s| s.iter().copied().collect())
        .unwrap_or_default();
    while let Some(next) = stack.pop() {
        if seen.insert(next) {
            if let Some(more) = edges.get(&next) {
                stack.extend(more.iter().copied());
            }
        }
    }
    seen
}

/// Tarjan's strongly connected components over the down edges.
struct Tarjan<'a> {
    edges: &'a EdgeSets,
    next_index: u32,
    indices: IndexMap<VertexId, u32>,
    lowlink: IndexMap<VertexId, u32>,
    stack: Vec<VertexId>,
    on_stack: IndexSet<VertexId>,
    components: Vec<Vec<VertexId>>,
}

impl<'a> Tarjan<'a> {
    fn new(edges: &'a EdgeSets) -> Self {
        Self {
            edges,
            next_index: 0,
            indices: IndexMap::new(),
            lowlink: IndexMap::new(),
            stack: Vec::new(),
            on_stack: IndexSet::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, v: VertexId) {
        self.indices.insert(v, self.next_index);
        self.lowlink.insert(v, self.next_index);
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        let edges = self.edges;
        for w in edges.get(&v).into_iter().flatten().copied() {
            if !self.indices.contains_key(&w) {
                self.visit(w);
                let low = self.lowlink[&v].min(self.lowlink[&w]);
                self.lowlink.insert(v, low);
            } else if self.on_stack.contains(&w) {
                let low = self.lowlink[&v].min(self.indices[&w]);
                self.lowlink.insert(v, low);
            }
        }

        if self.lowlink[&v] == self.indices[&v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.shift_remove(&w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}
