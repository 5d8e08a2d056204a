//! Causal graph storage and traversal
//!
//! Backed by a `petgraph` stable graph plus a node index keyed by
//! [`NodeRef`]. Every query that returns more than one node returns it in a
//! deterministic order, independent of insertion history.

use crate::DagError;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::Dfs;
use petgraph::Direction;
use retrodict_domain::{CausalEdge, ClaimId, Layer, ModelContent, NodeRef};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A node of the causal graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Entity or event this node represents
    pub node: NodeRef,
    /// Stratum
    pub layer: Layer,
}

/// Directed acyclic graph of entities and events
#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    graph: StableDiGraph<GraphNode, CausalEdge>,
    index: BTreeMap<NodeRef, NodeIndex>,
}

impl CausalGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the graph held by a model
    ///
    /// Edges whose endpoints are unknown, or that would close a cycle, are
    /// skipped; a published model never contains either.
    pub fn from_model(content: &ModelContent) -> Self {
        let mut graph = Self::new();
        for entity in content.entities.values() {
            graph.ensure_node(NodeRef::Entity(entity.id.clone()), entity.layer);
        }
        for event in content.events.values() {
            graph.ensure_node(NodeRef::Event(event.id.clone()), event.layer);
        }
        for edge in &content.edges {
            if let Err(e) = graph.try_add_edge(edge.clone()) {
                tracing::warn!("Skipping stored edge: {}", e);
            }
        }
        graph
    }

    /// Get or create a node; an existing node takes the new layer
    pub fn ensure_node(&mut self, node: NodeRef, layer: Layer) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node) {
            if let Some(weight) = self.graph.node_weight_mut(idx) {
                weight.layer = layer;
            }
            return idx;
        }
        let idx = self.graph.add_node(GraphNode {
            node: node.clone(),
            layer,
        });
        self.index.insert(node, idx);
        idx
    }

    /// Whether a node is present
    pub fn contains(&self, node: &NodeRef) -> bool {
        self.index.contains_key(node)
    }

    /// Layer of a node
    pub fn layer(&self, node: &NodeRef) -> Option<Layer> {
        self.index
            .get(node)
            .and_then(|&idx| self.graph.node_weight(idx))
            .map(|n| n.layer)
    }

    /// Nodes in order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRef> {
        self.index.keys()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edge between two nodes
    pub fn edge(&self, cause: &NodeRef, effect: &NodeRef) -> Option<&CausalEdge> {
        self.edge_index(cause, effect)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// All edges ordered by (cause, effect)
    pub fn edges(&self) -> Vec<&CausalEdge> {
        let mut edges: Vec<&CausalEdge> = self.graph.edge_weights().collect();
        edges.sort_by(|a, b| (&a.cause, &a.effect).cmp(&(&b.cause, &b.effect)));
        edges
    }

    /// Edges into a node, ordered by cause
    pub fn incoming(&self, node: &NodeRef) -> Vec<&CausalEdge> {
        self.adjacent_edges(node, Direction::Incoming)
    }

    /// Edges out of a node, ordered by effect
    pub fn outgoing(&self, node: &NodeRef) -> Vec<&CausalEdge> {
        self.adjacent_edges(node, Direction::Outgoing)
    }

    /// Whether `to` is reachable from `from` along causal edges
    pub fn has_path(&self, from: &NodeRef, to: &NodeRef) -> bool {
        let (Some(&start), Some(&goal)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx == goal {
                return true;
            }
        }
        false
    }

    /// Whether adding `cause -> effect` would create a cycle
    pub fn would_create_cycle(&self, cause: &NodeRef, effect: &NodeRef) -> bool {
        // Self-loops are always cycles
        if cause == effect {
            return true;
        }
        self.has_path(effect, cause)
    }

    /// Add an edge after the acyclicity check
    ///
    /// On error the graph is unchanged. An edge that already exists is
    /// replaced.
    pub fn try_add_edge(&mut self, edge: CausalEdge) -> Result<(), DagError> {
        let cause = *self
            .index
            .get(&edge.cause)
            .ok_or_else(|| DagError::UnknownNode(edge.cause.clone()))?;
        let effect = *self
            .index
            .get(&edge.effect)
            .ok_or_else(|| DagError::UnknownNode(edge.effect.clone()))?;

        if let Some(existing) = self.graph.find_edge(cause, effect) {
            if let Some(weight) = self.graph.edge_weight_mut(existing) {
                *weight = edge;
            }
            return Ok(());
        }
        if self.would_create_cycle(&edge.cause, &edge.effect) {
            return Err(DagError::TemporalParadox {
                cause: edge.cause,
                effect: edge.effect,
            });
        }
        self.graph.add_edge(cause, effect, edge);
        Ok(())
    }

    /// Mutable access to an existing edge
    pub fn edge_mut(&mut self, cause: &NodeRef, effect: &NodeRef) -> Option<&mut CausalEdge> {
        let idx = self.edge_index(cause, effect)?;
        self.graph.edge_weight_mut(idx)
    }

    /// Remove an edge, returning it
    pub fn remove_edge(&mut self, cause: &NodeRef, effect: &NodeRef) -> Option<CausalEdge> {
        let idx = self.edge_index(cause, effect)?;
        self.graph.remove_edge(idx)
    }

    /// Remove every edge backed by a claim that is no longer in force
    ///
    /// Returns the removed edges in (cause, effect) order.
    pub fn prune_inactive<F>(&mut self, is_active: F) -> Vec<CausalEdge>
    where
        F: Fn(ClaimId) -> bool,
    {
        let stale: Vec<(NodeRef, NodeRef)> = self
            .edges()
            .into_iter()
            .filter(|e| e.evidence.iter().any(|id| !is_active(*id)))
            .map(|e| (e.cause.clone(), e.effect.clone()))
            .collect();
        stale
            .iter()
            .filter_map(|(cause, effect)| self.remove_edge(cause, effect))
            .collect()
    }

    /// Deterministic topological order
    ///
    /// Kahn's algorithm with an ordered ready set: among nodes whose causes
    /// are all placed, the smallest [`NodeRef`] goes first.
    pub fn topological_order(&self) -> Vec<NodeRef> {
        let mut in_degree: BTreeMap<&NodeRef, usize> = self
            .index
            .iter()
            .map(|(node, &idx)| {
                let degree = self.graph.neighbors_directed(idx, Direction::Incoming).count();
                (node, degree)
            })
            .collect();

        let mut ready: BTreeSet<&NodeRef> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();

        let mut order = Vec::with_capacity(self.index.len());
        while let Some(node) = ready.pop_first() {
            order.push(node.clone());
            for child in self.outgoing(node) {
                if let Some(degree) = in_degree.get_mut(&child.effect) {
                    *degree -= 1;
                    if *degree == 0 {
                        if let Some((key, _)) = self.index.get_key_value(&child.effect) {
                            ready.insert(key);
                        }
                    }
                }
            }
        }
        order
    }

    /// Every node with a causal path into `node`
    pub fn ancestors(&self, node: &NodeRef) -> BTreeSet<NodeRef> {
        self.reachable(node, Direction::Incoming)
    }

    /// Every node reachable from `node`
    pub fn descendants(&self, node: &NodeRef) -> BTreeSet<NodeRef> {
        self.reachable(node, Direction::Outgoing)
    }

    /// Weakly connected components, each sorted, ordered by first member
    pub fn components(&self) -> Vec<Vec<NodeRef>> {
        let nodes: Vec<&NodeRef> = self.index.keys().collect();
        let position: BTreeMap<&NodeRef, usize> =
            nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let mut sets = UnionFind::new(nodes.len());

        for edge in self.graph.edge_weights() {
            if let (Some(&a), Some(&b)) = (position.get(&edge.cause), position.get(&edge.effect)) {
                sets.union(a, b);
            }
        }

        let mut groups: BTreeMap<usize, Vec<NodeRef>> = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            groups.entry(sets.find(i)).or_default().push((*node).clone());
        }
        let mut components: Vec<Vec<NodeRef>> = groups.into_values().collect();
        components.sort_by(|a, b| a.first().cmp(&b.first()));
        components
    }

    /// Strongly connected components with more than one node
    ///
    /// Always empty for a graph built through [`CausalGraph::try_add_edge`];
    /// used to verify whole graphs.
    pub fn find_cycles(&self) -> Vec<Vec<NodeRef>> {
        petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<NodeRef> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx))
                    .map(|n| n.node.clone())
                    .collect();
                members.sort();
                members
            })
            .collect()
    }

    fn edge_index(&self, cause: &NodeRef, effect: &NodeRef) -> Option<EdgeIndex> {
        let a = *self.index.get(cause)?;
        let b = *self.index.get(effect)?;
        self.graph.find_edge(a, b)
    }

    fn adjacent_edges(&self, node: &NodeRef, direction: Direction) -> Vec<&CausalEdge> {
        let Some(&idx) = self.index.get(node) else {
            return Vec::new();
        };
        let mut edges: Vec<&CausalEdge> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| e.weight())
            .collect();
        match direction {
            Direction::Incoming => edges.sort_by(|a, b| a.cause.cmp(&b.cause)),
            Direction::Outgoing => edges.sort_by(|a, b| a.effect.cmp(&b.effect)),
        }
        edges
    }

    fn reachable(&self, node: &NodeRef, direction: Direction) -> BTreeSet<NodeRef> {
        let mut found = BTreeSet::new();
        let Some(&start) = self.index.get(node) else {
            return found;
        };
        let mut queue = VecDeque::from([start]);
        let mut seen = BTreeSet::from([start]);
        while let Some(idx) = queue.pop_front() {
            for next in self.graph.neighbors_directed(idx, direction) {
                if seen.insert(next) {
                    if let Some(weight) = self.graph.node_weight(next) {
                        found.insert(weight.node.clone());
                    }
                    queue.push_back(next);
                }
            }
        }
        found
    }
}

/// Disjoint-set forest with path halving
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller root wins so group keys follow node order
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}
