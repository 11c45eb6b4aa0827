use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::fmt::Debug;

use super::types::{Transaction, TransactionSpec};
use crate::error::ConstructionError;

/// Immutable directed multigraph of blockchain states connected by
/// transactions.
///
/// Node and transaction indices follow input order and never change after
/// construction. Parallel transactions between the same pair of nodes are
/// kept as separate edges.
#[derive(Debug, Clone)]
pub struct RouteGraph<N, D> {
    pub(crate) graph: DiGraph<N, D>,
}

impl<N, D> RouteGraph<N, D> {
    /// Start building a graph from explicit node handles
    pub fn builder() -> RouteGraphBuilder<N, D> {
        RouteGraphBuilder::new()
    }

    /// Build a graph from node values and transactions that name their
    /// endpoints by value. Each endpoint resolves to the first node equal
    /// to it.
    pub fn from_values(
        nodes: Vec<N>,
        transactions: Vec<TransactionSpec<N, D>>,
    ) -> Result<Self, ConstructionError>
    where
        N: PartialEq + Debug,
    {
        let mut builder = RouteGraphBuilder::with_capacity(nodes.len(), transactions.len());
        for node in nodes {
            builder.add_node(node);
        }

        for (i, spec) in transactions.into_iter().enumerate() {
            let from = builder.resolve(&spec.from, i)?;
            let to = builder.resolve(&spec.to, i)?;
            builder.graph.add_edge(from, to, spec.details);
        }

        let graph = builder.build();
        tracing::debug!(
            "Built route graph with {} nodes, {} transactions",
            graph.node_count(),
            graph.transaction_count()
        );
        Ok(graph)
    }

    /// Get the number of nodes (N)
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of transactions (M)
    pub fn transaction_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, node: NodeIndex) -> bool {
        node.index() < self.graph.node_count()
    }

    /// Get the value stored for a node handle
    pub fn node(&self, node: NodeIndex) -> Option<&N> {
        self.graph.node_weight(node)
    }

    /// Get the handle of the first node equal to `value`
    pub fn find_node(&self, value: &N) -> Option<NodeIndex>
    where
        N: PartialEq,
    {
        self.graph
            .node_indices()
            .find(|&idx| &self.graph[idx] == value)
    }

    /// Node handles in construction order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &N)> + '_ {
        self.graph.node_indices().map(move |idx| (idx, &self.graph[idx]))
    }

    /// Get the caller-facing view of a transaction
    pub fn transaction(&self, id: EdgeIndex) -> Option<Transaction<'_, N, D>> {
        let (from, to) = self.graph.edge_endpoints(id)?;
        Some(Transaction {
            id,
            from: &self.graph[from],
            to: &self.graph[to],
            details: &self.graph[id],
        })
    }

    /// All transactions in construction order
    pub fn transactions(&self) -> impl Iterator<Item = Transaction<'_, N, D>> + '_ {
        self.arcs().map(|(_, _, tx)| tx)
    }

    /// Transactions in construction order together with their endpoint indices
    pub(crate) fn arcs(&self) -> impl Iterator<Item = (usize, usize, Transaction<'_, N, D>)> + '_ {
        self.graph.edge_references().map(move |edge| {
            let (u, v) = (edge.source(), edge.target());
            let tx = Transaction {
                id: edge.id(),
                from: &self.graph[u],
                to: &self.graph[v],
                details: edge.weight(),
            };
            (u.index(), v.index(), tx)
        })
    }

    /// Get the origin node of a transaction
    pub(crate) fn origin(&self, id: EdgeIndex) -> Option<NodeIndex> {
        self.graph.edge_endpoints(id).map(|(from, _)| from)
    }

    pub(crate) fn target(&self, id: EdgeIndex) -> Option<NodeIndex> {
        self.graph.edge_endpoints(id).map(|(_, to)| to)
    }
}

/// Incremental construction with handles returned per node
#[derive(Debug)]
pub struct RouteGraphBuilder<N, D> {
    graph: DiGraph<N, D>,
}

impl<N, D> Default for RouteGraphBuilder<N, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, D> RouteGraphBuilder<N, D> {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
        }
    }

    pub fn with_capacity(nodes: usize, transactions: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, transactions),
        }
    }

    /// Add a node and return its handle. Equal values are never merged.
    pub fn add_node(&mut self, value: N) -> NodeIndex {
        self.graph.add_node(value)
    }

    /// Add a transaction between two previously returned handles
    pub fn add_transaction(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        details: D,
    ) -> Result<EdgeIndex, ConstructionError> {
        let transaction = self.graph.edge_count();
        for node in [from, to] {
            if node.index() >= self.graph.node_count() {
                return Err(ConstructionError::UnknownNode {
                    node: format!("#{}", node.index()),
                    transaction,
                });
            }
        }
        Ok(self.graph.add_edge(from, to, details))
    }

    pub fn build(self) -> RouteGraph<N, D> {
        RouteGraph { graph: self.graph }
    }

    fn resolve(&self, value: &N, transaction: usize) -> Result<NodeIndex, ConstructionError>
    where
        N: PartialEq + Debug,
    {
        self.graph
            .node_indices()
            .find(|&idx| &self.graph[idx] == value)
            .ok_or_else(|| ConstructionError::UnknownNode {
                node: format!("{:?}", value),
                transaction,
            })
    }
}
