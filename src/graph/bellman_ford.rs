use petgraph::graph::{EdgeIndex, NodeIndex};

use super::builder::RouteGraph;
use crate::algebra::{AsyncLabelAlgebra, LabelAlgebra};
use crate::config::RouteConfig;
use crate::error::RouteError;

/// Result of one relaxation round: the best label found for every node and
/// the transaction that produced it
#[derive(Debug, Clone)]
pub struct ShortestRouteTree<L> {
    source: NodeIndex,
    labels: Vec<L>,
    predecessor: Vec<Option<EdgeIndex>>,
    passes: usize,
}

impl<L> ShortestRouteTree<L> {
    pub fn source(&self) -> NodeIndex {
        self.source
    }

    pub fn label(&self, node: NodeIndex) -> Option<&L> {
        self.labels.get(node.index())
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Transaction that last improved `node`, if any
    pub fn predecessor(&self, node: NodeIndex) -> Option<EdgeIndex> {
        self.predecessor.get(node.index()).copied().flatten()
    }

    /// Number of relaxation passes actually run
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Walk predecessors back from `destination` and return the best path
    /// from the source, first transaction first. Empty when `destination`
    /// is the source.
    pub fn path_to<N, D>(
        &self,
        graph: &RouteGraph<N, D>,
        destination: NodeIndex,
    ) -> Result<Vec<EdgeIndex>, RouteError> {
        let unreachable = RouteError::Unreachable {
            from: self.source.index(),
            to: destination.index(),
        };
        let n = self.labels.len();

        let mut path = Vec::new();
        let mut node = destination;
        while node != self.source {
            let arc = self.predecessor(node).ok_or_else(|| unreachable.clone())?;
            path.push(arc);

            // A simple path has at most N-1 transactions; anything longer
            // means the predecessors loop without reaching the source
            if path.len() >= n {
                tracing::warn!(
                    "Predecessor walk from {} looped at node {}",
                    destination.index(),
                    node.index()
                );
                return Err(RouteError::ImprovingCycle { node: node.index() });
            }
            node = graph.origin(arc).ok_or_else(|| unreachable.clone())?;
        }

        path.reverse();
        Ok(path)
    }

    /// First transaction of the best path to `destination`
    pub fn next_hop<N, D>(
        &self,
        graph: &RouteGraph<N, D>,
        destination: NodeIndex,
    ) -> Result<Option<EdgeIndex>, RouteError> {
        Ok(self.path_to(graph, destination)?.first().copied())
    }
}

/// Bellman-Ford relaxation generalized to a label algebra
pub struct BellmanFord<'g, N, D> {
    graph: &'g RouteGraph<N, D>,
    early_exit: bool,
}

impl<'g, N, D> BellmanFord<'g, N, D> {
    pub fn new(graph: &'g RouteGraph<N, D>, config: &RouteConfig) -> Self {
        Self {
            graph,
            early_exit: config.early_exit,
        }
    }

    /// Relax every transaction up to `N-1` times from `source`, then verify
    /// that no transaction can still improve a label.
    ///
    /// Transactions are relaxed in construction order and only a strictly
    /// improving candidate replaces a label, so the first transaction to
    /// reach the best label keeps the predecessor slot.
    ///
    /// Panics if `source` is not a node of the graph.
    pub fn relax<A>(
        &self,
        source: NodeIndex,
        start: A::Label,
        algebra: &A,
    ) -> Result<ShortestRouteTree<A::Label>, RouteError>
    where
        A: LabelAlgebra<N, D>,
    {
        let n = self.graph.node_count();
        let mut labels = vec![algebra.worst_label(); n];
        let mut predecessor = vec![None; n];
        labels[source.index()] = start;

        let mut passes = 0;
        for _ in 1..n {
            passes += 1;
            let mut improved = false;

            for (u, v, tx) in self.graph.arcs() {
                let candidate = algebra.accumulate(tx, &labels[u]);
                if algebra.improves(&candidate, &labels[v]) {
                    tracing::trace!("Pass {}: transaction {} improves node {}", passes, tx.id.index(), v);
                    labels[v] = candidate;
                    predecessor[v] = Some(tx.id);
                    improved = true;
                }
            }

            if !improved && self.early_exit {
                break;
            }
        }

        for (u, v, tx) in self.graph.arcs() {
            if algebra.improves(&algebra.accumulate(tx, &labels[u]), &labels[v]) {
                return Err(self.cycle_at(v, tx.id));
            }
        }

        tracing::debug!(
            "Relaxed {} transactions from node {} in {} passes",
            self.graph.transaction_count(),
            source.index(),
            passes
        );

        Ok(ShortestRouteTree {
            source,
            labels,
            predecessor,
            passes,
        })
    }

    /// Same round as [`BellmanFord::relax`], awaiting each `accumulate` in
    /// turn
    pub async fn relax_async<A>(
        &self,
        source: NodeIndex,
        start: A::Label,
        algebra: &A,
    ) -> Result<ShortestRouteTree<A::Label>, RouteError>
    where
        A: AsyncLabelAlgebra<N, D>,
    {
        let n = self.graph.node_count();
        let mut labels = vec![algebra.worst_label(); n];
        let mut predecessor = vec![None; n];
        labels[source.index()] = start;

        let mut passes = 0;
        for _ in 1..n {
            passes += 1;
            let mut improved = false;

            for (u, v, tx) in self.graph.arcs() {
                let candidate = algebra.accumulate(tx, &labels[u]).await;
                if algebra.improves(&candidate, &labels[v]) {
                    tracing::trace!("Pass {}: transaction {} improves node {}", passes, tx.id.index(), v);
                    labels[v] = candidate;
                    predecessor[v] = Some(tx.id);
                    improved = true;
                }
            }

            if !improved && self.early_exit {
                break;
            }
        }

        for (u, v, tx) in self.graph.arcs() {
            let candidate = algebra.accumulate(tx, &labels[u]).await;
            if algebra.improves(&candidate, &labels[v]) {
                return Err(self.cycle_at(v, tx.id));
            }
        }

        tracing::debug!(
            "Relaxed {} transactions from node {} in {} passes (async)",
            self.graph.transaction_count(),
            source.index(),
            passes
        );

        Ok(ShortestRouteTree {
            source,
            labels,
            predecessor,
            passes,
        })
    }

    fn cycle_at(&self, node: usize, arc: EdgeIndex) -> RouteError {
        tracing::warn!(
            "Transaction {} still improves node {} after {} passes - improving cycle",
            arc.index(),
            node,
            self.graph.node_count().saturating_sub(1)
        );
        RouteError::ImprovingCycle { node }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{FnAlgebra, MaxProduct, MinSum};
    use crate::graph::{Transaction, TransactionSpec};
    use async_trait::async_trait;

    type Graph = RouteGraph<&'static str, f64>;

    fn graph(nodes: &[&'static str], arcs: &[(&'static str, &'static str, f64)]) -> Graph {
        RouteGraph::from_values(
            nodes.to_vec(),
            arcs.iter()
                .map(|&(from, to, w)| TransactionSpec::new(from, to, w))
                .collect(),
        )
        .unwrap()
    }

    fn rate(tx: Transaction<'_, &'static str, f64>) -> f64 {
        *tx.details
    }

    #[test]
    fn test_concrete_labels() {
        let g = graph(&["A", "B", "C"], &[("A", "B", 2.0), ("B", "C", 3.0), ("B", "C", 5.0)]);
        let bf = BellmanFord::new(&g, &RouteConfig::default());
        let tree = bf.relax(NodeIndex::new(0), 1.0, &MaxProduct::new(rate)).unwrap();

        assert_eq!(tree.labels(), &[1.0, 2.0, 10.0]);
        assert_eq!(tree.predecessor(NodeIndex::new(2)), Some(EdgeIndex::new(2)));
        assert_eq!(
            tree.path_to(&g, NodeIndex::new(2)).unwrap(),
            vec![EdgeIndex::new(0), EdgeIndex::new(2)]
        );
        assert_eq!(tree.next_hop(&g, NodeIndex::new(2)).unwrap(), Some(EdgeIndex::new(0)));
    }

    #[test]
    fn test_equal_candidate_keeps_first_predecessor() {
        let g = graph(&["A", "B"], &[("A", "B", 4.0), ("A", "B", 4.0)]);
        let bf = BellmanFord::new(&g, &RouteConfig::default());
        let tree = bf.relax(NodeIndex::new(0), 1.0, &MaxProduct::new(rate)).unwrap();
        assert_eq!(tree.predecessor(NodeIndex::new(1)), Some(EdgeIndex::new(0)));
    }

    #[test]
    fn test_two_node_improving_cycle() {
        let g = graph(&["A", "B"], &[("A", "B", 3.0), ("B", "A", 2.0)]);
        let bf = BellmanFord::new(&g, &RouteConfig::default());
        let err = bf.relax(NodeIndex::new(0), 1.0, &MaxProduct::new(rate)).unwrap_err();
        assert!(matches!(err, RouteError::ImprovingCycle { .. }));
    }

    #[test]
    fn test_non_improving_cycle_is_accepted() {
        // Round trip loses value, so the cycle never pays off
        let g = graph(&["A", "B", "C"], &[("A", "B", 0.5), ("B", "A", 1.5), ("B", "C", 2.0)]);
        let bf = BellmanFord::new(&g, &RouteConfig::default());
        let tree = bf.relax(NodeIndex::new(0), 1.0, &MaxProduct::new(rate)).unwrap();
        assert_eq!(tree.labels(), &[1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_unreachable_destination() {
        let g = graph(&["A", "B", "C"], &[("A", "B", 1.0), ("C", "B", 1.0)]);
        let bf = BellmanFord::new(&g, &RouteConfig::default());
        let tree = bf.relax(NodeIndex::new(0), 1.0, &MaxProduct::new(rate)).unwrap();
        assert_eq!(
            tree.path_to(&g, NodeIndex::new(2)).unwrap_err(),
            RouteError::Unreachable { from: 0, to: 2 }
        );
    }

    #[test]
    fn test_path_to_source_is_empty() {
        let g = graph(&["A", "B"], &[("A", "B", 1.0)]);
        let bf = BellmanFord::new(&g, &RouteConfig::default());
        let tree = bf.relax(NodeIndex::new(0), 0.0, &MinSum::new(rate)).unwrap();
        assert!(tree.path_to(&g, NodeIndex::new(0)).unwrap().is_empty());
        assert_eq!(tree.next_hop(&g, NodeIndex::new(0)).unwrap(), None);
    }

    /// Transactions listed against topological order so several passes are
    /// needed before labels settle
    fn weighted() -> Graph {
        graph(
            &["S", "A", "B", "C", "D", "E"],
            &[
                ("D", "E", 1.0),
                ("C", "D", 2.0),
                ("B", "C", 1.0),
                ("A", "B", 4.0),
                ("S", "A", 1.0),
                ("S", "C", 9.0),
                ("A", "C", 3.0),
                ("B", "E", 7.0),
            ],
        )
    }

    /// Runs a synchronous algebra through the async engine, yielding before
    /// every answer
    struct Awaiting<A>(A);

    #[async_trait(?Send)]
    impl<A: LabelAlgebra<&'static str, f64>> AsyncLabelAlgebra<&'static str, f64> for Awaiting<A> {
        type Label = A::Label;

        fn worst_label(&self) -> A::Label {
            self.0.worst_label()
        }

        async fn accumulate(&self, arc: Transaction<'_, &'static str, f64>, label: &A::Label) -> A::Label {
            tokio::task::yield_now().await;
            self.0.accumulate(arc, label)
        }

        fn improves(&self, candidate: &A::Label, current: &A::Label) -> bool {
            self.0.improves(candidate, current)
        }
    }

    #[test]
    fn test_early_exit_matches_full_passes() {
        let g = weighted();
        let source = NodeIndex::new(0);
        let early = BellmanFord::new(&g, &RouteConfig { early_exit: true })
            .relax(source, 0.0, &MinSum::new(rate))
            .unwrap();
        let full = BellmanFord::new(&g, &RouteConfig { early_exit: false })
            .relax(source, 0.0, &MinSum::new(rate))
            .unwrap();

        assert_eq!(early.labels(), full.labels());
        for node in g.graph.node_indices() {
            assert_eq!(early.predecessor(node), full.predecessor(node));
        }
        assert_eq!(full.passes(), 5);
        assert!(early.passes() <= full.passes());
        assert_eq!(early.labels(), &[0.0, 1.0, 5.0, 4.0, 6.0, 7.0]);
    }

    #[test]
    fn test_single_node_self_loop_cycle() {
        let g = graph(&["A"], &[("A", "A", 2.0)]);
        let bf = BellmanFord::new(&g, &RouteConfig::default());
        let err = bf.relax(NodeIndex::new(0), 1.0, &MaxProduct::new(rate)).unwrap_err();
        assert_eq!(err, RouteError::ImprovingCycle { node: 0 });
    }

    #[test]
    fn test_predecessor_loop_is_reported_as_cycle() {
        // Non-monotone rule: the label after a transaction ignores the label
        // before it. A settles at 5 via B, B at 11 via A, and neither
        // predecessor leads back to S.
        let g = graph(&["S", "A", "B"], &[("S", "A", 1.0), ("A", "B", 11.0), ("B", "A", 5.0)]);
        let algebra = FnAlgebra::new(
            f64::NEG_INFINITY,
            |tx: Transaction<'_, &'static str, f64>, label: &f64| {
                if *label == f64::NEG_INFINITY {
                    f64::NEG_INFINITY
                } else {
                    *tx.details
                }
            },
            |a: &f64, b: &f64| a > b,
        );

        let tree = BellmanFord::new(&g, &RouteConfig::default())
            .relax(NodeIndex::new(0), 0.0, &algebra)
            .unwrap();
        assert_eq!(tree.labels(), &[0.0, 5.0, 11.0]);
        assert_eq!(
            tree.path_to(&g, NodeIndex::new(2)).unwrap_err(),
            RouteError::ImprovingCycle { node: 2 }
        );
        assert_eq!(
            tree.next_hop(&g, NodeIndex::new(2)).unwrap_err(),
            RouteError::ImprovingCycle { node: 2 }
        );
    }

    #[tokio::test]
    async fn test_async_relaxation_matches_sync() {
        let g = weighted();
        let source = NodeIndex::new(0);

        for early_exit in [true, false] {
            let bf = BellmanFord::new(&g, &RouteConfig { early_exit });
            let sync = bf.relax(source, 0.0, &MinSum::new(rate)).unwrap();
            let awaited = bf
                .relax_async(source, 0.0, &Awaiting(MinSum::new(rate)))
                .await
                .unwrap();

            assert_eq!(sync.labels(), awaited.labels());
            assert_eq!(sync.passes(), awaited.passes());
            for node in g.graph.node_indices() {
                assert_eq!(sync.predecessor(node), awaited.predecessor(node));
            }
        }
    }

    #[tokio::test]
    async fn test_async_two_node_improving_cycle() {
        let g = graph(&["A", "B"], &[("A", "B", 3.0), ("B", "A", 2.0)]);
        for early_exit in [true, false] {
            let err = BellmanFord::new(&g, &RouteConfig { early_exit })
                .relax_async(NodeIndex::new(0), 1.0, &Awaiting(MaxProduct::new(rate)))
                .await
                .unwrap_err();
            assert!(matches!(err, RouteError::ImprovingCycle { .. }));
        }
    }
}
