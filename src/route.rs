//! Hop-at-a-time route computation
//!
//! A [`Route`] commits one transaction per [`Route::advance`]. Every advance
//! re-relaxes the whole graph from the current node with the algebra passed
//! in, so external state read by the algebra (market rates) may change
//! between hops and the next decision always sees it.

use petgraph::graph::NodeIndex;
use std::iter::FusedIterator;

use crate::algebra::{AsyncLabelAlgebra, FnAlgebra, LabelAlgebra};
use crate::config::RouteConfig;
use crate::error::{Endpoint, LookupError, RouteError};
use crate::graph::{BellmanFord, Hop, RouteGraph, ShortestRouteTree, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    /// More hops may follow
    Active,
    /// The destination has been reached
    Exhausted,
    /// The last round failed; see [`Route::resume`]
    Failed,
}

/// State of one route iteration: where we are and what we hold
#[derive(Debug, Clone)]
pub struct Route<L> {
    current: NodeIndex,
    destination: NodeIndex,
    label: L,
    status: RouteStatus,
    hops: usize,
    config: RouteConfig,
}

impl<L: Clone> Route<L> {
    /// Start a route at `source` holding `start`. Fails if either endpoint
    /// is not a node of `graph`.
    pub fn new<N, D>(
        graph: &RouteGraph<N, D>,
        source: NodeIndex,
        destination: NodeIndex,
        start: L,
        config: RouteConfig,
    ) -> Result<Self, LookupError> {
        if !graph.contains_node(source) {
            return Err(LookupError::NodeNotFound {
                endpoint: Endpoint::Source,
                node: source.index(),
            });
        }
        if !graph.contains_node(destination) {
            return Err(LookupError::NodeNotFound {
                endpoint: Endpoint::Destination,
                node: destination.index(),
            });
        }

        let status = if source == destination {
            RouteStatus::Exhausted
        } else {
            RouteStatus::Active
        };

        Ok(Self {
            current: source,
            destination,
            label: start,
            status,
            hops: 0,
            config,
        })
    }

    pub fn current_node(&self) -> NodeIndex {
        self.current
    }

    pub fn destination(&self) -> NodeIndex {
        self.destination
    }

    /// Label held at the current node
    pub fn current_label(&self) -> &L {
        &self.label
    }

    pub fn status(&self) -> RouteStatus {
        self.status
    }

    pub fn hops_committed(&self) -> usize {
        self.hops
    }

    /// Re-arm a failed route so the caller can retry, typically after
    /// updating the state the algebra reads. Returns whether the route can
    /// advance again.
    pub fn resume(&mut self) -> bool {
        if self.status == RouteStatus::Failed {
            self.status = if self.current == self.destination {
                RouteStatus::Exhausted
            } else {
                RouteStatus::Active
            };
        }
        self.status == RouteStatus::Active
    }

    /// Compute and commit the next hop.
    ///
    /// Returns `Ok(None)` once the destination is reached, and also after a
    /// failure until [`Route::resume`] is called. An error leaves the
    /// position and label of the last committed hop untouched. Advancing on
    /// a graph that lacks the route's nodes fails with
    /// [`RouteError::Unreachable`].
    pub fn advance<'g, N, D, A>(
        &mut self,
        graph: &'g RouteGraph<N, D>,
        algebra: &A,
    ) -> Result<Option<Hop<'g, N, D, L>>, RouteError>
    where
        A: LabelAlgebra<N, D, Label = L>,
    {
        if !self.ready(graph)? {
            return Ok(None);
        }

        let tree = BellmanFord::new(graph, &self.config).relax(self.current, self.label.clone(), algebra);
        self.settle(graph, tree).map(Some)
    }

    /// [`Route::advance`] for algebras that await inside `accumulate`
    pub async fn advance_async<'g, N, D, A>(
        &mut self,
        graph: &'g RouteGraph<N, D>,
        algebra: &A,
    ) -> Result<Option<Hop<'g, N, D, L>>, RouteError>
    where
        A: AsyncLabelAlgebra<N, D, Label = L>,
    {
        if !self.ready(graph)? {
            return Ok(None);
        }

        let tree = BellmanFord::new(graph, &self.config)
            .relax_async(self.current, self.label.clone(), algebra)
            .await;
        self.settle(graph, tree).map(Some)
    }

    fn ready<N, D>(&mut self, graph: &RouteGraph<N, D>) -> Result<bool, RouteError> {
        if self.status == RouteStatus::Active && self.current == self.destination {
            self.status = RouteStatus::Exhausted;
        }
        if self.status != RouteStatus::Active {
            return Ok(false);
        }

        // Handles were checked against the graph given to `new`; a different
        // graph may not contain them
        if !graph.contains_node(self.current) || !graph.contains_node(self.destination) {
            let err = RouteError::Unreachable {
                from: self.current.index(),
                to: self.destination.index(),
            };
            tracing::warn!("Route handles are not nodes of the graph being routed: {}", err);
            self.status = RouteStatus::Failed;
            return Err(err);
        }
        Ok(true)
    }

    fn settle<'g, N, D>(
        &mut self,
        graph: &'g RouteGraph<N, D>,
        tree: Result<ShortestRouteTree<L>, RouteError>,
    ) -> Result<Hop<'g, N, D, L>, RouteError> {
        let outcome = tree.and_then(|tree| self.commit(graph, tree));
        if let Err(err) = &outcome {
            tracing::warn!(
                "Route round from node {} to {} failed after {} hops: {}",
                self.current.index(),
                self.destination.index(),
                self.hops,
                err
            );
            self.status = RouteStatus::Failed;
        }
        outcome
    }

    fn commit<'g, N, D>(
        &mut self,
        graph: &'g RouteGraph<N, D>,
        tree: ShortestRouteTree<L>,
    ) -> Result<Hop<'g, N, D, L>, RouteError> {
        let unreachable = || RouteError::Unreachable {
            from: self.current.index(),
            to: self.destination.index(),
        };

        let id = tree
            .next_hop(graph, self.destination)?
            .ok_or_else(unreachable)?;
        let arc = graph.transaction(id).ok_or_else(unreachable)?;
        let next = graph.target(id).ok_or_else(unreachable)?;
        let after = tree.label(next).cloned().ok_or_else(unreachable)?;

        tracing::debug!(
            "Hop {}: transaction {} from node {} to {} (destination {})",
            self.hops + 1,
            id.index(),
            self.current.index(),
            next.index(),
            self.destination.index()
        );

        let before = std::mem::replace(&mut self.label, after.clone());
        self.current = next;
        self.hops += 1;
        if self.current == self.destination {
            self.status = RouteStatus::Exhausted;
        }

        Ok(Hop {
            arc,
            labels: [before, after],
        })
    }
}

/// Lazy, non-restartable sequence of hops driven by a fixed algebra
/// instance. The algebra may still read state that changes between calls
/// to `next`.
pub struct RouteIter<'g, N, D, A: LabelAlgebra<N, D>> {
    graph: &'g RouteGraph<N, D>,
    algebra: A,
    route: Route<A::Label>,
}

impl<'g, N, D, A: LabelAlgebra<N, D>> RouteIter<'g, N, D, A> {
    pub fn route(&self) -> &Route<A::Label> {
        &self.route
    }

    pub fn status(&self) -> RouteStatus {
        self.route.status()
    }

    pub fn current_node(&self) -> NodeIndex {
        self.route.current_node()
    }

    pub fn current_label(&self) -> &A::Label {
        self.route.current_label()
    }

    pub fn hops_committed(&self) -> usize {
        self.route.hops_committed()
    }

    pub fn algebra(&self) -> &A {
        &self.algebra
    }

    /// Swap in new algebra state before the next hop
    pub fn algebra_mut(&mut self) -> &mut A {
        &mut self.algebra
    }

    pub fn resume(&mut self) -> bool {
        self.route.resume()
    }

    pub fn into_route(self) -> Route<A::Label> {
        self.route
    }
}

impl<'g, N, D, A: LabelAlgebra<N, D>> Iterator for RouteIter<'g, N, D, A> {
    type Item = Result<Hop<'g, N, D, A::Label>, RouteError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.route.advance(self.graph, &self.algebra).transpose()
    }
}

impl<'g, N, D, A: LabelAlgebra<N, D>> FusedIterator for RouteIter<'g, N, D, A> {}

impl<N, D> RouteGraph<N, D> {
    /// Route from `source` to `destination` starting with `start`, choosing
    /// each hop with `algebra`
    pub fn route<A>(
        &self,
        source: NodeIndex,
        destination: NodeIndex,
        start: A::Label,
        algebra: A,
    ) -> Result<RouteIter<'_, N, D, A>, LookupError>
    where
        A: LabelAlgebra<N, D>,
    {
        self.route_with_config(source, destination, start, algebra, RouteConfig::default())
    }

    pub fn route_with_config<A>(
        &self,
        source: NodeIndex,
        destination: NodeIndex,
        start: A::Label,
        algebra: A,
        config: RouteConfig,
    ) -> Result<RouteIter<'_, N, D, A>, LookupError>
    where
        A: LabelAlgebra<N, D>,
    {
        let route = Route::new(self, source, destination, start, config)?;
        Ok(RouteIter {
            graph: self,
            algebra,
            route,
        })
    }

    /// Closure form of [`RouteGraph::route`]
    pub fn compute_route<L, Acc, Imp>(
        &self,
        source: NodeIndex,
        destination: NodeIndex,
        start: L,
        worst: L,
        accumulate: Acc,
        improves: Imp,
    ) -> Result<RouteIter<'_, N, D, FnAlgebra<L, Acc, Imp>>, LookupError>
    where
        L: Clone,
        Acc: Fn(Transaction<'_, N, D>, &L) -> L,
        Imp: Fn(&L, &L) -> bool,
    {
        self.route(source, destination, start, FnAlgebra::new(worst, accumulate, improves))
    }

    /// Predict the full best path from a single relaxation without
    /// committing anything. Each hop carries the labels of its endpoints
    /// from that relaxation.
    pub fn plan<A>(
        &self,
        source: NodeIndex,
        destination: NodeIndex,
        start: A::Label,
        algebra: &A,
    ) -> crate::Result<Vec<Hop<'_, N, D, A::Label>>>
    where
        A: LabelAlgebra<N, D>,
    {
        let route = Route::new(self, source, destination, start, RouteConfig::default())?;
        if route.status() == RouteStatus::Exhausted {
            return Ok(Vec::new());
        }

        let tree = BellmanFord::new(self, &route.config).relax(source, route.label, algebra)?;
        let unreachable = || RouteError::Unreachable {
            from: source.index(),
            to: destination.index(),
        };

        let mut hops = Vec::new();
        for id in tree.path_to(self, destination)? {
            let arc = self.transaction(id).ok_or_else(unreachable)?;
            let (from, to) = self.graph.edge_endpoints(id).ok_or_else(unreachable)?;
            let before = tree.label(from).cloned().ok_or_else(unreachable)?;
            let after = tree.label(to).cloned().ok_or_else(unreachable)?;
            hops.push(Hop {
                arc,
                labels: [before, after],
            });
        }
        Ok(hops)
    }
}
