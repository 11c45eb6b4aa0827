//! Error taxonomy for graph construction and route computation

use thiserror::Error;

/// Which side of a route request referenced an unknown node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Destination,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Source => write!(f, "source"),
            Endpoint::Destination => write!(f, "destination"),
        }
    }
}

/// Raised while building a graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("transaction #{transaction} references unknown node {node}")]
    UnknownNode { node: String, transaction: usize },
}

/// Raised when a route is requested for a node the graph does not contain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{endpoint} node {node} not found in graph")]
    NodeNotFound { endpoint: Endpoint, node: usize },
}

/// Raised by a relaxation round. The round's state is discarded; hops
/// committed by earlier rounds stay valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("improving cycle detected through node {node}")]
    ImprovingCycle { node: usize },

    #[error("destination {to} not reachable from node {from}")]
    Unreachable { from: usize, to: usize },
}

/// Any error produced by this crate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Route(#[from] RouteError),
}

pub type Result<T> = std::result::Result<T, Error>;
