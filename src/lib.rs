//! Hop-at-a-time routing over a graph of opaque states.
//!
//! A [`RouteGraph`] holds nodes and the transactions between them. Routing
//! runs a Bellman-Ford relaxation generalized to a caller-supplied
//! [`LabelAlgebra`] and commits only the first transaction of the best path.
//! The graph is relaxed again from the new position before every hop, so
//! labels that depend on external state (rates, fees, balances) are read
//! fresh each time.

pub mod algebra;
pub mod config;
pub mod display;
pub mod error;
pub mod graph;
pub mod route;
pub mod scenario;
pub mod stream;

pub use algebra::{AsyncLabelAlgebra, FnAlgebra, LabelAlgebra, MaxProduct, MinSum};
pub use config::RouteConfig;
pub use error::{ConstructionError, Endpoint, Error, LookupError, Result, RouteError};
pub use graph::{BellmanFord, Hop, RouteGraph, RouteGraphBuilder, ShortestRouteTree, Transaction, TransactionSpec};
pub use route::{Route, RouteIter, RouteStatus};
