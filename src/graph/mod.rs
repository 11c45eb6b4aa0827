pub mod bellman_ford;
pub mod builder;
pub mod types;

// Re-exports for external use
pub use bellman_ford::{BellmanFord, ShortestRouteTree};
pub use builder::{RouteGraph, RouteGraphBuilder};
pub use types::{Hop, Transaction, TransactionSpec};
