//! Cross-chain swap scenarios for the `chain-route` binary
//!
//! A scenario lists chain/token states, the transactions between them, a
//! conversion-rate table and optional rate updates that land after each
//! committed hop. Rates live behind a shared lock so the driver can move the
//! market between hops while the route holds the algebra.

use parking_lot::RwLock;
use petgraph::graph::NodeIndex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::algebra::LabelAlgebra;
use crate::error::ConstructionError;
use crate::graph::{Hop, RouteGraph, Transaction, TransactionSpec};

/// A token held on a specific chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ChainToken {
    pub chain: String,
    pub token: String,
}

impl ChainToken {
    pub fn new(chain: &str, token: &str) -> Self {
        Self {
            chain: chain.to_string(),
            token: token.to_string(),
        }
    }
}

impl std::fmt::Display for ChainToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.token, self.chain)
    }
}

/// Exchange or bridge executing a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Venue(pub String);

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount held, `None` while unreached
pub type Amount = Option<Decimal>;

pub type SwapGraph = RouteGraph<ChainToken, Venue>;
pub type SwapHop<'g> = Hop<'g, ChainToken, Venue, Amount>;

/// Output units per input unit for one transaction
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateQuote {
    pub from: ChainToken,
    pub to: ChainToken,
    pub venue: Venue,
    pub rate: Decimal,
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("{endpoint} {node} is not a scenario node")]
    UnknownEndpoint { endpoint: &'static str, node: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub nodes: Vec<ChainToken>,
    pub transactions: Vec<TransactionSpec<ChainToken, Venue>>,
    pub rates: Vec<RateQuote>,
    pub source: ChainToken,
    pub destination: ChainToken,
    pub amount: Decimal,
    /// `updates[i]` is applied after hop `i` is committed
    #[serde(default)]
    pub updates: Vec<Vec<RateQuote>>,
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let scenario = Self::from_json(&raw)?;
        tracing::info!(
            "Loaded scenario {} ({} nodes, {} transactions, {} rates, {} update batches)",
            path.display(),
            scenario.nodes.len(),
            scenario.transactions.len(),
            scenario.rates.len(),
            scenario.updates.len()
        );
        Ok(scenario)
    }

    pub fn build_graph(&self) -> Result<SwapGraph, ScenarioError> {
        Ok(RouteGraph::from_values(
            self.nodes.clone(),
            self.transactions.clone(),
        )?)
    }

    /// Resolve the scenario's source and destination in `graph`
    pub fn endpoints(&self, graph: &SwapGraph) -> Result<(NodeIndex, NodeIndex), ScenarioError> {
        let find = |endpoint: &'static str, node: &ChainToken| {
            graph
                .find_node(node)
                .ok_or_else(|| ScenarioError::UnknownEndpoint {
                    endpoint,
                    node: node.to_string(),
                })
        };
        Ok((
            find("source", &self.source)?,
            find("destination", &self.destination)?,
        ))
    }

    pub fn live_rates(&self) -> LiveRates {
        let rates = LiveRates::default();
        rates.apply(&self.rates);
        rates
    }

    /// Rate updates scheduled after hop `index`
    pub fn updates_after(&self, index: usize) -> &[RateQuote] {
        self.updates.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

type RateKey = (ChainToken, ChainToken, Venue);

/// Shared, mutable conversion-rate table
#[derive(Debug, Clone, Default)]
pub struct LiveRates {
    table: Arc<RwLock<HashMap<RateKey, Decimal>>>,
}

impl LiveRates {
    pub fn set(&self, quote: &RateQuote) {
        self.apply(std::slice::from_ref(quote));
    }

    pub fn apply(&self, quotes: &[RateQuote]) {
        let mut table = self.table.write();
        for quote in quotes {
            table.insert(
                (quote.from.clone(), quote.to.clone(), quote.venue.clone()),
                quote.rate,
            );
        }
    }

    pub fn rate(&self, from: &ChainToken, to: &ChainToken, venue: &Venue) -> Option<Decimal> {
        // Keyed lookup needs owned parts; the table is small
        self.table
            .read()
            .get(&(from.clone(), to.clone(), venue.clone()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

/// Maximise the amount received, reading rates at relaxation time
#[derive(Debug, Clone)]
pub struct RateAlgebra {
    rates: LiveRates,
}

impl RateAlgebra {
    pub fn new(rates: LiveRates) -> Self {
        Self { rates }
    }
}

impl LabelAlgebra<ChainToken, Venue> for RateAlgebra {
    type Label = Amount;

    fn worst_label(&self) -> Amount {
        None
    }

    fn accumulate(&self, arc: Transaction<'_, ChainToken, Venue>, label: &Amount) -> Amount {
        let amount = (*label)?;
        let rate = self.rates.rate(arc.from, arc.to, arc.details)?;
        amount.checked_mul(rate)
    }

    fn improves(&self, candidate: &Amount, current: &Amount) -> bool {
        match (candidate, current) {
            (Some(candidate), Some(current)) => candidate > current,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ETH_POLYGON: &str = r#"{
        "nodes": [
            {"chain": "Ethereum", "token": "ETH"},
            {"chain": "Ethereum", "token": "USDC"},
            {"chain": "Polygon", "token": "USDC"}
        ],
        "transactions": [
            {"from": {"chain": "Ethereum", "token": "ETH"}, "to": {"chain": "Ethereum", "token": "USDC"}, "details": "uniswap"},
            {"from": {"chain": "Ethereum", "token": "USDC"}, "to": {"chain": "Polygon", "token": "USDC"}, "details": "bridge-a"},
            {"from": {"chain": "Ethereum", "token": "USDC"}, "to": {"chain": "Polygon", "token": "USDC"}, "details": "bridge-b"}
        ],
        "rates": [
            {"from": {"chain": "Ethereum", "token": "ETH"}, "to": {"chain": "Ethereum", "token": "USDC"}, "venue": "uniswap", "rate": "3000"},
            {"from": {"chain": "Ethereum", "token": "USDC"}, "to": {"chain": "Polygon", "token": "USDC"}, "venue": "bridge-a", "rate": "0.998"},
            {"from": {"chain": "Ethereum", "token": "USDC"}, "to": {"chain": "Polygon", "token": "USDC"}, "venue": "bridge-b", "rate": "0.999"}
        ],
        "source": {"chain": "Ethereum", "token": "ETH"},
        "destination": {"chain": "Polygon", "token": "USDC"},
        "amount": "1",
        "updates": [
            [{"from": {"chain": "Ethereum", "token": "USDC"}, "to": {"chain": "Polygon", "token": "USDC"}, "venue": "bridge-b", "rate": "0.990"}]
        ]
    }"#;

    fn quote(venue: &str, rate: Decimal) -> RateQuote {
        RateQuote {
            from: ChainToken::new("Ethereum", "USDC"),
            to: ChainToken::new("Polygon", "USDC"),
            venue: Venue(venue.to_string()),
            rate,
        }
    }

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_json(ETH_POLYGON).unwrap();
        assert_eq!(scenario.nodes.len(), 3);
        assert_eq!(scenario.transactions[2].details, Venue("bridge-b".to_string()));
        assert_eq!(scenario.amount, dec!(1));
        assert_eq!(scenario.updates_after(0).len(), 1);
        assert!(scenario.updates_after(1).is_empty());
        assert_eq!(scenario.live_rates().len(), 3);
    }

    #[test]
    fn test_unknown_transaction_endpoint() {
        let raw = ETH_POLYGON.replacen(
            r#"{"from": {"chain": "Ethereum", "token": "ETH"}, "to": {"chain": "Ethereum", "token": "USDC"}, "details""#,
            r#"{"from": {"chain": "Solana", "token": "ETH"}, "to": {"chain": "Ethereum", "token": "USDC"}, "details""#,
            1,
        );
        let scenario = Scenario::from_json(&raw).unwrap();
        assert!(matches!(
            scenario.build_graph(),
            Err(ScenarioError::Construction(ConstructionError::UnknownNode { transaction: 0, .. }))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(Scenario::from_json("{\"nodes\": 3}"), Err(ScenarioError::Json(_))));
    }

    #[test]
    fn test_rate_algebra_labels() {
        let rates = LiveRates::default();
        rates.set(&quote("bridge-a", dec!(0.5)));
        let algebra = RateAlgebra::new(rates);

        assert!(algebra.improves(&Some(dec!(0)), &None));
        assert!(!algebra.improves(&None, &Some(dec!(0))));
        assert!(!algebra.improves(&Some(dec!(2)), &Some(dec!(2))));
        assert!(algebra.improves(&Some(dec!(2.1)), &Some(dec!(2))));
    }

    #[test]
    fn test_set_replaces_quote_for_same_venue() {
        let rates = LiveRates::default();
        rates.set(&quote("bridge-a", dec!(0.998)));
        rates.set(&quote("bridge-b", dec!(0.999)));
        rates.set(&quote("bridge-a", dec!(0.990)));

        let (from, to) = (ChainToken::new("Ethereum", "USDC"), ChainToken::new("Polygon", "USDC"));
        assert_eq!(rates.len(), 2);
        assert_eq!(rates.rate(&from, &to, &Venue("bridge-a".to_string())), Some(dec!(0.990)));
        assert_eq!(rates.rate(&from, &to, &Venue("bridge-b".to_string())), Some(dec!(0.999)));
        assert_eq!(rates.rate(&to, &from, &Venue("bridge-a".to_string())), None);
    }

    #[test]
    fn test_route_switches_bridge_after_update() {
        let scenario = Scenario::from_json(ETH_POLYGON).unwrap();
        let graph = scenario.build_graph().unwrap();
        let (source, destination) = scenario.endpoints(&graph).unwrap();
        let rates = scenario.live_rates();

        let mut route = graph
            .route(source, destination, Some(scenario.amount), RateAlgebra::new(rates.clone()))
            .unwrap();

        let first = route.next().unwrap().unwrap();
        assert_eq!(first.details().0, "uniswap");
        assert_eq!(first.labels, [Some(dec!(1)), Some(dec!(3000))]);

        rates.apply(scenario.updates_after(0));

        let second = route.next().unwrap().unwrap();
        assert_eq!(second.details().0, "bridge-a");
        assert_eq!(*second.label_after(), Some(dec!(2994.000)));
        assert!(route.next().is_none());
    }

    #[test]
    fn test_plan_uses_rates_at_planning_time() {
        let scenario = Scenario::from_json(ETH_POLYGON).unwrap();
        let graph = scenario.build_graph().unwrap();
        let (source, destination) = scenario.endpoints(&graph).unwrap();
        let algebra = RateAlgebra::new(scenario.live_rates());

        let planned = graph.plan(source, destination, Some(dec!(2)), &algebra).unwrap();
        let venues: Vec<_> = planned.iter().map(|hop| hop.details().0.as_str()).collect();
        assert_eq!(venues, vec!["uniswap", "bridge-b"]);
        assert_eq!(*planned[1].label_after(), Some(dec!(5994)));
    }

    #[test]
    fn test_missing_endpoint() {
        let mut scenario = Scenario::from_json(ETH_POLYGON).unwrap();
        scenario.destination = ChainToken::new("Arbitrum", "USDC");
        let graph = scenario.build_graph().unwrap();
        assert!(matches!(
            scenario.endpoints(&graph),
            Err(ScenarioError::UnknownEndpoint { endpoint: "destination", .. })
        ));
    }
}
