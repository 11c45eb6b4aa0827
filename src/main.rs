use clap::Parser;
use eyre::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use chain_route::config::AppConfig;
use chain_route::display::{print_header, print_hop, print_plan, print_summary};
use chain_route::scenario::{RateAlgebra, Scenario};

#[derive(Parser)]
#[command(name = "chain-route")]
#[command(about = "Hop-by-hop cross-chain swap router", long_about = None)]
struct Cli {
    /// Scenario file (overrides SCENARIO_PATH)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Print the route predicted from the initial rates and exit
    #[arg(long, default_value = "false")]
    plan: bool,

    /// Wait between committed hops, in milliseconds (overrides HOP_DELAY_MS)
    #[arg(long)]
    hop_delay_ms: Option<u64>,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json)?;

    let scenario_path = cli.scenario.unwrap_or(config.scenario_path);
    let hop_delay = Duration::from_millis(cli.hop_delay_ms.unwrap_or(config.hop_delay_ms));

    let scenario = Scenario::load(&scenario_path)?;
    let graph = scenario.build_graph()?;
    let (source, destination) = scenario.endpoints(&graph)?;
    let rates = scenario.live_rates();
    info!("Rate table holds {} quotes", rates.len());

    if cli.plan {
        print_header(&scenario, "plan");
        let algebra = RateAlgebra::new(rates);
        let hops = graph.plan(source, destination, Some(scenario.amount), &algebra)?;
        print_plan(&hops);
        return Ok(());
    }

    print_header(&scenario, "live");
    let mut route = graph.route_with_config(
        source,
        destination,
        Some(scenario.amount),
        RateAlgebra::new(rates.clone()),
        config.route,
    )?;

    let mut failure = None;
    let mut index = 0;
    while let Some(step) = route.next() {
        match step {
            Ok(hop) => {
                print_hop(index, &hop);

                let updates = scenario.updates_after(index);
                if !updates.is_empty() {
                    rates.apply(updates);
                    info!("Applied {} rate updates after hop {}", updates.len(), index);
                }
                index += 1;

                if !hop_delay.is_zero() {
                    tokio::time::sleep(hop_delay).await;
                }
            }
            Err(e) => {
                error!("Routing stopped at {}: {}", route.current_node().index(), e);
                failure = Some(e);
            }
        }
    }

    print_summary(route.status(), route.hops_committed(), route.current_label());

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
