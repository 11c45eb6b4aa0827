use crate::route::RouteStatus;
use crate::scenario::{Amount, Scenario, SwapHop};

const RULE_WIDTH: usize = 67;

fn rule() -> String {
    format!("\x1b[1;36m{}\x1b[0m", "═".repeat(RULE_WIDTH))
}

/// Format an amount, `unreached` when there is none
pub fn format_amount(amount: &Amount) -> String {
    match amount {
        Some(value) => value.normalize().to_string(),
        None => "unreached".to_string(),
    }
}

/// One-line rendering of a committed hop
pub fn format_hop(index: usize, hop: &SwapHop<'_>) -> String {
    format!(
        "#{:<2} {:<14} → {:<14} via {:<10} {:>14} → {:<14}",
        index,
        hop.from().to_string(),
        hop.to().to_string(),
        hop.details().to_string(),
        format_amount(hop.label_before()),
        format_amount(hop.label_after()),
    )
}

pub fn print_header(scenario: &Scenario, mode: &str) {
    println!("{}", rule());
    println!(
        "\x1b[1;36m  {} {} → {} | {}\x1b[0m",
        scenario.amount.normalize(),
        scenario.source,
        scenario.destination,
        mode
    );
    println!("{}", rule());
    println!();
}

pub fn print_hop(index: usize, hop: &SwapHop<'_>) {
    println!("  {}", format_hop(index, hop));
}

/// Print a planned route as computed from the initial rates
pub fn print_plan(hops: &[SwapHop<'_>]) {
    if hops.is_empty() {
        println!("  Source is the destination, nothing to do.");
        return;
    }
    for (i, hop) in hops.iter().enumerate() {
        print_hop(i, hop);
    }
    println!();
    if let Some(last) = hops.last() {
        println!(
            "  Predicted receipt: \x1b[1m{}\x1b[0m",
            format_amount(last.label_after())
        );
    }
}

/// Footer for an executed route
pub fn print_summary(status: RouteStatus, hops: usize, received: &Amount) {
    println!();
    println!("{}", rule());
    let outcome = match status {
        RouteStatus::Exhausted => "\x1b[1;32mARRIVED\x1b[0m",
        RouteStatus::Failed => "\x1b[1;31mFAILED\x1b[0m",
        RouteStatus::Active => "\x1b[1;33mSTOPPED\x1b[0m",
    };
    println!(
        "  {} | Hops: {} | Holding: \x1b[1m{}\x1b[0m",
        outcome,
        hops,
        format_amount(received)
    );
    println!("{}", rule());
}
