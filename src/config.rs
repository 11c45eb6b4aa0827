//! Engine tuning and driver configuration

use std::env;
use std::path::PathBuf;

/// Default scenario shipped with the repository
pub const DEFAULT_SCENARIO_PATH: &str = "scenarios/eth_polygon.json";

/// Tuning knobs for a relaxation round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteConfig {
    /// Stop relaxing once a full pass improves nothing. Final labels are the
    /// same as with all `N-1` passes on graphs without an improving cycle.
    pub early_exit: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self { early_exit: true }
    }
}

/// Configuration for the `chain-route` binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub scenario_path: PathBuf,
    /// Simulated confirmation time between committed hops
    pub hop_delay_ms: u64,
    pub log_json: bool,
    pub route: RouteConfig,
}

impl AppConfig {
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();

        let hop_delay_ms = match env::var("HOP_DELAY_MS") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| eyre::eyre!("Invalid HOP_DELAY_MS '{}': {}", raw, e))?,
            Err(_) => 0,
        };

        Ok(Self {
            scenario_path: env::var("SCENARIO_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCENARIO_PATH)),
            hop_delay_ms,
            log_json: env_flag("LOG_JSON", false),
            route: RouteConfig {
                early_exit: env_flag("EARLY_EXIT", true),
            },
        })
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| parse_flag(&v).unwrap_or(default))
        .unwrap_or(default)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
