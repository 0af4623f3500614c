//! Command line argument surface of the `migrator` binary.

use {
    crate::{
        domain::eth::H160,
        infra::{balancer, uniswap},
    },
    clap::Parser,
    reqwest::Url,
};

#[derive(Debug, Parser)]
#[command(name = "migrator", about = "Inspect Balancer V3 positions and their Uniswap V4 counterparts")]
pub struct Args {
    /// Emit logs as JSON.
    #[arg(long, env = "MIGRATOR_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Tracing filter applied when RUST_LOG is unset.
    #[arg(long, env = "MIGRATOR_LOG_FILTER", default_value = "info")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// List the owner's open Balancer V3 pool shares with their per-token
    /// claims.
    BalancerPositions {
        #[arg(long, env = "MIGRATOR_OWNER", value_parser = parse_address)]
        owner: H160,

        #[arg(
            long,
            env = "BALANCER_SUBGRAPH_URL",
            default_value = balancer::DEFAULT_SUBGRAPH_URL
        )]
        subgraph_url: Url,
    },
    /// List the owner's Uniswap V4 position records.
    UniswapPositions {
        #[arg(long, env = "MIGRATOR_OWNER", value_parser = parse_address)]
        owner: H160,

        #[arg(
            long,
            env = "UNISWAP_SUBGRAPH_URL",
            default_value = uniswap::DEFAULT_SUBGRAPH_URL
        )]
        subgraph_url: Url,

        /// Bearer token for gateway-hosted subgraph deployments.
        #[arg(long, env = "UNISWAP_SUBGRAPH_AUTH")]
        auth_token: Option<String>,
    },
}

/// Parses a 20-byte address with or without the `0x` prefix.
fn parse_address(value: &str) -> Result<H160, String> {
    let raw = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(raw).map_err(|err| err.to_string())?;
    if bytes.len() != 20 {
        return Err(format!(
            "expected a 20-byte address, got {} bytes",
            bytes.len()
        ));
    }
    Ok(H160::from_slice(&bytes))
}
