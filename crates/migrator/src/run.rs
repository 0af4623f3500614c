//! Process wiring: argument parsing, logging and command dispatch.

use {
    crate::{
        domain::shares,
        infra::{
            balancer::{self, BalancerSubgraphClient},
            cli,
            observe,
            uniswap::UniswapSubgraphClient,
        },
    },
    anyhow::{Context, Result},
    clap::Parser,
    num::ToPrimitive,
};

/// Parses the process arguments and runs the selected command. This is the
/// entry point used by the `migrator` binary.
pub async fn start(args: impl Iterator<Item = String>) {
    let args = cli::Args::parse_from(args);
    observe::init(&args.log_filter, args.log_json);

    if let Err(err) = run(args.command).await {
        tracing::error!(?err, "command failed");
        std::process::exit(1);
    }
}

async fn run(command: cli::Command) -> Result<()> {
    let http = reqwest::Client::new();
    match command {
        cli::Command::BalancerPositions {
            owner,
            subgraph_url,
        } => {
            let client = BalancerSubgraphClient::from_subgraph_url(&subgraph_url, http);
            let positions = client.user_pool_shares(owner).await?;
            if positions.is_empty() {
                println!("No open Balancer positions for {owner:#x}");
                return Ok(());
            }

            for share in &positions {
                let pool = &share.pool;
                println!(
                    "Pool {} ({})",
                    pool.id,
                    balancer::pool_explorer_url(&pool.id)
                );

                let user_balance = share
                    .balance
                    .to_f64()
                    .context("share balance out of range")?;
                let total_shares = pool
                    .total_shares
                    .to_f64()
                    .context("total shares out of range")?;
                let amounts = shares::user_token_shares(user_balance, total_shares, &pool.tokens)?;
                for token in &pool.tokens {
                    let amount = amounts.get(&token.symbol).copied().unwrap_or_default();
                    println!(
                        "  {:<10} {}",
                        token.symbol,
                        shares::format_token_amount(&amount.to_string(), token.decimals)
                    );
                }
            }
        }
        cli::Command::UniswapPositions {
            owner,
            subgraph_url,
            auth_token,
        } => {
            let client = UniswapSubgraphClient::from_subgraph_url(&subgraph_url, http, auth_token);
            let positions = client.positions(owner).await?;
            if positions.is_empty() {
                println!("No Uniswap V4 positions for {owner:#x}");
                return Ok(());
            }

            for position in &positions {
                println!("Position {} (token id {})", position.id, position.token_id);
            }
        }
    }
    Ok(())
}
