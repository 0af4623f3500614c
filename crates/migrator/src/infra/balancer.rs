//! Client for the Balancer V3 subgraph used to retrieve a user's pool
//! shares.

const QUERY_PAGE_SIZE: usize = 100;

/// The Base deployment of the Balancer V3 subgraph.
pub const DEFAULT_SUBGRAPH_URL: &str =
    "https://api.studio.thegraph.com/query/75376/balancer-v3-base/version/latest";

use {
    crate::{
        domain::{
            eth::{H160, lowercase_address},
            shares::PoolShare,
        },
        infra::subgraph::{SubgraphClient, json_map},
    },
    anyhow::Result,
    reqwest::{Client, Url},
    std::future::Future,
};

/// Balancer V3 subgraph client for fetching a user's pool shares.
pub struct BalancerSubgraphClient {
    client: SubgraphClient,
}

impl BalancerSubgraphClient {
    pub fn from_subgraph_url(subgraph_url: &Url, client: Client) -> Self {
        Self {
            client: SubgraphClient::new(subgraph_url.clone(), client, None),
        }
    }

    /// Retrieves the owner's open pool shares, paging through the result
    /// set. Closed positions (zero balance) are filtered out; an owner
    /// without positions yields an empty list.
    pub async fn user_pool_shares(&self, owner: H160) -> Result<Vec<PoolShare>> {
        use self::pool_shares_query::*;

        let user = lowercase_address(&owner);
        let user = &user;
        collect_pages(|skip| async move {
            Ok(self
                .client
                .query::<Data>(
                    QUERY,
                    Some(json_map! {
                        "user" => user,
                        "first" => QUERY_PAGE_SIZE,
                        "skip" => skip,
                    }),
                )
                .await?
                .pool_shares)
        })
        .await
    }
}

/// Pages through a result set with `first`/`skip` windows of
/// [`QUERY_PAGE_SIZE`], keeping only open shares. The last page is the first
/// one shorter than the window.
async fn collect_pages<F, Fut>(mut fetch: F) -> Result<Vec<PoolShare>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<PoolShare>>>,
{
    let mut shares = Vec::new();
    let mut skip = 0;

    loop {
        let page = fetch(skip).await?;

        let no_more_pages = page.len() != QUERY_PAGE_SIZE;
        shares.extend(page.into_iter().filter(PoolShare::is_open));

        if no_more_pages {
            break;
        }

        skip += QUERY_PAGE_SIZE;
    }

    Ok(shares)
}

/// Explorer page for a Balancer pool.
pub fn pool_explorer_url(pool_id: &str) -> String {
    format!("https://app.balancer.fi/#/base/pool/{pool_id}")
}

mod pool_shares_query {
    use serde::Deserialize;

    pub const QUERY: &str = r#"
        query GetUserShares($user: String, $first: Int, $skip: Int) {
            poolShares(where: { user: $user }, first: $first, skip: $skip) {
                id
                balance
                pool {
                    id
                    address
                    totalShares
                    tokens {
                        address
                        symbol
                        decimals
                        balance
                        name
                    }
                }
            }
        }
    "#;

    #[derive(Debug, Deserialize)]
    pub struct Data {
        #[serde(rename = "poolShares")]
        pub pool_shares: Vec<crate::domain::shares::PoolShare>,
    }
}
